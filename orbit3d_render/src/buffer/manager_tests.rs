use super::*;
use std::sync::{Arc, Mutex};
use crate::buffer::storage::DefaultBufferFactory;
use crate::buffer::usage::{IndexType, LockMode};
use crate::buffer::vertex_declaration::{VertexDeclaration, VertexElementSemantic, VertexElementType};

// ============================================================================
// Helpers
// ============================================================================

#[derive(Default)]
struct RecordingLicensee {
    expired: Mutex<Vec<VertexBufferKey>>,
}

impl RecordingLicensee {
    fn expired(&self) -> Vec<VertexBufferKey> {
        self.expired.lock().unwrap().clone()
    }
}

impl HardwareBufferLicensee for RecordingLicensee {
    fn license_expired(&self, copy: VertexBufferKey) {
        self.expired.lock().unwrap().push(copy);
    }
}

fn manager_with(config: RenderConfig) -> HardwareBufferManager {
    HardwareBufferManager::new(Box::new(DefaultBufferFactory::new()), &config)
}

fn manager() -> HardwareBufferManager {
    manager_with(RenderConfig::default())
}

fn position_declaration() -> VertexDeclaration {
    VertexDeclaration::new()
        .with_element(0, VertexElementType::Float3, VertexElementSemantic::Position)
}

fn vertex_desc(declaration: VertexDeclaration, vertex_count: usize) -> VertexBufferDesc {
    VertexBufferDesc {
        declaration,
        source: 0,
        vertex_count,
        usage: BufferUsage::STATIC_WRITE_ONLY,
        use_shadow: false,
    }
}

fn licensee() -> (Arc<RecordingLicensee>, Weak<dyn HardwareBufferLicensee>) {
    let licensee = Arc::new(RecordingLicensee::default());
    let weak = Arc::downgrade(&licensee) as Weak<dyn HardwareBufferLicensee>;
    (licensee, weak)
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn test_create_vertex_buffer_size_from_layout() {
    let mut mgr = manager();
    let key = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 10)).unwrap();

    let vb = mgr.vertex_buffer(key).unwrap();
    assert_eq!(vb.vertex_size(), 12);
    assert_eq!(vb.vertex_count(), 10);
    assert_eq!(vb.size(), 120);
    assert!(!vb.has_shadow());
    assert_eq!(mgr.vertex_buffer_count(), 1);
}

#[test]
fn test_create_vertex_buffer_with_shadow() {
    let mut mgr = manager();
    let mut desc = vertex_desc(position_declaration(), 4);
    desc.usage = BufferUsage::STATIC;
    desc.use_shadow = true;
    let key = mgr.create_vertex_buffer(desc).unwrap();

    let vb = mgr.vertex_buffer(key).unwrap();
    assert!(vb.has_shadow());
    assert_eq!(vb.usage(), BufferUsage::STATIC_WRITE_ONLY);
    assert_eq!(vb.shadow().unwrap().usage(), BufferUsage::DYNAMIC);
}

#[test]
fn test_create_vertex_buffer_rejects_missing_source() {
    let mut mgr = manager();
    let mut desc = vertex_desc(position_declaration(), 4);
    desc.source = 3;
    assert!(matches!(mgr.create_vertex_buffer(desc), Err(Error::InvalidResource(_))));
}

#[test]
fn test_create_index_buffer() {
    let mut mgr = manager();
    let key = mgr.create_index_buffer(IndexBufferDesc {
        index_type: IndexType::U16,
        index_count: 6,
        usage: BufferUsage::STATIC,
        use_shadow: false,
    }).unwrap();

    let ib = mgr.index_buffer(key).unwrap();
    assert_eq!(ib.size(), 12);
    assert_eq!(ib.index_size(), 2);
    assert_eq!(ib.index_count(), 6);
    assert_eq!(mgr.index_buffer_count(), 1);
}

#[test]
fn test_instance_data_capability() {
    let caps = RenderSystemCapabilities::new();
    let mut mgr = HardwareBufferManager::new(
        Box::new(DefaultBufferFactory::with_capabilities(caps)),
        &RenderConfig::default(),
    );
    let key = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let vb = mgr.vertex_buffer_mut(key).unwrap();
    assert!(matches!(vb.set_is_instance_data(true), Err(Error::Unsupported(_))));
    assert!(vb.set_is_instance_data(false).is_ok());

    let mut mgr = manager();
    let key = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let vb = mgr.vertex_buffer_mut(key).unwrap();
    vb.set_is_instance_data(true).unwrap();
    assert!(vb.is_instance_data());
}

#[test]
fn test_device_copy_capability_reaches_buffers() {
    let mut mgr = manager();
    let key = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    assert!(!mgr.vertex_buffer(key).unwrap().device_copy());

    let caps = RenderSystemCapabilities::new().with_device_copy(true);
    let mut mgr = HardwareBufferManager::new(
        Box::new(DefaultBufferFactory::with_capabilities(caps)),
        &RenderConfig::default(),
    );
    let key = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    assert!(mgr.vertex_buffer(key).unwrap().device_copy());
}

// ============================================================================
// Temporary copies
// ============================================================================

#[test]
fn test_allocate_copy_with_data() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 2)).unwrap();
    let payload: Vec<u8> = (0..24).collect();
    mgr.vertex_buffer_mut(source).unwrap().write_data(0, &payload, true).unwrap();

    let (_holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak, true).unwrap();

    let vb = mgr.vertex_buffer(copy).unwrap();
    assert_eq!(vb.vertex_size(), 12);
    assert_eq!(vb.vertex_count(), 2);
    assert_eq!(vb.usage(), BufferUsage::DYNAMIC_WRITE_ONLY_DISCARDABLE);
    assert!(vb.has_shadow());

    let mut out = vec![0u8; 24];
    vb.read_data(0, &mut out).unwrap();
    assert_eq!(out, payload);
    assert!(mgr.is_leased(copy));
    assert_eq!(mgr.leased_copy_count(), 1);
}

#[test]
fn test_allocate_copy_of_empty_buffer_rejected() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 0)).unwrap();
    let (_holder, weak) = licensee();
    assert!(matches!(
        mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak, false),
        Err(Error::InvalidResource(_))
    ));
}

#[test]
fn test_released_copy_is_reused() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 8)).unwrap();
    let (holder, weak) = licensee();

    let first = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak.clone(), false).unwrap();
    mgr.release_vertex_buffer_copy(first);
    assert_eq!(holder.expired(), vec![first]);
    assert_eq!(mgr.free_copy_count(), 1);
    assert!(!mgr.is_leased(first));

    let count_before = mgr.vertex_buffer_count();
    let second = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak, false).unwrap();
    assert_eq!(first, second);
    assert_eq!(mgr.vertex_buffer_count(), count_before);
    assert_eq!(mgr.free_copy_count(), 0);
}

#[test]
fn test_free_copy_reused_across_sources_with_equal_shape() {
    let mut mgr = manager();
    let a = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 8)).unwrap();
    let normals = VertexDeclaration::new()
        .with_element(0, VertexElementType::Float3, VertexElementSemantic::Normal);
    let b = mgr.create_vertex_buffer(vertex_desc(normals, 8)).unwrap();
    let (_holder, weak) = licensee();

    let copy = mgr.allocate_vertex_buffer_copy(a, BufferLicenseRelease::Manual, weak.clone(), false).unwrap();
    mgr.release_vertex_buffer_copy(copy);

    let reused = mgr.allocate_vertex_buffer_copy(b, BufferLicenseRelease::Manual, weak, false).unwrap();
    assert_eq!(reused, copy);
    assert_eq!(
        mgr.vertex_buffer(reused).unwrap().elements()[0].semantic,
        VertexElementSemantic::Normal
    );
    assert_eq!(mgr.tracked_copy_count(b), 1);
    assert_eq!(mgr.tracked_copy_count(a), 0);
}

#[test]
fn test_free_copy_not_reused_for_different_vertex_size() {
    let mut mgr = manager();
    let a = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 8)).unwrap();
    let wide = VertexDeclaration::new()
        .with_element(0, VertexElementType::Float4, VertexElementSemantic::Position);
    let b = mgr.create_vertex_buffer(vertex_desc(wide, 8)).unwrap();
    let (_holder, weak) = licensee();

    let copy = mgr.allocate_vertex_buffer_copy(a, BufferLicenseRelease::Manual, weak.clone(), false).unwrap();
    mgr.release_vertex_buffer_copy(copy);

    let other = mgr.allocate_vertex_buffer_copy(b, BufferLicenseRelease::Manual, weak, false).unwrap();
    assert_ne!(other, copy);
    assert_eq!(mgr.free_copy_count(), 1);
}

#[test]
fn test_release_of_unleased_copy_is_ignored() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    mgr.release_vertex_buffer_copy(source);
    assert_eq!(mgr.free_copy_count(), 0);
}

#[test]
fn test_touch_manual_copy_is_state_violation() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (_holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak, false).unwrap();
    assert!(matches!(mgr.touch_vertex_buffer_copy(copy), Err(Error::StateViolation(_))));
}

#[test]
fn test_automatic_copy_expires_after_untouched_frames() {
    let mut config = RenderConfig::default();
    config.temp_buffer_expiry_frames = 3;
    let mut mgr = manager_with(config);
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak, false).unwrap();

    mgr.release_buffer_copies(false);
    mgr.release_buffer_copies(false);
    mgr.touch_vertex_buffer_copy(copy).unwrap();
    mgr.release_buffer_copies(false);
    mgr.release_buffer_copies(false);
    assert!(mgr.is_leased(copy));
    assert!(holder.expired().is_empty());

    mgr.release_buffer_copies(false);
    assert!(!mgr.is_leased(copy));
    assert_eq!(holder.expired(), vec![copy]);
    assert_eq!(mgr.free_copy_count(), 1);
}

#[test]
fn test_release_buffer_copies_skips_manual_leases() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (holder, weak) = licensee();
    let manual = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak.clone(), false).unwrap();
    let automatic = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak, false).unwrap();

    mgr.release_buffer_copies(true);

    assert!(mgr.is_leased(manual));
    assert!(!mgr.is_leased(automatic));
    assert!(mgr.vertex_buffer(automatic).is_none());
    assert!(mgr.vertex_buffer(manual).is_some());
    assert_eq!(holder.expired(), vec![automatic]);
    assert_eq!(mgr.free_copy_count(), 0);
}

#[test]
fn test_under_used_copies_freed_after_threshold() {
    let mut config = RenderConfig::default();
    config.under_used_frame_threshold = 3;
    let mut mgr = manager_with(config);
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (_holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak, false).unwrap();
    mgr.release_vertex_buffer_copy(copy);

    mgr.release_buffer_copies(false);
    mgr.release_buffer_copies(false);
    assert_eq!(mgr.free_copy_count(), 1);

    mgr.release_buffer_copies(false);
    assert_eq!(mgr.free_copy_count(), 0);
    assert!(mgr.vertex_buffer(copy).is_none());
}

#[test]
fn test_free_unused_buffer_copies() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (_holder, weak) = licensee();
    let a = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak.clone(), false).unwrap();
    let b = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak, false).unwrap();
    mgr.release_vertex_buffer_copy(a);

    assert_eq!(mgr.free_unused_buffer_copies(), 1);
    assert!(mgr.vertex_buffer(a).is_none());
    assert!(mgr.vertex_buffer(b).is_some());
    assert_eq!(mgr.free_unused_buffer_copies(), 0);
}

#[test]
fn test_force_release_buffer_copies() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (holder, weak) = licensee();
    let manual = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak.clone(), false).unwrap();
    let automatic = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak.clone(), false).unwrap();
    let free = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak, false).unwrap();
    mgr.release_vertex_buffer_copy(free);
    assert_eq!(mgr.tracked_copy_count(source), 3);

    assert_eq!(mgr.force_release_buffer_copies(source), 3);

    assert_eq!(mgr.tracked_copy_count(source), 0);
    assert_eq!(mgr.leased_copy_count(), 0);
    assert_eq!(mgr.free_copy_count(), 0);
    assert_eq!(mgr.vertex_buffer_count(), 1);
    let expired = holder.expired();
    assert!(expired.contains(&manual));
    assert!(expired.contains(&automatic));
}

#[test]
fn test_register_source_and_copy() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 2)).unwrap();
    let premade = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 2)).unwrap();
    mgr.register_vertex_buffer_source_and_copy(source, premade).unwrap();
    assert_eq!(mgr.free_copy_count(), 1);

    let (_holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak, false).unwrap();
    assert_eq!(copy, premade);

    assert!(mgr.register_vertex_buffer_source_and_copy(source, source).is_err());
}

// ============================================================================
// Destruction
// ============================================================================

#[test]
fn test_destroy_source_releases_its_copies() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak, false).unwrap();

    assert!(mgr.destroy_vertex_buffer(source));
    assert!(mgr.vertex_buffer(copy).is_none());
    assert_eq!(holder.expired(), vec![copy]);
    assert_eq!(mgr.vertex_buffer_count(), 0);
}

#[test]
fn test_notify_destroyed_is_idempotent() {
    let mut mgr = manager();
    let key = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    assert!(mgr.notify_vertex_buffer_destroyed(key).is_some());
    assert!(mgr.notify_vertex_buffer_destroyed(key).is_none());
    assert!(!mgr.destroy_vertex_buffer(key));

    let ib = mgr.create_index_buffer(IndexBufferDesc {
        index_type: IndexType::U32,
        index_count: 3,
        usage: BufferUsage::STATIC,
        use_shadow: true,
    }).unwrap();
    assert!(mgr.destroy_index_buffer(ib));
    assert!(mgr.notify_index_buffer_destroyed(ib).is_none());
    assert!(!mgr.destroy_index_buffer(ib));
}

#[test]
fn test_destroy_leased_copy_notifies_licensee() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak, false).unwrap();

    assert!(mgr.destroy_vertex_buffer(copy));
    assert_eq!(holder.expired(), vec![copy]);
    assert_eq!(mgr.tracked_copy_count(source), 0);
}

#[test]
fn test_drop_notifies_outstanding_licensees() {
    let (holder, weak) = licensee();
    let copy = {
        let mut mgr = manager();
        let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
        mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak, false).unwrap()
    };
    assert_eq!(holder.expired(), vec![copy]);
}

#[test]
fn test_dropped_licensee_is_skipped() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Automatic, weak, false).unwrap();
    drop(holder);

    mgr.release_vertex_buffer_copy(copy);
    assert_eq!(mgr.free_copy_count(), 1);
}

#[test]
fn test_copy_lock_goes_through_shadow() {
    let mut mgr = manager();
    let source = mgr.create_vertex_buffer(vertex_desc(position_declaration(), 1)).unwrap();
    let (_holder, weak) = licensee();
    let copy = mgr.allocate_vertex_buffer_copy(source, BufferLicenseRelease::Manual, weak, false).unwrap();

    let vb = mgr.vertex_buffer_mut(copy).unwrap();
    vb.lock_as::<f32>(0, 12, LockMode::Discard).unwrap().copy_from_slice(&[1.0, 2.0, 3.0]);
    vb.unlock().unwrap();

    let mut out = [0u8; 12];
    vb.read_data(0, &mut out).unwrap();
    assert_eq!(bytemuck::cast_slice::<u8, f32>(&out), &[1.0, 2.0, 3.0]);
}
