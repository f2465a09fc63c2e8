use super::*;

#[test]
fn test_software_storage_is_zeroed() {
    let storage = SoftwareBufferStorage::new(10);
    assert_eq!(storage.size(), 10);
    assert_eq!(storage.bytes(), &[0u8; 10]);
    assert!(storage.is_system_memory());
}

#[test]
fn test_software_storage_write_read() {
    let mut storage = SoftwareBufferStorage::new(8);
    storage.write_data(2, &[1, 2, 3], false).unwrap();

    let mut out = [0u8; 5];
    storage.read_data(1, &mut out).unwrap();
    assert_eq!(out, [0, 1, 2, 3, 0]);
}

#[test]
fn test_software_storage_rejects_out_of_range() {
    let mut storage = SoftwareBufferStorage::new(4);
    assert!(matches!(
        storage.write_data(2, &[1, 2, 3], false),
        Err(Error::BoundsViolation(_))
    ));
    let mut out = [0u8; 2];
    assert!(matches!(storage.read_data(3, &mut out), Err(Error::BoundsViolation(_))));
    assert!(matches!(storage.lock_impl(usize::MAX, 2, LockMode::Normal), Err(Error::BoundsViolation(_))));
}

#[test]
fn test_software_storage_locked_bytes_view() {
    let mut storage = SoftwareBufferStorage::new(16);
    storage.lock_impl(4, 8, LockMode::Normal).unwrap();
    storage.locked_bytes(4, 8).unwrap().fill(0xAB);
    storage.unlock_impl().unwrap();

    assert_eq!(&storage.bytes()[..4], &[0; 4]);
    assert_eq!(&storage.bytes()[4..12], &[0xAB; 8]);
    assert_eq!(&storage.bytes()[12..], &[0; 4]);
}

#[test]
fn test_software_storage_has_no_device_copy() {
    let mut dst = SoftwareBufferStorage::new(4);
    let src = SoftwareBufferStorage::new(4);
    assert!(matches!(
        dst.copy_from_storage(&src, 0, 0, 4),
        Err(Error::Unimplemented(_))
    ));
}

#[test]
fn test_default_factory() {
    let factory = DefaultBufferFactory::new();
    assert!(factory.capabilities().instance_data);

    let storage = factory.create_storage(12, BufferUsage::STATIC).unwrap();
    assert_eq!(storage.size(), 12);
    assert!(storage.is_system_memory());
}

#[test]
fn test_default_factory_custom_capabilities() {
    let factory = DefaultBufferFactory::with_capabilities(RenderSystemCapabilities::new());
    assert!(!factory.capabilities().instance_data);
}
