use super::*;
use crate::error::Error;

#[test]
fn test_resize_grows_capacity_in_steps() {
    let mut list = FloatConstantList::new();
    list.resize(5).unwrap();
    assert_eq!(list.len(), 5);
    assert!(list.capacity() >= 16);
    assert_eq!(list.as_slice(), &[0.0; 5]);

    list.resize(17).unwrap();
    assert_eq!(list.len(), 17);
    assert!(list.capacity() >= 32);
}

#[test]
fn test_resize_smaller_is_state_violation() {
    let mut list = IntConstantList::new();
    list.resize(8).unwrap();
    assert!(matches!(list.resize(4), Err(Error::StateViolation(_))));
    assert_eq!(list.len(), 8);
    list.resize(8).unwrap();
}

#[test]
fn test_clear_allows_regrowth() {
    let mut list = FloatConstantList::with_grow_step(4);
    list.resize(10).unwrap();
    list.clear();
    assert!(list.is_empty());
    list.resize(2).unwrap();
    assert_eq!(list.len(), 2);
}

#[test]
fn test_insert_and_remove_range() {
    let mut list = IntConstantList::new();
    for v in 1..=4 {
        list.push(v);
    }
    list.insert_zeros(2, 3).unwrap();
    assert_eq!(list.as_slice(), &[1, 2, 0, 0, 0, 3, 4]);

    list.remove_range(1, 4).unwrap();
    assert_eq!(list.as_slice(), &[1, 3, 4]);

    assert!(matches!(list.remove_range(2, 5), Err(Error::BoundsViolation(_))));
    assert!(matches!(list.insert_zeros(9, 1), Err(Error::BoundsViolation(_))));
}

#[test]
fn test_write_bounds_checked() {
    let mut list = FloatConstantList::new();
    list.extend_zeros(4);
    list.write(1, &[1.0, 2.0]).unwrap();
    assert_eq!(list.as_slice(), &[0.0, 1.0, 2.0, 0.0]);
    assert_eq!(list.get(2), Some(2.0));
    assert_eq!(list.get(9), None);
    assert!(matches!(list.write(3, &[1.0, 2.0]), Err(Error::BoundsViolation(_))));
}

#[test]
fn test_grow_step_never_zero() {
    let list = FloatConstantList::with_grow_step(0);
    assert_eq!(list.grow_step(), 1);
}
