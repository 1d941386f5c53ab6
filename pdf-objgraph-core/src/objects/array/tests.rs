//! Tests for Array object functionality

use super::*;
use crate::objects::Object;

#[test]
fn test_array_new() {
    let array = Array::new();
    assert_eq!(array.len(), 0, "New array should be empty");
    assert!(array.is_empty(), "New array should be empty");
}

#[test]
fn test_array_push_pop() {
    let mut array = Array::new();
    assert!(array.pop().is_none(), "Pop on empty array should return None");

    array.push(42);
    array.push(true);
    assert_eq!(array.len(), 2);

    assert_eq!(array.pop(), Some(Object::Boolean(true)));
    assert_eq!(array.pop(), Some(Object::integer(42)));
    assert!(array.is_empty());
}

#[test]
fn test_array_insert_remove() {
    let mut array = Array::new();
    array.push(1);
    array.push(3);
    array.insert(1, 2);

    let values: Vec<i64> = array.iter().filter_map(Object::as_integer).collect();
    assert_eq!(values, vec![1, 2, 3]);

    assert_eq!(array.remove(0), Object::integer(1));
    assert_eq!(array.len(), 2);
}

#[test]
#[should_panic]
fn test_array_remove_out_of_bounds() {
    let mut array = Array::new();
    array.remove(0);
}

#[test]
fn test_array_get_mut() {
    let mut array = Array::from(vec![Object::integer(1), Object::Null]);
    if let Some(slot) = array.get_mut(1) {
        *slot = Object::name("Replaced");
    }
    assert_eq!(array.get(1), Some(&Object::name("Replaced")));
    assert!(array.get(2).is_none());
}

#[test]
fn test_array_references() {
    let mut array = Array::new();
    array.push(ObjectId::new(4, 0));
    array.push(Object::integer(4));
    array.push(ObjectId::new(9, 1));
    array.push(ObjectId::new(4, 0));

    let refs: Vec<ObjectId> = array.references().collect();
    assert_eq!(
        refs,
        vec![ObjectId::new(4, 0), ObjectId::new(9, 1), ObjectId::new(4, 0)]
    );

    assert_eq!(array.remove_reference(ObjectId::new(4, 0)), 2);
    assert_eq!(array.len(), 2);
}

#[test]
fn test_array_conversions() {
    let array: Array = (0..3).map(|i| Object::integer(i)).collect();
    let vec: Vec<Object> = array.clone().into();
    assert_eq!(vec.len(), 3);

    let mut total = 0;
    for obj in &array {
        total += obj.as_integer().unwrap_or(0);
    }
    assert_eq!(total, 3);
}

#[test]
fn test_array_clear_and_equality() {
    let mut a = Array::from(vec![Object::Null, Object::Boolean(false)]);
    let b = a.clone();
    assert_eq!(a, b);
    a.clear();
    assert_ne!(a, b);
    assert_eq!(a, Array::default());
}
