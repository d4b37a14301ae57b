//! Column-level storage behaviour: push, swap-remove, reserve, resize,
//! clear, and destructor accounting.

use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicUsize, Ordering};

use soa_ecs::{component_info, register_component, Column};

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Simple {
    value: i32,
}

#[derive(Clone, Default, Debug)]
struct Complex {
    name: String,
}

impl Complex {
    fn new(name: &str) -> Self {
        Complex { name: name.to_owned() }
    }
}

static TRACKED_DROPS: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Default)]
struct Tracked {
    _payload: String,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        TRACKED_DROPS.fetch_add(1, Ordering::Relaxed);
    }
}

fn column_of<T: soa_ecs::Component>() -> Column {
    let id = register_component::<T>().unwrap();
    Column::new(component_info(id).unwrap())
}

/// Relocates `value` into the column, transferring ownership.
fn push_value<T: soa_ecs::Component>(column: &mut Column, value: T) {
    let value = ManuallyDrop::new(value);
    unsafe { column.push((&*value as *const T).cast()) };
}

#[test]
fn new_column_is_empty_without_allocation() {
    let column = column_of::<Simple>();
    assert_eq!(column.len(), 0);
    assert!(column.is_empty());
    assert_eq!(column.capacity(), 0);
}

#[test]
fn push_and_read_back_simple_values() {
    let mut column = column_of::<Simple>();
    push_value(&mut column, Simple { value: 42 });
    push_value(&mut column, Simple { value: 100 });

    assert_eq!(column.len(), 2);
    assert_eq!(unsafe { column.get::<Simple>(0) }.value, 42);
    assert_eq!(unsafe { column.get::<Simple>(1) }.value, 100);
}

#[test]
fn push_cloned_leaves_the_source_alive() {
    let mut column = column_of::<Complex>();
    let source = Complex::new("still mine");
    unsafe { column.push_cloned((&source as *const Complex).cast()) };

    assert_eq!(column.len(), 1);
    assert_eq!(unsafe { column.get::<Complex>(0) }.name, "still mine");
    assert_eq!(source.name, "still mine");
}

#[test]
fn values_survive_buffer_growth() {
    let mut column = column_of::<Complex>();
    for index in 0..100 {
        push_value(&mut column, Complex::new(&format!("value-{index}")));
    }
    assert_eq!(column.len(), 100);
    for index in 0..100 {
        assert_eq!(
            unsafe { column.get::<Complex>(index) }.name,
            format!("value-{index}")
        );
    }
}

#[test]
fn swap_remove_moves_the_tail_into_the_gap() {
    let mut column = column_of::<Simple>();
    for value in [0, 10, 20] {
        push_value(&mut column, Simple { value });
    }

    column.swap_remove(1);
    assert_eq!(column.len(), 2);
    assert_eq!(unsafe { column.get::<Simple>(0) }.value, 0);
    assert_eq!(unsafe { column.get::<Simple>(1) }.value, 20);
}

#[test]
fn swap_remove_on_nontrivial_values() {
    let mut column = column_of::<Complex>();
    for name in ["first", "second", "third"] {
        push_value(&mut column, Complex::new(name));
    }

    column.swap_remove(1);
    assert_eq!(column.len(), 2);
    assert_eq!(unsafe { column.get::<Complex>(0) }.name, "first");
    assert_eq!(unsafe { column.get::<Complex>(1) }.name, "third");
}

#[test]
fn swap_remove_of_the_last_element_only_shrinks() {
    let mut column = column_of::<Complex>();
    push_value(&mut column, Complex::new("first"));
    push_value(&mut column, Complex::new("second"));

    column.swap_remove(1);
    assert_eq!(column.len(), 1);
    assert_eq!(unsafe { column.get::<Complex>(0) }.name, "first");

    column.swap_remove(0);
    assert_eq!(column.len(), 0);
}

#[test]
fn reserve_preallocates_without_changing_length() {
    let mut column = column_of::<Simple>();
    column.reserve(100);
    assert!(column.capacity() >= 100);
    assert_eq!(column.len(), 0);

    push_value(&mut column, Simple { value: 0 });
    let first_slot = column.get_ptr(0);
    for value in 1..100 {
        push_value(&mut column, Simple { value });
    }
    // No growth happened inside the reserved range, so addresses held.
    assert_eq!(column.get_ptr(0), first_slot);
    assert_eq!(unsafe { column.get::<Simple>(99) }.value, 99);
}

#[test]
fn resize_default_constructs_and_destroys() {
    let mut column = column_of::<Simple>();
    column.resize(3);
    assert_eq!(column.len(), 3);
    for index in 0..3 {
        assert_eq!(unsafe { column.get::<Simple>(index) }.value, 0);
    }
    column.resize(1);
    assert_eq!(column.len(), 1);
}

#[test]
fn clear_and_drop_run_every_destructor() {
    let before = TRACKED_DROPS.load(Ordering::Relaxed);
    {
        let mut column = column_of::<Tracked>();
        for _ in 0..5 {
            push_value(&mut column, Tracked::default());
        }
        column.clear();
        assert_eq!(TRACKED_DROPS.load(Ordering::Relaxed), before + 5);
        assert_eq!(column.len(), 0);
        assert_eq!(column.capacity(), 0);

        // Refill, then let Drop do the cleanup.
        for _ in 0..3 {
            push_value(&mut column, Tracked::default());
        }
    }
    assert_eq!(TRACKED_DROPS.load(Ordering::Relaxed), before + 8);
}

#[test]
fn pop_destroys_only_the_tail() {
    let mut column = column_of::<Complex>();
    push_value(&mut column, Complex::new("keep"));
    push_value(&mut column, Complex::new("drop"));

    column.pop();
    assert_eq!(column.len(), 1);
    assert_eq!(unsafe { column.get::<Complex>(0) }.name, "keep");
}
