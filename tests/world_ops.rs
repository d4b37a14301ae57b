//! Entity lifecycle and component attach/detach behaviour.

use soa_ecs::prelude::*;

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Health {
    current: f32,
    max: f32,
}

fn setup() -> World {
    register_component::<Position>().unwrap();
    register_component::<Velocity>().unwrap();
    register_component::<Health>().unwrap();
    World::new()
}

#[test]
fn entity_ids_are_distinct_and_monotonic() {
    let mut world = setup();
    let first = world.create_entity();
    let second = world.create_entity();
    assert!(second > first);
    assert_eq!(world.entity_count(), 2);
    assert!(world.contains(first) && world.contains(second));
}

#[test]
fn attach_then_get_single_component() {
    let mut world = setup();
    let entity = world.create_entity();
    world
        .attach_one(entity, Position { x: 1.0, y: 2.0, z: 3.0 })
        .unwrap();

    let position = world.get::<Position>(entity).unwrap();
    assert_eq!(*position, Position { x: 1.0, y: 2.0, z: 3.0 });
}

#[test]
fn attach_multiple_components_at_once() {
    let mut world = setup();
    let entity = world.create_entity();
    world
        .attach(
            entity,
            (
                Position { x: 1.0, y: 2.0, z: 3.0 },
                Velocity { x: 4.0, y: 5.0, z: 6.0 },
            ),
        )
        .unwrap();

    let (position, velocity) = world.get_all::<(Position, Velocity)>(entity).unwrap();
    assert_eq!(position.x, 1.0);
    assert_eq!(velocity.x, 4.0);
}

#[test]
fn get_mut_modifies_in_place() {
    let mut world = setup();
    let entity = world.create_entity();
    world.attach_one(entity, Position::default()).unwrap();

    world.get_mut::<Position>(entity).unwrap().x = 99.0;
    assert_eq!(world.get::<Position>(entity).unwrap().x, 99.0);
}

#[test]
fn attach_overlap_is_rejected() {
    let mut world = setup();
    let entity = world.create_entity();
    world.attach_one(entity, Position::default()).unwrap();

    let result = world.attach_one(entity, Position::default());
    assert_eq!(result, Err(WorldError::DuplicateAttach { entity }));

    // The entity is untouched by the failed attach.
    assert!(world.has_one::<Position>(entity));
    assert!(!world.has_one::<Velocity>(entity));
}

#[test]
fn bundle_naming_a_type_twice_is_rejected() {
    let mut world = setup();
    let entity = world.create_entity();
    let result = world.attach(entity, (Position::default(), Position::default()));
    assert_eq!(result, Err(WorldError::DuplicateAttach { entity }));
}

#[test]
fn operations_on_unknown_entities_report_it() {
    let mut world = setup();
    let ghost = 999;

    assert_eq!(
        world.attach_one(ghost, Position::default()),
        Err(WorldError::UnknownEntity(ghost))
    );
    assert_eq!(
        world.detach::<(Position,)>(ghost),
        Err(WorldError::UnknownEntity(ghost))
    );
    assert_eq!(world.get::<Position>(ghost), Err(WorldError::UnknownEntity(ghost)));
    assert!(!world.has_one::<Position>(ghost));
    assert!(!world.destroy_entity(ghost));
}

#[test]
fn get_of_missing_component_reports_it() {
    let mut world = setup();
    let entity = world.create_entity();
    world.attach_one(entity, Position::default()).unwrap();

    assert!(matches!(
        world.get::<Velocity>(entity),
        Err(WorldError::MissingComponent { .. })
    ));
}

#[test]
fn detach_single_component_preserves_the_rest() {
    let mut world = setup();
    let entity = world.create_entity();
    world
        .attach(
            entity,
            (
                Position { x: 1.0, y: 2.0, z: 3.0 },
                Velocity { x: 4.0, y: 5.0, z: 6.0 },
            ),
        )
        .unwrap();

    world.detach::<(Velocity,)>(entity).unwrap();
    assert!(!world.has_one::<Velocity>(entity));

    let position = world.get::<Position>(entity).unwrap();
    assert_eq!(*position, Position { x: 1.0, y: 2.0, z: 3.0 });
}

#[test]
fn detach_multiple_components_at_once() {
    let mut world = setup();
    let entity = world.create_entity();
    world
        .attach(
            entity,
            (
                Position { x: 1.0, y: 2.0, z: 3.0 },
                Velocity::default(),
                Health { current: 100.0, max: 100.0 },
            ),
        )
        .unwrap();

    world.detach::<(Velocity, Health)>(entity).unwrap();

    assert!(world.has_one::<Position>(entity));
    assert!(!world.has_one::<Velocity>(entity));
    assert!(!world.has_one::<Health>(entity));
    assert_eq!(world.get::<Position>(entity).unwrap().x, 1.0);
}

#[test]
fn detach_all_components_keeps_the_entity_alive() {
    let mut world = setup();
    let entity = world.create_entity();
    world
        .attach(entity, (Position::default(), Velocity::default()))
        .unwrap();

    world.detach::<(Position, Velocity)>(entity).unwrap();

    assert!(world.contains(entity));
    assert!(!world.has_one::<Position>(entity));
    assert!(!world.has_one::<Velocity>(entity));
    assert!(world.archetype_of(entity).unwrap().mask().is_empty());

    // The emptied entity can pick up components again.
    world.attach_one(entity, Health { current: 1.0, max: 2.0 }).unwrap();
    assert_eq!(world.get::<Health>(entity).unwrap().max, 2.0);
}

#[test]
fn spawn_mints_and_populates_in_one_step() {
    let mut world = setup();
    let entity = world
        .spawn((
            Position { x: 7.0, y: 8.0, z: 9.0 },
            Health { current: 50.0, max: 100.0 },
        ))
        .unwrap();

    assert!(world.contains(entity));
    assert_eq!(world.get::<Position>(entity).unwrap().z, 9.0);
    assert_eq!(world.get::<Health>(entity).unwrap().current, 50.0);
    assert!(!world.has_one::<Velocity>(entity));
}

#[test]
fn detach_all_empties_but_keeps_the_entity() {
    let mut world = setup();
    let entity = world
        .spawn((Position::default(), Velocity::default(), Health::default()))
        .unwrap();

    world.detach_all(entity).unwrap();

    assert!(world.contains(entity));
    assert!(world.archetype_of(entity).unwrap().mask().is_empty());
    assert!(!world.has::<(Position, Velocity, Health)>(entity));

    // Idempotent on an already-empty entity.
    world.detach_all(entity).unwrap();
    assert!(world.contains(entity));
}

#[test]
fn detach_of_absent_component_is_a_no_op() {
    let mut world = setup();
    let entity = world.create_entity();
    world.attach_one(entity, Position { x: 1.0, y: 0.0, z: 0.0 }).unwrap();

    world.detach::<(Velocity,)>(entity).unwrap();
    assert_eq!(world.get::<Position>(entity).unwrap().x, 1.0);
}

#[test]
fn has_checks_whole_sets() {
    let mut world = setup();
    let entity = world.create_entity();
    world
        .attach(entity, (Position::default(), Velocity::default()))
        .unwrap();

    assert!(world.has::<(Position, Velocity)>(entity));
    assert!(!world.has::<(Position, Health)>(entity));
    assert!(world.has::<()>(entity));
}

#[test]
fn destroy_entity_drops_it_from_the_world() {
    let mut world = setup();
    let entity = world.create_entity();
    world.attach_one(entity, Position::default()).unwrap();

    assert!(world.destroy_entity(entity));
    assert!(!world.contains(entity));
    assert_eq!(world.get::<Position>(entity), Err(WorldError::UnknownEntity(entity)));
    assert!(!world.destroy_entity(entity));
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn empty_archetype_exists_after_first_entity_and_is_reused() {
    let mut world = setup();
    let first = world.create_entity();
    let archetypes_after_first = world.archetype_count();
    let second = world.create_entity();
    assert_eq!(world.archetype_count(), archetypes_after_first);

    let empty = world.archetype_of(first).unwrap();
    assert!(empty.mask().is_empty());
    assert!(empty.contains(first) && empty.contains(second));
}
