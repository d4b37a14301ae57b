//! # soa-ecs
//!
//! Archetype-based Entity-Component-System storage engine.
//!
//! Entities are grouped by their exact set of attached component types
//! (their *archetype*); each component type is laid out contiguously in a
//! structure-of-arrays column, so compile-time-typed queries iterate
//! cache-friendly linear memory.
//!
//! ## Design goals
//! - Archetype storage with type-erased columns behind per-type vtables
//! - Bitmask archetype identity with O(1) query matching
//! - Swap-and-pop removal with dense index fix-up
//! - Typed queries whose const-correctness is enforced by the borrow
//!   checker
//!
//! ## Example
//! ```
//! use soa_ecs::prelude::*;
//!
//! #[derive(Clone, Default)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Clone, Default)]
//! struct Velocity { x: f32, y: f32 }
//!
//! register_component::<Position>().unwrap();
//! register_component::<Velocity>().unwrap();
//!
//! let mut world = World::new();
//! let entity = world.create_entity();
//! world
//!     .attach(entity, (Position { x: 0.0, y: 0.0 }, Velocity { x: 1.0, y: 2.0 }))
//!     .unwrap();
//!
//! let query = Query::<(Position, Velocity)>::new().unwrap();
//! query.each_mut(&mut world, |(position, velocity)| {
//!     position.x += velocity.x;
//!     position.y += velocity.y;
//! });
//!
//! assert_eq!(world.get::<Position>(entity).unwrap().y, 2.0);
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod engine;

pub(crate) type HashMap<K, V> = ahash::AHashMap<K, V>;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::component::{
    component_id_of, component_info, register_component, Component, ComponentBundle, ComponentSet,
    TypeInfo,
};

pub use engine::archetype::Archetype;
pub use engine::query::{ComponentQuery, Query};
pub use engine::storage::Column;
pub use engine::world::World;

pub use engine::error::{RegistryError, WorldError, WorldResult};

pub use engine::types::{
    ArchetypeId, ComponentMask, ComponentTypeId, EntityId, MAX_COMPONENTS,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used engine types.
///
/// Import with:
/// ```rust
/// use soa_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        component_id_of, register_component, Component, ComponentMask, EntityId, Query,
        RegistryError, World, WorldError, WorldResult,
    };
}
