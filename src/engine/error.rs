//! Error types for component registration and world mutation.
//!
//! This module declares the focused, composable error types used across
//! the registry and the world mutation pipeline. Each error carries
//! enough context to make the failure actionable while staying small and
//! cheap to pass around or convert into the aggregate [`WorldError`].
//!
//! ## Goals
//! * **Specificity:** each variant models a single misuse class (type
//!   never registered, id space exhausted, unknown entity, missing
//!   component, double attach).
//! * **Ergonomics:** all errors implement [`std::error::Error`] and
//!   [`std::fmt::Display`], and `From<RegistryError>` lets registry
//!   failures bubble through world operations with `?`.
//!
//! Internal bookkeeping violations (index/entity tables disagreeing,
//! typed access against the wrong column) are *not* modelled here; those
//! are debug assertions, not recoverable conditions.

use std::fmt;

use crate::engine::types::{ComponentTypeId, EntityId};

/// Errors raised by the global component registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration would exceed the fixed component-id space.
    CapacityExceeded {
        /// The fixed capacity that was hit
        /// ([`MAX_COMPONENTS`](crate::engine::types::MAX_COMPONENTS)).
        capacity: usize,
    },

    /// A type was used before being registered.
    NotRegistered {
        /// Rust type name of the offending component.
        name: &'static str,
    },

    /// Zero-sized types cannot back a storage column.
    ZeroSized {
        /// Rust type name of the offending component.
        name: &'static str,
    },

    /// A [`ComponentTypeId`] did not correspond to any registered type.
    UnknownTypeId(ComponentTypeId),

    /// The registry lock was poisoned by a panic in another thread.
    PoisonedLock,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::CapacityExceeded { capacity } => {
                write!(f, "component type capacity exceeded (maximum {capacity})")
            }
            RegistryError::NotRegistered { name } => {
                write!(f, "component type {name} was never registered")
            }
            RegistryError::ZeroSized { name } => {
                write!(f, "component type {name} is zero-sized and cannot be stored")
            }
            RegistryError::UnknownTypeId(id) => {
                write!(f, "component type id {id} is not registered")
            }
            RegistryError::PoisonedLock => f.write_str("component registry lock poisoned"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Aggregate error for world-level operations.
///
/// Covers the user-facing misuse classes: operating on an entity that was
/// never minted or already destroyed, reading a component the entity does
/// not carry, and attaching a component that is already present.
/// Registry failures encountered while resolving component types are
/// wrapped in [`WorldError::Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    /// The entity id is not live in this world.
    UnknownEntity(EntityId),

    /// The entity does not carry the requested component.
    MissingComponent {
        /// Entity the lookup was performed on.
        entity: EntityId,
        /// Rust type name of the requested component.
        component: &'static str,
    },

    /// An attach overlapped the entity's current component set, or the
    /// bundle itself named the same component type twice.
    DuplicateAttach {
        /// Entity the attach was performed on.
        entity: EntityId,
    },

    /// A component type could not be resolved through the registry.
    Registry(RegistryError),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::UnknownEntity(entity) => {
                write!(f, "entity {entity} is not live in this world")
            }
            WorldError::MissingComponent { entity, component } => {
                write!(f, "entity {entity} has no {component} component")
            }
            WorldError::DuplicateAttach { entity } => {
                write!(f, "attach would duplicate a component on entity {entity}")
            }
            WorldError::Registry(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WorldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorldError::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for WorldError {
    fn from(e: RegistryError) -> Self {
        WorldError::Registry(e)
    }
}

/// Convenience alias for world operation results.
pub type WorldResult<T> = Result<T, WorldError>;
