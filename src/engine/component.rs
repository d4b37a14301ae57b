//! Component type registry.
//!
//! A process-wide catalogue that assigns each component type a dense
//! [`ComponentTypeId`] and records the metadata storage columns need to
//! manipulate values of that type without the static type in scope: size,
//! alignment, and a small vtable of lifecycle operations monomorphised at
//! the registration site.
//!
//! ## Purpose
//! The registry decouples component type information from runtime
//! storage, letting archetypes hold heterogeneous columns behind a
//! uniform byte-level interface.
//!
//! ## Design
//! - Components are registered once and assigned a compact id in
//!   `[0, MAX_COMPONENTS)`; re-registration returns the existing id.
//! - Type ids are content-addressed by [`TypeId`], so every world in the
//!   process shares the id space.
//! - In Rust a move is always a bitwise relocation, so the vtable carries
//!   default-construction, clone-construction, and destruction; element
//!   transfer between columns is a plain byte copy with the source slot
//!   treated as moved out.
//!
//! ## Invariants
//! - Every entry in `by_type` has a matching `by_id[id]`.
//! - Ids are dense: `by_id.len()` is the number of registered types.
//! - A [`TypeInfo`] never describes a zero-sized type.

use std::any::{type_name, TypeId};
use std::mem::{align_of, needs_drop, size_of};
use std::sync::{OnceLock, RwLock};

use crate::engine::error::RegistryError;
use crate::engine::types::{ComponentMask, ComponentTypeId, MAX_COMPONENTS};
use crate::HashMap;

/// Marker for types that may be stored as components.
///
/// Blanket-implemented: any `Clone + Default + Send + Sync + 'static`
/// type qualifies. `Clone` backs the copy-construction vtable entry,
/// `Default` the default-construction entry, and `Send + Sync` lets a
/// world holding the type cross thread boundaries.
pub trait Component: Clone + Default + Send + Sync + 'static {}

impl<T: Clone + Default + Send + Sync + 'static> Component for T {}

/// Metadata and lifecycle vtable for one registered component type.
///
/// Captured once per type at the registration site, where the static type
/// is in scope, and stored as plain function pointers taking untyped
/// memory.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    /// Dense id assigned by the registry.
    pub id: ComponentTypeId,
    /// Rust type name, for diagnostics.
    pub name: &'static str,
    /// `size_of` the component type in bytes. Never zero.
    pub size: usize,
    /// `align_of` the component type in bytes.
    pub align: usize,
    /// Whether dropping a value of this type runs any code.
    pub needs_drop: bool,
    pub(crate) type_id: TypeId,
    pub(crate) default_fn: unsafe fn(*mut u8),
    pub(crate) clone_fn: unsafe fn(*const u8, *mut u8),
    pub(crate) drop_fn: unsafe fn(*mut u8),
}

impl TypeInfo {
    fn of<T: Component>(id: ComponentTypeId) -> Self {
        Self {
            id,
            name: type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
            needs_drop: needs_drop::<T>(),
            type_id: TypeId::of::<T>(),
            default_fn: erased_default::<T>,
            clone_fn: erased_clone::<T>,
            drop_fn: erased_drop::<T>,
        }
    }
}

/// Default-constructs a `T` into `dst`.
///
/// # Safety
/// `dst` must be valid for writes of `T`, aligned, and uninitialised.
unsafe fn erased_default<T: Default>(dst: *mut u8) {
    unsafe { dst.cast::<T>().write(T::default()) }
}

/// Clone-constructs a `T` into `dst` from the live value at `src`.
///
/// # Safety
/// `src` must point to a live `T`; `dst` must be valid for writes of `T`,
/// aligned, uninitialised, and not overlap `src`.
unsafe fn erased_clone<T: Clone>(src: *const u8, dst: *mut u8) {
    unsafe { dst.cast::<T>().write((*src.cast::<T>()).clone()) }
}

/// Drops the `T` at `slot` in place.
///
/// # Safety
/// `slot` must point to a live `T` that is not used afterwards.
unsafe fn erased_drop<T>(slot: *mut u8) {
    unsafe { slot.cast::<T>().drop_in_place() }
}

/// Mapping between Rust component types and dense [`ComponentTypeId`]s.
struct ComponentRegistry {
    next_id: usize,
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_id: Vec<TypeInfo>,
}

static REGISTRY: OnceLock<RwLock<ComponentRegistry>> = OnceLock::new();

fn registry() -> &'static RwLock<ComponentRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(ComponentRegistry {
            next_id: 0,
            by_type: HashMap::new(),
            by_id: Vec::new(),
        })
    })
}

impl ComponentRegistry {
    fn register<T: Component>(&mut self) -> Result<ComponentTypeId, RegistryError> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Ok(existing);
        }

        if self.next_id >= MAX_COMPONENTS {
            return Err(RegistryError::CapacityExceeded { capacity: MAX_COMPONENTS });
        }

        let id = self.next_id as ComponentTypeId;
        self.next_id += 1;
        self.by_type.insert(type_id, id);
        self.by_id.push(TypeInfo::of::<T>(id));
        Ok(id)
    }

    fn id_of<T: Component>(&self) -> Result<ComponentTypeId, RegistryError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(RegistryError::NotRegistered { name: type_name::<T>() })
    }

    fn info(&self, id: ComponentTypeId) -> Result<TypeInfo, RegistryError> {
        self.by_id
            .get(id as usize)
            .copied()
            .ok_or(RegistryError::UnknownTypeId(id))
    }
}

/// Registers component type `T` in the global registry and returns its
/// [`ComponentTypeId`].
///
/// ## Behavior
/// - Idempotent: re-registering returns the id assigned the first time.
/// - Zero-sized types are rejected; a column cannot address them.
///
/// ## Errors
/// [`RegistryError::CapacityExceeded`] once
/// [`MAX_COMPONENTS`] distinct types exist,
/// [`RegistryError::ZeroSized`] for ZSTs.
pub fn register_component<T: Component>() -> Result<ComponentTypeId, RegistryError> {
    if size_of::<T>() == 0 {
        return Err(RegistryError::ZeroSized { name: type_name::<T>() });
    }
    let mut registry = registry().write().map_err(|_| RegistryError::PoisonedLock)?;
    registry.register::<T>()
}

/// Returns the [`ComponentTypeId`] assigned to `T`.
///
/// ## Errors
/// [`RegistryError::NotRegistered`] if `T` was never registered.
pub fn component_id_of<T: Component>() -> Result<ComponentTypeId, RegistryError> {
    let registry = registry().read().map_err(|_| RegistryError::PoisonedLock)?;
    registry.id_of::<T>()
}

/// Returns the [`TypeInfo`] recorded for a registered id.
///
/// ## Errors
/// [`RegistryError::UnknownTypeId`] if no type carries this id.
pub fn component_info(id: ComponentTypeId) -> Result<TypeInfo, RegistryError> {
    let registry = registry().read().map_err(|_| RegistryError::PoisonedLock)?;
    registry.info(id)
}

/// A static list of component types, usable wherever only the *types*
/// matter: detach targets, `has` checks, query include/exclude sets.
///
/// Implemented for tuples of up to eight [`Component`] types and for the
/// unit type `()` (the empty set).
pub trait ComponentSet {
    /// Appends the [`ComponentTypeId`] of each element type to `out`, in
    /// declaration order.
    fn ids(out: &mut Vec<ComponentTypeId>) -> Result<(), RegistryError>;

    /// The mask with the bit of each element type set.
    fn mask() -> Result<ComponentMask, RegistryError> {
        let mut ids = Vec::new();
        Self::ids(&mut ids)?;
        let mut mask = ComponentMask::EMPTY;
        for id in ids {
            mask.set(id);
        }
        Ok(mask)
    }
}

/// A set of component *values* that can be relocated into column storage,
/// one value per element type.
///
/// Implemented for tuples of up to eight [`Component`] values. The writer
/// callback receives each value as a raw pointer and must relocate the
/// pointed-to bytes into storage; the values are forgotten here, so a
/// writer that ignores a pointer leaks that value rather than
/// double-dropping it.
pub trait ComponentBundle: ComponentSet {
    /// Hands each component value to `write` as
    /// `(type id, pointer to the value)`, transferring ownership of the
    /// pointed-to bytes to the writer.
    fn write_into(
        self,
        write: &mut dyn FnMut(ComponentTypeId, *const u8),
    ) -> Result<(), RegistryError>;
}

impl ComponentSet for () {
    fn ids(_out: &mut Vec<ComponentTypeId>) -> Result<(), RegistryError> {
        Ok(())
    }
}

impl ComponentBundle for () {
    fn write_into(
        self,
        _write: &mut dyn FnMut(ComponentTypeId, *const u8),
    ) -> Result<(), RegistryError> {
        Ok(())
    }
}

macro_rules! impl_component_tuple {
    ($(($component:ident, $index:tt)),+) => {
        impl<$($component: Component),+> ComponentSet for ($($component,)+) {
            fn ids(out: &mut Vec<ComponentTypeId>) -> Result<(), RegistryError> {
                $(out.push(component_id_of::<$component>()?);)+
                Ok(())
            }
        }

        impl<$($component: Component),+> ComponentBundle for ($($component,)+) {
            fn write_into(
                self,
                write: &mut dyn FnMut(ComponentTypeId, *const u8),
            ) -> Result<(), RegistryError> {
                let ids = ($(component_id_of::<$component>()?,)+);
                let values = core::mem::ManuallyDrop::new(self);
                $(write(ids.$index, (&values.$index as *const $component).cast::<u8>());)+
                Ok(())
            }
        }
    };
}

impl_component_tuple!((A, 0));
impl_component_tuple!((A, 0), (B, 1));
impl_component_tuple!((A, 0), (B, 1), (C, 2));
impl_component_tuple!((A, 0), (B, 1), (C, 2), (D, 3));
impl_component_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_component_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_component_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_component_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));
