//! Archetype storage: all entities sharing one exact component set.
//!
//! An [`Archetype`] owns one [`Column`] per set bit of its mask plus two
//! parallel entity indices: a dense `index → entity` vector and its
//! reverse `entity → index` map. Entity removal is swap-and-pop, so
//! surviving indices stay dense and every column stays row-aligned with
//! the entity vector.
//!
//! ## Invariants (held at every quiescent moment)
//! - `index_to_entity.len() == entity_to_index.len()` and both equal the
//!   element count of every owned column.
//! - For all `i < count`: `entity_to_index[index_to_entity[i]] == i`.
//! - The mask's set bits are exactly the occupied column slots.
//!
//! ## Lifecycle
//! Archetypes are created lazily by the world the first time an entity
//! needs their component set, and persist for the world's lifetime; the
//! empty archetype is the destination after removing every component.

use crate::engine::component::{component_id_of, component_info, Component};
use crate::engine::error::RegistryError;
use crate::engine::storage::Column;
use crate::engine::types::{ComponentMask, ComponentTypeId, EntityId, MAX_COMPONENTS};
use crate::HashMap;

/// Storage for every entity whose component set equals one mask.
pub struct Archetype {
    mask: ComponentMask,
    columns: Vec<Option<Column>>,
    index_to_entity: Vec<EntityId>,
    entity_to_index: HashMap<EntityId, usize>,
}

impl Archetype {
    /// Creates the archetype for the empty mask. Infallible: it owns no
    /// columns.
    pub(crate) fn empty() -> Self {
        Self {
            mask: ComponentMask::EMPTY,
            columns: (0..MAX_COMPONENTS).map(|_| None).collect(),
            index_to_entity: Vec::new(),
            entity_to_index: HashMap::new(),
        }
    }

    /// Creates an empty archetype for `mask`, allocating one column slot
    /// per set bit, each bound to the registered [`TypeInfo`] of its id.
    ///
    /// ## Errors
    /// [`RegistryError::UnknownTypeId`] if a mask bit does not correspond
    /// to a registered component type.
    ///
    /// [`TypeInfo`]: crate::engine::component::TypeInfo
    pub fn new(mask: ComponentMask) -> Result<Self, RegistryError> {
        let mut archetype = Self::empty();
        archetype.mask = mask;
        for id in mask.iter() {
            archetype.columns[id as usize] = Some(Column::new(component_info(id)?));
        }
        Ok(archetype)
    }

    /// The component mask identifying this archetype.
    #[inline]
    pub fn mask(&self) -> ComponentMask {
        self.mask
    }

    /// Number of entities stored.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.index_to_entity.len()
    }

    /// Returns `true` if no entity is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index_to_entity.is_empty()
    }

    /// Returns `true` if `entity` currently lives in this archetype.
    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entity_to_index.contains_key(&entity)
    }

    /// Dense row index of `entity`, if present.
    #[inline]
    pub fn index_of(&self, entity: EntityId) -> Option<usize> {
        self.entity_to_index.get(&entity).copied()
    }

    /// Entity stored at row `index`.
    #[inline]
    pub fn entity_at(&self, index: usize) -> Option<EntityId> {
        self.index_to_entity.get(index).copied()
    }

    /// The dense entity vector, row-aligned with every column.
    #[inline]
    pub fn entities(&self) -> &[EntityId] {
        &self.index_to_entity
    }

    /// Shared access to the column for `id`, if this archetype owns one.
    #[inline]
    pub fn column(&self, id: ComponentTypeId) -> Option<&Column> {
        self.columns.get(id as usize).and_then(|slot| slot.as_ref())
    }

    /// Exclusive access to the column for `id`, if this archetype owns
    /// one.
    #[inline]
    pub fn column_mut(&mut self, id: ComponentTypeId) -> Option<&mut Column> {
        self.columns.get_mut(id as usize).and_then(|slot| slot.as_mut())
    }

    /// Registers `entity` at the next dense row and returns that row.
    ///
    /// Does **not** construct component values: the caller must follow up
    /// with exactly one push into each owned column so rows stay aligned.
    pub fn add_entity(&mut self, entity: EntityId) -> usize {
        debug_assert!(!self.contains(entity), "entity already in archetype");
        let index = self.index_to_entity.len();
        self.index_to_entity.push(entity);
        self.entity_to_index.insert(entity, index);
        index
    }

    /// Removes `entity` by swap-and-pop, destroying its component values
    /// and fixing up the index of the entity that swapped into its row.
    ///
    /// Removing an entity that is not present is a programming error:
    /// debug builds assert, release builds return silently.
    pub fn remove_entity(&mut self, entity: EntityId) {
        self.remove_entity_migrated(entity, ComponentMask::EMPTY);
    }

    /// Removal variant used during migration: columns whose bit is in
    /// `preserved` had their slot relocated into the target archetype, so
    /// compaction must not destroy them; every other column destroys its
    /// slot as usual.
    pub(crate) fn remove_entity_migrated(&mut self, entity: EntityId, preserved: ComponentMask) {
        let Some(index) = self.entity_to_index.remove(&entity) else {
            debug_assert!(false, "entity not present in archetype");
            return;
        };

        let last = self.index_to_entity.len() - 1;
        if index != last {
            let moved = self.index_to_entity[last];
            self.entity_to_index.insert(moved, index);
            self.index_to_entity.swap(index, last);
        }
        self.index_to_entity.pop();

        for (id, column) in self
            .columns
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, column)| column.as_mut().map(|c| (slot as ComponentTypeId, c)))
        {
            if preserved.has(id) {
                column.swap_forget(index);
            } else {
                column.swap_remove(index);
            }
        }

        debug_assert_eq!(self.index_to_entity.len(), self.entity_to_index.len());
    }

    /// Destroys every element in every column and clears both entity
    /// indices. The mask and the columns themselves remain.
    pub fn clear(&mut self) {
        for column in self.columns.iter_mut().filter_map(|slot| slot.as_mut()) {
            column.clear();
        }
        self.index_to_entity.clear();
        self.entity_to_index.clear();
    }

    /// Typed shared reference to `entity`'s component of type `T`.
    ///
    /// Returns `None` if the entity is not stored here or `T` is not part
    /// of this archetype's mask.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        let index = self.index_of(entity)?;
        self.component_at::<T>(index)
    }

    /// Typed exclusive reference to `entity`'s component of type `T`.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        let index = self.index_of(entity)?;
        let id = component_id_of::<T>().ok()?;
        let column = self.column_mut(id)?;
        Some(unsafe { column.get_mut::<T>(index) })
    }

    /// Typed shared reference to the component of type `T` at row
    /// `index`.
    pub fn component_at<T: Component>(&self, index: usize) -> Option<&T> {
        if index >= self.index_to_entity.len() {
            return None;
        }
        let id = component_id_of::<T>().ok()?;
        let column = self.column(id)?;
        Some(unsafe { column.get::<T>(index) })
    }

    /// Raw base pointer of the dense entity vector, for iteration that
    /// must not hold a borrow of the archetype.
    #[inline]
    pub(crate) fn entities_ptr(&self) -> *const EntityId {
        self.index_to_entity.as_ptr()
    }
}
