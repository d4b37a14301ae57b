//! World: archetype registry, entity index, and all mutation paths.
//!
//! The [`World`] owns every archetype, keyed by component mask, plus the
//! map from each live entity to the archetype it currently occupies. It
//! mints entity ids and drives the only structural mutations the engine
//! has: entity creation and destruction, and component attach/detach
//! with the archetype migration they imply.
//!
//! ## Migration
//! Changing an entity's component set moves its row between archetypes:
//!
//! 1. reserve a row in the target archetype,
//! 2. relocate newly attached values into their columns,
//! 3. relocate carried-over values column by column (a byte copy; the
//!    source slots become moved-out),
//! 4. compact the source archetype, destroying only the slots that were
//!    not carried over,
//! 5. repoint the entity index at the target archetype.
//!
//! All five steps run under one `&mut self` borrow, so no query or other
//! mutation can observe a half-migrated entity.

use std::any::type_name;
use std::fmt;

use tracing::{debug, trace};

use crate::engine::archetype::Archetype;
use crate::engine::component::{
    component_id_of, Component, ComponentBundle, ComponentSet,
};
use crate::engine::error::{RegistryError, WorldError, WorldResult};
use crate::engine::query::ComponentQuery;
use crate::engine::types::{ArchetypeId, ComponentMask, ComponentTypeId, EntityId};
use crate::HashMap;

/// The registry of archetypes and live entities.
pub struct World {
    archetypes: Vec<Archetype>,
    mask_index: HashMap<ComponentMask, ArchetypeId>,
    entity_index: HashMap<EntityId, ArchetypeId>,
    next_entity_id: EntityId,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entity_index.len())
            .field("archetype_count", &self.archetypes.len())
            .finish()
    }
}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self {
            archetypes: Vec::new(),
            mask_index: HashMap::new(),
            entity_index: HashMap::new(),
            next_entity_id: 0,
        }
    }

    /// All archetypes, in creation order. Row contents are reachable
    /// through the archetype API; the slice itself is mainly useful for
    /// iteration and diagnostics.
    #[inline]
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub(crate) fn archetypes_mut(&mut self) -> &mut [Archetype] {
        &mut self.archetypes
    }

    /// Number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entity_index.len()
    }

    /// Number of archetypes created so far (empty ones included; they are
    /// never freed).
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Returns `true` if `entity` is live in this world.
    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entity_index.contains_key(&entity)
    }

    /// Iterates over every live entity id, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entity_index.keys().copied()
    }

    /// The archetype `entity` currently occupies, if it is live.
    pub fn archetype_of(&self, entity: EntityId) -> Option<&Archetype> {
        let &archetype_id = self.entity_index.get(&entity)?;
        self.archetypes.get(archetype_id as usize)
    }

    fn get_or_create_archetype(
        &mut self,
        mask: ComponentMask,
    ) -> Result<ArchetypeId, RegistryError> {
        if let Some(&archetype_id) = self.mask_index.get(&mask) {
            return Ok(archetype_id);
        }
        let archetype_id = self.archetypes.len() as ArchetypeId;
        self.archetypes.push(Archetype::new(mask)?);
        self.mask_index.insert(mask, archetype_id);
        trace!(archetype_id, mask = ?mask, "created archetype");
        Ok(archetype_id)
    }

    fn ensure_empty_archetype(&mut self) -> ArchetypeId {
        if let Some(&archetype_id) = self.mask_index.get(&ComponentMask::EMPTY) {
            return archetype_id;
        }
        let archetype_id = self.archetypes.len() as ArchetypeId;
        self.archetypes.push(Archetype::empty());
        self.mask_index.insert(ComponentMask::EMPTY, archetype_id);
        archetype_id
    }

    /// Mints a fresh entity and places it in the empty archetype.
    ///
    /// Ids are monotonically increasing and never reused within this
    /// world's lifetime.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.next_entity_id;
        self.next_entity_id += 1;
        let archetype_id = self.ensure_empty_archetype();
        self.archetypes[archetype_id as usize].add_entity(entity);
        self.entity_index.insert(entity, archetype_id);
        entity
    }

    /// Mints a fresh entity carrying the bundle's components: one
    /// [`create_entity`](Self::create_entity) plus one
    /// [`attach`](Self::attach).
    ///
    /// ## Errors
    /// As [`attach`](Self::attach). On error the minted entity stays
    /// live, holding no components.
    pub fn spawn<B: ComponentBundle>(&mut self, bundle: B) -> WorldResult<EntityId> {
        let entity = self.create_entity();
        self.attach(entity, bundle)?;
        Ok(entity)
    }

    /// Destroys `entity`, dropping all of its component values.
    ///
    /// Returns `false` if the entity was not live (already destroyed or
    /// never minted).
    pub fn destroy_entity(&mut self, entity: EntityId) -> bool {
        let Some(archetype_id) = self.entity_index.remove(&entity) else {
            return false;
        };
        self.archetypes[archetype_id as usize].remove_entity(entity);
        true
    }

    /// Attaches the bundle's components to `entity`, migrating it to the
    /// archetype for its widened mask.
    ///
    /// Newly attached values are relocated into their columns; components
    /// the entity already carried move with it untouched (a byte copy,
    /// never a clone).
    ///
    /// ## Errors
    /// - [`WorldError::UnknownEntity`] if `entity` is not live.
    /// - [`WorldError::DuplicateAttach`] if the bundle overlaps the
    ///   entity's current components, or names the same type twice.
    /// - [`WorldError::Registry`] if a bundle type was never registered.
    pub fn attach<B: ComponentBundle>(&mut self, entity: EntityId, bundle: B) -> WorldResult<()> {
        let mut ids = Vec::new();
        B::ids(&mut ids)?;
        let mut added = ComponentMask::EMPTY;
        for &id in &ids {
            added.set(id);
        }
        if (added.len() as usize) != ids.len() {
            return Err(WorldError::DuplicateAttach { entity });
        }

        let &source_id = self
            .entity_index
            .get(&entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        let current = self.archetypes[source_id as usize].mask();
        if !current.is_disjoint(added) {
            return Err(WorldError::DuplicateAttach { entity });
        }
        if added.is_empty() {
            return Ok(());
        }

        let target_id = self.get_or_create_archetype(current.union(added))?;
        let (source, target) = archetype_pair_mut(&mut self.archetypes, source_id, target_id);
        let old_index = source
            .index_of(entity)
            .ok_or(WorldError::UnknownEntity(entity))?;

        target.add_entity(entity);

        bundle.write_into(&mut |id: ComponentTypeId, value: *const u8| {
            if let Some(column) = target.column_mut(id) {
                unsafe { column.push(value) };
            } else {
                debug_assert!(false, "attach target lacks a bundle column");
            }
        })?;

        migrate_row(source, target, old_index, current);
        source.remove_entity_migrated(entity, current);
        self.entity_index.insert(entity, target_id);
        trace!(entity, source = source_id, target = target_id, "attached components");
        Ok(())
    }

    /// Attaches a single component value to `entity`.
    pub fn attach_one<T: Component>(&mut self, entity: EntityId, value: T) -> WorldResult<()> {
        self.attach(entity, (value,))
    }

    /// Detaches the set's component types from `entity`, migrating it to
    /// the archetype for its narrowed mask.
    ///
    /// Types in the set that the entity does not carry are ignored (their
    /// mask bits are already clear). Detaching every component moves the
    /// entity to the empty archetype; it stays live.
    ///
    /// ## Errors
    /// - [`WorldError::UnknownEntity`] if `entity` is not live.
    /// - [`WorldError::Registry`] if a set type was never registered.
    pub fn detach<S: ComponentSet>(&mut self, entity: EntityId) -> WorldResult<()> {
        let removed = S::mask()?;
        let &source_id = self
            .entity_index
            .get(&entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        let current = self.archetypes[source_id as usize].mask();
        let target_mask = current.difference(removed);
        if target_mask == current {
            return Ok(());
        }

        let target_id = self.get_or_create_archetype(target_mask)?;
        let (source, target) = archetype_pair_mut(&mut self.archetypes, source_id, target_id);
        let old_index = source
            .index_of(entity)
            .ok_or(WorldError::UnknownEntity(entity))?;

        target.add_entity(entity);
        migrate_row(source, target, old_index, target_mask);
        source.remove_entity_migrated(entity, target_mask);
        self.entity_index.insert(entity, target_id);
        trace!(entity, source = source_id, target = target_id, "detached components");
        Ok(())
    }

    /// Detaches a single component type from `entity`.
    pub fn detach_one<T: Component>(&mut self, entity: EntityId) -> WorldResult<()> {
        self.detach::<(T,)>(entity)
    }

    /// Detaches every component from `entity`, dropping their values and
    /// moving the entity to the empty archetype. The entity stays live.
    ///
    /// ## Errors
    /// [`WorldError::UnknownEntity`] if `entity` is not live.
    pub fn detach_all(&mut self, entity: EntityId) -> WorldResult<()> {
        let &source_id = self
            .entity_index
            .get(&entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        if self.archetypes[source_id as usize].mask().is_empty() {
            return Ok(());
        }

        let target_id = self.ensure_empty_archetype();
        let (source, target) = archetype_pair_mut(&mut self.archetypes, source_id, target_id);
        target.add_entity(entity);
        source.remove_entity(entity);
        self.entity_index.insert(entity, target_id);
        trace!(entity, source = source_id, target = target_id, "detached all components");
        Ok(())
    }

    /// Shared reference to `entity`'s component of type `T`.
    ///
    /// ## Errors
    /// [`WorldError::UnknownEntity`], [`WorldError::MissingComponent`],
    /// or [`WorldError::Registry`] if `T` was never registered.
    pub fn get<T: Component>(&self, entity: EntityId) -> WorldResult<&T> {
        let id = component_id_of::<T>()?;
        let &archetype_id = self
            .entity_index
            .get(&entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        let archetype = &self.archetypes[archetype_id as usize];
        let index = archetype
            .index_of(entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        let column = archetype.column(id).ok_or(WorldError::MissingComponent {
            entity,
            component: type_name::<T>(),
        })?;
        Ok(unsafe { column.get::<T>(index) })
    }

    /// Exclusive reference to `entity`'s component of type `T`.
    ///
    /// ## Errors
    /// As [`get`](Self::get).
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> WorldResult<&mut T> {
        let id = component_id_of::<T>()?;
        let &archetype_id = self
            .entity_index
            .get(&entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        let archetype = &mut self.archetypes[archetype_id as usize];
        let index = archetype
            .index_of(entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        let column = archetype
            .column_mut(id)
            .ok_or(WorldError::MissingComponent {
                entity,
                component: type_name::<T>(),
            })?;
        Ok(unsafe { column.get_mut::<T>(index) })
    }

    /// Shared references to several of `entity`'s components at once,
    /// as a tuple in declaration order.
    ///
    /// Exclusive multi-component access is not offered; take
    /// [`get_mut`](Self::get_mut) borrows one at a time instead.
    pub fn get_all<Q: ComponentQuery>(&self, entity: EntityId) -> WorldResult<Q::Item<'_>> {
        let &archetype_id = self
            .entity_index
            .get(&entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        let archetype = &self.archetypes[archetype_id as usize];
        let index = archetype
            .index_of(entity)
            .ok_or(WorldError::UnknownEntity(entity))?;
        Q::fetch(archetype, index).ok_or(WorldError::MissingComponent {
            entity,
            component: type_name::<Q>(),
        })
    }

    /// Returns `true` if `entity` is live and carries every component
    /// type in the set. Unknown entities and unregistered types answer
    /// `false`.
    pub fn has<S: ComponentSet>(&self, entity: EntityId) -> bool {
        let Ok(required) = S::mask() else {
            return false;
        };
        let Some(archetype) = self.archetype_of(entity) else {
            return false;
        };
        archetype.mask().contains_all(required)
    }

    /// Returns `true` if `entity` is live and carries a component of type
    /// `T`.
    pub fn has_one<T: Component>(&self, entity: EntityId) -> bool {
        self.has::<(T,)>(entity)
    }

    /// Empties the archetype at `archetype_id` and erases its entities
    /// from the entity index: the cleared entities are destroyed.
    pub(crate) fn clear_archetype(&mut self, archetype_id: ArchetypeId) {
        let archetype = &mut self.archetypes[archetype_id as usize];
        for &entity in archetype.entities() {
            self.entity_index.remove(&entity);
        }
        archetype.clear();
        debug!(archetype_id, "cleared archetype");
    }
}

/// Relocates the row at `old_index` from `source` into the freshly
/// reserved tail row of `target`, one column per bit of `carried`. The
/// source slots become moved-out; the caller must compact them with the
/// same mask so they are forgotten, not dropped.
fn migrate_row(
    source: &Archetype,
    target: &mut Archetype,
    old_index: usize,
    carried: ComponentMask,
) {
    for id in carried.iter() {
        if let (Some(source_column), Some(target_column)) =
            (source.column(id), target.column_mut(id))
        {
            unsafe { target_column.push(source_column.get_ptr(old_index)) };
        } else {
            debug_assert!(false, "carried component missing a column");
        }
    }
}

/// Exclusive references to two distinct archetypes at once, via
/// `split_at_mut` around the larger index.
fn archetype_pair_mut(
    archetypes: &mut [Archetype],
    a: ArchetypeId,
    b: ArchetypeId,
) -> (&mut Archetype, &mut Archetype) {
    debug_assert_ne!(a, b, "source and destination archetype must differ");
    let (a, b) = (a as usize, b as usize);
    if a < b {
        let (head, tail) = archetypes.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = archetypes.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}
