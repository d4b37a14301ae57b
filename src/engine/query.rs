//! Compile-time-typed queries over archetype storage.
//!
//! A [`Query`] selects every archetype whose mask is a superset of its
//! include mask and disjoint from its exclude mask, then iterates the
//! matching rows with typed references produced at the boundary. The
//! value component list is a tuple type parameter, so a visitor whose
//! parameter types disagree with the query simply does not compile.
//!
//! ## Execution model
//! Per matching archetype: snapshot the entity count at entry, skip empty
//! archetypes, fetch the typed column base pointers once, then visit rows
//! in ascending index order. Archetype visit order is unspecified.
//!
//! ## Const-correctness
//! [`each`](Query::each) borrows the world shared and yields shared
//! component references; [`each_mut`](Query::each_mut) requires an
//! exclusive world borrow to yield mutable ones. Running a mutating
//! visitor over a shared world borrow is therefore a compile-time error,
//! and no re-entrant world mutation can invalidate an archetype mid-
//! iteration.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::engine::archetype::Archetype;
use crate::engine::component::{Component, ComponentSet};
use crate::engine::error::RegistryError;
use crate::engine::storage::Column;
use crate::engine::types::{ComponentMask, ComponentTypeId, EntityId};
use crate::engine::world::World;

/// A tuple of value component types a query yields per entity.
///
/// Implemented for `()` (matches every archetype, yields nothing) and
/// tuples of up to eight [`Component`] types.
pub trait ComponentQuery: ComponentSet {
    /// Shared references to one row, in declaration order.
    type Item<'a>;
    /// Exclusive references to one row, in declaration order.
    type ItemMut<'a>;

    /// Builds [`Self::Item`] for `row` from column base pointers laid out
    /// in declaration order.
    ///
    /// # Safety
    /// `bases[i]` must be the base pointer of a live column of the i-th
    /// element type with more than `row` elements, and the produced
    /// references must not outlive the storage or alias a mutable borrow.
    unsafe fn item<'a>(bases: &[NonNull<u8>], row: usize) -> Self::Item<'a>;

    /// Builds [`Self::ItemMut`] for `row`.
    ///
    /// # Safety
    /// As [`item`](Self::item), and additionally the caller must
    /// guarantee exclusive access to the touched rows.
    unsafe fn item_mut<'a>(bases: &[NonNull<u8>], row: usize) -> Self::ItemMut<'a>;

    /// Shared column slices over one whole archetype, in declaration
    /// order.
    type Slice<'a>;
    /// Exclusive column slices over one whole archetype, in declaration
    /// order.
    type SliceMut<'a>;

    /// Shared references to the components of the entity at `index`
    /// inside `archetype`, or `None` if any element type is absent.
    fn fetch(archetype: &Archetype, index: usize) -> Option<Self::Item<'_>>;

    /// Builds [`Self::Slice`] covering `len` rows from column base
    /// pointers laid out in declaration order.
    ///
    /// # Safety
    /// As [`item`](Self::item), for the whole `0..len` range.
    unsafe fn slice<'a>(bases: &[NonNull<u8>], len: usize) -> Self::Slice<'a>;

    /// Builds [`Self::SliceMut`] covering `len` rows.
    ///
    /// # Safety
    /// As [`item_mut`](Self::item_mut), for the whole `0..len` range.
    unsafe fn slice_mut<'a>(bases: &[NonNull<u8>], len: usize) -> Self::SliceMut<'a>;
}

impl ComponentQuery for () {
    type Item<'a> = ();
    type ItemMut<'a> = ();
    type Slice<'a> = ();
    type SliceMut<'a> = ();

    unsafe fn item<'a>(_bases: &[NonNull<u8>], _row: usize) -> Self::Item<'a> {}

    unsafe fn item_mut<'a>(_bases: &[NonNull<u8>], _row: usize) -> Self::ItemMut<'a> {}

    fn fetch(_archetype: &Archetype, _index: usize) -> Option<Self::Item<'_>> {
        Some(())
    }

    unsafe fn slice<'a>(_bases: &[NonNull<u8>], _len: usize) -> Self::Slice<'a> {}

    unsafe fn slice_mut<'a>(_bases: &[NonNull<u8>], _len: usize) -> Self::SliceMut<'a> {}
}

macro_rules! impl_component_query {
    ($(($component:ident, $index:tt)),+) => {
        impl<$($component: Component),+> ComponentQuery for ($($component,)+) {
            type Item<'a> = ($(&'a $component,)+);
            type ItemMut<'a> = ($(&'a mut $component,)+);
            type Slice<'a> = ($(&'a [$component],)+);
            type SliceMut<'a> = ($(&'a mut [$component],)+);

            unsafe fn item<'a>(bases: &[NonNull<u8>], row: usize) -> Self::Item<'a> {
                ($(unsafe { &*bases[$index].as_ptr().cast::<$component>().add(row) },)+)
            }

            unsafe fn item_mut<'a>(bases: &[NonNull<u8>], row: usize) -> Self::ItemMut<'a> {
                ($(unsafe { &mut *bases[$index].as_ptr().cast::<$component>().add(row) },)+)
            }

            fn fetch(archetype: &Archetype, index: usize) -> Option<Self::Item<'_>> {
                Some(($(archetype.component_at::<$component>(index)?,)+))
            }

            unsafe fn slice<'a>(bases: &[NonNull<u8>], len: usize) -> Self::Slice<'a> {
                ($(unsafe {
                    core::slice::from_raw_parts(bases[$index].as_ptr().cast::<$component>(), len)
                },)+)
            }

            unsafe fn slice_mut<'a>(bases: &[NonNull<u8>], len: usize) -> Self::SliceMut<'a> {
                ($(unsafe {
                    core::slice::from_raw_parts_mut(bases[$index].as_ptr().cast::<$component>(), len)
                },)+)
            }
        }
    };
}

impl_component_query!((A, 0));
impl_component_query!((A, 0), (B, 1));
impl_component_query!((A, 0), (B, 1), (C, 2));
impl_component_query!((A, 0), (B, 1), (C, 2), (D, 3));
impl_component_query!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_component_query!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_component_query!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_component_query!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));

/// A typed view over every archetype matching an include/exclude mask
/// pair.
///
/// Holds no storage: queries are transient views constructed against the
/// registry and applied to any world.
pub struct Query<Q: ComponentQuery> {
    include: ComponentMask,
    exclude: ComponentMask,
    ids: Vec<ComponentTypeId>,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: ComponentQuery> Query<Q> {
    /// Builds the query for value components `Q`, caching their type ids
    /// in declaration order for column lookup.
    ///
    /// ## Errors
    /// [`RegistryError::NotRegistered`] if a value component was never
    /// registered.
    pub fn new() -> Result<Self, RegistryError> {
        let mut ids = Vec::new();
        Q::ids(&mut ids)?;
        let mut include = ComponentMask::EMPTY;
        for &id in &ids {
            include.set(id);
        }
        Ok(Self {
            include,
            exclude: ComponentMask::EMPTY,
            ids,
            _marker: PhantomData,
        })
    }

    /// Widens the include mask with the types of `S` without adding value
    /// components: matched entities must carry them, but the visitor does
    /// not receive them.
    pub fn with<S: ComponentSet>(mut self) -> Result<Self, RegistryError> {
        self.include = self.include.union(S::mask()?);
        Ok(self)
    }

    /// Widens the exclude mask with the types of `S`: archetypes carrying
    /// any of them no longer match.
    pub fn without<S: ComponentSet>(mut self) -> Result<Self, RegistryError> {
        self.exclude = self.exclude.union(S::mask()?);
        Ok(self)
    }

    /// Returns `true` if an archetype with `mask` matches this query.
    /// The empty include mask matches every archetype.
    #[inline]
    pub fn matches(&self, mask: ComponentMask) -> bool {
        mask.contains_all(self.include) && mask.is_disjoint(self.exclude)
    }

    /// Invokes `visitor` once per matched entity with shared references
    /// to its value components.
    pub fn each<'w, F>(&self, world: &'w World, mut visitor: F)
    where
        F: FnMut(Q::Item<'w>),
    {
        for archetype in world.archetypes() {
            if !self.matches(archetype.mask()) {
                continue;
            }
            let count = archetype.entity_count();
            if count == 0 {
                continue;
            }
            let Some(bases) = collect_bases(archetype, &self.ids) else {
                continue;
            };
            for row in 0..count {
                visitor(unsafe { Q::item(&bases, row) });
            }
        }
    }

    /// As [`each`](Self::each), additionally passing the entity id ahead
    /// of the component references.
    pub fn each_with_entity<'w, F>(&self, world: &'w World, mut visitor: F)
    where
        F: FnMut(EntityId, Q::Item<'w>),
    {
        for archetype in world.archetypes() {
            if !self.matches(archetype.mask()) {
                continue;
            }
            let count = archetype.entity_count();
            if count == 0 {
                continue;
            }
            let Some(bases) = collect_bases(archetype, &self.ids) else {
                continue;
            };
            let entities = archetype.entities();
            for row in 0..count {
                visitor(entities[row], unsafe { Q::item(&bases, row) });
            }
        }
    }

    /// Invokes `visitor` once per matched entity with exclusive
    /// references to its value components. Requires an exclusive world
    /// borrow, which statically rules out re-entrant world access for the
    /// duration.
    pub fn each_mut<F>(&self, world: &mut World, mut visitor: F)
    where
        F: FnMut(Q::ItemMut<'_>),
    {
        let archetype_count = world.archetypes_mut().len();
        for archetype_index in 0..archetype_count {
            let archetype = &mut world.archetypes_mut()[archetype_index];
            if !self.matches(archetype.mask()) {
                continue;
            }
            let count = archetype.entity_count();
            if count == 0 {
                continue;
            }
            let Some(bases) = collect_bases(archetype, &self.ids) else {
                continue;
            };
            for row in 0..count {
                visitor(unsafe { Q::item_mut(&bases, row) });
            }
        }
    }

    /// As [`each_mut`](Self::each_mut), additionally passing the entity
    /// id ahead of the component references.
    pub fn each_with_entity_mut<F>(&self, world: &mut World, mut visitor: F)
    where
        F: FnMut(EntityId, Q::ItemMut<'_>),
    {
        let archetype_count = world.archetypes_mut().len();
        for archetype_index in 0..archetype_count {
            let archetype = &mut world.archetypes_mut()[archetype_index];
            if !self.matches(archetype.mask()) {
                continue;
            }
            let count = archetype.entity_count();
            if count == 0 {
                continue;
            }
            let Some(bases) = collect_bases(archetype, &self.ids) else {
                continue;
            };
            let entities = archetype.entities_ptr();
            for row in 0..count {
                let entity = unsafe { *entities.add(row) };
                visitor(entity, unsafe { Q::item_mut(&bases, row) });
            }
        }
    }

    /// Invokes `visitor` once per matching non-empty archetype with the
    /// dense entity slice and one shared column slice per value
    /// component, all row-aligned.
    ///
    /// This is the bulk counterpart of [`each`](Self::each): one call per
    /// archetype instead of one per entity, for visitors that want to
    /// walk contiguous columns themselves.
    pub fn each_chunk<'w, F>(&self, world: &'w World, mut visitor: F)
    where
        F: FnMut(&'w [EntityId], Q::Slice<'w>),
    {
        for archetype in world.archetypes() {
            if !self.matches(archetype.mask()) {
                continue;
            }
            let count = archetype.entity_count();
            if count == 0 {
                continue;
            }
            let Some(bases) = collect_bases(archetype, &self.ids) else {
                continue;
            };
            visitor(archetype.entities(), unsafe { Q::slice(&bases, count) });
        }
    }

    /// Bulk counterpart of [`each_mut`](Self::each_mut): per matching
    /// non-empty archetype, the visitor receives the dense entity slice
    /// and one exclusive column slice per value component.
    pub fn each_chunk_mut<F>(&self, world: &mut World, mut visitor: F)
    where
        F: FnMut(&[EntityId], Q::SliceMut<'_>),
    {
        let archetype_count = world.archetypes_mut().len();
        for archetype_index in 0..archetype_count {
            let archetype = &mut world.archetypes_mut()[archetype_index];
            if !self.matches(archetype.mask()) {
                continue;
            }
            let count = archetype.entity_count();
            if count == 0 {
                continue;
            }
            let Some(bases) = collect_bases(archetype, &self.ids) else {
                continue;
            };
            let entities = archetype.entities_ptr();
            visitor(
                unsafe { core::slice::from_raw_parts(entities, count) },
                unsafe { Q::slice_mut(&bases, count) },
            );
        }
    }

    /// Total entity count over matching archetypes.
    pub fn size(&self, world: &World) -> usize {
        world
            .archetypes()
            .iter()
            .filter(|archetype| self.matches(archetype.mask()))
            .map(Archetype::entity_count)
            .sum()
    }

    /// Destroys every entity in every matching archetype: the archetypes
    /// are emptied and the entities leave the world's entity index. The
    /// archetypes themselves remain for reuse.
    pub fn clear(&self, world: &mut World) {
        let archetype_count = world.archetypes().len();
        for archetype_index in 0..archetype_count {
            if self.matches(world.archetypes()[archetype_index].mask()) {
                world.clear_archetype(archetype_index as u32);
            }
        }
    }

    /// Destroys every matched entity for which `predicate` answers
    /// `true`, and returns how many were destroyed.
    ///
    /// Matching entities are collected before any removal, because
    /// swap-and-pop perturbs the row order mid-iteration.
    pub fn remove_if<F>(&self, world: &mut World, mut predicate: F) -> usize
    where
        F: FnMut(EntityId, Q::Item<'_>) -> bool,
    {
        let mut selected: Vec<EntityId> = Vec::new();
        for archetype in world.archetypes() {
            if !self.matches(archetype.mask()) {
                continue;
            }
            let count = archetype.entity_count();
            if count == 0 {
                continue;
            }
            let Some(bases) = collect_bases(archetype, &self.ids) else {
                continue;
            };
            let entities = archetype.entities();
            for row in 0..count {
                if predicate(entities[row], unsafe { Q::item(&bases, row) }) {
                    selected.push(entities[row]);
                }
            }
        }

        let removed = selected.len();
        for entity in selected {
            world.destroy_entity(entity);
        }
        removed
    }
}

/// Resolves the typed column base pointers for `ids` inside one
/// archetype, in declaration order. `None` if any column is absent
/// (the archetype does not match).
fn collect_bases(archetype: &Archetype, ids: &[ComponentTypeId]) -> Option<Vec<NonNull<u8>>> {
    ids.iter()
        .map(|&id| archetype.column(id).map(Column::base))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::component::register_component;

    #[derive(Clone, Default)]
    struct Flag(#[allow(dead_code)] u64);

    #[derive(Clone, Default)]
    struct Counter(#[allow(dead_code)] i64);

    #[test]
    fn match_rules_follow_include_and_exclude() {
        let flag = register_component::<Flag>().unwrap();
        let counter = register_component::<Counter>().unwrap();

        let query = Query::<(Flag,)>::new().unwrap().without::<(Counter,)>().unwrap();

        let mut only_flag = ComponentMask::EMPTY;
        only_flag.set(flag);
        let mut both = only_flag;
        both.set(counter);

        assert!(query.matches(only_flag));
        assert!(!query.matches(both));
        assert!(!query.matches(ComponentMask::EMPTY));
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = Query::<()>::new().unwrap();
        let mut some = ComponentMask::EMPTY;
        some.set(3);
        assert!(query.matches(ComponentMask::EMPTY));
        assert!(query.matches(some));
    }

    #[test]
    fn unregistered_value_component_is_rejected() {
        #[derive(Clone, Default)]
        struct NeverRegistered(#[allow(dead_code)] u8);
        assert!(matches!(
            Query::<(NeverRegistered,)>::new(),
            Err(RegistryError::NotRegistered { .. })
        ));
    }
}
