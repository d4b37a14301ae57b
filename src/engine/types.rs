//! Core identifiers and bit-level layouts.
//!
//! This module defines the fundamental types shared across all engine
//! subsystems: entity identifiers, dense component type ids, archetype
//! ids, and the [`ComponentMask`] bitset that doubles as archetype
//! identity and query predicate substrate.
//!
//! ## Design
//!
//! - Entities are opaque 32-bit values minted by a per-world counter and
//!   never reused within that world's lifetime.
//! - Component types receive a dense small-integer id on registration;
//!   the id is the bit position inside a [`ComponentMask`].
//! - A mask is a single `u32` word: with [`MAX_COMPONENTS`] fixed at 32,
//!   subset and disjointness tests are one bitwise operation each.

/// Opaque entity identifier. Minted monotonically by a
/// [`World`](crate::engine::world::World); independent of the entity's
/// component set.
pub type EntityId = u32;

/// Dense identifier for a registered component type, in
/// `[0, MAX_COMPONENTS)`. Doubles as the bit position inside a
/// [`ComponentMask`].
pub type ComponentTypeId = u8;

/// Index of an archetype inside a world's archetype table.
pub type ArchetypeId = u32;

/// Maximum number of distinct component types a process may register.
///
/// Fixed: the mask below is a single `u32` word. Widening the mask is the
/// only change required to raise this.
pub const MAX_COMPONENTS: usize = 32;

/// Bitset over [`ComponentTypeId`]s identifying a set of component types.
///
/// Mask equality is archetype equality. Queries match archetypes through
/// [`contains_all`](Self::contains_all) (include set) and
/// [`is_disjoint`](Self::is_disjoint) (exclude set).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ComponentMask(u32);

impl ComponentMask {
    /// The mask with no bits set. Identifies the empty archetype.
    pub const EMPTY: ComponentMask = ComponentMask(0);

    /// Sets the bit corresponding to `id`.
    #[inline]
    pub fn set(&mut self, id: ComponentTypeId) {
        debug_assert!((id as usize) < MAX_COMPONENTS);
        self.0 |= 1u32 << (id as u32);
    }

    /// Clears the bit corresponding to `id`.
    #[inline]
    pub fn unset(&mut self, id: ComponentTypeId) {
        debug_assert!((id as usize) < MAX_COMPONENTS);
        self.0 &= !(1u32 << (id as u32));
    }

    /// Returns `true` if the bit for `id` is set.
    #[inline]
    pub fn has(self, id: ComponentTypeId) -> bool {
        debug_assert!((id as usize) < MAX_COMPONENTS);
        (self.0 >> (id as u32)) & 1 == 1
    }

    /// Returns the union of the two masks.
    #[inline]
    pub fn union(self, other: ComponentMask) -> ComponentMask {
        ComponentMask(self.0 | other.0)
    }

    /// Returns this mask with every bit of `other` cleared.
    #[inline]
    pub fn difference(self, other: ComponentMask) -> ComponentMask {
        ComponentMask(self.0 & !other.0)
    }

    /// Returns `true` if every bit of `required` is set in this mask.
    #[inline]
    pub fn contains_all(self, required: ComponentMask) -> bool {
        self.0 & required.0 == required.0
    }

    /// Returns `true` if the two masks share no bits.
    #[inline]
    pub fn is_disjoint(self, other: ComponentMask) -> bool {
        self.0 & other.0 == 0
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates over the set bits in ascending [`ComponentTypeId`] order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentTypeId> {
        let mut bits = self.0;
        core::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let id = bits.trailing_zeros() as ComponentTypeId;
            bits &= bits - 1;
            Some(id)
        })
    }
}
