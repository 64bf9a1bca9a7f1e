//! # Component Masks
//!
//! Every registered component type owns exactly one bit of a 64-bit mask.
//! Masks combine bits to describe sets of types, both on entities and in
//! queries.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Number of component types a registry can hold (one per mask bit).
pub const MAX_COMPONENT_TYPES: u32 = u64::BITS;

/// A set of component types, one bit per type.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The mask with no types.
    pub const EMPTY: Self = Self(0);

    /// Creates a mask from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Creates the single-type mask for a bit position (0-63).
    ///
    /// Returns `None` if `bit` is out of range.
    #[inline]
    #[must_use]
    pub const fn single(bit: u32) -> Option<Self> {
        if bit < MAX_COMPONENT_TYPES {
            Some(Self(1 << bit))
        } else {
            None
        }
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Checks if no bits are set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of types in the mask.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Checks if the mask names exactly one type.
    #[inline]
    #[must_use]
    pub const fn is_single(self) -> bool {
        self.0.is_power_of_two()
    }

    /// Checks if every type of `other` is also in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Checks if the two masks share at least one type.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// The most significant set bit as a single-type mask, or `EMPTY`.
    #[inline]
    #[must_use]
    pub const fn highest(self) -> Self {
        if self.0 == 0 {
            Self::EMPTY
        } else {
            Self(1 << (63 - self.0.leading_zeros()))
        }
    }

    /// Bit position of the most significant set bit.
    #[inline]
    #[must_use]
    pub const fn highest_bit_index(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(63 - self.0.leading_zeros())
        }
    }

    /// Position of `single` within an index list ordered by descending bit
    /// significance: the number of bits of `self` strictly above it.
    ///
    /// `single` should have exactly one bit set; for wider masks only the
    /// highest bit is considered.
    #[inline]
    #[must_use]
    pub const fn rank_of(self, single: Self) -> usize {
        let Some(bit) = single.highest_bit_index() else {
            return 0;
        };
        // A single shift by `bit + 1` overflows for bit 63.
        ((self.0 >> bit) >> 1).count_ones() as usize
    }

    /// Iterates the single-type masks of `self`, most significant first.
    #[inline]
    #[must_use]
    pub const fn iter_descending(self) -> MaskBits {
        MaskBits { remaining: self.0 }
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for ComponentMask {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for ComponentMask {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

/// Iterator over the single-type masks of a mask, highest bit first.
#[derive(Clone, Debug)]
pub struct MaskBits {
    remaining: u64,
}

impl Iterator for MaskBits {
    type Item = ComponentMask;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let top = ComponentMask(self.remaining).highest();
        if top.is_empty() {
            return None;
        }
        self.remaining &= !top.0;
        Some(top)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for MaskBits {}

/// How an entity's mask is compared against a query mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaskMatchMode {
    /// The entity has at least one of the requested types.
    Any,
    /// The entity has all of the requested types, possibly more.
    #[default]
    Partial,
    /// The entity has exactly the requested types.
    Exact,
}

impl MaskMatchMode {
    /// Tests `entity` against `query`.
    #[inline]
    #[must_use]
    pub const fn matches(self, entity: ComponentMask, query: ComponentMask) -> bool {
        match self {
            Self::Any => entity.intersects(query),
            Self::Partial => entity.contains(query),
            Self::Exact => entity.contains(query) && entity.count() == query.count(),
        }
    }
}
