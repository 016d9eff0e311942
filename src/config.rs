//! Compile-time tuning knobs for the tree layout.
//!
//! These are fixed at build time: the branching factor shapes every node in
//! the tree, so it cannot vary between values of the same crate build. The
//! defaults (32-way nodes, rebalancing slack of one, two spare slots) are the
//! ones the RRB literature settled on; the `bits-*` cargo features select a
//! narrower radix, which is mostly useful for exercising deep trees and the
//! rebalancing machinery with small inputs.

/// Number of index bits consumed per tree level.
#[cfg(feature = "bits-2")]
pub const BITS: usize = 2;

/// Number of index bits consumed per tree level.
#[cfg(all(feature = "bits-3", not(feature = "bits-2")))]
pub const BITS: usize = 3;

/// Number of index bits consumed per tree level.
#[cfg(all(
    feature = "bits-4",
    not(any(feature = "bits-2", feature = "bits-3"))
))]
pub const BITS: usize = 4;

/// Number of index bits consumed per tree level.
#[cfg(not(any(feature = "bits-2", feature = "bits-3", feature = "bits-4")))]
pub const BITS: usize = 5;

/// Maximum number of children in a node, and of elements in a leaf or tail.
pub const BRANCHING: usize = 1 << BITS;

/// Bit mask extracting one level's worth of index bits.
pub const MASK: usize = BRANCHING - 1;

/// Search slack allowed by the rebalancing plan: a concatenation node may
/// keep children holding as few as `BRANCHING - INVARIANT` grandchildren.
pub const INVARIANT: usize = 1;

/// Extra nodes the rebalancing plan tolerates beyond the optimal count
/// before it starts redistributing children.
pub const EXTRAS: usize = 2;

/// Levels needed to address the full 32-bit index domain.
pub const MAX_HEIGHT: usize = (32 + BITS - 1) / BITS;
