//! Two in-memory indexed containers for algorithmic workloads:
//!
//! * [`SegmentTree`]: fixed-size range aggregation with point updates over
//!   any [`Monoid`](monoid::Monoid).
//! * [`Forest`] / [`Tree`]: a treap with split, merge, insertion and
//!   membership search in expected logarithmic time.
//!
//! Neither structure is synchronized; share them across threads only behind
//! external locking.

mod error;
pub mod monoid;
pub mod segment_tree;
pub mod treap;

pub use error::{Error, IndexError, Result};
pub use segment_tree::SegmentTree;
pub use treap::{Forest, Seed, Tree};
