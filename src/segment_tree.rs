//! Fixed-size range aggregation over an associative combine operation.
//!
//! Nodes use the implicit layout: the root is `1` and node `v` has children
//! `2v` and `2v + 1`. Node coverage is never stored; it is recomputed from
//! `(tl, tr)` on every descent. The left half of a node covering `[tl, tr]`
//! is `[tl, (tl + tr) / 2]`, which is the `ceil(len / 2)` partition used when
//! building.

use std::fmt;
use std::ops::{Bound, RangeBounds};

use crate::error::{Error, Result};
use crate::monoid::{FnMonoid, Monoid};

pub struct SegmentTree<M: Monoid> {
    tree: Vec<M::Set>,
    len: usize,
    monoid: M,
}

impl<M: Monoid> SegmentTree<M> {
    /// Builds the tree in O(n). An empty input gives a tree on which every
    /// `get` fails with [`Error::OutOfRange`].
    pub fn new<I>(values: I, monoid: M) -> Self
    where
        I: IntoIterator<Item = M::Set>,
    {
        let values: Vec<_> = values.into_iter().collect();
        let len = values.len();
        // The recursive partition is not balanced for non-powers of two, so
        // node ids can run past 2n.
        let tree = (0..4 * len).map(|_| monoid.id()).collect();
        let mut res = Self { tree, len, monoid };
        if len > 0 {
            res.build(1, len, &mut values.into_iter());
        }
        log::debug!("built segment tree over {} elements ({} slots)", len, res.tree.len());
        res
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn monoid(&self) -> &M { &self.monoid }

    /// Leaves are visited left to right, so `values` is consumed in order.
    fn build<I: Iterator<Item = M::Set>>(&mut self, v: usize, len: usize, values: &mut I) {
        if len == 1 {
            if let Some(x) = values.next() {
                self.tree[v] = x;
            }
            return;
        }
        let mid = (len + 1) / 2;
        self.build(2 * v, mid, values);
        self.build(2 * v + 1, len - mid, values);
        self.pull(v);
    }

    fn pull(&mut self, v: usize) {
        self.tree[v] = self.monoid.op(&self.tree[2 * v], &self.tree[2 * v + 1]);
    }

    /// Replaces element `index` and recomputes its ancestors. O(log n).
    pub fn set(&mut self, index: usize, value: M::Set) -> Result<()> {
        if index >= self.len {
            return Err(Error::OutOfRange {
                start: index,
                end: index.saturating_add(1),
                len: self.len,
            });
        }
        self.set_rec(1, 0, self.len - 1, index, value);
        Ok(())
    }

    fn set_rec(&mut self, v: usize, tl: usize, tr: usize, index: usize, value: M::Set) {
        if tl == tr {
            self.tree[v] = value;
            return;
        }
        let mid = (tl + tr) / 2;
        if index <= mid {
            self.set_rec(2 * v, tl, mid, index, value);
        } else {
            self.set_rec(2 * v + 1, mid + 1, tr, index, value);
        }
        self.pull(v);
    }
}

impl<M: Monoid> SegmentTree<M>
where
    M::Set: Clone,
{
    /// Combination of elements `l..=r`. Requires `l <= r < len`.
    pub fn get(&self, l: usize, r: usize) -> Result<M::Set> {
        if l > r || r >= self.len {
            return Err(Error::OutOfRange {
                start: l,
                end: r.saturating_add(1),
                len: self.len,
            });
        }
        Ok(self.get_rec(1, 0, self.len - 1, l, r))
    }

    fn get_rec(&self, v: usize, tl: usize, tr: usize, l: usize, r: usize) -> M::Set {
        if l > r {
            // clipped away entirely
            return self.monoid.id();
        }
        if l == tl && r == tr {
            return self.tree[v].clone();
        }
        let mid = (tl + tr) / 2;
        let lhs = self.get_rec(2 * v, tl, mid, l, r.min(mid));
        let rhs = self.get_rec(2 * v + 1, mid + 1, tr, l.max(mid + 1), r);
        self.monoid.op(&lhs, &rhs)
    }

    /// Half-open variant of [`get`](Self::get). An empty range folds to the
    /// identity, as long as it lies within `0..=len`.
    pub fn fold(&self, range: impl RangeBounds<usize>) -> Result<M::Set> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len,
        };
        if start > end || end > self.len {
            return Err(Error::OutOfRange { start, end, len: self.len });
        }
        if start == end {
            return Ok(self.monoid.id());
        }
        self.get(start, end - 1)
    }
}

impl<T, F> SegmentTree<FnMonoid<T, F>>
where
    T: Clone,
    F: Fn(&T, &T) -> T,
{
    /// Shorthand for a closure-backed tree; `identity` must satisfy
    /// `f(identity, x) == x == f(x, identity)`.
    pub fn with_op<I>(values: I, identity: T, f: F) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::new(values, FnMonoid::new(identity, f))
    }
}

impl<M: Monoid + Default> FromIterator<M::Set> for SegmentTree<M> {
    fn from_iter<I: IntoIterator<Item = M::Set>>(iter: I) -> Self {
        Self::new(iter, M::default())
    }
}

impl<M: Monoid> SegmentTree<M>
where
    M::Set: fmt::Display,
{
    /// Debug listing of the backing array, one `index value` per line.
    pub fn dump(&self) -> Dump<'_, M> { Dump(self) }
}

pub struct Dump<'a, M: Monoid>(&'a SegmentTree<M>);

impl<M: Monoid> fmt::Display for Dump<'_, M>
where
    M::Set: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, x) in self.0.tree.iter().enumerate() {
            writeln!(f, "{} {}", i, x)?;
        }
        Ok(())
    }
}
