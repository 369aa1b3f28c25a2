//! Combine operations for [`SegmentTree`](crate::SegmentTree).
//!
//! A monoid pairs an associative binary operation with its identity element.
//! The identity is always explicit: it is what empty or clipped ranges fold
//! to, so it has to be a true identity for `op` (e.g. `i32::MIN` for max,
//! not `0`).

use std::iter::Sum;
use std::marker::PhantomData;
use std::ops::Add;

pub trait BinaryOp {
    type Set;
    fn op(&self, lhs: &Self::Set, rhs: &Self::Set) -> Self::Set;
}

pub trait Identity: BinaryOp {
    fn id(&self) -> Self::Set;
}

/// Marker: `op(a, op(b, c)) == op(op(a, b), c)`.
pub trait Associative {}

pub trait Monoid: BinaryOp + Associative + Identity {}

impl<T: BinaryOp + Associative + Identity> Monoid for T {}

pub struct OpAdd<T>(PhantomData<fn(&T) -> T>);

impl<T> Default for OpAdd<T> {
    fn default() -> Self { Self(PhantomData) }
}

impl<T> BinaryOp for OpAdd<T>
where
    for<'a> &'a T: Add<&'a T, Output = T>,
{
    type Set = T;
    fn op(&self, lhs: &T, rhs: &T) -> T { lhs + rhs }
}

impl<T> Identity for OpAdd<T>
where
    for<'a> &'a T: Add<&'a T, Output = T>,
    T: for<'a> Sum<&'a T>,
{
    fn id(&self) -> T { None.into_iter().sum() }
}

impl<T> Associative for OpAdd<T> where for<'a> &'a T: Add<&'a T, Output = T> {}

/// Maximum, with the caller's lower bound as identity.
#[derive(Debug, Clone)]
pub struct OpMax<T> {
    floor: T,
}

impl<T> OpMax<T> {
    pub fn new(floor: T) -> Self { Self { floor } }
}

impl<T: Ord + Clone> BinaryOp for OpMax<T> {
    type Set = T;
    fn op(&self, lhs: &T, rhs: &T) -> T { lhs.max(rhs).clone() }
}

impl<T: Ord + Clone> Identity for OpMax<T> {
    fn id(&self) -> T { self.floor.clone() }
}

impl<T: Ord + Clone> Associative for OpMax<T> {}

/// Minimum, with the caller's upper bound as identity.
#[derive(Debug, Clone)]
pub struct OpMin<T> {
    ceil: T,
}

impl<T> OpMin<T> {
    pub fn new(ceil: T) -> Self { Self { ceil } }
}

impl<T: Ord + Clone> BinaryOp for OpMin<T> {
    type Set = T;
    fn op(&self, lhs: &T, rhs: &T) -> T { lhs.min(rhs).clone() }
}

impl<T: Ord + Clone> Identity for OpMin<T> {
    fn id(&self) -> T { self.ceil.clone() }
}

impl<T: Ord + Clone> Associative for OpMin<T> {}

macro_rules! impl_bounded_default {
    ( $($ty:ty),* ) => { $(
        impl Default for OpMax<$ty> {
            fn default() -> Self { Self::new(<$ty>::MIN) }
        }
        impl Default for OpMin<$ty> {
            fn default() -> Self { Self::new(<$ty>::MAX) }
        }
    )* };
}

impl_bounded_default! { i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize }

/// Any closure as a monoid. Associativity of `f` and the identity law for
/// `id` are the caller's promise.
pub struct FnMonoid<T, F> {
    id: T,
    f: F,
}

impl<T, F> FnMonoid<T, F>
where
    F: Fn(&T, &T) -> T,
{
    pub fn new(id: T, f: F) -> Self { Self { id, f } }
}

impl<T, F> BinaryOp for FnMonoid<T, F>
where
    F: Fn(&T, &T) -> T,
{
    type Set = T;
    fn op(&self, lhs: &T, rhs: &T) -> T { (self.f)(lhs, rhs) }
}

impl<T: Clone, F> Identity for FnMonoid<T, F>
where
    F: Fn(&T, &T) -> T,
{
    fn id(&self) -> T { self.id.clone() }
}

impl<T, F> Associative for FnMonoid<T, F> where F: Fn(&T, &T) -> T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add() {
        let op_add: OpAdd<i32> = Default::default();
        assert_eq!(op_add.op(&1, &2), 3);
        assert_eq!(op_add.id(), 0);
    }

    #[test]
    fn max_min_identity_below_zero() {
        let max = OpMax::<i64>::default();
        assert_eq!(max.id(), i64::MIN);
        assert_eq!(max.op(&max.id(), &-7), -7);

        let min = OpMin::<i64>::default();
        assert_eq!(min.id(), i64::MAX);
        assert_eq!(min.op(&-3, &min.id()), -3);
    }

    #[test]
    fn closure() {
        let gcd = FnMonoid::new(0_u32, |&a: &u32, &b: &u32| {
            let (mut a, mut b) = (a, b);
            while b != 0 {
                let t = a % b;
                a = b;
                b = t;
            }
            a
        });
        assert_eq!(gcd.op(&12, &18), 6);
        assert_eq!(gcd.op(&gcd.id(), &9), 9);
    }
}
