//! Randomized balanced search tree (treap).
//!
//! A [`Forest`] owns an arena of nodes together with the generator that draws
//! their priorities; a [`Tree`] is a move-only handle to one root inside that
//! arena. Operations that consume trees ([`Forest::merge`],
//! [`Forest::split`], [`Forest::release`]) take handles by value, so a
//! consumed tree cannot be touched again.
//!
//! Every tree keeps two invariants: keys are strictly increasing in order
//! (left subtree below the node, right subtree above), and a node's priority
//! is at least the priority of each child.
//!
//! No walk recurses on depth, so a degenerate tree from a skewed generator is
//! slow but never exhausts the stack.
//!
//! ```
//! use cpl_trees::{Forest, Seed, Tree};
//!
//! let mut forest = Forest::with_seed(Seed::Fixed(1));
//! let mut tree = Tree::new();
//! for key in (1..=5).rev() {
//!     forest.insert(&mut tree, key).unwrap();
//! }
//! let (left, right) = forest.split(tree, &2).unwrap();
//! assert_eq!(forest.iter(&left).unwrap().copied().collect::<Vec<_>>(), [1, 2]);
//! let tree = forest.merge(left, right).unwrap();
//! assert!(forest.find(&tree, &4).unwrap());
//! ```

mod arena;
mod priority;

use std::cmp::Ordering;
use std::sync::atomic::{self, AtomicU32};

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, IndexError, Result};
use arena::{Arena, Node, NodePtr};

pub use arena::Id;
pub use priority::{Priority, Seed, DEFAULT_SEED};

type Walk<T> = std::result::Result<T, IndexError>;

static NEXT_FOREST: AtomicU32 = AtomicU32::new(1);

/// Handle to a (possibly empty) tree inside a [`Forest`].
///
/// Dropping a non-empty handle without [`Forest::release`] keeps its nodes
/// allocated until the forest itself is dropped.
#[derive(Debug, Default)]
#[must_use]
pub struct Tree {
    root: NodePtr,
    forest: u32,
}

impl Tree {
    pub fn new() -> Tree { Tree::default() }

    pub fn is_empty(&self) -> bool { self.root.is_none() }
}

#[derive(Debug)]
pub struct Forest<K, R = ChaCha8Rng> {
    id: u32,
    arena: Arena<K>,
    rng: R,
}

impl<K> Forest<K> {
    /// Forest seeded from the clock.
    pub fn new() -> Forest<K> { Forest::with_seed(Seed::default()) }

    pub fn with_seed(seed: Seed) -> Forest<K> {
        let fixed = Seed::Fixed(seed.value());
        log::debug!("treap priorities seeded with {:?} (from {:?})", fixed, seed);
        Forest::with_rng(fixed.rng())
    }
}

impl<K> Default for Forest<K> {
    fn default() -> Self { Self::new() }
}

impl<K, R> Forest<K, R> {
    /// Forest drawing priorities from `rng`. Expected depth is logarithmic
    /// only if `rng` is close to uniform.
    pub fn with_rng(rng: R) -> Forest<K, R> {
        let id = NEXT_FOREST.fetch_add(1, atomic::Ordering::Relaxed);
        Forest { id, arena: Arena::new(), rng }
    }

    /// Live nodes across every tree of this forest.
    pub fn len(&self) -> usize { self.arena.size() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn owns(&self, tree: &Tree) -> bool { tree.root.is_none() || tree.forest == self.id }

    fn check(&self, tree: &Tree) -> Result<()> {
        if self.owns(tree) {
            Ok(())
        } else {
            Err(Error::ForeignTree { trees: Vec::new() })
        }
    }

    fn handle(&self, root: NodePtr) -> Tree { Tree { root, forest: self.id } }

    /// Frees every node of `tree` for reuse and returns how many there were.
    pub fn release(&mut self, tree: Tree) -> Result<usize> {
        if !self.owns(&tree) {
            return Err(Error::ForeignTree { trees: vec![tree] });
        }
        let mut stack: Vec<Id> = tree.root.into_iter().collect();
        let mut freed = 0;
        while let Some(id) = stack.pop() {
            let node = self.arena.remove(&Some(id))?;
            stack.extend(node.left);
            stack.extend(node.right);
            freed += 1;
        }
        log::trace!("released {} treap nodes", freed);
        Ok(freed)
    }

    /// Number of keys in `tree`.
    pub fn count(&self, tree: &Tree) -> Result<usize> {
        self.check(tree)?;
        let mut stack: Vec<NodePtr> = vec![tree.root];
        let mut total = 0;
        while let Some(node) = stack.pop() {
            if node.is_some() {
                let entry = self.arena.get(&node)?;
                stack.push(entry.left);
                stack.push(entry.right);
                total += 1;
            }
        }
        Ok(total)
    }

    pub fn depth(&self, tree: &Tree) -> Result<usize> {
        self.check(tree)?;
        let mut stack: Vec<(NodePtr, usize)> = vec![(tree.root, 0)];
        let mut deepest = 0;
        while let Some((node, above)) = stack.pop() {
            if node.is_some() {
                let entry = self.arena.get(&node)?;
                deepest = deepest.max(above + 1);
                stack.push((entry.left, above + 1));
                stack.push((entry.right, above + 1));
            }
        }
        Ok(deepest)
    }

    /// Calls `f` on every key of `tree` in ascending order.
    pub fn traverse<F: FnMut(&K)>(&self, tree: &Tree, mut f: F) -> Result<()> {
        self.check(tree)?;
        let mut stack = Vec::new();
        descend(&self.arena, &mut stack, tree.root)?;
        while let Some(entry) = stack.pop() {
            f(&entry.key);
            descend(&self.arena, &mut stack, entry.right)?;
        }
        Ok(())
    }

    /// Ascending keys of `tree`, walked lazily.
    pub fn iter<'a>(&'a self, tree: &Tree) -> Result<Iter<'a, K>> {
        self.check(tree)?;
        let mut stack = Vec::new();
        descend(&self.arena, &mut stack, tree.root)?;
        Ok(Iter { arena: &self.arena, stack })
    }
}

impl<K, R: Rng> Forest<K, R> {
    /// Single-node tree holding `key`.
    pub fn create(&mut self, key: K) -> Tree {
        let priority: Priority = self.rng.gen();
        let root = self.arena.insert(Node::new(key, priority));
        self.handle(root)
    }
}

impl<K: Ord, R> Forest<K, R> {
    /// Joins two trees where every key of `left` is below every key of
    /// `right`. Both handles are consumed on success; on any error they are
    /// handed back unchanged.
    pub fn merge(&mut self, left: Tree, right: Tree) -> Result<Tree> {
        if !self.owns(&left) || !self.owns(&right) {
            return Err(Error::ForeignTree { trees: vec![left, right] });
        }
        if let (Some(max), Some(min)) = (self.rightmost(left.root)?, self.leftmost(right.root)?) {
            if max >= min {
                log::debug!("refusing to merge unordered trees");
                return Err(Error::InvariantViolation { left, right });
            }
        }
        let root = merge_nodes(&mut self.arena, left.root, right.root)?;
        Ok(self.handle(root))
    }

    /// Partitions `tree` into keys `<= key` and keys `> key`.
    pub fn split(&mut self, tree: Tree, key: &K) -> Result<(Tree, Tree)> {
        if !self.owns(&tree) {
            return Err(Error::ForeignTree { trees: vec![tree] });
        }
        let (left, right) = split_nodes(&mut self.arena, tree.root, key)?;
        Ok((self.handle(left), self.handle(right)))
    }

    pub fn find(&self, tree: &Tree, key: &K) -> Result<bool> {
        self.check(tree)?;
        let mut node = tree.root;
        while node.is_some() {
            let entry = self.arena.get(&node)?;
            match key.cmp(&entry.key) {
                Ordering::Equal => return Ok(true),
                Ordering::Less => node = entry.left,
                Ordering::Greater => node = entry.right,
            }
        }
        Ok(false)
    }

    fn leftmost(&self, mut node: NodePtr) -> Walk<Option<&K>> {
        let mut key = None;
        while node.is_some() {
            let entry = self.arena.get(&node)?;
            key = Some(&entry.key);
            node = entry.left;
        }
        Ok(key)
    }

    fn rightmost(&self, mut node: NodePtr) -> Walk<Option<&K>> {
        let mut key = None;
        while node.is_some() {
            let entry = self.arena.get(&node)?;
            key = Some(&entry.key);
            node = entry.right;
        }
        Ok(key)
    }
}

impl<K: Ord, R: Rng> Forest<K, R> {
    /// Adds `key` to `tree` by splitting at `key` and merging the new node in
    /// between. Returns `false`, leaving the tree as it was, if `key` is
    /// already present.
    pub fn insert(&mut self, tree: &mut Tree, key: K) -> Result<bool> {
        if self.find(tree, &key)? {
            return Ok(false);
        }
        let (left, right) = split_nodes(&mut self.arena, tree.root, &key)?;
        let mid = self.create(key);
        let left = merge_nodes(&mut self.arena, left, mid.root)?;
        let root = merge_nodes(&mut self.arena, left, right)?;
        *tree = self.handle(root);
        Ok(true)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Open child slot that the next subtree gets hung on; `None` is the root.
type Hole = Option<(NodePtr, Side)>;

fn attach<K>(arena: &mut Arena<K>, root: &mut NodePtr, hole: Hole, node: NodePtr) -> Walk<()> {
    match hole {
        None => *root = node,
        Some((parent, Side::Left)) => arena.get_mut(&parent)?.left = node,
        Some((parent, Side::Right)) => arena.get_mut(&parent)?.right = node,
    }
    Ok(())
}

/// Walks down the two spines that face each other (right spine of `left`,
/// left spine of `right`), taking the higher priority at each step.
fn merge_nodes<K>(arena: &mut Arena<K>, mut left: NodePtr, mut right: NodePtr) -> Walk<NodePtr> {
    let mut root = None;
    let mut hole: Hole = None;
    while left.is_some() && right.is_some() {
        let left_p = arena.get(&left)?.priority;
        let right_p = arena.get(&right)?.priority;
        if left_p > right_p {
            attach(arena, &mut root, hole, left)?;
            hole = Some((left, Side::Right));
            left = arena.get(&left)?.right;
        } else {
            // ties go right
            attach(arena, &mut root, hole, right)?;
            hole = Some((right, Side::Left));
            right = arena.get(&right)?.left;
        }
    }
    attach(arena, &mut root, hole, left.or(right))?;
    Ok(root)
}

/// Peels nodes off one path from the root: a node above `key` joins the right
/// part with its right subtree, anything else joins the left part with its
/// left subtree.
fn split_nodes<K: Ord>(arena: &mut Arena<K>, mut node: NodePtr, key: &K) -> Walk<(NodePtr, NodePtr)> {
    let (mut left_root, mut right_root) = (None, None);
    let (mut left_hole, mut right_hole): (Hole, Hole) = (None, None);
    while node.is_some() {
        let (above, next) = {
            let entry = arena.get(&node)?;
            if entry.key > *key {
                (true, entry.left)
            } else {
                (false, entry.right)
            }
        };
        if above {
            attach(arena, &mut right_root, right_hole, node)?;
            right_hole = Some((node, Side::Left));
        } else {
            attach(arena, &mut left_root, left_hole, node)?;
            left_hole = Some((node, Side::Right));
        }
        node = next;
    }
    // cut the last links back into the other part
    if left_hole.is_some() {
        attach(arena, &mut left_root, left_hole, None)?;
    }
    if right_hole.is_some() {
        attach(arena, &mut right_root, right_hole, None)?;
    }
    Ok((left_root, right_root))
}

/// Pushes `node` and its left spine.
fn descend<'a, K>(arena: &'a Arena<K>, stack: &mut Vec<&'a Node<K>>, mut node: NodePtr) -> Walk<()> {
    while node.is_some() {
        let entry = arena.get(&node)?;
        stack.push(entry);
        node = entry.left;
    }
    Ok(())
}

/// In-order iterator returned by [`Forest::iter`].
pub struct Iter<'a, K> {
    arena: &'a Arena<K>,
    stack: Vec<&'a Node<K>>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let entry = self.stack.pop()?;
        if let Err(e) = descend(self.arena, &mut self.stack, entry.right) {
            // only reachable through a corrupted arena
            debug_assert!(false, "treap iteration hit {}", e);
            log::error!("treap iteration stopped: {}", e);
            self.stack.clear();
        }
        Some(&entry.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> Forest<i32> { Forest::with_seed(Seed::deterministic(true)) }

    fn keys(forest: &Forest<i32>, tree: &Tree) -> Vec<i32> {
        forest.iter(tree).unwrap().copied().collect()
    }

    /// Checks both invariants and returns the node count.
    fn check_shape<K: Ord>(arena: &Arena<K>, node: NodePtr, lo: Option<&K>, hi: Option<&K>) -> usize {
        if node.is_none() {
            return 0;
        }
        let entry = arena.get(&node).unwrap();
        assert!(lo.map_or(true, |lo| *lo < entry.key));
        assert!(hi.map_or(true, |hi| entry.key < *hi));
        for child in [entry.left, entry.right] {
            if child.is_some() {
                assert!(arena.get(&child).unwrap().priority <= entry.priority);
            }
        }
        1 + check_shape(arena, entry.left, lo, Some(&entry.key))
            + check_shape(arena, entry.right, Some(&entry.key), hi)
    }

    #[test]
    fn insert_split_merge() {
        let mut forest = forest();
        let mut tree = Tree::new();
        for key in (1..=5).rev() {
            assert!(forest.insert(&mut tree, key).unwrap());
            assert!(forest.find(&tree, &key).unwrap());
        }
        for key in 1..=5 {
            assert!(forest.find(&tree, &key).unwrap());
        }

        let (left, right) = forest.split(tree, &2).unwrap();
        assert_eq!(keys(&forest, &left), [1, 2]);
        assert_eq!(keys(&forest, &right), [3, 4, 5]);
        for key in 1..=2 {
            assert!(forest.find(&left, &key).unwrap());
            assert!(!forest.find(&right, &key).unwrap());
        }
        for key in 3..=5 {
            assert!(forest.find(&right, &key).unwrap());
        }

        let tree = forest.merge(left, right).unwrap();
        for key in 1..=5 {
            assert!(forest.find(&tree, &key).unwrap());
        }
        assert_eq!(check_shape(&forest.arena, tree.root, None, None), 5);
    }

    #[test]
    fn find_missing() {
        let mut forest = forest();
        let mut tree = Tree::new();
        assert!(!forest.find(&tree, &0).unwrap());
        for key in [10, 30, 20] {
            forest.insert(&mut tree, key).unwrap();
        }
        for key in [0, 15, 25, 35] {
            assert!(!forest.find(&tree, &key).unwrap());
        }
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut forest = forest();
        let mut tree = forest.create(7);
        assert!(!forest.insert(&mut tree, 7).unwrap());
        assert_eq!(forest.count(&tree).unwrap(), 1);
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn split_edges() {
        let mut forest = forest();
        let mut tree = Tree::new();
        for key in 0..10 {
            forest.insert(&mut tree, key).unwrap();
        }
        let (left, right) = forest.split(tree, &-1).unwrap();
        assert!(left.is_empty());
        assert_eq!(forest.count(&right).unwrap(), 10);

        let (left, rest) = forest.split(right, &9).unwrap();
        assert!(rest.is_empty());
        assert_eq!(keys(&forest, &left), (0..10).collect::<Vec<_>>());

        let (a, b) = forest.split(Tree::new(), &3).unwrap();
        assert!(a.is_empty() && b.is_empty());
    }

    #[test]
    fn merge_with_empty() {
        let mut forest = forest();
        let one = forest.create(1);
        let tree = forest.merge(Tree::new(), one).unwrap();
        let tree = forest.merge(tree, Tree::new()).unwrap();
        assert_eq!(keys(&forest, &tree), [1]);
        assert!(forest.merge(Tree::new(), Tree::new()).unwrap().is_empty());
    }

    #[test]
    fn unordered_merge_gives_trees_back() {
        let mut forest = forest();
        let mut low = Tree::new();
        let mut high = Tree::new();
        for key in [1, 2, 3] {
            forest.insert(&mut low, key).unwrap();
        }
        for key in [3, 4] {
            forest.insert(&mut high, key).unwrap();
        }
        let (low, high) = match forest.merge(low, high) {
            Err(Error::InvariantViolation { left, right }) => (left, right),
            other => panic!("expected invariant violation, got {:?}", other),
        };
        assert_eq!(keys(&forest, &low), [1, 2, 3]);
        assert_eq!(keys(&forest, &high), [3, 4]);
        assert!(matches!(forest.merge(high, low), Err(Error::InvariantViolation { .. })));
    }

    #[test]
    fn foreign_tree() {
        let mut a = forest();
        let mut b = forest();
        let tree = a.create(1);
        assert!(matches!(b.find(&tree, &1), Err(Error::ForeignTree { .. })));
        let tree = match b.split(tree, &1) {
            Err(Error::ForeignTree { mut trees }) if trees.len() == 1 => trees.remove(0),
            other => panic!("expected the handle back, got {:?}", other),
        };
        assert_eq!(keys(&a, &tree), [1]);
        let empty = Tree::new();
        assert!(!b.find(&empty, &1).unwrap());
    }

    #[test]
    fn foreign_merge_hands_back_both() {
        let mut a = forest();
        let mut b = forest();
        let mut mine = Tree::new();
        for key in [1, 2, 3] {
            a.insert(&mut mine, key).unwrap();
        }
        let theirs = b.create(10);
        let mut trees = match a.merge(mine, theirs) {
            Err(Error::ForeignTree { trees }) => trees,
            other => panic!("expected foreign tree error, got {:?}", other),
        };
        assert_eq!(trees.len(), 2);
        let theirs = trees.pop().unwrap();
        let mine = trees.pop().unwrap();
        assert_eq!(keys(&a, &mine), [1, 2, 3]);
        assert_eq!(keys(&b, &theirs), [10]);

        let theirs = match a.release(theirs) {
            Err(Error::ForeignTree { mut trees }) => trees.remove(0),
            other => panic!("expected foreign tree error, got {:?}", other),
        };
        assert_eq!(b.release(theirs).unwrap(), 1);
        assert_eq!(a.release(mine).unwrap(), 3);
        assert!(a.is_empty());
    }

    #[test]
    fn long_spine_does_not_recurse() {
        const N: u32 = 200_000;
        let mut forest: Forest<u32, _> = Forest::with_rng(rand::rngs::mock::StepRng::new(0, 1));
        let mut tree = Tree::new();
        for key in 0..N {
            forest.insert(&mut tree, key).unwrap();
        }
        assert_eq!(forest.depth(&tree).unwrap(), N as usize);

        let (left, right) = forest.split(tree, &0).unwrap();
        assert_eq!(keys_u32(&forest, &left), [0]);
        assert_eq!(forest.count(&right).unwrap(), N as usize - 1);

        let tree = forest.merge(left, right).unwrap();
        let mut expected = 0;
        forest
            .traverse(&tree, |&k| {
                assert_eq!(k, expected);
                expected += 1;
            })
            .unwrap();
        assert_eq!(expected, N);
        assert!(forest.find(&tree, &(N / 2)).unwrap());
        assert_eq!(forest.release(tree).unwrap(), N as usize);
    }

    fn keys_u32<R>(forest: &Forest<u32, R>, tree: &Tree) -> Vec<u32> {
        forest.iter(tree).unwrap().copied().collect()
    }

    #[test]
    fn vacant_slot_is_reported() {
        let mut forest = forest();
        let mut tree = Tree::new();
        for key in 0..8 {
            forest.insert(&mut tree, key).unwrap();
        }
        forest.arena.remove(&tree.root).unwrap();
        let id = tree.root.unwrap();
        assert!(matches!(forest.iter(&tree), Err(Error::Index(IndexError::Empty(i))) if i == id));
        assert!(matches!(forest.traverse(&tree, |_| {}), Err(Error::Index(_))));
        assert!(matches!(forest.count(&tree), Err(Error::Index(_))));
        assert!(matches!(forest.depth(&tree), Err(Error::Index(_))));
    }

    #[test]
    fn insert_keeps_handle_on_duplicate() {
        let mut forest = forest();
        let mut tree = Tree::new();
        for key in [4, 2, 6] {
            forest.insert(&mut tree, key).unwrap();
        }
        assert!(!forest.insert(&mut tree, 2).unwrap());
        assert_eq!(keys(&forest, &tree), [2, 4, 6]);
        assert_eq!(check_shape(&forest.arena, tree.root, None, None), 3);
    }

    #[test]
    fn merge_and_split_keep_heap_order() {
        let mut forest = forest();
        let mut low = Tree::new();
        let mut high = Tree::new();
        for key in 0..300 {
            forest.insert(&mut low, key).unwrap();
            forest.insert(&mut high, key + 1000).unwrap();
        }
        let tree = forest.merge(low, high).unwrap();
        assert_eq!(check_shape(&forest.arena, tree.root, None, None), 600);
        let (left, right) = forest.split(tree, &150).unwrap();
        assert_eq!(check_shape(&forest.arena, left.root, None, None), 151);
        assert_eq!(check_shape(&forest.arena, right.root, None, None), 449);
    }

    #[test]
    fn traverse_matches_iter() {
        let mut forest = forest();
        let mut tree = Tree::new();
        for key in [8, 3, 10, 1, 6, 14, 4, 7, 13] {
            forest.insert(&mut tree, key).unwrap();
        }
        let mut seen = Vec::new();
        forest.traverse(&tree, |&k| seen.push(k)).unwrap();
        assert_eq!(seen, keys(&forest, &tree));
        assert_eq!(seen, [1, 3, 4, 6, 7, 8, 10, 13, 14]);
        // restartable
        assert_eq!(forest.iter(&tree).unwrap().count(), 9);
    }

    #[test]
    fn release_recycles_slots() {
        let mut forest = forest();
        let mut tree = Tree::new();
        for key in 0..32 {
            forest.insert(&mut tree, key).unwrap();
        }
        assert_eq!(forest.len(), 32);
        assert_eq!(forest.release(tree).unwrap(), 32);
        assert!(forest.is_empty());

        let mut tree = Tree::new();
        for key in 0..8 {
            forest.insert(&mut tree, key).unwrap();
        }
        assert_eq!(forest.len(), 8);
        assert_eq!(forest.arena.slots.len(), 32);
    }

    #[test]
    fn stays_shallow() {
        let mut forest = forest();
        let mut tree = Tree::new();
        for key in 0..4096 {
            forest.insert(&mut tree, key).unwrap();
        }
        assert_eq!(check_shape(&forest.arena, tree.root, None, None), 4096);
        // expected height is about 3 ln n, roughly 25 here
        assert!(forest.depth(&tree).unwrap() < 64);
    }

    #[test]
    fn same_seed_same_shape() {
        let build = || {
            let mut forest = forest();
            let mut tree = Tree::new();
            for key in [5, 1, 9, 3, 7] {
                forest.insert(&mut tree, key).unwrap();
            }
            let root = forest.arena.get(&tree.root).unwrap().key;
            (root, forest.depth(&tree).unwrap())
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn injected_rng() {
        let mut forest: Forest<u8, _> = Forest::with_rng(rand::rngs::mock::StepRng::new(0, 1));
        let mut tree = Tree::new();
        for key in 0..16 {
            forest.insert(&mut tree, key).unwrap();
        }
        // increasing priorities put the newest key at the root: a left spine
        assert_eq!(forest.depth(&tree).unwrap(), 16);
        assert_eq!(forest.iter(&tree).unwrap().count(), 16);
    }
}
