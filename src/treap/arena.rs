use crate::error::IndexError;

use super::priority::Priority;

pub type Id = usize;
pub(crate) type NodePtr = Option<Id>;

#[derive(Debug)]
pub(crate) struct Node<K> {
    pub(crate) key: K,
    pub(crate) priority: Priority,
    pub(crate) left: NodePtr,
    pub(crate) right: NodePtr,
}

impl<K> Node<K> {
    pub(crate) fn new(key: K, priority: Priority) -> Node<K> {
        Node { key, priority, left: None, right: None }
    }
}

/// Slot storage for nodes. Freed slots are reused before the vector grows.
#[derive(Debug)]
pub(crate) struct Arena<K> {
    reuse: Vec<Id>,
    pub(super) slots: Vec<Option<Node<K>>>,
}

impl<K> Arena<K> {
    pub(crate) fn new() -> Arena<K> {
        Arena { reuse: Vec::new(), slots: Vec::new() }
    }

    /// Number of occupied slots.
    pub(crate) fn size(&self) -> usize {
        self.slots.len() - self.reuse.len()
    }

    pub(crate) fn insert(&mut self, node: Node<K>) -> NodePtr {
        if let Some(id) = self.reuse.pop() {
            self.slots[id] = Some(node);
            return Some(id);
        }
        self.slots.push(Some(node));
        Some(self.slots.len() - 1)
    }

    /// Slot of a live node.
    fn occupied(&self, ptr: &NodePtr) -> Result<Id, IndexError> {
        let id = ptr.ok_or(IndexError::None)?;
        match self.slots.get(id) {
            Some(Some(_)) => Ok(id),
            Some(None) => Err(IndexError::Empty(id)),
            None => Err(IndexError::OutOfBounds(id)),
        }
    }

    pub(crate) fn remove(&mut self, ptr: &NodePtr) -> Result<Node<K>, IndexError> {
        let id = self.occupied(ptr)?;
        let node = self.slots[id].take().ok_or(IndexError::Empty(id))?;
        self.reuse.push(id);
        Ok(node)
    }

    pub(crate) fn get(&self, ptr: &NodePtr) -> Result<&Node<K>, IndexError> {
        let id = self.occupied(ptr)?;
        self.slots[id].as_ref().ok_or(IndexError::Empty(id))
    }

    pub(crate) fn get_mut(&mut self, ptr: &NodePtr) -> Result<&mut Node<K>, IndexError> {
        let id = self.occupied(ptr)?;
        self.slots[id].as_mut().ok_or(IndexError::Empty(id))
    }
}
