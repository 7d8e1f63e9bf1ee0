//! Specialized collection types

pub use slotmap::{SlotMap, SecondaryMap, Key};

/// A queued structural change to a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation<T> {
    /// Item should be added
    Add(T),
    /// Item should be removed
    Remove(T),
}

/// Buffer of structural changes requested while a collection is being iterated
///
/// Changes are applied by draining the buffer once the traversal has finished.
/// Draining yields every removal before any addition, each group in the order
/// it was queued.
#[derive(Debug, Clone)]
pub struct DeferredBuffer<T> {
    additions: Vec<T>,
    removals: Vec<T>,
}

impl<T> Default for DeferredBuffer<T> {
    fn default() -> Self {
        Self {
            additions: Vec::new(),
            removals: Vec::new(),
        }
    }
}

impl<T: PartialEq> DeferredBuffer<T> {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an addition. Returns false if the item is already queued for addition.
    pub fn queue_add(&mut self, item: T) -> bool {
        if self.additions.contains(&item) {
            return false;
        }
        self.additions.push(item);
        true
    }

    /// Queue a removal
    ///
    /// A removal of an item that is still waiting to be added cancels that
    /// addition instead. Returns false if nothing new was queued.
    pub fn queue_remove(&mut self, item: T) -> bool {
        if let Some(index) = self.additions.iter().position(|queued| *queued == item) {
            self.additions.remove(index);
            return false;
        }
        if self.removals.contains(&item) {
            return false;
        }
        self.removals.push(item);
        true
    }

    /// Check if an item is waiting to be added
    pub fn is_pending_add(&self, item: &T) -> bool {
        self.additions.contains(item)
    }

    /// Check if an item is waiting to be removed
    pub fn is_pending_remove(&self, item: &T) -> bool {
        self.removals.contains(item)
    }

    /// Drop queued entries matching the predicate without applying them
    pub fn discard(&mut self, mut predicate: impl FnMut(&T) -> bool) {
        self.additions.retain(|item| !predicate(item));
        self.removals.retain(|item| !predicate(item));
    }
}

impl<T> DeferredBuffer<T> {
    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// Number of queued changes
    pub fn len(&self) -> usize {
        self.additions.len() + self.removals.len()
    }

    /// Take every queued change, removals first
    pub fn drain(&mut self) -> impl Iterator<Item = Mutation<T>> {
        let removals = std::mem::take(&mut self.removals);
        let additions = std::mem::take(&mut self.additions);
        removals
            .into_iter()
            .map(Mutation::Remove)
            .chain(additions.into_iter().map(Mutation::Add))
    }

    /// Drop everything queued
    pub fn clear(&mut self) {
        self.additions.clear();
        self.removals.clear();
    }
}
