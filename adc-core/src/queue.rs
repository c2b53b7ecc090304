//! FIFO of ordinary clients waiting for the converter.

use heapless::Deque;

use crate::client::ClientId;

/// Bounded FIFO of waiting client ids.
///
/// Each client appears at most once because a claimed client cannot start
/// again, so the slot capacity `N` is also a hard bound on the queue length.
pub struct PendingQueue<const N: usize> {
    entries: Deque<ClientId, N>,
}

impl<const N: usize> PendingQueue<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Appends a client at the tail. Returns the id back when the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `Err(id)` when all `N` positions are occupied.
    pub fn push_back(&mut self, id: ClientId) -> Result<(), ClientId> {
        self.entries.push_back(id)
    }

    /// Removes and returns the head of the queue.
    pub fn pop_front(&mut self) -> Option<ClientId> {
        self.entries.pop_front()
    }

    /// Removes every occurrence of `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: ClientId) -> bool {
        let mut removed = false;
        for _ in 0..self.entries.len() {
            let Some(entry) = self.entries.pop_front() else {
                break;
            };
            if entry == id {
                removed = true;
            } else {
                // Cannot fail: the pop above freed a position.
                let _ = self.entries.push_back(entry);
            }
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, id: ClientId) -> bool {
        self.entries.iter().any(|entry| *entry == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.entries.iter().copied()
    }
}

impl<const N: usize> Default for PendingQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: usize) -> ClientId {
        ClientId::from_index(raw).expect("index fits")
    }

    #[test]
    fn preserves_insertion_order() {
        let mut queue = PendingQueue::<4>::new();
        queue.push_back(id(2)).expect("room");
        queue.push_back(id(0)).expect("room");
        queue.push_back(id(3)).expect("room");

        assert_eq!(queue.pop_front(), Some(id(2)));
        assert_eq!(queue.pop_front(), Some(id(0)));
        assert_eq!(queue.pop_front(), Some(id(3)));
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn remove_drops_member_and_keeps_order() {
        let mut queue = PendingQueue::<4>::new();
        for raw in [1, 2, 3] {
            queue.push_back(id(raw)).expect("room");
        }

        assert!(queue.remove(id(2)));
        assert!(!queue.contains(id(2)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_front(), Some(id(1)));
        assert_eq!(queue.pop_front(), Some(id(3)));
    }

    #[test]
    fn removing_absent_client_is_a_no_op() {
        let mut queue = PendingQueue::<2>::new();
        queue.push_back(id(0)).expect("room");

        assert!(!queue.remove(id(1)));
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(id(0)));
    }

    #[test]
    fn full_queue_hands_id_back() {
        let mut queue = PendingQueue::<1>::new();
        queue.push_back(id(0)).expect("room");

        assert_eq!(queue.push_back(id(1)), Err(id(1)));
    }
}
