use super::replacer::{FrameId, Replacer};
use log::trace;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    /// Neighbour towards the most recently used end.
    newer: Option<FrameId>,
    /// Neighbour towards the least recently used end.
    older: Option<FrameId>,
}

/// Least-recently-used replacer.
///
/// Evictable frames form a doubly linked recency list whose links live in a
/// map keyed by frame id, so track, untrack and victim are all O(1).
#[derive(Debug)]
pub struct LruReplacer {
    links: HashMap<FrameId, Link>,
    /// Most recently tracked frame
    newest: Option<FrameId>,
    /// Least recently tracked frame, the next victim
    oldest: Option<FrameId>,
    capacity: usize,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            links: HashMap::with_capacity(capacity),
            newest: None,
            oldest: None,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, frame_id: FrameId) -> bool {
        self.links.contains_key(&frame_id)
    }

    fn push_newest(&mut self, frame_id: FrameId) {
        let link = Link {
            newer: None,
            older: self.newest,
        };
        match self.newest {
            Some(prev) => {
                if let Some(prev_link) = self.links.get_mut(&prev) {
                    prev_link.newer = Some(frame_id);
                }
            }
            None => self.oldest = Some(frame_id),
        }
        self.newest = Some(frame_id);
        self.links.insert(frame_id, link);
    }

    fn unlink(&mut self, frame_id: FrameId) -> bool {
        let Some(link) = self.links.remove(&frame_id) else {
            return false;
        };

        match link.newer {
            Some(newer) => {
                if let Some(newer_link) = self.links.get_mut(&newer) {
                    newer_link.older = link.older;
                }
            }
            None => self.newest = link.older,
        }
        match link.older {
            Some(older) => {
                if let Some(older_link) = self.links.get_mut(&older) {
                    older_link.newer = link.newer;
                }
            }
            None => self.oldest = link.newer,
        }
        true
    }
}

impl Replacer for LruReplacer {
    fn victim(&mut self) -> Option<FrameId> {
        let frame_id = self.oldest?;
        self.unlink(frame_id);
        trace!("victim frame {}", frame_id);
        Some(frame_id)
    }

    fn track(&mut self, frame_id: FrameId) {
        // Recency is not refreshed for a frame that is already evictable.
        if self.links.contains_key(&frame_id) {
            return;
        }

        if self.links.len() >= self.capacity {
            if let Some(dropped) = self.oldest {
                self.unlink(dropped);
                trace!("replacer full, dropped frame {} from tracking", dropped);
            }
        }
        self.push_newest(frame_id);
    }

    fn untrack(&mut self, frame_id: FrameId) {
        if self.unlink(frame_id) {
            trace!("untracked frame {}", frame_id);
        }
    }

    fn size(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_lru_operations() {
        let mut replacer = LruReplacer::new(3);

        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.victim(), None);

        replacer.track(1);
        replacer.track(2);
        replacer.track(3);
        assert_eq!(replacer.size(), 3);

        // First tracked is first evicted
        assert_eq!(replacer.victim(), Some(1));
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(3));
        assert_eq!(replacer.victim(), None);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_track_untrack() {
        let mut replacer = LruReplacer::new(3);

        replacer.track(1);
        replacer.track(2);
        assert_eq!(replacer.size(), 2);

        replacer.untrack(1);
        assert_eq!(replacer.size(), 1);
        assert!(!replacer.contains(1));

        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), None);

        replacer.track(1);
        assert_eq!(replacer.victim(), Some(1));
    }

    #[test]
    fn test_duplicate_track_keeps_recency() {
        let mut replacer = LruReplacer::new(3);

        replacer.track(1);
        replacer.track(2);
        replacer.track(1);
        assert_eq!(replacer.size(), 2);

        // Frame 1 stays the oldest
        assert_eq!(replacer.victim(), Some(1));
        assert_eq!(replacer.victim(), Some(2));
    }

    #[test]
    fn test_untrack_non_existent() {
        let mut replacer = LruReplacer::new(2);

        replacer.untrack(999);
        assert_eq!(replacer.size(), 0);

        replacer.track(4);
        replacer.untrack(999);
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut replacer = LruReplacer::new(2);

        replacer.track(1);
        replacer.track(2);
        replacer.track(3);

        assert_eq!(replacer.size(), 2);
        assert!(!replacer.contains(1));
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(3));
    }

    #[test]
    fn test_untrack_head_tail_and_middle() {
        let mut replacer = LruReplacer::new(5);
        for frame_id in 1..=5 {
            replacer.track(frame_id);
        }

        replacer.untrack(1);
        replacer.untrack(5);
        replacer.untrack(3);
        assert_eq!(replacer.size(), 2);

        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(4));
        assert_eq!(replacer.victim(), None);

        // List is reusable after draining
        replacer.track(3);
        assert_eq!(replacer.victim(), Some(3));
    }

    #[test]
    fn test_complex_scenario() {
        let mut replacer = LruReplacer::new(3);

        replacer.track(1);
        replacer.track(2);
        replacer.track(3);

        replacer.untrack(2);
        assert_eq!(replacer.size(), 2);

        assert_eq!(replacer.victim(), Some(1));

        replacer.track(2);
        replacer.track(4);

        assert_eq!(replacer.victim(), Some(3));
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(4));
    }

    #[test]
    fn test_six_frame_sequence() {
        let mut replacer = LruReplacer::new(7);

        for frame_id in [1, 2, 3, 4, 5, 6, 1] {
            replacer.track(frame_id);
        }
        assert_eq!(replacer.size(), 6);

        assert_eq!(replacer.victim(), Some(1));
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(3));

        replacer.untrack(3);
        replacer.untrack(4);
        assert_eq!(replacer.size(), 2);

        replacer.track(4);

        assert_eq!(replacer.victim(), Some(5));
        assert_eq!(replacer.victim(), Some(6));
        assert_eq!(replacer.victim(), Some(4));
    }
}
