use std::fmt::Debug;

/// Index of a frame inside a buffer pool instance's frame array.
pub type FrameId = usize;

/// Replacement policy. Tracks which frames are evictable and names victims.
pub trait Replacer: Send + Sync + Debug {
    /// Remove and return the frame to evict. Returns None if no frame is tracked.
    fn victim(&mut self) -> Option<FrameId>;

    /// Mark a frame as evictable. Tracking an already tracked frame is a no-op.
    fn track(&mut self, frame_id: FrameId);

    /// Mark a frame as not evictable. Untracking an unknown frame is a no-op.
    fn untrack(&mut self, frame_id: FrameId);

    /// Get the number of evictable frames.
    fn size(&self) -> usize;
}
