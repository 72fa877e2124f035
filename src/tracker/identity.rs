//! Track identities and the per-video identity allocator.

use std::fmt;

/// Identity carried by a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackId {
    /// Not yet assigned by the tracker (`-1` on the wire)
    #[default]
    Unassigned,
    /// Flagged for deletion by a secondary filter (`-2` on the wire)
    Deleted,
    /// A track identity issued by an [`IdentityAllocator`]
    Assigned(u64),
}

impl TrackId {
    /// Wire value used by detection records.
    pub fn to_raw(self) -> i64 {
        match self {
            TrackId::Unassigned => -1,
            TrackId::Deleted => -2,
            TrackId::Assigned(id) => id as i64,
        }
    }

    /// Parse a wire value. Positive values are identities, `-2` marks deletion,
    /// anything else is unassigned.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            id if id > 0 => TrackId::Assigned(id as u64),
            -2 => TrackId::Deleted,
            _ => TrackId::Unassigned,
        }
    }

    pub fn assigned(self) -> Option<u64> {
        match self {
            TrackId::Assigned(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

/// Monotonic identity source owned by a single video's tracker.
///
/// Identities start at 1 and are never reused.
#[derive(Debug, Clone)]
pub struct IdentityAllocator {
    next: u64,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Get the next unique track ID.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of identities issued so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}
