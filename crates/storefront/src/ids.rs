//! Collision-free numeric ID generation.

use chrono::Utc;

/// Monotonic ID source.
///
/// IDs look like millisecond timestamps (compatible with IDs already on
/// disk) but are strictly increasing: two IDs requested within the same
/// millisecond still differ.
#[derive(Debug, Clone, Default)]
pub struct IdSequence {
    last: i64,
}

impl IdSequence {
    /// Start after `floor`, typically the largest ID already in use.
    #[must_use]
    pub const fn after(floor: i64) -> Self {
        Self { last: floor }
    }

    /// Start after the largest of `existing`.
    #[must_use]
    pub fn seeded(existing: impl IntoIterator<Item = i64>) -> Self {
        Self::after(existing.into_iter().max().unwrap_or(0))
    }

    /// Make sure future IDs are greater than `id`.
    pub fn observe(&mut self, id: i64) {
        self.last = self.last.max(id);
    }

    /// Next unused ID.
    pub fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last.saturating_add(1));
        self.last
    }
}
