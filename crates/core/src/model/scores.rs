use serde::{Deserialize, Deserializer, Serialize};

/// Number of finished games remembered.
pub const RECENT_SCORE_SLOTS: usize = 3;

/// Scores of the last few games, most recent first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecentScores([u32; RECENT_SCORE_SLOTS]);

impl RecentScores {
    #[must_use]
    pub fn new(scores: [u32; RECENT_SCORE_SLOTS]) -> Self {
        Self(scores)
    }

    /// Normalise a persisted list of any length: extra entries are dropped,
    /// missing ones read as zero.
    #[must_use]
    pub fn from_slice(scores: &[u32]) -> Self {
        let mut slots = [0; RECENT_SCORE_SLOTS];
        for (slot, score) in slots.iter_mut().zip(scores) {
            *slot = *score;
        }
        Self(slots)
    }

    /// Shift history back one slot and put `score` in front.
    pub fn push(&mut self, score: u32) {
        self.0.rotate_right(1);
        self.0[0] = score;
    }

    #[must_use]
    pub fn as_array(&self) -> [u32; RECENT_SCORE_SLOTS] {
        self.0
    }

    #[must_use]
    pub fn latest(&self) -> u32 {
        self.0[0]
    }
}

impl<'de> Deserialize<'de> for RecentScores {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let scores = Vec::<u32>::deserialize(deserializer)?;
        Ok(Self::from_slice(&scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_shifts_most_recent_first() {
        let mut scores = RecentScores::default();
        scores.push(10);
        scores.push(7);
        assert_eq!(scores.as_array(), [7, 10, 0]);
        scores.push(3);
        scores.push(4);
        assert_eq!(scores.as_array(), [4, 3, 7]);
        assert_eq!(scores.latest(), 4);
    }

    #[test]
    fn deserializes_short_and_long_lists() {
        let short: RecentScores = serde_json::from_str("[5]").unwrap();
        assert_eq!(short.as_array(), [5, 0, 0]);
        let long: RecentScores = serde_json::from_str("[1,2,3,4]").unwrap();
        assert_eq!(long.as_array(), [1, 2, 3]);
    }

    #[test]
    fn serializes_as_plain_array() {
        let json = serde_json::to_string(&RecentScores::new([7, 10, 0])).unwrap();
        assert_eq!(json, "[7,10,0]");
    }
}
