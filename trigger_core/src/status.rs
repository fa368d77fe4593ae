//! Outcomes reported by the edge handlers and the sync summary.

/// What happened to one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Wrong polarity for the configured edge; the decoder was not called.
    Ignored,
    /// Arrived before the noise filter threshold; no state changed.
    Filtered,
    /// Passed the filter and updated the decoder.
    Accepted,
}

impl EdgeOutcome {
    #[inline]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Confidence in the current tooth count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    None,
    /// Primary pattern found, cam half of the cycle unknown.
    Half,
    Full,
}

impl SyncState {
    pub fn from_flags(has_sync: bool, half_sync: bool) -> Self {
        match (has_sync, half_sync) {
            (true, _) => Self::Full,
            (false, true) => Self::Half,
            (false, false) => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Half => "half",
            Self::Full => "full",
        }
    }
}
