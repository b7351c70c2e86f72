//! Shared cross-platform state types.

/// Unified sync state surfaced to UI layers for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Offline,
    Syncing,
    Synced,
    Error,
}

impl SyncState {
    /// Derive the display state from the runtime flags.
    #[must_use]
    pub const fn from_runtime(online: bool, syncing: bool) -> Self {
        if !online {
            Self::Offline
        } else if syncing {
            Self::Syncing
        } else {
            Self::Synced
        }
    }

    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}
