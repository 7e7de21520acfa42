//! Once-per-session alert suppression.

use crate::types::AlertKey;
use std::collections::BTreeSet;

/// Set of alert categories already fired in the current session.
///
/// There is no time-based expiry: a key stays fired until the session is
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct AlertDeduplicator {
    fired: BTreeSet<AlertKey>,
}

impl AlertDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` and return true the first time it is seen; false after.
    pub fn try_fire(&mut self, key: AlertKey) -> bool {
        self.fired.insert(key)
    }

    pub fn has_fired(&self, key: AlertKey) -> bool {
        self.fired.contains(&key)
    }

    /// Fired keys in declaration order.
    pub fn fired(&self) -> impl Iterator<Item = AlertKey> + '_ {
        self.fired.iter().copied()
    }
}
