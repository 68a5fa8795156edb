use std::collections::HashMap;

use crate::form::SearchField;
use crate::identity::UserId;

/// What the next text message from an admin means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    /// The next text is a search query against `SearchField`.
    AwaitingQuery(SearchField),
    /// The next text is relayed to `target`.
    AwaitingReply { target: UserId },
}

/// Pending admin states, one per admin, cleared after one round-trip.
#[derive(Debug, Default)]
pub struct AdminStateStore {
    states: HashMap<UserId, AdminState>,
}

impl AdminStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, admin: UserId, state: AdminState) {
        self.states.insert(admin, state);
    }

    pub fn get(&self, admin: UserId) -> Option<AdminState> {
        self.states.get(&admin).copied()
    }

    /// Removes and returns the pending state.
    pub fn take(&mut self, admin: UserId) -> Option<AdminState> {
        self.states.remove(&admin)
    }

    pub fn clear(&mut self, admin: UserId) {
        self.states.remove(&admin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_state() {
        let mut store = AdminStateStore::new();
        store.set(UserId(1), AdminState::AwaitingReply { target: UserId(9) });
        assert_eq!(
            store.take(UserId(1)),
            Some(AdminState::AwaitingReply { target: UserId(9) })
        );
        assert_eq!(store.get(UserId(1)), None);
    }

    #[test]
    fn test_latest_state_wins() {
        let mut store = AdminStateStore::new();
        store.set(UserId(1), AdminState::AwaitingQuery(SearchField::Phone));
        store.set(UserId(1), AdminState::AwaitingQuery(SearchField::FullName));
        assert_eq!(
            store.get(UserId(1)),
            Some(AdminState::AwaitingQuery(SearchField::FullName))
        );
    }
}
