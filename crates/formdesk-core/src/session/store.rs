use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::model::Session;
use crate::form::FormFlow;
use crate::identity::UserId;

/// Active questionnaire sessions keyed by identity.
///
/// Owned by the single message-dispatch context, so it is mutated through
/// `&mut self` and needs no lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<UserId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh session, discarding any session in progress.
    pub fn start(&mut self, user_id: UserId, flow: &FormFlow) -> &mut Session {
        let session = Session::new(user_id, flow);
        match self.sessions.entry(user_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<&Session> {
        self.sessions.get(&user_id)
    }

    pub fn get_mut(&mut self, user_id: UserId) -> Option<&mut Session> {
        self.sessions.get_mut(&user_id)
    }

    /// Removes the session; returns whether one existed.
    pub fn clear(&mut self, user_id: UserId) -> bool {
        self.sessions.remove(&user_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormStep;
    use crate::session::StepInput;

    #[test]
    fn test_restart_discards_progress() {
        let flow = FormFlow::default();
        let mut store = SessionStore::new();
        store
            .start(UserId(1), &flow)
            .advance(&flow, StepInput::Text("Казахстан".into()));
        assert_eq!(store.get(UserId(1)).unwrap().step, FormStep::Age);

        store.start(UserId(1), &flow);
        let session = store.get(UserId(1)).unwrap();
        assert_eq!(session.step, FormStep::Citizenship);
        assert!(session.answers.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear() {
        let flow = FormFlow::default();
        let mut store = SessionStore::new();
        store.start(UserId(2), &flow);
        assert!(store.clear(UserId(2)));
        assert!(!store.clear(UserId(2)));
        assert!(store.is_empty());
    }
}
