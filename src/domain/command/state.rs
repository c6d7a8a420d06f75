use crate::domain::foundation::UserId;

/// Identification state of one connection.
///
/// Starts `Unidentified`; a well-formed `identify` moves it to
/// `Identified`. A later `identify` rebinds the user, and the state never
/// returns to `Unidentified`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Unidentified,
    Identified(UserId),
}

impl ConnectionState {
    /// Records the identified user, returning the previous one if any.
    pub fn identify(&mut self, user_id: UserId) -> Option<UserId> {
        match std::mem::replace(self, ConnectionState::Identified(user_id)) {
            ConnectionState::Identified(previous) => Some(previous),
            ConnectionState::Unidentified => None,
        }
    }

    pub fn user(&self) -> Option<&UserId> {
        match self {
            ConnectionState::Identified(user_id) => Some(user_id),
            ConnectionState::Unidentified => None,
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, ConnectionState::Identified(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn starts_unidentified() {
        let state = ConnectionState::default();
        assert!(!state.is_identified());
        assert!(state.user().is_none());
    }

    #[test]
    fn identify_moves_to_identified() {
        let mut state = ConnectionState::default();
        assert_eq!(state.identify(user("u1")), None);
        assert_eq!(state.user(), Some(&user("u1")));
    }

    #[test]
    fn reidentify_rebinds_and_stays_identified() {
        let mut state = ConnectionState::default();
        state.identify(user("u1"));
        assert_eq!(state.identify(user("u2")), Some(user("u1")));
        assert_eq!(state.user(), Some(&user("u2")));
    }
}
