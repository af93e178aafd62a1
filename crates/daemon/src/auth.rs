use std::collections::{BTreeMap, HashMap};

use common::auth::{Authorizer, Session};

/// Name of the cookie carrying a session credential.
pub const SESSION_COOKIE: &str = "privy_session";

/// Authorizer backed by the static credential table from the config file.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthorizer {
    sessions: HashMap<String, Session>,
}

impl TokenAuthorizer {
    pub fn new(sessions: &BTreeMap<String, Session>) -> Self {
        Self {
            sessions: sessions
                .iter()
                .filter(|(token, _)| !token.trim().is_empty())
                .map(|(token, session)| (token.trim().to_string(), session.clone()))
                .collect(),
        }
    }
}

impl Authorizer for TokenAuthorizer {
    fn session(&self, credential: Option<&str>) -> Option<Session> {
        let credential = credential?.trim();
        if credential.is_empty() {
            return None;
        }
        self.sessions.get(credential).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use common::auth::Role;

    fn authorizer() -> TokenAuthorizer {
        let mut sessions = BTreeMap::new();
        sessions.insert("admin-token".to_string(), Session::new("ops", Role::Administrator));
        sessions.insert("member-token".to_string(), Session::new("jane", Role::Member));
        sessions.insert(" ".to_string(), Session::new("blank", Role::Administrator));
        TokenAuthorizer::new(&sessions)
    }

    #[test]
    fn test_known_credentials() {
        let authorizer = authorizer();
        assert_eq!(
            authorizer.session(Some("admin-token")).unwrap().role,
            Role::Administrator
        );
        assert_eq!(authorizer.session(Some("member-token")).unwrap().subject, "jane");
    }

    #[test]
    fn test_missing_blank_and_unknown_credentials() {
        let authorizer = authorizer();
        assert!(authorizer.session(None).is_none());
        assert!(authorizer.session(Some("")).is_none());
        assert!(authorizer.session(Some("  ")).is_none());
        assert!(authorizer.session(Some("guess")).is_none());
    }
}
