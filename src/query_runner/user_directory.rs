use crate::card_catalog::{InMemoryCatalog, UserRecord};

/// Looks up team members by login for result formatting.
pub trait UserDirectory: Send + Sync {
    fn find_by_login(&self, login: &str) -> Option<UserRecord>;
}

impl UserDirectory for InMemoryCatalog {
    fn find_by_login(&self, login: &str) -> Option<UserRecord> {
        self.users()
            .iter()
            .find(|user| user.login.eq_ignore_ascii_case(login))
            .cloned()
    }
}

impl UserDirectory for Vec<UserRecord> {
    fn find_by_login(&self, login: &str) -> Option<UserRecord> {
        self.iter()
            .find(|user| user.login.eq_ignore_ascii_case(login))
            .cloned()
    }
}
