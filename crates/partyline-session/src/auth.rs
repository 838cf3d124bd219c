//! Bearer-token lookup.
//!
//! Partyline does not log anyone in. Whatever obtained the token (a REST
//! login, a cookie, a config file) hands it over through [`TokenProvider`],
//! which the driver queries on every connect and reconnect attempt.

use std::sync::{Arc, PoisonError, RwLock};

/// Supplies the current auth token, or `None` when signed out.
///
/// Implemented for any `Fn() -> Option<String>` closure.
///
/// # Example
///
/// ```rust
/// use partyline_session::TokenProvider;
///
/// let from_env = || std::env::var("PARTYLINE_TOKEN").ok();
/// let _ = from_env.token();
/// ```
pub trait TokenProvider: Send + Sync + 'static {
    /// Returns the token to present, read fresh on each call.
    fn token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// A token fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// A provider that is always signed out.
    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A token slot shared between the login flow and the session.
///
/// Clones share the same slot: setting the token on one clone is visible
/// to every other, including the one handed to the driver.
#[derive(Debug, Clone, Default)]
pub struct SharedToken {
    slot: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) =
            Some(token.into());
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TokenProvider for SharedToken {
    fn token(&self) -> Option<String> {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token() {
        assert_eq!(StaticToken::new("abc").token().as_deref(), Some("abc"));
        assert_eq!(StaticToken::none().token(), None);
    }

    #[test]
    fn test_shared_token_visible_across_clones() {
        let login = SharedToken::new();
        let session = login.clone();
        assert_eq!(session.token(), None);

        login.set("t1");
        assert_eq!(session.token().as_deref(), Some("t1"));

        login.clear();
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_closure_provider() {
        let provider = || Some("from-closure".to_owned());
        assert_eq!(provider.token().as_deref(), Some("from-closure"));
    }
}
