use crate::errors::Result;

pub mod sqlite;

/// Trait hiding where the session token is persisted
///
/// The CLI keeps the token in a SQLite file so that a login survives between invocations;
/// tests use the in-memory mock. Both are swappable without touching the API client.
pub trait TokenStore: Send {
    /// Return the stored token, if any
    fn load(&self) -> Result<Option<String>>;

    /// Persist `token`, replacing any previous one
    fn save(&mut self, token: &str) -> Result<()>;

    /// Forget the token. Clearing an empty store is not an error.
    fn clear(&mut self) -> Result<()>;
}

pub mod mock {

    use super::*;

    #[derive(Debug, Default, Clone)]
    pub struct MemoryStore(Option<String>);

    impl MemoryStore {
        pub fn new() -> Self {
            MemoryStore(None)
        }

        pub fn with_token(token: &str) -> Self {
            MemoryStore(Some(token.to_string()))
        }
    }

    impl TokenStore for MemoryStore {
        fn load(&self) -> Result<Option<String>> {
            Ok(self.0.clone())
        }

        fn save(&mut self, token: &str) -> Result<()> {
            self.0 = Some(token.to_string());
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            self.0 = None;
            Ok(())
        }
    }

}
