use std::env;

/// Default PocketBase URL for a local development instance.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";
/// Collection holding the match records.
const DEFAULT_COLLECTION: &str = "volleyball_matches";

/// Runtime configuration describing how to connect to PocketBase.
#[derive(Debug, Clone)]
pub struct PocketBaseConfig {
    /// Base URL of the PocketBase instance.
    pub base_url: String,
    /// Name of the match collection.
    pub collection: String,
    /// Optional auth token sent with every request.
    pub auth_token: Option<String>,
}

impl PocketBaseConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            collection: DEFAULT_COLLECTION.into(),
            auth_token: None,
        }
    }

    /// Build a configuration from environment variables, defaulting to the
    /// local development instance when unset.
    pub fn from_env() -> Self {
        let base_url =
            env::var("POCKETBASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let collection =
            env::var("POCKETBASE_COLLECTION").unwrap_or_else(|_| DEFAULT_COLLECTION.to_string());
        let auth_token = env::var("POCKETBASE_TOKEN").ok().filter(|t| !t.is_empty());

        Self {
            base_url,
            collection,
            auth_token,
        }
    }
}
