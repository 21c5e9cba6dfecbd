use super::error::{PostgrestDaoError, PostgrestResult};

/// Runtime configuration describing how to reach a PostgREST (Supabase) endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project URL, without the `/rest/v1` suffix.
    pub base_url: String,
    /// Key sent both as `apikey` and as bearer token.
    pub api_key: String,
    /// Capacity of the local change feed.
    pub feed_capacity: usize,
}

impl PostgrestConfig {
    /// Construct a configuration from explicit project URL and key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            feed_capacity: 32,
        }
    }

    /// Override the change feed capacity.
    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> PostgrestResult<Self> {
        let base_url = read_var("SUPABASE_URL")?;
        let api_key = read_var("SUPABASE_ANON_KEY")?;
        Ok(Self::new(base_url, api_key))
    }

    /// Whether the environment selects this backend at all.
    pub fn is_configured() -> bool {
        std::env::var_os("SUPABASE_URL").is_some_and(|value| !value.is_empty())
    }
}

fn read_var(var: &'static str) -> PostgrestResult<String> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(PostgrestDaoError::MissingEnvVar { var })
}
