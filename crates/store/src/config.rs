//! Store configuration from the environment.

use anyhow::Context;

/// Connection settings for the hosted store.
///
/// Absence of the URL is a fatal startup error, not a domain error: the
/// process has nothing to serve without a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
}

impl StoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        Ok(Self { database_url })
    }
}
