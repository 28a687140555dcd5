use anyhow::{anyhow, Context, Result};
use std::env;

use crate::password;

pub const URI_VAR: &str = "MONGO_URI";
pub const DATABASE_VAR: &str = "SEED_DATABASE";
pub const COST_VAR: &str = "SEED_BCRYPT_COST";

pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub store_uri: String,
    pub database: Option<String>,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Reads the process environment. A `.env` file should already be loaded.
    pub fn from_env(uri_override: Option<String>) -> Result<Self> {
        Self::from_lookup(uri_override, |key| env::var(key).ok())
    }

    pub fn from_lookup(
        uri_override: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let store_uri = uri_override
            .or_else(|| lookup(URI_VAR))
            .map(|uri| uri.trim().to_string())
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| anyhow!("{} is not set. Add it to .env or pass --uri", URI_VAR))?;

        let database = lookup(DATABASE_VAR)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let bcrypt_cost = match lookup(COST_VAR) {
            Some(raw) => {
                let cost: u32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a number, got '{}'", COST_VAR, raw))?;
                if !(password::MIN_COST..=password::MAX_COST).contains(&cost) {
                    return Err(anyhow!(
                        "{} must be between {} and {}, got {}",
                        COST_VAR,
                        password::MIN_COST,
                        password::MAX_COST,
                        cost
                    ));
                }
                cost
            }
            None => DEFAULT_BCRYPT_COST,
        };

        Ok(Self {
            store_uri,
            database,
            bcrypt_cost,
        })
    }
}
