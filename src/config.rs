use crate::pagination::DEFAULT_PAGE_SIZE;
use anyhow::Context;
use std::num::NonZeroU32;
use std::str::FromStr;

#[derive(Debug)]
pub struct Config {
    database_url: String,
    server_port: u16,
    page_size: NonZeroU32,
}

impl Config {
    /// Reads `DATABASE_URL` and `SERVER_PORT`, plus `PAGE_SIZE` when set.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = load_env("DATABASE_URL")?;
        let server_port = load_env("SERVER_PORT")?;
        let page_size = load_env_or("PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        Ok(Self {
            database_url,
            server_port,
            page_size,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }

    #[must_use]
    pub const fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }
}

fn load_env<T>(key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let val =
        std::env::var(key).with_context(|| format!("Failed to load environment variable {key}"))?;
    parse_env(key, &val)
}

fn load_env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(val) => parse_env(key, &val),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to load environment variable {key}"))
        }
    }
}

fn parse_env<T>(key: &str, val: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    val.parse::<T>()
        .with_context(|| format!("Failed to parse environment variable {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_must_be_positive() {
        assert_eq!(
            parse_env::<NonZeroU32>("PAGE_SIZE", "25").unwrap().get(),
            25
        );
        assert!(parse_env::<NonZeroU32>("PAGE_SIZE", "0").is_err());
        assert!(parse_env::<NonZeroU32>("PAGE_SIZE", "ten").is_err());
    }

    #[test]
    fn parse_error_names_the_variable() {
        let err = parse_env::<u16>("SERVER_PORT", "http").unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse environment variable SERVER_PORT");
    }
}
