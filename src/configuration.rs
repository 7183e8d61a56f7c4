use std::{env, fs, io::ErrorKind, ops::Deref, sync::Arc, time::Duration};

use crate::error::Error;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 120;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RANGE_DAYS: i64 = 14;
pub const DEFAULT_RANGE_DEBOUNCE_MS: u64 = 300;

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub environment: String,
    pub cache_ttl: Duration,
    pub timeout: u64,
    pub default_range_days: i64,
    pub range_debounce: Duration,
    pub user_subgraph_urls: Vec<String>,
}

impl Config {
    /// Builds a config pointing at `base_url` with every other field at its
    /// default.
    pub fn with_base_url(base_url: &str) -> Config {
        Config {
            base_url: base_url.trim_end_matches('/').to_owned(),
            environment: String::from("development"),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            timeout: DEFAULT_TIMEOUT_SECS,
            default_range_days: DEFAULT_RANGE_DAYS,
            range_debounce: Duration::from_millis(DEFAULT_RANGE_DEBOUNCE_MS),
            user_subgraph_urls: vec![],
        }
    }

    pub fn get_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    let base_url = var_with_fallback("BASE_URL", "VITE_BASE_URL")?
        .ok_or_else(|| {
            Error::ConfigurationError(String::from("BASE_URL is not set"))
        })?;
    let environment = var_with_fallback("ENVIRONMENT", "VITE_ENVIRONMENT")?
        .unwrap_or_else(|| String::from("development"));

    let cache_ttl_secs: u64 =
        parse_or_default("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
    let timeout = parse_or_default("TIMEOUT", DEFAULT_TIMEOUT_SECS)?;
    let default_range_days =
        parse_or_default("DEFAULT_RANGE_DAYS", DEFAULT_RANGE_DAYS)?;
    let range_debounce_ms =
        parse_or_default("RANGE_DEBOUNCE_MS", DEFAULT_RANGE_DEBOUNCE_MS)?;

    let user_subgraph_urls = match optional_var("USER_SUBGRAPH_URLS")? {
        Some(urls) => parse_list(&urls),
        None => vec![],
    };

    if default_range_days < 0 {
        return Err(Error::ConfigurationError(format!(
            "DEFAULT_RANGE_DAYS must not be negative, got {}",
            default_range_days
        )));
    }

    let config = Config {
        base_url: base_url.trim_end_matches('/').to_owned(),
        environment,
        cache_ttl: Duration::from_secs(cache_ttl_secs),
        timeout,
        default_range_days,
        range_debounce: Duration::from_millis(range_debounce_ms),
        user_subgraph_urls,
    };

    Ok(config)
}

/// Loads `.env` from the working directory into the process environment.
/// A missing file is not an error; variables already set win.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";

    match fs::read_to_string(config_file) {
        Ok(config_string) => {
            parse_config_string(config_string);
            Ok(())
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

fn parse_config_string(config: String) {
    for (key, value) in parse_env_lines(&config) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

fn parse_env_lines(config: &str) -> Vec<(String, String)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_at(line.find('=')?);
            let value = value[1..].trim().trim_matches('"');
            Some((key.trim().to_owned(), value.to_owned()))
        })
        .collect()
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect()
}

fn optional_var(key: &str) -> Result<Option<String>, Error> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::VAR(e)),
    }
}

fn var_with_fallback(
    key: &str,
    fallback: &str,
) -> Result<Option<String>, Error> {
    match optional_var(key)? {
        Some(value) => Ok(Some(value)),
        None => optional_var(fallback),
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, Error>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match optional_var(key)? {
        Some(value) => Ok(value.trim().parse()?),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_lines() {
        let config = "\
# comment
BASE_URL=https://api.example.com/
ENVIRONMENT=\"staging\"

USER_SUBGRAPH_URLS=https://a.example/graphql,https://b.example/graphql
BROKEN_LINE
";
        let pairs = parse_env_lines(config);
        assert_eq!(
            pairs,
            vec![
                (
                    String::from("BASE_URL"),
                    String::from("https://api.example.com/")
                ),
                (String::from("ENVIRONMENT"), String::from("staging")),
                (
                    String::from("USER_SUBGRAPH_URLS"),
                    String::from(
                        "https://a.example/graphql,https://b.example/graphql"
                    )
                ),
            ]
        );
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(
            parse_list(" a , ,b,"),
            vec![String::from("a"), String::from("b")]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let config = Config::with_base_url("https://api.example.com/");
        assert_eq!(
            config.get_url("dashboard/tvl"),
            "https://api.example.com/dashboard/tvl"
        );
        assert_eq!(config.cache_ttl, Duration::from_secs(120));
        assert!(!config.is_production());
    }
}
