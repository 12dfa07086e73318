use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;
use regex::Regex;

use crate::env::EnvManager;
use crate::error::ConfigError;

/// The recognized configuration surface. Every key is optional except
/// the source credentials; everything else falls back to a sane default
/// for a local single-node deployment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source_addr: String,
    pub source_user: String,
    pub source_pass: String,
    pub source_flavor: String,
    pub source_client_id: u32,
    pub store_uri: String,
    pub store_db: String,
    pub store_events_coll: String,
    pub store_offsets_coll: String,
    pub include_regex: Option<Regex>,
    pub exclude_regex: Option<Regex>,
    pub tz: Option<Tz>,
}

impl Settings {
    /// Loads from the process environment, optionally overridden by a
    /// key/value file. Any missing credential or unparseable value is
    /// `FatalConfig` — the process must not start the reader.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut env = EnvManager::from_environment();
        if let Some(path) = env_file {
            env.load_from_file(path)?;
        }
        Self::from_env(&env)
    }

    fn from_env(env: &EnvManager) -> Result<Self, ConfigError> {
        let source_user = required(env, "SOURCE_USER")?;
        let source_pass = required(env, "SOURCE_PASS")?;

        let source_client_id = match env.get("SOURCE_CLIENT_ID") {
            Some(raw) => raw.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                key: "SOURCE_CLIENT_ID",
                detail: e.to_string(),
            })?,
            None => 1001,
        };

        let tz = match env.get("TZ") {
            Some(raw) => Some(Tz::from_str(raw).map_err(|e| ConfigError::InvalidValue { key: "TZ", detail: e })?),
            None => None,
        };

        let include_regex = compile_optional(env, "INCLUDE_REGEX")?;
        let exclude_regex = compile_optional(env, "EXCLUDE_REGEX")?;

        Ok(Self {
            source_addr: env.get("SOURCE_ADDR").unwrap_or("127.0.0.1:3306").to_string(),
            source_user,
            source_pass,
            source_flavor: env.get("SOURCE_FLAVOR").unwrap_or("mysql").to_string(),
            source_client_id,
            store_uri: env.get("STORE_URI").unwrap_or("mongodb://127.0.0.1:27017").to_string(),
            store_db: env.get("STORE_DB").unwrap_or("cdc").to_string(),
            store_events_coll: env.get("STORE_EVENTS_COLL").unwrap_or("events").to_string(),
            store_offsets_coll: env.get("STORE_OFFSETS_COLL").unwrap_or("offsets").to_string(),
            include_regex,
            exclude_regex,
            tz,
        })
    }
}

fn required(env: &EnvManager, key: &'static str) -> Result<String, ConfigError> {
    env.get(key).map(str::to_string).ok_or(ConfigError::Missing(key))
}

fn compile_optional(env: &EnvManager, key: &'static str) -> Result<Option<Regex>, ConfigError> {
    match env.get(key) {
        Some(raw) => Regex::new(raw)
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue { key, detail: e.to_string() }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &[(&str, &str)]) -> EnvManager {
        let mut env = EnvManager::default();
        let content: String = pairs.iter().map(|(k, v)| format!("{k}={v}\n")).collect();
        env.parse_into(&content).unwrap();
        env
    }

    #[test]
    fn missing_credentials_is_fatal() {
        let env = env_with(&[]);
        let err = Settings::from_env(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SOURCE_USER")));
    }

    #[test]
    fn defaults_fill_in_optional_keys() {
        let env = env_with(&[("SOURCE_USER", "repl"), ("SOURCE_PASS", "secret")]);
        let settings = Settings::from_env(&env).unwrap();
        assert_eq!(settings.source_addr, "127.0.0.1:3306");
        assert_eq!(settings.store_db, "cdc");
        assert!(settings.tz.is_none());
    }

    #[test]
    fn invalid_client_id_is_fatal() {
        let env = env_with(&[("SOURCE_USER", "repl"), ("SOURCE_PASS", "secret"), ("SOURCE_CLIENT_ID", "not-a-number")]);
        assert!(Settings::from_env(&env).is_err());
    }
}
