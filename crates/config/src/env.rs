use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Loads configuration from the process environment and, optionally, a
/// key/value file. File values take precedence over the ambient
/// environment, matching the common "local .env overrides shell" rule.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn from_environment() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        self.parse_into(&content)
    }

    pub(crate) fn parse_into(&mut self, content: &str) -> Result<(), ConfigError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some(eq_pos) = line.find('=') else {
                return Err(ConfigError::Malformed(format!(
                    "line {} is not KEY=VALUE",
                    line_num + 1
                )));
            };

            let key = line[..eq_pos].trim();
            if key.is_empty() {
                return Err(ConfigError::Malformed(format!("empty key at line {}", line_num + 1)));
            }
            let value = unquote(line[eq_pos + 1..].trim());
            self.vars.insert(key.to_string(), value);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if value.len() >= 2 && ((bytes[0] == b'"' && bytes[value.len() - 1] == b'"') || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')) {
        return value[1..value.len() - 1].to_string();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_pairs() {
        let mut env = EnvManager::default();
        env.parse_into("KEY1=value1\nKEY2=value2\n").unwrap();
        assert_eq!(env.get("KEY1"), Some("value1"));
        assert_eq!(env.get("KEY2"), Some("value2"));
    }

    #[test]
    fn strips_comments_and_blank_lines() {
        let mut env = EnvManager::default();
        env.parse_into("# a comment\n\nKEY=value\n").unwrap();
        assert_eq!(env.get("KEY"), Some("value"));
    }

    #[test]
    fn unquotes_values() {
        let mut env = EnvManager::default();
        env.parse_into("A=\"with spaces\"\nB='single'\n").unwrap();
        assert_eq!(env.get("A"), Some("with spaces"));
        assert_eq!(env.get("B"), Some("single"));
    }

    #[test]
    fn rejects_malformed_lines() {
        let mut env = EnvManager::default();
        assert!(env.parse_into("NOT_A_PAIR").is_err());
    }
}
