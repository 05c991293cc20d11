use crate::error::CliError;
use engine_core::config::PaginatorConfig;
use std::{collections::HashMap, fs, path::Path, str::FromStr};

pub const DEFAULT_TAKE_VAR: &str = "KEYSET_DEFAULT_TAKE";
pub const TIEBREAKER_VAR: &str = "KEYSET_TIEBREAKER";
pub const MAX_CURSOR_LEN_VAR: &str = "KEYSET_MAX_CURSOR_LEN";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Process environment overlaid with an optional `.env` file.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Loads `KEY=VALUE` lines from `path`. File values win over the
    /// process environment.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {e}", path.display()))
        })?;
        self.parse_env_content(&content)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn database_url(&self) -> Option<&str> {
        self.get(DATABASE_URL_VAR)
    }

    /// Paginator settings, defaulting whatever the environment leaves unset.
    pub fn paginator_config(&self) -> Result<PaginatorConfig, CliError> {
        let mut config = PaginatorConfig::default();
        if let Some(take) = self.parsed(DEFAULT_TAKE_VAR)? {
            config.default_take = take;
        }
        if let Some(tiebreaker) = self.get(TIEBREAKER_VAR) {
            config.tiebreaker = tiebreaker.to_string();
        }
        if let Some(max) = self.parsed(MAX_CURSOR_LEN_VAR)? {
            config.max_cursor_len = max;
        }
        Ok(config)
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, CliError> {
        self.get(key)
            .map(|raw| {
                raw.parse()
                    .map_err(|_| CliError::Config(format!("{key} has an invalid value '{raw}'")))
            })
            .transpose()
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                ))
            })?;

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars.insert(key.to_string(), unquote(value.trim()).to_string());
        }

        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(content: &str) -> EnvManager {
        let mut env = EnvManager::default();
        env.parse_env_content(content).unwrap();
        env
    }

    #[test]
    fn test_parse_env_content() {
        let env = env(r#"
# local overrides
KEYSET_TIEBREAKER="event_id"
DATABASE_URL='postgres://localhost/events'
EMPTY=
        "#);
        assert_eq!(env.get(TIEBREAKER_VAR), Some("event_id"));
        assert_eq!(env.database_url(), Some("postgres://localhost/events"));
        assert_eq!(env.get("EMPTY"), None);
    }

    #[test]
    fn test_invalid_env_line() {
        let mut env = EnvManager::default();
        assert!(matches!(
            env.parse_env_content("NO EQUALS SIGN"),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_paginator_config_from_env() {
        let config = env("KEYSET_DEFAULT_TAKE=25\nKEYSET_MAX_CURSOR_LEN=512")
            .paginator_config()
            .unwrap();
        assert_eq!(config.default_take, 25);
        assert_eq!(config.max_cursor_len, 512);
        assert_eq!(config.tiebreaker, "id");

        assert!(matches!(
            env("KEYSET_DEFAULT_TAKE=ten").paginator_config(),
            Err(CliError::Config(_))
        ));
    }
}
