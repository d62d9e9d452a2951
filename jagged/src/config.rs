/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Library-wide settings.

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable overriding [`Config::display_limit`].
pub const DISPLAY_LIMIT_ENV: &str = "JAGGED_DISPLAY_LIMIT";

/// Environment variable overriding [`Config::check_valid`].
pub const CHECK_VALID_ENV: &str = "JAGGED_CHECK_VALID";

/// `Config` controls how arrays are displayed and how much checking
/// is done when they are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of characters `Display` may use for an array before
    /// eliding the middle with `...`.
    pub display_limit: usize,

    /// Validate every node of a tree when an [`crate::Array`] is
    /// made from it.
    pub check_valid: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::lenient()
    }
}

impl Config {
    // Trust trees as given.
    pub fn lenient() -> Self {
        Self {
            display_limit: 85,
            check_valid: false,
        }
    }

    // Check every tree on construction.
    pub fn strict() -> Self {
        Self {
            check_valid: true,
            ..Self::lenient()
        }
    }

    /// Defaults overridden by `JAGGED_DISPLAY_LIMIT` and
    /// `JAGGED_CHECK_VALID`. Values that fail to parse are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(limit) = parse_var(&lookup, DISPLAY_LIMIT_ENV) {
            config.display_limit = limit;
        }
        if let Some(check) = lookup(CHECK_VALID_ENV).and_then(|v| parse_flag(CHECK_VALID_ENV, &v)) {
            config.check_valid = check;
        }
        tracing::info!(
            display_limit = config.display_limit,
            check_valid = config.check_valid,
            "loaded configuration from environment"
        );
        config
    }

    /// The process-wide configuration, read from the environment on
    /// first use.
    pub fn global() -> &'static Config {
        static GLOBAL: OnceLock<Config> = OnceLock::new();
        GLOBAL.get_or_init(Config::from_env)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = lookup(name)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::error!("failed to override config from value \"{}\" in ${}: {}", value, name, e);
            None
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => {
            tracing::error!("failed to override config from value \"{}\" in ${}: not a flag", value, name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Config::default(), Config::lenient());
        assert_eq!(Config::default().display_limit, 85);
        assert!(Config::strict().check_valid);
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (DISPLAY_LIMIT_ENV, " 40 "),
            (CHECK_VALID_ENV, "TRUE"),
        ]));
        assert_eq!(config.display_limit, 40);
        assert!(config.check_valid);

        // Bad values leave the defaults in place.
        let config = Config::from_lookup(lookup(&[
            (DISPLAY_LIMIT_ENV, "wide"),
            (CHECK_VALID_ENV, "sometimes"),
        ]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_serde_defaults() {
        let config: Config = serde_json::from_str(r#"{"check_valid": true}"#).unwrap();
        assert_eq!(config, Config::strict());
    }
}
