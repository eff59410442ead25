//! Environment lookups shared by service configs.
//!
//! Every helper takes a lookup function instead of reading the process
//! environment directly, so configs can be parsed from a plain map in tests.

use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context as _, anyhow};

/// Reads from the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub fn required<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("missing required environment variable {key}"))
}

pub fn optional_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Parses `key` when set, otherwise returns `default`. A value that is set
/// but does not parse is an error rather than a silent fallback.
pub fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| anyhow!("{e}"))
            .with_context(|| format!("invalid value {raw:?} for {key}")),
    }
}
