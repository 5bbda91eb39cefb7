//! Environment overrides shared by the agent and server configs.

use std::env::VarError;

#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {name}: {reason}")]
pub struct EnvError {
    pub name: &'static str,
    pub value: String,
    pub reason: &'static str,
}

fn var(name: &'static str) -> Result<Option<String>, EnvError> {
    match std::env::var(name) {
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(EnvError {
            name,
            value: String::new(),
            reason: "not valid unicode",
        }),
    }
}

/// Overwrites `target` when `name` is set.
pub fn override_string(name: &'static str, target: &mut String) -> Result<(), EnvError> {
    if let Some(v) = var(name)? {
        *target = v;
    }
    Ok(())
}

pub fn override_bool(name: &'static str, target: &mut bool) -> Result<(), EnvError> {
    if let Some(v) = var(name)? {
        *target = parse_bool(&v).ok_or(EnvError {
            name,
            value: v,
            reason: "expected true or false",
        })?;
    }
    Ok(())
}

pub fn override_u32(name: &'static str, target: &mut u32) -> Result<(), EnvError> {
    if let Some(v) = var(name)? {
        *target = v.trim().parse().map_err(|_| EnvError {
            name,
            value: v,
            reason: "expected a positive integer",
        })?;
    }
    Ok(())
}

/// Overwrites `target` with an interval in seconds.
pub fn override_secs(name: &'static str, target: &mut u64) -> Result<(), EnvError> {
    if let Some(v) = var(name)? {
        *target = parse_secs(&v).ok_or(EnvError {
            name,
            value: v,
            reason: "expected seconds, optionally suffixed with s, m or h",
        })?;
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" => Some(true),
        "0" | "false" | "f" | "no" => Some(false),
        _ => None,
    }
}

/// Parses `"300"`, `"300s"`, `"5m"` or `"1h"` into seconds.
///
/// # Examples
///
/// ```
/// use pulse_common::env::parse_secs;
///
/// assert_eq!(parse_secs("10s"), Some(10));
/// assert_eq!(parse_secs("5m"), Some(300));
/// assert_eq!(parse_secs("2"), Some(2));
/// assert_eq!(parse_secs("soon"), None);
/// ```
pub fn parse_secs(value: &str) -> Option<u64> {
    let value = value.trim();
    let (number, scale) = match value.char_indices().last()? {
        (i, 's') => (&value[..i], 1),
        (i, 'm') => (&value[..i], 60),
        (i, 'h') => (&value[..i], 3600),
        _ => (value, 1),
    };
    number.parse::<u64>().ok()?.checked_mul(scale)
}
