//! Identifier validators.
//!
//! Each validator trims its input (except env values, which are sent
//! verbatim), checks the length bounds, then matches a strict pattern. A
//! failure names the field it was checking.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::{DokkuError, DokkuResult};

/// Same rule Dokku applies to app and service names.
pub static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z][a-z0-9-]*$").expect("valid regex")
});

pub static ENV_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("valid regex")
});

pub static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*$")
        .expect("valid regex")
});

pub static PROCESS_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z][a-z0-9_-]*$").expect("valid regex")
});

/// `512m`, `1`, `2G`.
pub static RESOURCE_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-9]+[a-zA-Z]?$").expect("valid regex")
});

/// Unquoted Postgres identifier. Table names are interpolated into catalog
/// queries, so nothing outside this pattern is accepted.
pub static TABLE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("valid regex")
});

pub const MAX_ENV_VALUE_BYTES: usize = 65_536;
pub const MAX_SCALE_COUNT: u32 = 32;

fn check(
    field: &str,
    raw: &str,
    (min, max): (usize, usize),
    pattern: &Regex,
    hint: &str,
) -> DokkuResult<String> {
    let value = raw.trim();
    if value.len() < min {
        return Err(DokkuError::validation(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    if value.len() > max {
        return Err(DokkuError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    if !pattern.is_match(value) {
        return Err(DokkuError::validation(field, hint));
    }
    Ok(value.to_string())
}

/// # Errors
///
/// Returns `Validation` unless the name is 2–64 chars of `[a-z0-9-]` starting
/// with a letter.
pub fn validate_app_name(raw: &str) -> DokkuResult<String> {
    check(
        "app name",
        raw,
        (2, 64),
        &NAME_RE,
        "Must start with a letter; only lowercase, numbers, hyphens",
    )
}

/// Database services follow the app naming rule.
///
/// # Errors
///
/// Same as [`validate_app_name`].
pub fn validate_database_name(raw: &str) -> DokkuResult<String> {
    check(
        "database name",
        raw,
        (2, 64),
        &NAME_RE,
        "Must start with a letter; only lowercase, numbers, hyphens",
    )
}

/// # Errors
///
/// Returns `Validation` unless the key is UPPER_SNAKE_CASE, 1–256 chars.
pub fn validate_env_key(raw: &str) -> DokkuResult<String> {
    check(
        "environment key",
        raw,
        (1, 256),
        &ENV_KEY_RE,
        "Must be UPPER_SNAKE_CASE",
    )
}

/// Values are sent as-is; only the size is bounded.
///
/// # Errors
///
/// Returns `Validation` when the value exceeds 64 KiB.
pub fn validate_env_value(raw: &str) -> DokkuResult<String> {
    if raw.len() > MAX_ENV_VALUE_BYTES {
        return Err(DokkuError::validation(
            "environment value",
            format!("must be at most {MAX_ENV_VALUE_BYTES} bytes"),
        ));
    }
    Ok(raw.to_string())
}

/// # Errors
///
/// Returns `Validation` for anything that is not a lowercase DNS name.
pub fn validate_domain(raw: &str) -> DokkuResult<String> {
    check("domain", raw, (1, 253), &DOMAIN_RE, "Invalid domain name")
}

/// # Errors
///
/// Returns `Validation` unless the type is 1–32 chars of `[a-z0-9_-]`
/// starting with a letter.
pub fn validate_process_type(raw: &str) -> DokkuResult<String> {
    check(
        "process type",
        raw,
        (1, 32),
        &PROCESS_TYPE_RE,
        "Invalid process type",
    )
}

/// # Errors
///
/// Returns `Validation` unless the value is digits with an optional unit letter.
pub fn validate_resource_value(raw: &str) -> DokkuResult<String> {
    check(
        "resource value",
        raw,
        (1, 16),
        &RESOURCE_VALUE_RE,
        "Invalid resource value (e.g. 512m, 1, 2G)",
    )
}

/// # Errors
///
/// Returns `Validation` when `count` exceeds 32.
pub fn validate_scale_count(count: u32) -> DokkuResult<u32> {
    if count > MAX_SCALE_COUNT {
        return Err(DokkuError::validation(
            "scale count",
            format!("must be between 0 and {MAX_SCALE_COUNT}"),
        ));
    }
    Ok(count)
}

/// A table identifier safe to interpolate into a catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// # Errors
    ///
    /// Returns `Validation` unless `raw` is a plain identifier of 1–63 chars.
    pub fn parse(raw: &str) -> DokkuResult<Self> {
        check("table name", raw, (1, 63), &TABLE_NAME_RE, "Invalid table name").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
