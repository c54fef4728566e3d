/// Cache keys for the domain client's TTL cache.
pub mod keys {
    /// Enriched apps list
    /// Value: Vec<AppInfo>
    pub const APPS_LIST: &str = "apps:list";

    /// Every app-derived entry; invalidated after any app-scoped mutation.
    pub const APPS_PREFIX: &str = "apps:";

    /// Postgres services with their links
    /// Value: Vec<DatabaseInfo>
    pub const POSTGRES_LIST: &str = "postgres:list";

    /// Every database-derived entry; invalidated after database mutations.
    pub const POSTGRES_PREFIX: &str = "postgres:";
}

/// TTL constants
pub mod ttl {
    /// Default lifetime of a cached report (2 minutes)
    pub const DEFAULT_SECS: u64 = 120;
}

/// Returns true when `key` falls under `prefix`, the rule used for bulk invalidation.
#[must_use]
pub fn under_prefix(key: &str, prefix: &str) -> bool {
    key.starts_with(prefix)
}
