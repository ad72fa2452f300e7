use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = parlor_common::id::prefixed_ulid("cn");
/// assert!(id.starts_with("cn_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    /// A single gateway connection.
    pub const CONNECTION: &str = "cn";
}
