use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = chama_common::id::prefixed_ulid("chm");
/// assert!(id.starts_with("chm_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const USER: &str = "usr";
    pub const CHAMA: &str = "chm";
    pub const MEMBERSHIP: &str = "mem";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_ulid_format() {
        let id = prefixed_ulid(prefix::CHAMA);
        assert!(id.starts_with("chm_"));
        // ULID is 26 chars, plus prefix + underscore
        assert_eq!(id.len(), 4 + 26);
    }

    #[test]
    fn test_uniqueness() {
        let a = prefixed_ulid(prefix::USER);
        let b = prefixed_ulid(prefix::USER);
        assert_ne!(a, b);
    }
}
