//! Cache key derivation for orchestrated reads.
//!
//! Keys are namespaced by the resource tag so that two resources never share
//! an entry, and carry the normalized request parameters so that two requests
//! that resolve to the same slice share one entry.

use crate::record::Id;

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Key for one page of a list, after page/size clamping.
    pub fn page(tag: &str, page: u64, records_per_page: u64) -> String {
        Self::build_composite(&[tag, "page", &page.to_string(), &records_per_page.to_string()])
    }

    /// Key for a single record by identifier.
    pub fn by_id(tag: &str, id: Id) -> String {
        Self::build_composite(&[tag, "id", &id.to_string()])
    }

    /// Key for the unpaginated ordered list.
    pub fn all(tag: &str) -> String {
        Self::build_composite(&[tag, "all"])
    }

    /// Build composite key from multiple parts.
    pub fn build_composite(parts: &[&str]) -> String {
        parts.join(":")
    }

    /// Parse a composite key into parts.
    pub fn parse(key: &str) -> Vec<&str> {
        key.split(':').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key() {
        assert_eq!(CacheKeyBuilder::page("generos", 2, 10), "generos:page:2:10");
    }

    #[test]
    fn test_id_key() {
        assert_eq!(CacheKeyBuilder::by_id("cines", 42), "cines:id:42");
    }

    #[test]
    fn test_all_key() {
        assert_eq!(CacheKeyBuilder::all("generos"), "generos:all");
    }

    #[test]
    fn test_keys_do_not_collide_across_operations() {
        let keys = [
            CacheKeyBuilder::page("generos", 1, 1),
            CacheKeyBuilder::by_id("generos", 1),
            CacheKeyBuilder::all("generos"),
            CacheKeyBuilder::by_id("cines", 1),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_composite_key_parser() {
        let parts = CacheKeyBuilder::parse("generos:page:3:25");
        assert_eq!(parts, vec!["generos", "page", "3", "25"]);
    }
}
