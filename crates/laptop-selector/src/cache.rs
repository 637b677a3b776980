/// Redis caching layer for catalog reads.
///
/// Every lookup returns `Option<T>`; a miss (or an unreachable Redis) sends the
/// caller to the hosted database.
///
/// Key schema:
/// - `lsel:v1:laptops`: JSON Vec<LaptopRow> (TTL, dropped on admin writes)
/// - `lsel:v1:programs`: JSON Vec<ProgramReq> (TTL)
/// - `lsel:v1:program-search:{sha256(query|limit)}`: JSON Vec<ProgramReq> (TTL)
use std::time::Duration;

use sha2::{Digest, Sha256};

use selector_common::model::{LaptopRow, ProgramReq};
use selector_common::redis::RedisCache;

const KEY_PREFIX: &str = "lsel:v1:";

#[derive(Clone)]
pub struct CatalogCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl CatalogCache {
    pub fn new(redis: RedisCache, ttl: Duration) -> Self {
        Self {
            redis,
            ttl_secs: ttl.as_secs().max(1),
        }
    }

    pub fn disabled() -> Self {
        Self::new(RedisCache::disabled(), Duration::from_secs(1))
    }

    pub async fn is_available(&self) -> bool {
        self.redis.is_available().await
    }

    pub async fn get_laptops(&self) -> Option<Vec<LaptopRow>> {
        self.redis.get_json(&laptops_key()).await
    }

    pub async fn set_laptops(&self, laptops: &[LaptopRow]) {
        self.redis
            .set_json(&laptops_key(), laptops, self.ttl_secs)
            .await;
    }

    pub async fn get_programs(&self) -> Option<Vec<ProgramReq>> {
        self.redis.get_json(&programs_key()).await
    }

    pub async fn set_programs(&self, programs: &[ProgramReq]) {
        self.redis
            .set_json(&programs_key(), programs, self.ttl_secs)
            .await;
    }

    pub async fn get_program_search(&self, query: &str, limit: u32) -> Option<Vec<ProgramReq>> {
        self.redis.get_json(&program_search_key(query, limit)).await
    }

    pub async fn set_program_search(&self, query: &str, limit: u32, programs: &[ProgramReq]) {
        self.redis
            .set_json(&program_search_key(query, limit), programs, self.ttl_secs)
            .await;
    }

    /// Drop the cached laptop list after the `laptops` table changed.
    pub async fn invalidate_laptops(&self) {
        self.redis.delete(&laptops_key()).await;
    }
}

fn laptops_key() -> String {
    format!("{KEY_PREFIX}laptops")
}

fn programs_key() -> String {
    format!("{KEY_PREFIX}programs")
}

/// Case-insensitive: "Blender" and "blender" share an entry.
fn program_search_key(query: &str, limit: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(limit.to_string().as_bytes());
    format!("{KEY_PREFIX}program-search:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_keys_are_namespaced_and_normalised() {
        let a = program_search_key("Blender", 20);
        let b = program_search_key("  blender ", 20);
        let c = program_search_key("blender", 10);
        assert!(a.starts_with("lsel:v1:program-search:"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 64 hex chars of SHA-256
        assert_eq!(a.len(), "lsel:v1:program-search:".len() + 64);
    }

    #[tokio::test]
    async fn disabled_cache_misses() {
        let cache = CatalogCache::disabled();
        cache.set_laptops(&[]).await;
        assert!(cache.get_laptops().await.is_none());
        assert!(cache.get_program_search("x", 1).await.is_none());
        assert!(!cache.is_available().await);
    }
}
