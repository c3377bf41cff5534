//! List enrichment: read-through detail resolution for list pages.
//!
//! The engine takes one page of list items (already sliced in insertion
//! order by the route) and attaches each item's [`ContentDetail`]. Lookups
//! go cache-first; on miss the resolver queries the content store and the
//! serialized result is written back to the cache from a detached task.
//! Items resolve concurrently but the output always keeps the input order.
//!
//! Failure policy: a cache error on any path is logged and the request
//! proceeds (the cache is an optimization, never a correctness dependency);
//! a content store error fails the whole page. A missing content record is
//! not an error at all, the item just carries null details.

use crate::cache::DetailCache;
use crate::error::ApiError;
use crate::models::{ContentDetail, EnrichedItem, ItemType, ListItem, Movie, TvShow};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("content store query failed: {0}")]
    Store(#[from] sqlx::Error),
    #[error("enrichment task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<EnrichError> for ApiError {
    fn from(err: EnrichError) -> Self {
        match err {
            EnrichError::Store(e) => ApiError::DatabaseError(e),
            EnrichError::Task(e) => {
                ApiError::InternalError(format!("enrichment task failed: {}", e))
            }
        }
    }
}

/// Produces the normalized detail record for a piece of content, straight
/// from the store. No caching here; that is the engine's job.
///
/// `Ok(None)` means the content does not exist (deleted or never created)
/// and is deliberately distinct from `Err`, which signals a store failure.
#[rocket::async_trait]
pub trait ContentResolver: Send + Sync {
    async fn resolve(
        &self,
        content_id: Uuid,
        item_type: ItemType,
    ) -> Result<Option<ContentDetail>, sqlx::Error>;
}

/// Resolver backed by the Postgres content store.
pub struct PgContentResolver {
    pool: PgPool,
}

impl PgContentResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl ContentResolver for PgContentResolver {
    async fn resolve(
        &self,
        content_id: Uuid,
        item_type: ItemType,
    ) -> Result<Option<ContentDetail>, sqlx::Error> {
        match item_type {
            ItemType::Movie => {
                let movie: Option<Movie> = sqlx::query_as(
                    r#"SELECT id, title, description, genres, release_date, director, actors
                       FROM movies
                       WHERE id = $1"#,
                )
                .bind(content_id)
                .fetch_optional(&self.pool)
                .await?;

                Ok(movie.map(ContentDetail::from))
            }
            ItemType::TvShow => {
                let show: Option<TvShow> = sqlx::query_as(
                    r#"SELECT id, title, description, genres, episodes
                       FROM tv_shows
                       WHERE id = $1"#,
                )
                .bind(content_id)
                .fetch_optional(&self.pool)
                .await?;

                Ok(show.map(ContentDetail::from))
            }
        }
    }
}

/// Read-through enrichment over a shared detail cache.
pub struct EnrichmentEngine {
    resolver: Arc<dyn ContentResolver>,
    cache: Arc<dyn DetailCache>,
    ttl: Duration,
}

impl EnrichmentEngine {
    pub fn new(
        resolver: Arc<dyn ContentResolver>,
        cache: Arc<dyn DetailCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            resolver,
            cache,
            ttl,
        }
    }

    /// Resolve details for every item of a page, concurrently, returning
    /// results in the input order regardless of per-item timing.
    pub async fn enrich(&self, items: Vec<ListItem>) -> Result<Vec<EnrichedItem>, EnrichError> {
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let resolver = Arc::clone(&self.resolver);
            let cache = Arc::clone(&self.cache);
            let ttl = self.ttl;
            handles.push(tokio::spawn(enrich_item(resolver, cache, ttl, item)));
        }

        // Joining in spawn order reassembles the original slice order.
        let mut enriched = Vec::with_capacity(handles.len());
        for handle in handles {
            enriched.push(handle.await??);
        }

        Ok(enriched)
    }
}

async fn enrich_item(
    resolver: Arc<dyn ContentResolver>,
    cache: Arc<dyn DetailCache>,
    ttl: Duration,
    item: ListItem,
) -> Result<EnrichedItem, EnrichError> {
    let key = item.content_id.to_string();

    match cache.get(&key).await {
        // Cache hit. The blob is the serialized Option<ContentDetail>, so a
        // resolved-to-missing item is a hit too and skips the store.
        Ok(Some(raw)) => match serde_json::from_str::<Option<ContentDetail>>(&raw) {
            Ok(details) => {
                return Ok(EnrichedItem {
                    content_id: item.content_id,
                    item_type: item.item_type,
                    details,
                });
            }
            Err(e) => {
                log::warn!("discarding undecodable cache entry for {}: {}", key, e);
            }
        },
        Ok(None) => {}
        // Unreachable cache reads as a miss; the store answers instead.
        Err(e) => {
            log::warn!(
                "detail cache read failed for {}, falling back to store: {}",
                key,
                e
            );
        }
    }

    let details = resolver.resolve(item.content_id, item.item_type).await?;

    // Fire-and-forget cache population. The write may outlive this request;
    // its failure is logged and never surfaced to the caller.
    match serde_json::to_string(&details) {
        Ok(payload) => {
            let write_key = key;
            tokio::spawn(async move {
                if let Err(e) = cache.set_with_expiry(&write_key, payload, ttl).await {
                    log::warn!("detail cache write failed for {}: {}", write_key, e);
                }
            });
        }
        Err(e) => {
            log::warn!("failed to serialize details for {}: {}", key, e);
        }
    }

    Ok(EnrichedItem {
        content_id: item.content_id,
        item_type: item.item_type,
        details,
    })
}
