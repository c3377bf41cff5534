use crate::enrich::EnrichmentEngine;
use crate::error::ApiError;
use crate::models::{
    AddItemRequest, EnrichedItem, ListItem, MessageResponse, RemoveItemRequest,
};
use rocket::State;
use rocket::serde::json::Json;
use rocket::{get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Add a movie or TV show to the user's list.
///
/// The list row is created on first add. The existence check and the append
/// run in one transaction with a conditional insert, so concurrent adds for
/// the same (user, content) pair cannot produce duplicates.
#[openapi(tag = "My List")]
#[post("/add", data = "<request>")]
pub async fn add_list_item(
    request: Json<AddItemRequest>,
    pool: &State<PgPool>,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = request.into_inner();

    let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(request.user_id)
        .fetch_one(pool.inner())
        .await?;
    if !user_exists {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let mut tx = pool.inner().begin().await?;

    sqlx::query("INSERT INTO user_lists (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(request.user_id)
        .execute(&mut *tx)
        .await?;

    let inserted = sqlx::query(
        r#"INSERT INTO user_list_items (user_id, content_id, item_type)
           VALUES ($1, $2, $3)
           ON CONFLICT (user_id, content_id) DO NOTHING"#,
    )
    .bind(request.user_id)
    .bind(request.content_id)
    .bind(request.item_type)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(ApiError::Duplicate(
            "Item already exists in the user's list".to_string(),
        ));
    }

    tx.commit().await?;

    Ok(Json(MessageResponse {
        message: "Item added to the user's list successfully".to_string(),
    }))
}

/// Remove an item from the user's list. Idempotent: removing a content id
/// that is not in the list still succeeds.
#[openapi(tag = "My List")]
#[post("/remove", data = "<request>")]
pub async fn remove_list_item(
    request: Json<RemoveItemRequest>,
    pool: &State<PgPool>,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = request.into_inner();

    sqlx::query("DELETE FROM user_list_items WHERE user_id = $1 AND content_id = $2")
        .bind(request.user_id)
        .bind(request.content_id)
        .execute(pool.inner())
        .await?;

    Ok(Json(MessageResponse {
        message: "Item removed from the user's list successfully".to_string(),
    }))
}

/// Retrieve one page of the user's list, enriched with content details.
///
/// Items come back in insertion order; a page past the end of the list is an
/// empty array, not an error. 404 only when the user has no list at all.
#[openapi(tag = "My List")]
#[get("/list/<user_id>?<page>&<limit>")]
pub async fn list_items(
    user_id: Uuid,
    page: Option<i64>,
    limit: Option<i64>,
    pool: &State<PgPool>,
    engine: &State<Arc<EnrichmentEngine>>,
) -> Result<Json<Vec<EnrichedItem>>, ApiError> {
    let list_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM user_lists WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(pool.inner())
            .await?;
    if !list_exists {
        return Err(ApiError::NotFound("User list not found".to_string()));
    }

    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(10).max(1);
    let offset = (page - 1) * limit;

    let items: Vec<ListItem> = sqlx::query_as(
        r#"SELECT content_id, item_type
           FROM user_list_items
           WHERE user_id = $1
           ORDER BY id ASC
           LIMIT $2 OFFSET $3"#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool.inner())
    .await?;

    let enriched = engine.enrich(items).await?;

    Ok(Json(enriched))
}
