use crate::error::ApiError;
use crate::models::{RecordCollection, RecordType};
use rocket::State;
use rocket::get;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use sqlx::PgPool;

/// Fetch every record of a given type: `user`, `movie` or `tv-show`.
///
/// The path segment is validated against the closed [`RecordType`] set; any
/// other value is a 400, matching the public contract.
#[openapi(tag = "Catalog")]
#[get("/<record_type>")]
pub async fn list_records(
    record_type: &str,
    pool: &State<PgPool>,
) -> Result<Json<RecordCollection>, ApiError> {
    let Ok(record_type) = record_type.parse::<RecordType>() else {
        return Err(ApiError::BadRequest(format!(
            "Invalid type '{}' provided",
            record_type
        )));
    };

    let records = match record_type {
        RecordType::User => RecordCollection::Users(
            sqlx::query_as(
                r#"SELECT id, username, preferences, watch_history, created_at
                   FROM users
                   ORDER BY username ASC"#,
            )
            .fetch_all(pool.inner())
            .await?,
        ),
        RecordType::Movie => RecordCollection::Movies(
            sqlx::query_as(
                r#"SELECT id, title, description, genres, release_date, director, actors
                   FROM movies
                   ORDER BY title ASC"#,
            )
            .fetch_all(pool.inner())
            .await?,
        ),
        RecordType::TvShow => RecordCollection::TvShows(
            sqlx::query_as(
                r#"SELECT id, title, description, genres, episodes
                   FROM tv_shows
                   ORDER BY title ASC"#,
            )
            .fetch_all(pool.inner())
            .await?,
        ),
    };

    Ok(Json(records))
}
