use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ===== Closed Enums =====

/// Closed genre set shared by movies, TV shows and user preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Genre {
    Action,
    Comedy,
    Drama,
    Fantasy,
    Horror,
    Romance,
    SciFi,
}

/// Kind of content a list item points at. Stored as text, `movie` or
/// `tv_show` on the wire and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Movie,
    TvShow,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Movie => "movie",
            ItemType::TvShow => "tv_show",
        }
    }
}

// Manual sqlx plumbing so the enum reads and writes plain TEXT columns.

impl sqlx::Type<sqlx::Postgres> for ItemType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for ItemType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ItemType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        match <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)? {
            "movie" => Ok(ItemType::Movie),
            "tv_show" => Ok(ItemType::TvShow),
            other => Err(format!("invalid item type '{}'", other).into()),
        }
    }
}

/// Record collections addressable through `GET /my-list/{type}`.
/// Parsed with an exhaustive match so an invalid path segment is a 400,
/// never a silent fall-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    User,
    Movie,
    TvShow,
}

impl FromStr for RecordType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(RecordType::User),
            "movie" => Ok(RecordType::Movie),
            "tv-show" => Ok(RecordType::TvShow),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::User => "user",
            RecordType::Movie => "movie",
            RecordType::TvShow => "tv-show",
        };
        f.write_str(name)
    }
}

// ===== Content Store Records =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[schemars(with = "Vec<Genre>")]
    pub genres: Json<Vec<Genre>>,
    pub release_date: DateTime<Utc>,
    pub director: String,
    pub actors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TvShow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[schemars(with = "Vec<Genre>")]
    pub genres: Json<Vec<Genre>>,
    #[schemars(with = "Vec<Episode>")]
    pub episodes: Json<Vec<Episode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub episode_number: i32,
    pub season_number: i32,
    pub release_date: DateTime<Utc>,
    pub director: String,
    pub actors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[schemars(with = "UserPreferences")]
    pub preferences: Json<UserPreferences>,
    #[schemars(with = "Vec<WatchHistoryEntry>")]
    pub watch_history: Json<Vec<WatchHistoryEntry>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub favorite_genres: Vec<Genre>,
    #[serde(default)]
    pub disliked_genres: Vec<Genre>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
    pub content_id: Uuid,
    pub watched_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
}

// ===== List Models =====

/// One entry of a user's list as stored; insertion order is the row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub content_id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

/// A list item extended with its resolved content details. `details` is
/// null when the referenced content no longer exists in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedItem {
    pub content_id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub details: Option<ContentDetail>,
}

// ===== Content Details =====

/// Denormalized, presentation-only projection of a content record. Derived
/// on demand by the resolver or read back verbatim from the detail cache;
/// never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum ContentDetail {
    #[serde(rename = "movie")]
    Movie(MovieDetail),
    #[serde(rename = "tv-show")]
    TvShow(TvShowDetail),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub genres: Vec<Genre>,
    pub release_date: DateTime<Utc>,
    pub director: String,
    pub actors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TvShowDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub genres: Vec<Genre>,
    pub episodes: Vec<Episode>,
}

impl From<Movie> for ContentDetail {
    fn from(movie: Movie) -> Self {
        ContentDetail::Movie(MovieDetail {
            id: movie.id,
            title: movie.title,
            description: movie.description,
            genres: movie.genres.0,
            release_date: movie.release_date,
            director: movie.director,
            actors: movie.actors,
        })
    }
}

impl From<TvShow> for ContentDetail {
    fn from(show: TvShow) -> Self {
        ContentDetail::TvShow(TvShowDetail {
            id: show.id,
            title: show.title,
            description: show.description,
            genres: show.genres.0,
            episodes: show.episodes.0,
        })
    }
}

// ===== API Payloads =====

/// Response body for one of the `GET /my-list/{type}` collections.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum RecordCollection {
    Users(Vec<User>),
    Movies(Vec<Movie>),
    TvShows(Vec<TvShow>),
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub user_id: Uuid,
    pub content_id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub user_id: Uuid,
    pub content_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}
