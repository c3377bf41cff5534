//! Demo-data seeding.
//!
//! Clears and reinserts a small fixed catalog (two users, two movies, two
//! TV shows, one pre-populated list per user). Destructive, so the server
//! only runs it when `WATCHLIST_SEED` is set.

use crate::models::{Episode, Genre, ItemType, UserPreferences, WatchHistoryEntry};
use chrono::{TimeZone, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug)]
pub struct SeedSummary {
    pub users: usize,
    pub movies: usize,
    pub tv_shows: usize,
    pub list_items: usize,
}

pub async fn seed_database(pool: &PgPool) -> Result<SeedSummary, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // Item and list rows go first; users/movies/tv_shows cascade nothing.
    sqlx::query("DELETE FROM user_list_items").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM user_lists").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM users").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM movies").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM tv_shows").execute(&mut *tx).await?;

    let user_specs = [
        (
            "user1",
            UserPreferences {
                favorite_genres: vec![Genre::Action, Genre::Comedy],
                disliked_genres: vec![Genre::Horror],
            },
        ),
        (
            "user2",
            UserPreferences {
                favorite_genres: vec![Genre::Drama, Genre::Romance],
                disliked_genres: vec![Genre::SciFi],
            },
        ),
    ];

    let mut user_ids = Vec::with_capacity(user_specs.len());
    for (username, preferences) in user_specs {
        let id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO users (username, preferences, watch_history)
               VALUES ($1, $2, $3)
               RETURNING id"#,
        )
        .bind(username)
        .bind(Json(preferences))
        .bind(Json(Vec::<WatchHistoryEntry>::new()))
        .fetch_one(&mut *tx)
        .await?;
        user_ids.push(id);
    }

    let inception: Uuid = sqlx::query_scalar(
        r#"INSERT INTO movies (title, description, genres, release_date, director, actors)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id"#,
    )
    .bind("Inception")
    .bind(
        "A thief who steals corporate secrets through the use of dream-sharing technology \
         is given the inverse task of planting an idea into the mind of a C.E.O.",
    )
    .bind(Json(vec![Genre::Action, Genre::SciFi]))
    .bind(Utc.with_ymd_and_hms(2010, 7, 16, 0, 0, 0).unwrap())
    .bind("Christopher Nolan")
    .bind(vec![
        "Leonardo DiCaprio".to_string(),
        "Joseph Gordon-Levitt".to_string(),
        "Ellen Page".to_string(),
    ])
    .fetch_one(&mut *tx)
    .await?;

    let shawshank: Uuid = sqlx::query_scalar(
        r#"INSERT INTO movies (title, description, genres, release_date, director, actors)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id"#,
    )
    .bind("The Shawshank Redemption")
    .bind(
        "Two imprisoned men bond over a number of years, finding solace and eventual \
         redemption through acts of common decency.",
    )
    .bind(Json(vec![Genre::Drama]))
    .bind(Utc.with_ymd_and_hms(1994, 10, 14, 0, 0, 0).unwrap())
    .bind("Frank Darabont")
    .bind(vec![
        "Tim Robbins".to_string(),
        "Morgan Freeman".to_string(),
        "Bob Gunton".to_string(),
    ])
    .fetch_one(&mut *tx)
    .await?;

    let friends_cast = vec![
        "Jennifer Aniston".to_string(),
        "Courteney Cox".to_string(),
        "Lisa Kudrow".to_string(),
    ];
    let friends: Uuid = sqlx::query_scalar(
        r#"INSERT INTO tv_shows (title, description, genres, episodes)
           VALUES ($1, $2, $3, $4)
           RETURNING id"#,
    )
    .bind("Friends")
    .bind(
        "Follows the personal and professional lives of six twenty to \
         thirty-something-year-old friends living in Manhattan.",
    )
    .bind(Json(vec![Genre::Comedy]))
    .bind(Json(vec![
        Episode {
            episode_number: 1,
            season_number: 1,
            release_date: Utc.with_ymd_and_hms(1994, 9, 22, 0, 0, 0).unwrap(),
            director: "James Burrows".to_string(),
            actors: friends_cast.clone(),
        },
        Episode {
            episode_number: 2,
            season_number: 1,
            release_date: Utc.with_ymd_and_hms(1994, 9, 29, 0, 0, 0).unwrap(),
            director: "James Burrows".to_string(),
            actors: friends_cast,
        },
    ]))
    .fetch_one(&mut *tx)
    .await?;

    let breaking_bad_cast = vec![
        "Bryan Cranston".to_string(),
        "Aaron Paul".to_string(),
        "Anna Gunn".to_string(),
    ];
    let breaking_bad: Uuid = sqlx::query_scalar(
        r#"INSERT INTO tv_shows (title, description, genres, episodes)
           VALUES ($1, $2, $3, $4)
           RETURNING id"#,
    )
    .bind("Breaking Bad")
    .bind(
        "A high school chemistry teacher diagnosed with inoperable lung cancer turns to \
         manufacturing and selling methamphetamine in order to secure his family's future.",
    )
    .bind(Json(vec![Genre::Comedy, Genre::Drama]))
    .bind(Json(vec![
        Episode {
            episode_number: 1,
            season_number: 1,
            release_date: Utc.with_ymd_and_hms(2008, 1, 20, 0, 0, 0).unwrap(),
            director: "Vince Gilligan".to_string(),
            actors: breaking_bad_cast.clone(),
        },
        Episode {
            episode_number: 2,
            season_number: 1,
            release_date: Utc.with_ymd_and_hms(2008, 1, 27, 0, 0, 0).unwrap(),
            director: "Vince Gilligan".to_string(),
            actors: breaking_bad_cast,
        },
    ]))
    .fetch_one(&mut *tx)
    .await?;

    let lists: [(Uuid, [(Uuid, ItemType); 2]); 2] = [
        (
            user_ids[0],
            [(inception, ItemType::Movie), (friends, ItemType::TvShow)],
        ),
        (
            user_ids[1],
            [(shawshank, ItemType::Movie), (breaking_bad, ItemType::TvShow)],
        ),
    ];

    let mut list_items = 0;
    for (user_id, items) in lists {
        sqlx::query("INSERT INTO user_lists (user_id) VALUES ($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (content_id, item_type) in items {
            sqlx::query(
                "INSERT INTO user_list_items (user_id, content_id, item_type) VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(content_id)
            .bind(item_type)
            .execute(&mut *tx)
            .await?;
            list_items += 1;
        }
    }

    tx.commit().await?;

    Ok(SeedSummary {
        users: user_ids.len(),
        movies: 2,
        tv_shows: 2,
        list_items,
    })
}
