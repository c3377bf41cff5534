#[macro_use]
extern crate rocket;

pub mod cache;
pub mod db;
pub mod enrich;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod seed_data;

use crate::cache::{DEFAULT_DETAIL_TTL, MemoryDetailCache};
use crate::db::WatchlistDb;
use crate::enrich::{EnrichmentEngine, PgContentResolver};
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};
use std::time::Duration;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

fn detail_ttl_from_env() -> Duration {
    match std::env::var("DETAIL_CACHE_TTL_SECS") {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                log::warn!(
                    "ignoring invalid DETAIL_CACHE_TTL_SECS '{}', using default",
                    raw
                );
                DEFAULT_DETAIL_TTL
            }
        },
        Err(_) => DEFAULT_DETAIL_TTL,
    }
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // The content store URI is mandatory; refuse to start without it. A
    // failed initial connection aborts ignite with a non-zero exit below.
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to the content store URI");
    let figment = rocket::Config::figment().merge(("databases.watchlist_db.url", database_url));

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::custom(figment)
        .attach(RequestLogger)
        .attach(WatchlistDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite("Run Migrations", |rocket| async move {
            match WatchlistDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    match db::run_migrations(&pool).await {
                        Ok(_) => {
                            log::info!("database migrations successful");
                            Ok(rocket)
                        }
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    }
                }
                None => {
                    log::error!("database pool not available for migrations");
                    Err(rocket)
                }
            }
        }))
        // Clone the pool into managed state and wire up the enrichment
        // engine (store-backed resolver + shared in-process detail cache)
        .attach(AdHoc::try_on_ignite(
            "Manage DB Pool and Enrichment Engine",
            |rocket| async move {
                match WatchlistDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();

                        let ttl = detail_ttl_from_env();
                        log::info!("detail cache TTL set to {}s", ttl.as_secs());

                        let engine = Arc::new(EnrichmentEngine::new(
                            Arc::new(PgContentResolver::new(pool.clone())),
                            Arc::new(MemoryDetailCache::new()),
                            ttl,
                        ));

                        Ok(rocket.manage(pool).manage(engine))
                    }
                    None => Err(rocket),
                }
            },
        ))
        // Optional demo-data seeding; destructive, so opt-in via env
        .attach(AdHoc::try_on_ignite("Seed Demo Data", |rocket| async move {
            if std::env::var("WATCHLIST_SEED").is_err() {
                return Ok(rocket);
            }

            let pool = match rocket.state::<rocket_db_pools::sqlx::PgPool>() {
                Some(pool) => pool.clone(),
                None => {
                    log::error!("database pool not available for seeding");
                    return Err(rocket);
                }
            };

            match seed_data::seed_database(&pool).await {
                Ok(summary) => {
                    log::info!(
                        "database seeded: {} users, {} movies, {} tv shows, {} list items",
                        summary.users,
                        summary.movies,
                        summary.tv_shows,
                        summary.list_items
                    );
                    Ok(rocket)
                }
                Err(e) => {
                    log::error!("database seeding failed: {}", e);
                    Err(rocket)
                }
            }
        }))
        .mount(
            "/my-list",
            openapi_get_routes![
                routes::health::health_check,
                routes::catalog::list_records,
                routes::my_list::add_list_item,
                routes::my_list::remove_list_item,
                routes::my_list::list_items,
            ],
        )
        .mount(
            "/api-docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../my-list/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api-docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("My List API", "../../my-list/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::models::{Episode, Genre, ItemType};
    use chrono::{TimeZone, Utc};
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};
    use sqlx::postgres::PgPoolOptions;
    use sqlx::types::Json;
    use std::sync::Arc;
    use testcontainers::ImageExt;
    use testcontainers_modules::postgres::Postgres;
    use testcontainers_modules::testcontainers::{
        ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
    };
    use thiserror::Error;
    use uuid::Uuid;

    use crate::cache::{DEFAULT_DETAIL_TTL, DetailCache};
    use crate::enrich::{EnrichmentEngine, PgContentResolver};

    #[derive(Debug, Error)]
    pub enum TestDatabaseError {
        #[error("database error: {0}")]
        Sqlx(#[from] sqlx::Error),
        #[error("migration error: {0}")]
        Migration(#[from] sqlx::migrate::MigrateError),
        #[error("container error: {0}")]
        Container(#[from] TestcontainersError),
    }

    /// Ephemeral database factory for integration tests. Each instance
    /// launches a disposable Postgres container and runs the migrations.
    pub struct TestDatabase {
        pool: Option<PgPool>,
        container: Option<ContainerAsync<Postgres>>,
    }

    impl TestDatabase {
        pub async fn new() -> Result<Self, TestDatabaseError> {
            // gen_random_uuid() needs Postgres 13+.
            let container = Postgres::default().with_tag("16-alpine").start().await?;

            let host = container.get_host().await?.to_string();
            let port = container.get_host_port_ipv4(5432).await?;
            let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?;

            crate::db::MIGRATOR.run(&pool).await?;

            Ok(Self {
                pool: Some(pool),
                container: Some(container),
            })
        }

        /// Connection pool for use in tests and Rocket state.
        pub fn pool(&self) -> &PgPool {
            self.pool.as_ref().expect("test database pool is available")
        }

        /// Convenience method returning a clone of the pooled connection handle.
        pub fn pool_clone(&self) -> PgPool {
            self.pool().clone()
        }

        /// Close pool connections and tear the container down.
        pub async fn close(mut self) -> Result<(), TestDatabaseError> {
            if let Some(pool) = self.pool.take() {
                pool.close().await;
            }

            if let Some(container) = self.container.take() {
                container.stop().await?;
            }

            Ok(())
        }
    }

    /// Convenience helpers for seeding content and list rows in tests.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a user row, returning the new user id.
        pub async fn insert_user(&self, username: &str) -> Result<Uuid, sqlx::Error> {
            sqlx::query_scalar("INSERT INTO users (username) VALUES ($1) RETURNING id")
                .bind(username)
                .fetch_one(self.pool)
                .await
        }

        /// Insert a movie with fixed filler fields, returning its id.
        pub async fn insert_movie(&self, title: &str) -> Result<Uuid, sqlx::Error> {
            sqlx::query_scalar(
                r#"INSERT INTO movies (title, description, genres, release_date, director, actors)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   RETURNING id"#,
            )
            .bind(title)
            .bind("This is a test movie")
            .bind(Json(vec![Genre::Action, Genre::Comedy]))
            .bind(Utc.with_ymd_and_hms(2010, 7, 16, 0, 0, 0).unwrap())
            .bind("Test Director")
            .bind(vec!["Actor 1".to_string(), "Actor 2".to_string()])
            .fetch_one(self.pool)
            .await
        }

        /// Insert a TV show with a single episode, returning its id.
        pub async fn insert_tv_show(&self, title: &str) -> Result<Uuid, sqlx::Error> {
            sqlx::query_scalar(
                r#"INSERT INTO tv_shows (title, description, genres, episodes)
                   VALUES ($1, $2, $3, $4)
                   RETURNING id"#,
            )
            .bind(title)
            .bind("This is a test TV show")
            .bind(Json(vec![Genre::Action, Genre::Comedy]))
            .bind(Json(vec![Episode {
                episode_number: 1,
                season_number: 1,
                release_date: Utc.with_ymd_and_hms(1994, 9, 22, 0, 0, 0).unwrap(),
                director: "Test Director".to_string(),
                actors: vec!["Actor 1".to_string(), "Actor 2".to_string()],
            }]))
            .fetch_one(self.pool)
            .await
        }

        /// Append an item to a user's list directly, creating the list row
        /// when absent.
        pub async fn add_list_item(
            &self,
            user_id: Uuid,
            content_id: Uuid,
            item_type: ItemType,
        ) -> Result<(), sqlx::Error> {
            sqlx::query(
                "INSERT INTO user_lists (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
            )
            .bind(user_id)
            .execute(self.pool)
            .await?;

            sqlx::query(
                "INSERT INTO user_list_items (user_id, content_id, item_type) VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(content_id)
            .bind(item_type)
            .execute(self.pool)
            .await?;

            Ok(())
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        engine: Option<Arc<EnrichmentEngine>>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
                engine: None,
            }
        }

        /// Mount routes under `/my-list`, the service base path.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/my-list".to_string(), routes));
            self
        }

        /// Manage a `PgPool` instance for tests that exercise database-backed routes.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Manage a pre-built enrichment engine (for tests that need to
        /// observe or replace the cache behind it).
        pub fn manage_engine(mut self, engine: Arc<EnrichmentEngine>) -> Self {
            self.engine = Some(engine);
            self
        }

        /// Manage a store-backed engine over the given cache with the
        /// default TTL; enough for most list-route tests.
        pub fn manage_default_engine(self, pool: PgPool, cache: Arc<dyn DetailCache>) -> Self {
            let engine = Arc::new(EnrichmentEngine::new(
                Arc::new(PgContentResolver::new(pool)),
                cache,
                DEFAULT_DETAIL_TTL,
            ));
            self.manage_engine(engine)
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }

            if let Some(engine) = self.engine {
                rocket = rocket.manage(engine);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
