use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use rocket::routes;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use watchlist_api::cache::{DetailCache, MemoryDetailCache};
use watchlist_api::models::{ContentDetail, EnrichedItem, ItemType};
use watchlist_api::routes::my_list::{add_list_item, list_items, remove_list_item};
use watchlist_api::test_support::{TestDatabase, TestFixtures, TestRocketBuilder};

async fn list_client(pool: sqlx::PgPool, cache: Arc<MemoryDetailCache>) -> Client {
    TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .manage_default_engine(pool, cache)
        .mount_api_routes(routes![add_list_item, remove_list_item, list_items])
        .async_client()
        .await
}

fn add_body(user_id: Uuid, content_id: Uuid, item_type: &str) -> String {
    serde_json::json!({
        "userId": user_id,
        "contentId": content_id,
        "type": item_type,
    })
    .to_string()
}

fn remove_body(user_id: Uuid, content_id: Uuid) -> String {
    serde_json::json!({
        "userId": user_id,
        "contentId": content_id,
    })
    .to_string()
}

async fn fetch_list(client: &Client, user_id: Uuid, query: &str) -> Vec<EnrichedItem> {
    let response = client
        .get(format!("/my-list/list/{}{}", user_id, query))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    response.into_json().await.expect("valid JSON payload")
}

/// The cache population write is detached from the request, so tests that
/// depend on it poll instead of assuming it finished.
async fn wait_for_cached(cache: &MemoryDetailCache, content_id: Uuid) {
    let key = content_id.to_string();
    for _ in 0..200 {
        if cache.get(&key).await.unwrap().is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cache entry for {} never appeared", content_id);
}

#[tokio::test]
async fn add_then_list_then_remove_round_trip() {
    let test_db = TestDatabase::new()
        .await
        .expect("failed to provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let user_id = fixtures.insert_user("u1").await.unwrap();
    let movie_id = fixtures.insert_movie("Test Movie").await.unwrap();

    let client = list_client(pool.clone(), Arc::new(MemoryDetailCache::new())).await;

    let response = client
        .post("/my-list/add")
        .header(ContentType::JSON)
        .body(add_body(user_id, movie_id, "movie"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    drop(response);

    let items = fetch_list(&client, user_id, "?page=1&limit=10").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content_id, movie_id);
    assert_eq!(items[0].item_type, ItemType::Movie);
    match items[0].details.as_ref() {
        Some(ContentDetail::Movie(detail)) => {
            assert_eq!(detail.id, movie_id);
            assert_eq!(detail.title, "Test Movie");
            assert_eq!(detail.director, "Test Director");
        }
        other => panic!("expected movie details, got {:?}", other),
    }

    let response = client
        .post("/my-list/remove")
        .header(ContentType::JSON)
        .body(remove_body(user_id, movie_id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    drop(response);

    let items = fetch_list(&client, user_id, "").await;
    assert!(items.is_empty());

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn duplicate_add_is_rejected_and_leaves_one_item() {
    let test_db = TestDatabase::new()
        .await
        .expect("failed to provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let user_id = fixtures.insert_user("u1").await.unwrap();
    let show_id = fixtures.insert_tv_show("Test TV Show").await.unwrap();

    let client = list_client(pool.clone(), Arc::new(MemoryDetailCache::new())).await;

    let response = client
        .post("/my-list/add")
        .header(ContentType::JSON)
        .body(add_body(user_id, show_id, "tv_show"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    drop(response);

    let response = client
        .post("/my-list/add")
        .header(ContentType::JSON)
        .body(add_body(user_id, show_id, "tv_show"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let error: serde_json::Value = response.into_json().await.expect("valid JSON payload");
    assert_eq!(error["error"], "Duplicate");

    let items = fetch_list(&client, user_id, "").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content_id, show_id);

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn add_for_unknown_user_is_not_found() {
    let test_db = TestDatabase::new()
        .await
        .expect("failed to provision test database");
    let pool = test_db.pool_clone();

    let client = list_client(pool.clone(), Arc::new(MemoryDetailCache::new())).await;

    let response = client
        .post("/my-list/add")
        .header(ContentType::JSON)
        .body(add_body(Uuid::new_v4(), Uuid::new_v4(), "movie"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    drop(response);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn remove_of_non_member_item_succeeds_and_changes_nothing() {
    let test_db = TestDatabase::new()
        .await
        .expect("failed to provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let user_id = fixtures.insert_user("u1").await.unwrap();
    let movie_id = fixtures.insert_movie("Kept").await.unwrap();
    fixtures
        .add_list_item(user_id, movie_id, ItemType::Movie)
        .await
        .unwrap();

    let client = list_client(pool.clone(), Arc::new(MemoryDetailCache::new())).await;

    let response = client
        .post("/my-list/remove")
        .header(ContentType::JSON)
        .body(remove_body(user_id, Uuid::new_v4()))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    drop(response);

    let items = fetch_list(&client, user_id, "").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content_id, movie_id);

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn list_for_user_without_a_list_is_not_found() {
    let test_db = TestDatabase::new()
        .await
        .expect("failed to provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    // The user exists but has never added anything.
    let user_id = fixtures.insert_user("u1").await.unwrap();

    let client = list_client(pool.clone(), Arc::new(MemoryDetailCache::new())).await;

    let response = client
        .get(format!("/my-list/list/{}", user_id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    drop(response);
    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn pagination_slices_in_insertion_order() {
    let test_db = TestDatabase::new()
        .await
        .expect("failed to provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let user_id = fixtures.insert_user("u1").await.unwrap();
    let mut movie_ids = Vec::new();
    for n in 0..5 {
        let id = fixtures.insert_movie(&format!("Movie {}", n)).await.unwrap();
        fixtures
            .add_list_item(user_id, id, ItemType::Movie)
            .await
            .unwrap();
        movie_ids.push(id);
    }

    let client = list_client(pool.clone(), Arc::new(MemoryDetailCache::new())).await;

    // Default page/limit covers the whole list in insertion order.
    let items = fetch_list(&client, user_id, "").await;
    let returned: Vec<Uuid> = items.iter().map(|item| item.content_id).collect();
    assert_eq!(returned, movie_ids);

    // Second page of two holds items three and four.
    let items = fetch_list(&client, user_id, "?page=2&limit=2").await;
    let returned: Vec<Uuid> = items.iter().map(|item| item.content_id).collect();
    assert_eq!(returned, vec![movie_ids[2], movie_ids[3]]);

    // A page past the end is empty, not an error.
    let items = fetch_list(&client, user_id, "?page=4&limit=2").await;
    assert!(items.is_empty());

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn missing_content_lists_with_null_details() {
    let test_db = TestDatabase::new()
        .await
        .expect("failed to provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let user_id = fixtures.insert_user("u1").await.unwrap();
    let movie_id = fixtures.insert_movie("Soon Deleted").await.unwrap();
    fixtures
        .add_list_item(user_id, movie_id, ItemType::Movie)
        .await
        .unwrap();

    sqlx::query("DELETE FROM movies WHERE id = $1")
        .bind(movie_id)
        .execute(&pool)
        .await
        .unwrap();

    let client = list_client(pool.clone(), Arc::new(MemoryDetailCache::new())).await;

    let items = fetch_list(&client, user_id, "").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content_id, movie_id);
    assert_eq!(items[0].details, None);

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn cached_details_survive_content_deletion_within_ttl() {
    let test_db = TestDatabase::new()
        .await
        .expect("failed to provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let user_id = fixtures.insert_user("u1").await.unwrap();
    let movie_id = fixtures.insert_movie("Cached Movie").await.unwrap();
    fixtures
        .add_list_item(user_id, movie_id, ItemType::Movie)
        .await
        .unwrap();

    let cache = Arc::new(MemoryDetailCache::new());
    let client = list_client(pool.clone(), cache.clone()).await;

    // First read resolves from the store and populates the cache.
    let first = fetch_list(&client, user_id, "").await;
    assert!(first[0].details.is_some());
    wait_for_cached(&cache, movie_id).await;

    sqlx::query("DELETE FROM movies WHERE id = $1")
        .bind(movie_id)
        .execute(&pool)
        .await
        .unwrap();

    // Within the TTL the cached projection still answers, byte-identical
    // to the first read, without touching the store.
    let second = fetch_list(&client, user_id, "").await;
    assert_eq!(second[0].details, first[0].details);

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}
