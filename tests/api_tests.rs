use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use cinematch::{
    api::{create_router, AppState},
    config::{CacheTtls, RecommenderSettings},
    db::{MemoryCache, MemoryInteractionStore, MemoryItemStore, RecommendationCache},
    models::Movie,
    services::{HybridConfig, RecommendationService, Recommenders},
};

const MAX_LIMIT: usize = 50;

async fn create_test_server() -> TestServer {
    let items = Arc::new(MemoryItemStore::new());
    let catalog: [(&str, &str, Option<Vec<f32>>); 5] = [
        ("tt0113277", "Heat", Some(vec![1.0, 0.0, 0.0])),
        ("tt0102926", "The Silence of the Lambs", Some(vec![0.0, 1.0, 0.0])),
        ("tt0114814", "The Usual Suspects", Some(vec![0.9, 0.1, 0.0])),
        ("tt0110413", "Leon", Some(vec![0.7, 0.0, 0.3])),
        ("tt0133093", "The Matrix", None),
    ];
    for (id, title, embedding) in catalog {
        items
            .insert(
                Movie::new(id, title).with_genres(["Crime"]).with_year(1995),
                embedding,
            )
            .await;
    }

    let interactions = Arc::new(MemoryInteractionStore::new());
    let recommenders = Recommenders::assemble(
        items.clone(),
        interactions.clone(),
        None,
        Some(HybridConfig::default()),
        RecommenderSettings::default(),
    );
    let service = RecommendationService::new(
        recommenders,
        items.clone(),
        interactions,
        RecommendationCache::new(Arc::new(MemoryCache::new())),
        CacheTtls::default(),
        5.0,
    );

    let app = create_router(AppState::new(Arc::new(service), items, MAX_LIMIT));
    TestServer::new(app).unwrap()
}

fn user(id: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(id).unwrap(),
    )
}

fn ids(body: &[Value]) -> Vec<&str> {
    body.iter()
        .map(|r| r["movie"]["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_list_and_get_movies() {
    let server = create_test_server().await;

    let response = server
        .get("/api/v1/movies")
        .add_query_param("limit", 2)
        .await;
    response.assert_status_ok();
    let movies: Vec<Value> = response.json();
    assert_eq!(movies.len(), 2);

    let response = server.get("/api/v1/movies/tt0113277").await;
    response.assert_status_ok();
    let movie: Value = response.json();
    assert_eq!(movie["title"], "Heat");
    assert_eq!(movie["year"], 1995);

    server
        .get("/api/v1/movies/tt0000000")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_movies() {
    let server = create_test_server().await;

    let response = server
        .get("/api/v1/movies/search")
        .add_query_param("query", "the")
        .await;
    response.assert_status_ok();
    let movies: Vec<Value> = response.json();
    assert_eq!(movies.len(), 3);
}

#[tokio::test]
async fn test_limit_out_of_range_is_rejected() {
    let server = create_test_server().await;

    server
        .get("/api/v1/recommendations/popular")
        .add_query_param("limit", 0)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/api/v1/movies")
        .add_query_param("limit", MAX_LIMIT + 1)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_record_and_list_interactions() {
    let server = create_test_server().await;
    let (name, value) = user("alice");

    let response = server
        .post("/api/v1/interactions")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "movie_id": "tt0113277", "type": "rate", "value": 4.5 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["user_id"], "alice");
    assert_eq!(created["type"], "rate");

    let response = server
        .get("/api/v1/interactions/me")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let mine: Vec<Value> = response.json();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["movie_id"], "tt0113277");
}

#[tokio::test]
async fn test_invalid_interactions_are_rejected() {
    let server = create_test_server().await;
    let (name, value) = user("alice");

    server
        .post("/api/v1/interactions")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "movie_id": "tt0113277", "type": "rate", "value": 7 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/v1/interactions")
        .add_header(name, value)
        .json(&json!({ "movie_id": "tt9999999", "type": "view" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .post("/api/v1/interactions")
        .json(&json!({ "movie_id": "tt0113277", "type": "view" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cold_start_user_gets_popular_movies() {
    let server = create_test_server().await;

    for (viewer, movie_id) in [("a", "tt0102926"), ("b", "tt0102926"), ("c", "tt0110413")] {
        let (name, value) = user(viewer);
        server
            .post("/api/v1/interactions")
            .add_header(name, value)
            .json(&json!({ "movie_id": movie_id, "type": "view" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let popular: Vec<Value> = server
        .get("/api/v1/recommendations/popular")
        .add_query_param("limit", 2)
        .await
        .json();
    assert_eq!(ids(&popular), vec!["tt0102926", "tt0110413"]);

    let (name, value) = user("newcomer");
    let personal: Vec<Value> = server
        .get("/api/v1/recommendations/user")
        .add_query_param("limit", 2)
        .add_header(name, value)
        .await
        .json();
    assert_eq!(ids(&personal), ids(&popular));
}

#[tokio::test]
async fn test_recommendations_follow_new_interactions() {
    let server = create_test_server().await;
    let (name, value) = user("bob");

    // Warm the cache with a cold-start answer
    server
        .get("/api/v1/recommendations/user")
        .add_query_param("strategy", "content")
        .add_header(name.clone(), value.clone())
        .await
        .assert_status_ok();

    server
        .post("/api/v1/interactions")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "movie_id": "tt0113277", "type": "rate", "value": 5 }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .get("/api/v1/recommendations/user")
        .add_query_param("strategy", "content")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let recommendations: Vec<Value> = response.json();

    assert_eq!(recommendations[0]["movie"]["id"], "tt0114814");
    assert_eq!(recommendations[0]["sources"], json!(["content"]));
    assert!(ids(&recommendations).iter().all(|id| *id != "tt0113277"));
}

#[tokio::test]
async fn test_unknown_strategy_is_rejected() {
    let server = create_test_server().await;
    let (name, value) = user("bob");

    server
        .get("/api/v1/recommendations/user")
        .add_query_param("strategy", "popular")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_similar_movies() {
    let server = create_test_server().await;

    let response = server
        .get("/api/v1/recommendations/item/tt0113277")
        .add_query_param("limit", 2)
        .await;
    response.assert_status_ok();
    let similar: Vec<Value> = response.json();
    assert_eq!(ids(&similar), vec!["tt0114814", "tt0110413"]);
    assert!(similar[0].get("sources").is_none());

    // No embedding: an empty list, not an error
    let response = server.get("/api/v1/recommendations/item/tt0133093").await;
    response.assert_status_ok();
    let similar: Vec<Value> = response.json();
    assert!(similar.is_empty());

    server
        .get("/api/v1/recommendations/item/tt0000000")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
