// tests/content_tests.rs
//
// Catalog, review and comment flows: role-gated writes, the one-review-
// per-title invariant (including the concurrent case) and the computed
// rating. Needs a running Postgres (DATABASE_URL), ignored by default:
//
//   DATABASE_URL=... cargo test -- --ignored

use reviewhub::{config::Config, routes, state::AppState, utils::mailer::LogMailer};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;

async fn spawn_app() -> (String, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "content_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_email: None,
        mail_webhook_url: None,
        mail_from: "noreply@test.local".to_string(),
        confirmation_code_sentinel: "no_code".to_string(),
        default_role: "user".to_string(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        mailer: Arc::new(LogMailer),
    };

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (address, pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn authenticate(address: &str, pool: &PgPool, username: &str) -> String {
    let client = reqwest::Client::new();
    let email = format!("{}@test.local", username);

    client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({"username": username, "email": email}))
        .send()
        .await
        .expect("signup failed");

    let code: String =
        sqlx::query_scalar("SELECT confirmation_code FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(pool)
            .await
            .expect("user should exist");

    let body: serde_json::Value = client
        .post(format!("{}/api/v1/auth/token", address))
        .json(&serde_json::json!({"username": username, "confirmation_code": code}))
        .send()
        .await
        .expect("token exchange failed")
        .json()
        .await
        .unwrap();

    body["token"].as_str().expect("token missing").to_string()
}

async fn set_role(pool: &PgPool, username: &str, role: &str) {
    sqlx::query("UPDATE users SET role = $1 WHERE username = $2")
        .bind(role)
        .bind(username)
        .execute(pool)
        .await
        .unwrap();
}

/// Creates an admin, a category and a title; returns the title id and the
/// admin's bearer token.
async fn seed_title(address: &str, pool: &PgPool) -> (i64, String) {
    let client = reqwest::Client::new();
    let admin = unique_name("adm");
    let admin_token = authenticate(address, pool, &admin).await;
    set_role(pool, &admin, "admin").await;

    let slug = unique_name("cat");
    let resp = client
        .post(format!("{}/api/v1/categories", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({"name": "Films", "slug": slug}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = client
        .post(format!("{}/api/v1/titles", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "name": format!("Title {}", unique_name("t")),
            "year": 1999,
            "category": slug
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();

    (body["id"].as_i64().unwrap(), admin_token)
}

#[tokio::test]
#[ignore]
async fn catalog_writes_are_admin_only_reads_are_open() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Anonymous read works.
    let resp = client
        .get(format!("{}/api/v1/categories", address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Anonymous write: 401.
    let resp = client
        .post(format!("{}/api/v1/categories", address))
        .json(&serde_json::json!({"name": "X", "slug": unique_name("x")}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // Plain user write: 403.
    let user = unique_name("usr");
    let token = authenticate(&address, &pool, &user).await;
    let resp = client
        .post(format!("{}/api/v1/categories", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"name": "X", "slug": unique_name("x")}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
#[ignore]
async fn title_year_must_not_be_in_the_future() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_title_id, admin_token) = seed_title(&address, &pool).await;

    let resp = client
        .post(format!("{}/api/v1/titles", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({"name": "From the future", "year": 2999}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
#[ignore]
async fn duplicate_genre_slugs_in_payload_collapse_to_one() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_title_id, admin_token) = seed_title(&address, &pool).await;

    let genre_slug = unique_name("gen");
    let resp = client
        .post(format!("{}/api/v1/genres", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({"name": "Sci-Fi", "slug": genre_slug}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    // Genres form a set: a repeated slug must not trip the join-table
    // unique constraint into a 500.
    let resp = client
        .post(format!("{}/api/v1/titles", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "name": format!("Title {}", unique_name("dg")),
            "year": 1965,
            "genre": [&genre_slug, &genre_slug]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    let genres = body["genre"].as_array().unwrap();
    assert_eq!(genres.len(), 1);
    assert_eq!(genres[0]["slug"], genre_slug.as_str());
}

#[tokio::test]
#[ignore]
async fn second_review_for_same_title_is_rejected() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (title_id, _) = seed_title(&address, &pool).await;

    let user = unique_name("rev");
    let token = authenticate(&address, &pool, &user).await;
    let url = format!("{}/api/v1/titles/{}/reviews", address, title_id);

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"text": "great", "score": 8}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"text": "changed my mind", "score": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
#[ignore]
async fn concurrent_duplicate_reviews_hit_the_constraint() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (title_id, _) = seed_title(&address, &pool).await;

    let user = unique_name("rc");
    let token = authenticate(&address, &pool, &user).await;
    let url = format!("{}/api/v1/titles/{}/reviews", address, title_id);

    let post = |text: &'static str| {
        let client = client.clone();
        let url = url.clone();
        let token = token.clone();
        async move {
            client
                .post(&url)
                .header("Authorization", format!("Bearer {}", token))
                .json(&serde_json::json!({"text": text, "score": 7}))
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        }
    };

    // Both pass the pre-check in the worst case; the unique constraint
    // must still let exactly one through.
    let (a, b) = tokio::join!(post("first"), post("second"));
    let mut statuses = [a, b];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 400]);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reviews r JOIN users u ON r.author_id = u.id \
         WHERE r.title_id = $1 AND u.username = $2",
    )
    .bind(title_id)
    .bind(&user)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore]
async fn review_score_must_be_in_range() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (title_id, _) = seed_title(&address, &pool).await;

    let user = unique_name("sc");
    let token = authenticate(&address, &pool, &user).await;

    for bad_score in [0, 11] {
        let resp = client
            .post(format!("{}/api/v1/titles/{}/reviews", address, title_id))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({"text": "x", "score": bad_score}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "score {} should fail", bad_score);
    }
}

#[tokio::test]
#[ignore]
async fn rating_is_the_mean_and_absent_without_reviews() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (title_id, _) = seed_title(&address, &pool).await;
    let title_url = format!("{}/api/v1/titles/{}", address, title_id);

    let body: serde_json::Value = client.get(&title_url).send().await.unwrap().json().await.unwrap();
    assert!(body["rating"].is_null(), "no reviews yet: rating must be null");

    for (user_prefix, score) in [("ra", 8), ("rb", 10)] {
        let user = unique_name(user_prefix);
        let token = authenticate(&address, &pool, &user).await;
        let resp = client
            .post(format!("{}/api/v1/titles/{}/reviews", address, title_id))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({"text": "review", "score": score}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
    }

    let body: serde_json::Value = client.get(&title_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["rating"].as_f64().unwrap(), 9.0);
}

#[tokio::test]
#[ignore]
async fn review_ownership_rules() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (title_id, _) = seed_title(&address, &pool).await;

    let author = unique_name("au");
    let author_token = authenticate(&address, &pool, &author).await;

    let resp = client
        .post(format!("{}/api/v1/titles/{}/reviews", address, title_id))
        .header("Authorization", format!("Bearer {}", author_token))
        .json(&serde_json::json!({"text": "mine", "score": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let review: serde_json::Value = resp.json().await.unwrap();
    let review_url = format!(
        "{}/api/v1/titles/{}/reviews/{}",
        address,
        title_id,
        review["id"].as_i64().unwrap()
    );

    // A stranger with role 'user' cannot delete it.
    let stranger = unique_name("st");
    let stranger_token = authenticate(&address, &pool, &stranger).await;
    let resp = client
        .delete(&review_url)
        .header("Authorization", format!("Bearer {}", stranger_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Anonymous deletion is 401.
    let resp = client.delete(&review_url).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // The author can edit their own review.
    let resp = client
        .patch(&review_url)
        .header("Authorization", format!("Bearer {}", author_token))
        .json(&serde_json::json!({"score": 6}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // A moderator can delete a foreign review.
    let moderator = unique_name("mo");
    let moderator_token = authenticate(&address, &pool, &moderator).await;
    set_role(&pool, &moderator, "moderator").await;
    let resp = client
        .delete(&review_url)
        .header("Authorization", format!("Bearer {}", moderator_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
}

#[tokio::test]
#[ignore]
async fn comments_follow_the_same_ownership_rules() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (title_id, _) = seed_title(&address, &pool).await;

    let author = unique_name("ca");
    let author_token = authenticate(&address, &pool, &author).await;

    let review: serde_json::Value = client
        .post(format!("{}/api/v1/titles/{}/reviews", address, title_id))
        .header("Authorization", format!("Bearer {}", author_token))
        .json(&serde_json::json!({"text": "review", "score": 9}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let review_id = review["id"].as_i64().unwrap();

    let comments_url = format!(
        "{}/api/v1/titles/{}/reviews/{}/comments",
        address, title_id, review_id
    );

    let comment: serde_json::Value = client
        .post(&comments_url)
        .header("Authorization", format!("Bearer {}", author_token))
        .json(&serde_json::json!({"text": "a comment"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comment_url = format!("{}/{}", comments_url, comment["id"].as_i64().unwrap());

    // Comments are listed newest-first and readable anonymously.
    let listed: serde_json::Value = client
        .get(&comments_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["author"], author.as_str());

    // A stranger cannot delete the comment; an admin can.
    let stranger = unique_name("cs");
    let stranger_token = authenticate(&address, &pool, &stranger).await;
    let resp = client
        .delete(&comment_url)
        .header("Authorization", format!("Bearer {}", stranger_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    set_role(&pool, &stranger, "admin").await;
    let resp = client
        .delete(&comment_url)
        .header("Authorization", format!("Bearer {}", stranger_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
}
