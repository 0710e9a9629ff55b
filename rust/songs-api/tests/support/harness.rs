use axum::{
    body::{self, Body},
    http::{self, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use songs_api::{config::AppConfig, server::Server};
use std::{
    fs,
    future::Future,
    path::{Path, PathBuf},
    sync::Once,
};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tower::ServiceExt;

static TRACING_INIT: Once = Once::new();

/// Runs a test closure against a songs API instance backed by a freshly
/// migrated and seeded Postgres database.
pub async fn with_songs_harness<F, Fut>(test: F)
where
    F: FnOnce(SongsTestHarness) -> Fut,
    Fut: Future<Output = ()>,
{
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });

    let database_url = match read_env_value("SONGS_TEST_DATABASE_URL")
        .expect("failed to read SONGS_TEST_DATABASE_URL")
    {
        Some(url) => url,
        None => {
            eprintln!("[songs-test] skipping harness: SONGS_TEST_DATABASE_URL is not set");
            return;
        }
    };

    let (client, _task) = connect(&database_url)
        .await
        .expect("failed to connect to test database");
    client
        .batch_execute("DROP TABLE IF EXISTS songs; DROP TABLE IF EXISTS schema_migrations;")
        .await
        .expect("failed to reset test database");

    let server = Server::new(test_config(database_url))
        .await
        .expect("failed to boot songs API for harness");

    let seed_sql = load_fixture("seed.sql").expect("failed to load seed fixture");
    client
        .batch_execute(&seed_sql)
        .await
        .expect("failed to seed test database");

    test(SongsTestHarness {
        router: server.router(),
    })
    .await;
}

fn test_config(database_url: String) -> AppConfig {
    AppConfig::from_vars(vec![
        ("SONGS_DATABASE_URL".to_string(), database_url),
        ("SONGS_LISTEN_ADDR".to_string(), "127.0.0.1:0".to_string()),
        ("SONGS_MAX_POOL_SIZE".to_string(), "4".to_string()),
    ])
    .expect("test config should parse")
}

async fn connect(database_url: &str) -> anyhow::Result<(Client, JoinHandle<()>)> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
    let task = tokio::spawn(async move {
        if let Err(err) = connection.await {
            eprintln!("fixture connection closed with error: {err}");
        }
    });
    Ok((client, task))
}

#[derive(Clone)]
pub struct SongsTestHarness {
    router: Router,
}

impl SongsTestHarness {
    pub async fn get(&self, uri: &str) -> http::Response<Body> {
        self.request(Method::GET, uri, None).await
    }

    pub async fn delete(&self, uri: &str) -> http::Response<Body> {
        self.request(Method::DELETE, uri, None).await
    }

    pub async fn post_json(&self, uri: &str, payload: Value) -> http::Response<Body> {
        self.request(Method::POST, uri, Some(payload)).await
    }

    pub async fn patch_json(&self, uri: &str, payload: Value) -> http::Response<Body> {
        self.request(Method::PATCH, uri, Some(payload)).await
    }

    /// Looks up a seeded song's id by exact title.
    pub async fn id_of(&self, title: &str) -> i64 {
        let uri = format!("/songs?song={}&page_size=100", title.replace(' ', "%20"));
        let (status, body) = read_json(self.get(&uri).await).await;
        assert_eq!(status, StatusCode::OK, "lookup failed: {body}");
        body["items"]
            .as_array()
            .and_then(|items| items.iter().find(|item| item["song"] == title))
            .and_then(|item| item["ID"].as_i64())
            .unwrap_or_else(|| panic!("no seeded song titled {title}: {body}"))
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        payload: Option<Value>,
    ) -> http::Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match payload {
            Some(value) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).expect("payload should serialize"))
            }
            None => Body::empty(),
        };

        let request = builder.body(body).expect("failed to build harness request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}

fn read_env_value(key: &str) -> anyhow::Result<Option<String>> {
    if let Ok(value) = std::env::var(key) {
        if value.trim().is_empty() {
            anyhow::bail!("{key} is set but empty");
        }
        return Ok(Some(value));
    }
    let file_key = format!("{key}_FILE");
    if let Ok(path) = std::env::var(&file_key) {
        let value = fs::read_to_string(&path)
            .map_err(|err| anyhow::anyhow!("failed to read {file_key} ({path}): {err}"))?
            .trim()
            .to_string();
        if value.is_empty() {
            anyhow::bail!("{file_key} pointed at an empty file");
        }
        return Ok(Some(value));
    }
    Ok(None)
}

fn load_fixture(name: &str) -> anyhow::Result<String> {
    let path = fixture_root().join(name);
    fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("failed to read fixture {name} from {:?}: {err}", path))
}

fn fixture_root() -> PathBuf {
    if let Ok(root) = std::env::var("SONGS_FIXTURE_ROOT") {
        let candidate = PathBuf::from(root);
        if candidate.exists() {
            return candidate;
        }
    }

    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}
