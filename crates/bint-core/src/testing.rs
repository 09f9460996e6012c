use axum::http::HeaderMap;
use sea_orm::DatabaseConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::cache::CacheService;
use crate::config::{Config, PostgresConfig};
use crate::controller::Controller;
use crate::response::Envelope;
use crate::App;

/// A test application for integration testing.
///
/// Spins up a Bint server on an OS-assigned port with an in-memory SQLite
/// database and an in-memory cache.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_get_user() {
///     let app = TestApp::new(vec![Arc::new(UserController)]).await;
///     let res = app.client.get(&app.url("/user/5")).await;
///     assert_eq!(res.status, 200);
///     assert_eq!(res.code(), 0);
/// }
/// ```
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: TestClient,
    pub db: DatabaseConnection,
    pub cache: CacheService,
    pub config: Config,
}

impl TestApp {
    /// Serve the given controllers with the test configuration.
    pub async fn new(controllers: Vec<Arc<dyn Controller>>) -> Self {
        Self::with_config(Self::config(), controllers).await
    }

    /// The configuration used by [`TestApp::new`].
    pub fn config() -> Config {
        Config {
            listen: "127.0.0.1:0".to_string(),
            environment: "test".to_string(),
            postgres: Some(PostgresConfig {
                url: Some("sqlite::memory:".to_string()),
                ..PostgresConfig::default()
            }),
            ..Config::default()
        }
    }

    /// Serve the given controllers with a custom config.
    pub async fn with_config(config: Config, controllers: Vec<Arc<dyn Controller>>) -> Self {
        let app = App::new(config)
            .await
            .expect("Failed to create test app")
            .controllers(controllers)
            .expect("Failed to compile test routes");
        Self::with_app(app).await
    }

    /// Serve an already assembled application (middleware, migrations...).
    pub async fn with_app(app: App) -> Self {
        let router = app.router();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestApp {
            addr,
            client: TestClient::new(addr),
            db: app.db,
            cache: app.cache,
            config: app.config,
        }
    }

    /// Get the full URL of `path` on the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// A simple HTTP test client with helper methods.
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
}

impl TestClient {
    /// Create a new test client pointing at the given address.
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
        }
    }

    pub async fn get(&self, url: &str) -> TestResponse {
        self.send(self.inner.get(url), "GET").await
    }

    pub async fn head(&self, url: &str) -> TestResponse {
        self.send(self.inner.head(url), "HEAD").await
    }

    pub async fn delete(&self, url: &str) -> TestResponse {
        self.send(self.inner.delete(url), "DELETE").await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: &str) -> TestResponse {
        self.send(json_body(self.inner.post(url), body), "POST").await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put(&self, url: &str, body: &str) -> TestResponse {
        self.send(json_body(self.inner.put(url), body), "PUT").await
    }

    /// Send a PATCH request with a JSON body.
    pub async fn patch(&self, url: &str, body: &str) -> TestResponse {
        self.send(json_body(self.inner.patch(url), body), "PATCH").await
    }

    /// Send a GET request with an extra header.
    pub async fn get_with_header(&self, url: &str, name: &str, value: &str) -> TestResponse {
        self.send(self.inner.get(url).header(name, value), "GET").await
    }

    async fn send(&self, req: reqwest::RequestBuilder, method: &str) -> TestResponse {
        let res = req
            .send()
            .await
            .unwrap_or_else(|e| panic!("{method} request failed: {e}"));
        TestResponse::from_response(res).await
    }

    /// Get the base URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_addr)
    }
}

fn json_body(req: reqwest::RequestBuilder, body: &str) -> reqwest::RequestBuilder {
    req.header("Content-Type", "application/json")
        .body(body.to_string())
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.text().await.unwrap_or_default();
        TestResponse {
            status,
            body,
            headers,
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    /// Parse the body as a response envelope.
    pub fn envelope(&self) -> Envelope {
        serde_json::from_str(&self.body).expect("Failed to parse response envelope")
    }

    /// The envelope `code`.
    pub fn code(&self) -> i64 {
        self.envelope().code
    }

    /// The envelope `msg`.
    pub fn msg(&self) -> String {
        self.envelope().msg
    }

    /// The envelope `data`; `Null` when absent.
    pub fn data(&self) -> serde_json::Value {
        self.json()["data"].clone()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
