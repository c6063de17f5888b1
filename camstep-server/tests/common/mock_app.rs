use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use tower::ServiceExt;

use camstep_embedded::DeviceConfig;
use camstep_server::app::create_app;
use camstep_server::configs::{Assets, Logger, Server, Settings, Update};
use camstep_server::services::DeviceService;

pub const INDEX_PAGE: &str = "<html><body>camera motor</body></html>";
pub const UPDATE_PASSWORD: &str = "secret";

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

pub struct MockApp {
    pub router: Router,
    pub device: DeviceService,
    pub dir: PathBuf,
}

pub struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl MockApp {
    pub fn new() -> Self {
        Self::with_config(DeviceConfig::default())
    }

    pub fn with_config(config: DeviceConfig) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "camstep-test-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), INDEX_PAGE).unwrap();

        let settings = Arc::new(Settings {
            server: Server {
                host: String::from("127.0.0.1"),
                port: 0,
            },
            logger: Logger {
                level: String::from("debug"),
            },
            motors: config.clone(),
            update: Update {
                password: String::from(UPDATE_PASSWORD),
                dir: dir.join("updates").to_string_lossy().to_string(),
            },
            assets: Assets {
                index_path: dir.join("index.html").to_string_lossy().to_string(),
            },
        });

        let device = DeviceService::new(config);
        let router = create_app(&settings, device.clone());

        Self {
            router,
            device,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> MockResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        MockResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    pub async fn get(&self, uri: &str) -> MockResponse {
        let request = Request::builder()
            .uri(uri)
            .method(Method::GET)
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    pub async fn upload(&self, uri: &str, password: Option<&str>, image: &[u8]) -> MockResponse {
        let mut request = Request::builder().uri(uri).method(Method::POST);
        if let Some(password) = password {
            request = request.header("X-Update-Password", password);
        }

        self.send(request.body(Body::from(image.to_vec())).unwrap()).await
    }

    pub async fn status(&self) -> serde_json::Value {
        let response = self.get("/status").await;
        assert_eq!(response.status, StatusCode::OK);
        serde_json::from_str(&response.body).unwrap()
    }
}

impl Drop for MockApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}
