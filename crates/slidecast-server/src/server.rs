//! `SlidecastServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use slidecast_core::ConnectionId;
use slidecast_slides::{Rasterizer, SlideLibrary};
use slidecast_store::SessionStore;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::http::slides;
use crate::hub::SessionHub;
use crate::lifecycle::LifecycleController;
use crate::router::MessageRouter;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::{ConnectParams, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection registry and whiteboard state.
    pub hub: Arc<SessionHub>,
    /// Session record transitions and admission.
    pub lifecycle: Arc<LifecycleController>,
    /// Inbound message dispatch.
    pub router: Arc<MessageRouter>,
    /// On-disk slide layout.
    pub library: Arc<SlideLibrary>,
    /// Document converter for uploads.
    pub rasterizer: Arc<dyn Rasterizer>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The slidecast server.
pub struct SlidecastServer {
    state: AppState,
}

impl SlidecastServer {
    /// Create a server over `store`, serving slides from `library`.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn SessionStore>,
        library: SlideLibrary,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        let hub = Arc::new(SessionHub::new());
        let lifecycle = Arc::new(LifecycleController::new(store));
        let router = Arc::new(MessageRouter::new(Arc::clone(&hub), Arc::clone(&lifecycle)));
        Self {
            state: AppState {
                hub,
                lifecycle,
                router,
                library: Arc::new(library),
                rasterizer,
                config: Arc::new(config),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                start_time: Instant::now(),
                metrics: None,
            },
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let upload_limit = self.state.config.max_upload_bytes;
        // browser clients open their socket on the bare origin
        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route(
                "/upload",
                post(slides::upload)
                    .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                    .layer(RequestBodyLimitLayer::new(upload_limit)),
            )
            .route("/slides/{session_id}/{file}", get(slides::slide))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.state.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.state.shutdown.token();
        info!(%addr, "slidecast listening");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server exited with error");
            }
        });
        Ok((addr, handle))
    }

    /// Connection registry and whiteboard state.
    pub fn hub(&self) -> &Arc<SessionHub> {
        &self.state.hub
    }

    /// Lifecycle controller.
    pub fn lifecycle(&self) -> &Arc<LifecycleController> {
        &self.state.lifecycle
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET / and GET /ws
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let conn_id = ConnectionId::new();
    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| run_ws_session(socket, conn_id, params, state))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let resp = health::health_check(
        state.start_time,
        state.hub.open_connections(),
        state.hub.registry.session_count(),
    );
    Json(resp)
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use slidecast_slides::{RasterOutcome, SlideError};
    use slidecast_store::MemorySessionStore;
    use std::path::Path;
    use tower::ServiceExt;

    /// Rasterizer that reports a fixed count without touching the file.
    struct FixedRasterizer(Option<u32>);

    #[async_trait]
    impl Rasterizer for FixedRasterizer {
        async fn convert(&self, pdf: &Path, _session_id: &str) -> slidecast_slides::Result<RasterOutcome> {
            assert!(pdf.exists(), "staged file must exist during conversion");
            match self.0 {
                Some(slide_count) => Ok(RasterOutcome { slide_count }),
                None => Err(SlideError::Rasterize {
                    status: "exit status: 1".into(),
                    stderr: "broken pdf".into(),
                }),
            }
        }
    }

    fn make_server(dir: &Path, outcome: Option<u32>) -> SlidecastServer {
        SlidecastServer::new(
            ServerConfig::default(),
            Arc::new(MemorySessionStore::new()),
            SlideLibrary::new(dir.join("slides"), dir.join("uploads")),
            Arc::new(FixedRasterizer(outcome)),
        )
    }

    async fn fetch(app: Router, uri: &str) -> Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(req).await.unwrap()
    }

    const BOUNDARY: &str = "slidecast-test-boundary";

    /// Build a `multipart/form-data` body from `(name, file name, content)`
    /// parts; a `None` file name makes a plain form field.
    fn form(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    /// The browser's layout: file first, then the session id.
    fn deck_form(session_id: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
        form(&[
            ("sessionFile", Some(file_name), content),
            ("sessionId", None, session_id.as_bytes()),
        ])
    }

    async fn upload(app: Router, body: Vec<u8>) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn server_with_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path(), Some(1));
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 0);
        assert!(!server.shutdown().token().is_cancelled());
        assert_eq!(server.hub().open_connections(), 0);
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let resp = fetch(make_server(dir.path(), Some(1)).router(), "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["active_sessions"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let dir = tempfile::tempdir().unwrap();
        let resp = fetch(make_server(dir.path(), Some(1)).router(), "/nonexistent").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_without_upgrade_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_server(dir.path(), Some(1)).router();
        for uri in ["/ws?role=teacher", "/?role=teacher", "/?clientId=c1"] {
            let resp = fetch(app.clone(), uri).await;
            assert!(resp.status().is_client_error(), "{uri}");
            assert_ne!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn metrics_absent_without_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let resp = fetch(make_server(dir.path(), Some(1)).router(), "/metrics").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_rendered_with_handle() {
        let dir = tempfile::tempdir().unwrap();
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let server = make_server(dir.path(), Some(1)).with_metrics(handle);
        let resp = fetch(server.router(), "/metrics").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn slide_requests_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_server(dir.path(), Some(1)).router();
        for uri in ["/slides/ABC/notes.txt", "/slides/ABC/slide-01.jpg", "/slides/..%2Fetc/slide-01.png"] {
            let resp = fetch(app.clone(), uri).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
        let resp = fetch(app, "/slides/ABC/slide-01.png").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn slide_served_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let session_dir = dir.path().join("slides").join("ABC");
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(session_dir.join("slide-02.png"), b"\x89PNG").unwrap();

        let resp = fetch(make_server(dir.path(), Some(1)).router(), "/slides/ABC/slide-02.png").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        assert_eq!(&body[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn upload_rejects_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_server(dir.path(), Some(3)).router();

        let (status, body) = upload(app.clone(), deck_form("S1", "deck.pptx", b"data")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"success": false, "message": "Only PDF files are allowed."}));

        let (status, body) = upload(app.clone(), deck_form("S1", "deck.pdf", b"")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file uploaded.");

        let (status, body) = upload(app.clone(), form(&[("sessionId", None, b"S1")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file uploaded.");

        let (status, body) = upload(app.clone(), deck_form("..", "deck.pdf", b"data")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid session id.");

        let (status, body) = upload(app.clone(), form(&[("sessionFile", Some("deck.pdf"), b"data")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid session id.");

        // a raw body is not a form
        let req = Request::builder()
            .method("POST")
            .uri("/upload?sessionId=S1&fileName=deck.pdf")
            .body(Body::from("%PDF-1.4"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_accepts_fields_in_any_order() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_server(dir.path(), Some(2)).router();
        let body = form(&[
            ("sessionId", None, b"S2"),
            ("note", None, b"ignored"),
            ("sessionFile", Some("Lecture 1.PDF"), b"%PDF-1.4"),
        ]);
        let (status, body) = upload(app, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"success": true, "slideCount": 2}));
    }

    #[tokio::test]
    async fn upload_reports_slide_count_and_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_server(dir.path(), Some(3)).router();
        let (status, body) = upload(app, deck_form("S1", "deck.pdf", b"%PDF-1.4")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"success": true, "slideCount": 3}));
        let leftovers = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn upload_failure_is_500_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_server(dir.path(), None).router();
        let (status, body) = upload(app, deck_form("S1", "deck.pdf", b"%PDF-1.4")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Failed to process PDF.");
        let leftovers = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
