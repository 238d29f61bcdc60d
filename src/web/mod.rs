//! HTTP server module

mod api;
mod dashboard;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::session::SessionManager;

pub use api::{ApiResponse, InitRequest, SendRequest};

/// Shared state handed to every handler
pub struct AppState {
    pub manager: Arc<SessionManager>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/api/init", post(api::init))
        .route("/api/status/{school_id}", get(api::status))
        .route("/api/sessions", get(api::list_sessions))
        .route("/api/send", post(api::send))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Pacing;
    use crate::engine::testing::{FakeEngine, FakeFactory};
    use crate::session::{ClientEvent, ManagerConfig, SessionState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn router(temp: &TempDir) -> (Router, Arc<SessionManager>, Arc<FakeEngine>) {
        let (factory, engine) = FakeFactory::new();
        let mut config = ManagerConfig::new(temp.path());
        config.pacing = Pacing::none();
        let manager = Arc::new(SessionManager::new(Arc::new(factory), config));
        let router = create_router(Arc::new(AppState::new(manager.clone())));
        (router, manager, engine)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_served() {
        let temp = TempDir::new().unwrap();
        let (router, _, _) = router(&temp);
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_of_unknown_school() {
        let temp = TempDir::new().unwrap();
        let (router, _, _) = router(&temp);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/status/ghost_school")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            serde_json::json!({ "exists": false, "isReady": false, "qrCode": null })
        );
    }

    #[tokio::test]
    async fn test_init_requires_school_id() {
        let temp = TempDir::new().unwrap();
        let (router, _, _) = router(&temp);
        let response = router
            .oneshot(post_json("/api/init", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_init_accepts_numeric_school_id() {
        let temp = TempDir::new().unwrap();
        let (router, manager, _) = router(&temp);

        let response = router
            .clone()
            .oneshot(post_json("/api/init", serde_json::json!({ "schoolId": 101 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["success"], true);
        assert!(manager.status("101").exists);

        let response = router
            .oneshot(post_json("/api/init", serde_json::json!({ "schoolId": true })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_init_then_status_shows_pairing_code() {
        let temp = TempDir::new().unwrap();
        let (router, manager, engine) = router(&temp);

        let response = router
            .clone()
            .oneshot(post_json(
                "/api/init",
                serde_json::json!({ "schoolId": "school_001" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["success"], true);

        let handle = manager.initialize("school_001").unwrap();
        engine
            .emit(
                "school_001",
                ClientEvent::PairingCodeIssued {
                    code: "CODE123".to_string(),
                },
            )
            .await;
        handle
            .subscribe()
            .wait_for(|s| matches!(s, SessionState::AwaitingLink { .. }))
            .await
            .unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/status/school_001")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            read_json(response).await,
            serde_json::json!({ "exists": true, "isReady": false, "qrCode": "CODE123" })
        );
    }

    #[tokio::test]
    async fn test_send_validation_and_readiness() {
        let temp = TempDir::new().unwrap();
        let (router, manager, engine) = router(&temp);

        let response = router
            .clone()
            .oneshot(post_json(
                "/api/send",
                serde_json::json!({ "schoolId": "school_001", "phoneNumber": "923001234567" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Missing required fields");

        let full = serde_json::json!({
            "schoolId": "school_001",
            "phoneNumber": "923001234567",
            "studentName": "Ali Khan",
            "amount": 5000,
            "dueDate": "2024-05-01"
        });
        let response = router
            .clone()
            .oneshot(post_json("/api/send", full.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let handle = manager.initialize("school_001").unwrap();
        engine.emit("school_001", ClientEvent::Linked).await;
        handle.wait_ready().await.unwrap();

        let response = router.oneshot(post_json("/api/send", full)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["success"], true);
        assert!(engine.sent()[0].body.contains("*Amount:* PKR 5000"));
    }
}
