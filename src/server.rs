use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    adjustment::handlers::{get_month_status, list_adjustments},
    api::handler::{health_check, AppState},
    users::handlers::{change_balance, create_user, delete_user, get_user, list_users, update_user},
};

pub fn create_app(state: AppState, request_timeout: Duration) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        .route("/health", get(health_check))
        // Users
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/:id/balance", post(change_balance))
        // Monthly adjustment log
        .route("/adjustments", get(list_adjustments))
        .route("/adjustments/:year_month", get(get_month_status))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

/// Serves until SIGINT/SIGTERM, then cancels `shutdown` so background tasks
/// wind down with the server.
pub async fn run_server(
    app: Router,
    bind_address: &str,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::adjustment::engine::CatchUpReport;
    use crate::bootstrap::{build_components, AppComponents};
    use crate::test_support::memory_pool;

    async fn test_components() -> AppComponents {
        build_components(memory_pool().await, Duration::from_secs(5))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_reports_empty_log() {
        let app = create_app(test_components().await.state, Duration::from_secs(5));

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["last_processed_month"], Value::Null);
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let app = create_app(test_components().await.state, Duration::from_secs(5));

        let (status, created) = send(
            &app,
            "POST",
            "/users",
            Some(json!({
                "user_name": "ana",
                "current_amount": 10000,
                "monthly_inputs": 5000,
                "monthly_outputs": 3000
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["current_amount"], 10000);

        let (status, fetched) = send(&app, "GET", &format!("/users/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["user_name"], "ana");

        let (status, patched) = send(
            &app,
            "PATCH",
            &format!("/users/{}", id),
            Some(json!({ "monthly_outputs": 1000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["monthly_outputs"], 1000);
        assert_eq!(patched["monthly_inputs"], 5000);

        let (status, debited) = send(
            &app,
            "POST",
            &format!("/users/{}/balance", id),
            Some(json!({ "amount": 2500, "is_debt": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(debited["current_amount"], 7500);

        let (status, credited) = send(
            &app,
            "POST",
            &format!("/users/{}/balance", id),
            Some(json!({ "amount": 500 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(credited["current_amount"], 8000);

        let (_, listed) = send(&app, "GET", "/users", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, deleted) = send(&app, "DELETE", &format!("/users/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["rows_affected"], 1);

        let (status, _) = send(&app, "GET", &format!("/users/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let app = create_app(test_components().await.state, Duration::from_secs(5));

        let (status, body) = send(&app, "GET", "/users/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_code"], "NOT_FOUND");

        let (status, _) = send(
            &app,
            "POST",
            "/users/42/balance",
            Some(json!({ "amount": 100, "is_debt": false })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "PATCH", "/users/42", Some(json!({ "user_name": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_overflowing_balance_change_is_rejected() {
        let app = create_app(test_components().await.state, Duration::from_secs(5));

        let (_, created) = send(
            &app,
            "POST",
            "/users",
            Some(json!({ "user_name": "max", "current_amount": i64::MAX - 10 })),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/users/{}/balance", id),
            Some(json!({ "amount": 100 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "INVALID_INPUT");

        let (status, listed) = send(&app, "GET", "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["current_amount"], i64::MAX - 10);
    }

    #[tokio::test]
    async fn test_malformed_month_is_bad_request() {
        let app = create_app(test_components().await.state, Duration::from_secs(5));

        let (status, body) = send(&app, "GET", "/adjustments/2025-13", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "INVALID_MONTH");
        assert_eq!(body["details"]["input"], "2025-13");

        let (status, body) = send(&app, "GET", "/adjustments/2025-07", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["year_month"], "2025-07");
        assert_eq!(body["processed"], false);
    }

    #[tokio::test]
    async fn test_adjustments_reflect_engine_runs() {
        let components = test_components().await;
        let app = create_app(components.state.clone(), Duration::from_secs(5));

        let month = match components.engine.catch_up().await.unwrap() {
            CatchUpReport::Baseline { month } => month,
            other => panic!("first run must record a baseline, got {:?}", other),
        };

        let (status, body) = send(&app, "GET", "/adjustments", None).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["year_month"], month.to_string());
        assert_eq!(entries[0]["adjusted"], false);

        let (_, status_body) =
            send(&app, "GET", &format!("/adjustments/{}", month), None).await;
        assert_eq!(status_body["processed"], true);

        let (_, health) = send(&app, "GET", "/health", None).await;
        assert_eq!(health["last_processed_month"], month.to_string());
    }
}
