use axum::{
    extract::{Path, State},
    Json,
    http::StatusCode,
};
use serde::Serialize;
use crate::auth::{SessionData, SignOutResponse, UserData, AuthResponse};
use crate::rpc::{RpcDispatcher, RpcParams, RpcResult};
use crate::server::AppState;
use crate::storage::{migrations, AppliedMigration, Store};
use std::sync::Arc;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal(message: impl ToString) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: message.to_string() }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub snapshot_path: String,
    pub exists: bool,
    pub migrations: Vec<AppliedMigration>,
}

/// Run `f` against the store on the blocking pool, one caller at a time
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> crate::Result<T> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || {
        let guard = store.lock().map_err(|_| internal("store lock poisoned"))?;
        f(&guard).map_err(|e| {
            tracing::error!("Store operation failed: {}", e);
            internal(e)
        })
    })
    .await
    .map_err(internal)?
}

pub async fn call_rpc(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(params): Json<RpcParams>,
) -> Result<Json<RpcResult>, ApiError> {
    let result = with_store(&state, move |store| RpcDispatcher::new(store).handle(&name, &params)).await?;
    Ok(Json(result))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let status = with_store(&state, |store| {
        Ok(StatusResponse {
            snapshot_path: store.snapshot_path().display().to_string(),
            exists: store.exists(),
            migrations: migrations::applied_migrations(store)?,
        })
    })
    .await?;
    Ok(Json(status))
}

pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<AuthResponse<SessionData>> {
    Json(state.auth.get_session())
}

pub async fn get_user(State(state): State<Arc<AppState>>) -> Json<AuthResponse<UserData>> {
    Json(state.auth.get_user())
}

pub async fn sign_out(State(state): State<Arc<AppState>>) -> Json<SignOutResponse> {
    Json(state.auth.sign_out())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DesktopAuth;
    use crate::server::router;
    use crate::storage::SnapshotLocation;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(dir: &std::path::Path) -> axum::Router {
        let store = Store::new(SnapshotLocation::new(dir));
        store
            .execute_batch(
                "CREATE TABLE families (id TEXT PRIMARY KEY, father_id TEXT, mother_id TEXT);
                 CREATE TABLE children (family_id TEXT, person_id TEXT);
                 INSERT INTO families VALUES ('f1', 'p1', NULL);
                 INSERT INTO children VALUES ('f1', 'p2');",
            )
            .unwrap();
        router(Arc::new(AppState::new(store, Arc::new(DesktopAuth::new()))))
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_rpc_route_envelopes() {
        let dir = tempfile::tempdir().unwrap();

        let (status, body) = send(
            app(dir.path()),
            post_json("/rpc/is_person_in_subtree", json!({"root_id": "p1", "target_id": "p2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"data": true, "error": null}));

        let (_, body) = send(
            app(dir.path()),
            post_json("/rpc/is_person_in_subtree", json!({"root_id": "p1"})),
        )
        .await;
        assert_eq!(body, json!({"data": null, "error": {"message": "Missing root_id or target_id"}}));

        let (_, body) = send(app(dir.path()), post_json("/rpc/foo", json!({}))).await;
        assert_eq!(body["error"]["message"], "Unknown RPC function: foo");
    }

    #[tokio::test]
    async fn test_auth_session_route() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder().uri("/auth/session").body(Body::empty()).unwrap();

        let (status, body) = send(app(dir.path()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["session"]["user"]["id"], crate::auth::DESKTOP_USER_ID);
        assert_eq!(body["error"], Value::Null);
    }

    #[tokio::test]
    async fn test_status_route() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder().uri("/status").body(Body::empty()).unwrap();

        let (status, body) = send(app(dir.path()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exists"], false);
        assert_eq!(body["migrations"], json!([]));
    }
}
