//! Task endpoints: create, status lookup, status update, pending list,
//! cached final status and delete.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bloqueo_core::domain::{
    CacheEntry, CreateTaskRequest, Task, TaskStatus, TaskStatusView, Tid, Vdom,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ServerError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orquestador", post(create_task))
        .route("/get_status", get(get_status_missing_tid))
        .route("/get_status/", get(get_status_missing_tid))
        .route("/get_status/{tid}", get(get_status))
        .route("/update_status", get(update_status).post(update_status))
        .route("/pending_tasks", get(pending_tasks))
        .route("/final_status/{tid}", get(final_status))
        .route("/tasks/{tid}", delete(delete_task))
}

// ── Response / query shapes ──────────────────────────────────────────────────

/// `{success, data}` on a hit, `{success: false, error}` on a miss.
#[derive(Debug, Serialize)]
pub struct Lookup {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TaskStatusView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusParams {
    pub tid: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PendingParams {
    pub vdom: Option<String>,
}

/// Pending tasks plus the firewall coordinates the executor should use.
#[derive(Debug, Serialize)]
pub struct PendingTasksResponse {
    pub host: Option<String>,
    pub token: Option<String>,
    pub vdom: String,
    pub data: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct FinalStatusResponse {
    pub tid: Tid,
    #[serde(flatten)]
    pub entry: CacheEntry,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Task>, ServerError> {
    let request: CreateTaskRequest = serde_json::from_slice(&body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))?;
    let task = state.orchestrator.create_task(request).await?;
    Ok(Json(task))
}

async fn get_status_missing_tid() -> ServerError {
    ServerError::NotFound("parameter 'tid' is required".to_owned())
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(tid): Path<String>,
) -> Result<Json<Lookup>, ServerError> {
    let tid = Tid::from(tid);
    let lookup = match state.orchestrator.status(&tid).await? {
        Some(view) => Lookup {
            success: true,
            data: Some(view),
            error: None,
        },
        None => Lookup {
            success: false,
            data: None,
            error: Some(format!("no task found with tid: {tid}")),
        },
    };
    Ok(Json(lookup))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpdateStatusParams>,
) -> Result<Json<TaskStatusView>, ServerError> {
    let (Some(tid), Some(status)) = (
        params.tid.filter(|t| !t.is_empty()),
        params.status.filter(|s| !s.is_empty()),
    ) else {
        return Err(ServerError::BadRequest(
            "parameters 'tid' and 'status' are required".to_owned(),
        ));
    };
    let status = TaskStatus::from_str(&status)?;
    info!(tid = %tid, status = %status, "status update requested");

    let view = state
        .orchestrator
        .update_status(&Tid::from(tid), status)
        .await?;
    Ok(Json(view))
}

async fn pending_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PendingParams>,
) -> Result<Json<PendingTasksResponse>, ServerError> {
    let Some(raw) = params.vdom.filter(|v| !v.is_empty()) else {
        return Err(ServerError::NotFound("parameter 'vdom' is required".to_owned()));
    };
    let vdom = Vdom::parse(raw)?;
    let data = state.orchestrator.pending_tasks(&vdom).await;

    Ok(Json(PendingTasksResponse {
        host: state.config.firewall_host.clone(),
        token: state.config.firewall_token.clone(),
        vdom: vdom.to_string(),
        data,
    }))
}

async fn final_status(
    State(state): State<Arc<AppState>>,
    Path(tid): Path<String>,
) -> Result<Json<FinalStatusResponse>, ServerError> {
    let tid = Tid::from(tid);
    match state.orchestrator.final_status(&tid).await {
        Some(entry) => Ok(Json(FinalStatusResponse { tid, entry })),
        None => Err(ServerError::NotFound(format!(
            "no final status cached for tid: {tid}"
        ))),
    }
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(tid): Path<String>,
) -> Result<StatusCode, ServerError> {
    let tid = Tid::from(tid);
    if state.orchestrator.delete_task(&tid).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(format!("task not found: {tid}")))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use bloqueo_core::AppBuilder;
    use bloqueo_core::impls::InMemoryBlobStore;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_router() -> (Router, Arc<InMemoryBlobStore>) {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let app = AppBuilder::new(blobs.clone()).build().await.unwrap();
        let config = Config {
            firewall_host: Some("10.0.0.1".into()),
            firewall_token: Some("secret".into()),
            ..Config::default()
        };
        let state = Arc::new(AppState {
            config: Arc::new(config),
            orchestrator: app.orchestrator,
        });
        (crate::routes::build(state), blobs)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn create_body(vdom: &str) -> Body {
        Body::from(
            json!({
                "service": "fortigate",
                "vdom": vdom,
                "obj": "203.0.113.7",
                "gdr": "grp-1",
                "ticket": "INC-42",
                "action": "block"
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn full_task_lifecycle() {
        let (router, _) = test_router().await;

        let (status, task) = send(&router, Method::POST, "/api/orquestador", create_body("A")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["status"], "pending");
        assert_eq!(task["updated_at"], "");
        assert_eq!(task["app"], "tsmx-bloqueo-forti");
        let tid = task["tid"].as_str().unwrap().to_owned();
        assert!(tid.ends_with("-A"));

        let (status, lookup) =
            send(&router, Method::GET, &format!("/api/get_status/{tid}"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lookup, json!({"success": true, "data": {"tid": tid, "status": "pending"}}));

        let (_, pending) = send(&router, Method::GET, "/api/pending_tasks?vdom=A", Body::empty()).await;
        assert_eq!(pending["host"], "10.0.0.1");
        assert_eq!(pending["token"], "secret");
        assert_eq!(pending["vdom"], "A");
        assert_eq!(pending["data"].as_array().unwrap().len(), 1);

        let uri = format!("/api/update_status?tid={tid}&status=executed");
        let (status, view) = send(&router, Method::POST, &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view, json!({"tid": tid, "status": "executed"}));

        let (_, pending) = send(&router, Method::GET, "/api/pending_tasks?vdom=A", Body::empty()).await;
        assert!(pending["data"].as_array().unwrap().is_empty());

        let (status, cached) =
            send(&router, Method::GET, &format!("/api/final_status/{tid}"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cached["status"], "executed");
        assert_eq!(cached["cliente"], "A");

        let (status, _) =
            send(&router, Method::DELETE, &format!("/api/tasks/{tid}"), Body::empty()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, lookup) =
            send(&router, Method::GET, &format!("/api/get_status/{tid}"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lookup["success"], false);
        assert!(lookup["error"].as_str().unwrap().contains(&tid));
    }

    #[tokio::test]
    async fn create_with_missing_field_persists_nothing() {
        let (router, blobs) = test_router().await;
        let body = Body::from(json!({"service": "fortigate", "obj": "x"}).to_string());

        let (status, error) = send(&router, Method::POST, "/api/orquestador", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("vdom"));
        assert!(blobs.blob_names().await.is_empty());
    }

    #[tokio::test]
    async fn create_accepts_numeric_ticket_and_keeps_it() {
        let (router, _) = test_router().await;
        let body = Body::from(
            json!({
                "service": "fortigate",
                "vdom": "A",
                "obj": "203.0.113.7",
                "gdr": "grp-1",
                "ticket": 12345,
                "action": "block"
            })
            .to_string(),
        );

        let (status, task) = send(&router, Method::POST, "/api/orquestador", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["ticket"], 12345);

        let (_, pending) = send(&router, Method::GET, "/api/pending_tasks?vdom=A", Body::empty()).await;
        assert_eq!(pending["data"][0]["ticket"], 12345);
    }

    #[tokio::test]
    async fn create_with_malformed_json_is_bad_request() {
        let (router, _) = test_router().await;
        let (status, error) =
            send(&router, Method::POST, "/api/orquestador", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].is_string());
    }

    #[tokio::test]
    async fn get_status_without_tid_is_not_found() {
        let (router, _) = test_router().await;
        let (status, error) = send(&router, Method::GET, "/api/get_status", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(error["error"].is_string());
    }

    #[tokio::test]
    async fn unsplittable_tid_is_bad_request() {
        let (router, _) = test_router().await;
        let (status, _) = send(&router, Method::GET, "/api/get_status/nodash", Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_status_validates_parameters() {
        let (router, _) = test_router().await;

        let (status, _) = send(&router, Method::GET, "/api/update_status?tid=X-A", Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, error) = send(
            &router,
            Method::GET,
            "/api/update_status?tid=X-A&status=done",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("pending"));

        let (status, _) = send(
            &router,
            Method::GET,
            "/api/update_status?tid=01HZZZZZZZZZZZZZZZZZZZZZZZ-A&status=failed",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pending_tasks_requires_vdom() {
        let (router, _) = test_router().await;
        let (status, error) = send(&router, Method::GET, "/api/pending_tasks", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(error["error"].as_str().unwrap().contains("vdom"));
    }

    #[tokio::test]
    async fn final_status_unknown_tid_is_not_found() {
        let (router, _) = test_router().await;
        let (status, _) =
            send(&router, Method::GET, "/api/final_status/X-A", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_unknown_task_is_not_found() {
        let (router, _) = test_router().await;
        let (status, _) = send(&router, Method::DELETE, "/api/tasks/X-A", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_route_is_mounted() {
        let (router, _) = test_router().await;
        let (status, body) = send(&router, Method::GET, "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
