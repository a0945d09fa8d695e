use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use shared::{normalize_text, CreateTaskRequest, Task, UpdateTaskRequest};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::message::{TaskAction, WebhookMessage};
use crate::notify::{safe_notify, Notifier};
use crate::store::TaskStore;
use crate::summarize::{SummaryOutcome, Summarizer};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    summarizer: Summarizer,
    notify_actions: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TaskStore>,
        notifier: Arc<dyn Notifier>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            store,
            notifier,
            summarizer,
            notify_actions: false,
        }
    }

    /// Also post a notice to the webhook for every create, update and delete.
    pub fn with_action_notifications(mut self, enabled: bool) -> Self {
        self.notify_actions = enabled;
        self
    }

    async fn announce(&self, action: TaskAction, task_text: &str) {
        if !self.notify_actions {
            return;
        }
        let now = chrono::Local::now().naive_local();
        let message = WebhookMessage::action(action, task_text, None, &now);
        safe_notify(self.notifier.as_ref(), "Failed to send action notification", || {
            self.notifier.send(&message)
        })
        .await;
    }
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/todos", get(list_tasks).post(create_task))
        .route("/api/todos/summarize", post(summarize))
        .route("/api/todos/:id", put(update_task).delete(delete_task))
        .route("/api/summary", post(summarize))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.store.list().await?;
    debug!(count = tasks.len(), "listed tasks");
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = Task::new(&payload.text)?;
    state.store.save(&task).await?;
    info!(id = %task.id, "task created");

    state.announce(TaskAction::Added, &task.text).await;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    ApiPath(id): ApiPath<Uuid>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    // reject bad text before touching the store
    if let Some(text) = &payload.text {
        normalize_text(text)?;
    }

    let mut task = state.store.get(id).await?.ok_or(ApiError::NotFound)?;
    let was_completed = task.completed;

    task.apply(payload)?;
    state.store.save(&task).await?;
    info!(%id, completed = task.completed, "task updated");

    let action = match (was_completed, task.completed) {
        (false, true) => TaskAction::Completed,
        (true, false) => TaskAction::Uncompleted,
        _ => TaskAction::Updated,
    };
    state.announce(action, &task.text).await;
    Ok(Json(task))
}

/// Succeeds whether or not the id matched; deleting is idempotent. An id
/// that is not a uuid cannot match anything.
async fn delete_task(
    ApiPath(raw_id): ApiPath<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let deleted = Json(json!({ "message": "Todo deleted successfully" }));
    let Ok(id) = raw_id.parse::<Uuid>() else {
        debug!(id = %raw_id, "delete of malformed id ignored");
        return Ok(deleted);
    };

    let existing = state.store.get(id).await?;
    let removed = state.store.delete(id).await?;
    info!(%id, removed, "task deleted");

    if let Some(task) = existing.filter(|_| removed) {
        state.announce(TaskAction::Deleted, &task.text).await;
    }
    Ok(deleted)
}

async fn summarize(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    let response = match state.summarizer.run().await? {
        SummaryOutcome::Empty => MessageResponse {
            message: "No todos to summarize",
            summary: None,
        },
        SummaryOutcome::Sent { summary } => MessageResponse {
            message: "Summary sent to Slack successfully",
            summary: Some(summary),
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTaskStore;
    use crate::testing::{FailingNotifier, RecordingNotifier};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        store: Arc<MemoryTaskStore>,
        notifier: Arc<RecordingNotifier>,
    }

    fn test_app(notify_actions: bool) -> TestApp {
        let store = Arc::new(MemoryTaskStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let summarizer = Summarizer::new(store.clone(), notifier.clone());
        let state = AppState::new(store.clone(), notifier.clone(), summarizer)
            .with_action_notifications(notify_actions);
        TestApp {
            router: router(state),
            store,
            notifier,
        }
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = test_app(false);
        let (status, body) = call(&app.router, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
    }

    #[tokio::test]
    async fn create_trims_text_and_returns_201() {
        let app = test_app(false);
        let (status, body) =
            call(&app.router, "POST", "/api/todos", Some(json!({ "text": "  buy milk  " }))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["text"], "buy milk");
        assert_eq!(body["completed"], false);
        assert_eq!(body["created_at"], body["updated_at"]);

        let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
        assert!(app.store.get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn blank_text_is_rejected_and_not_persisted() {
        let app = test_app(false);
        for body in [json!({ "text": "" }), json!({ "text": "   " }), json!({})] {
            let (status, json) = call(&app.router, "POST", "/api/todos", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["message"], "Todo text is required");
        }
        assert_eq!(app.store.len().await, 0);
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let app = test_app(false);
        call(&app.router, "POST", "/api/todos", Some(json!({ "text": "A" }))).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        call(&app.router, "POST", "/api/todos", Some(json!({ "text": "B" }))).await;

        let (status, body) = call(&app.router, "GET", "/api/todos", None).await;
        assert_eq!(status, StatusCode::OK);
        let texts: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, ["B", "A"]);
    }

    #[tokio::test]
    async fn toggle_changes_only_completion_and_updated_at() {
        let app = test_app(false);
        let task = Task::new("walk dog").unwrap();
        app.store.save(&task).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let (status, body) = call(
            &app.router,
            "PUT",
            &format!("/api/todos/{}", task.id),
            Some(json!({ "completed": true })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let updated: Task = serde_json::from_value(body).unwrap();
        assert!(updated.completed);
        assert_eq!(updated.text, task.text);
        assert_eq!(updated.created_at, task.created_at);
        assert!(updated.updated_at > task.updated_at);
    }

    #[tokio::test]
    async fn update_unknown_id_is_404_and_changes_nothing() {
        let app = test_app(false);
        let task = Task::new("keep me").unwrap();
        app.store.save(&task).await.unwrap();

        let (status, body) = call(
            &app.router,
            "PUT",
            &format!("/api/todos/{}", Uuid::new_v4()),
            Some(json!({ "text": "other" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Todo not found");
        assert_eq!(app.store.list().await.unwrap(), vec![task]);
    }

    #[tokio::test]
    async fn update_with_blank_text_is_400() {
        let app = test_app(false);
        let task = Task::new("keep me").unwrap();
        app.store.save(&task).await.unwrap();

        let (status, _) = call(
            &app.router,
            "PUT",
            &format!("/api/todos/{}", task.id),
            Some(json!({ "text": "  " })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.store.get(task.id).await.unwrap().unwrap(), task);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let app = test_app(false);
        let keep = Task::new("keep").unwrap();
        let drop = Task::new("drop").unwrap();
        app.store.save(&keep).await.unwrap();
        app.store.save(&drop).await.unwrap();
        let uri = format!("/api/todos/{}", drop.id);

        for _ in 0..2 {
            let (status, body) = call(&app.router, "DELETE", &uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["message"], "Todo deleted successfully");
        }
        assert_eq!(app.store.list().await.unwrap(), vec![keep]);
    }

    #[tokio::test]
    async fn malformed_requests_answer_with_json_messages() {
        let app = test_app(false);

        let (status, body) = call(
            &app.router,
            "PUT",
            "/api/todos/not-a-uuid",
            Some(json!({ "completed": true })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("UUID"));

        let (status, body) =
            call(&app.router, "POST", "/api/todos", Some(json!({ "text": 5 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].is_string());

        let request = Request::builder()
            .method("POST")
            .uri("/api/todos")
            .body(Body::from(r#"{"text":"no header"}"#))
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].as_str().unwrap().contains("Content-Type"));

        assert_eq!(app.store.len().await, 0);
    }

    #[tokio::test]
    async fn delete_of_malformed_id_still_succeeds() {
        let app = test_app(false);
        let task = Task::new("untouched").unwrap();
        app.store.save(&task).await.unwrap();

        let (status, body) = call(&app.router, "DELETE", "/api/todos/not-a-uuid", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Todo deleted successfully");
        assert_eq!(app.store.len().await, 1);
    }

    #[tokio::test]
    async fn summarize_empty_collection_does_not_notify() {
        let app = test_app(false);
        for uri in ["/api/todos/summarize", "/api/summary"] {
            let (status, body) = call(&app.router, "POST", uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["message"], "No todos to summarize");
            assert!(body.get("summary").is_none());
        }
        assert!(app.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn summarize_sends_report() {
        let app = test_app(false);
        app.store.save(&Task::new("pay rent").unwrap()).await.unwrap();

        let (status, body) = call(&app.router, "POST", "/api/todos/summarize", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Summary sent to Slack successfully");
        assert_eq!(body["summary"], "• ⃝ pay rent");
        assert_eq!(app.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn summarize_failure_is_generic_500() {
        let store = Arc::new(MemoryTaskStore::new());
        store.save(&Task::new("x").unwrap()).await.unwrap();
        let notifier = Arc::new(FailingNotifier);
        let summarizer = Summarizer::new(store.clone(), notifier.clone());
        let app = router(AppState::new(store, notifier, summarizer));

        let (status, body) = call(&app, "POST", "/api/summary", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to generate summary");
    }

    #[tokio::test]
    async fn action_notifications_follow_mutations() {
        let app = test_app(true);
        let (_, created) =
            call(&app.router, "POST", "/api/todos", Some(json!({ "text": "file taxes" }))).await;
        let uri = format!("/api/todos/{}", created["id"].as_str().unwrap());
        call(&app.router, "PUT", &uri, Some(json!({ "completed": true }))).await;
        call(&app.router, "DELETE", &uri, None).await;
        call(&app.router, "DELETE", &uri, None).await;

        let texts: Vec<String> = app.notifier.sent().into_iter().map(|m| m.text).collect();
        assert_eq!(
            texts,
            [
                "➕ Todo Added: file taxes",
                "✅ Todo Completed: file taxes",
                "🗑️ Todo Deleted: file taxes",
            ]
        );
    }

    #[tokio::test]
    async fn failed_action_notification_does_not_fail_request() {
        let store = Arc::new(MemoryTaskStore::new());
        let notifier = Arc::new(FailingNotifier);
        let summarizer = Summarizer::new(store.clone(), notifier.clone());
        let app = router(
            AppState::new(store.clone(), notifier, summarizer).with_action_notifications(true),
        );

        let (status, _) = call(&app, "POST", "/api/todos", Some(json!({ "text": "still saved" }))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(store.len().await, 1);
    }
}
