//! Calls to the backend's `/api/todos` routes.

use serde::Deserialize;
use shared::{CreateTaskRequest, Task, UpdateTaskRequest};
use uuid::Uuid;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{console, window, Request, RequestInit, Response};

const API_BASE: &str = "/api/todos";

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    pub message: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

async fn send(method: &str, url: &str, body: Option<String>) -> Result<String, String> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = &body {
        opts.set_body(&JsValue::from_str(body));
    }

    let request =
        Request::new_with_str_and_init(url, &opts).map_err(|_| "Failed to create request")?;
    if body.is_some() {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|_| "Failed to set header")?;
    }

    let promise = window()
        .ok_or("No window available")?
        .fetch_with_request(&request);

    let response: Response = JsFuture::from(promise)
        .await
        .map_err(|_| "Failed to send request")?
        .into();

    let text_promise = response.text().map_err(|_| "Failed to read response")?;
    let text = JsFuture::from(text_promise)
        .await
        .map_err(|_| "Failed to get text")?
        .as_string()
        .ok_or("Failed to convert to string")?;

    if !response.ok() {
        console::log_1(&format!("{} {} failed with {}: {}", method, url, response.status(), text).into());
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|e| e.message)
            .unwrap_or_else(|_| format!("Request failed with status {}", response.status()));
        return Err(message);
    }
    Ok(text)
}

fn parse<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, String> {
    serde_json::from_str(text).map_err(|e| format!("Failed to parse JSON: {}", e))
}

pub async fn fetch_tasks() -> Result<Vec<Task>, String> {
    let text = send("GET", API_BASE, None).await?;
    parse(&text)
}

pub async fn create_task(text: String) -> Result<Task, String> {
    let body = serde_json::to_string(&CreateTaskRequest { text })
        .map_err(|_| "Failed to serialize request")?;
    let text = send("POST", API_BASE, Some(body)).await?;
    parse(&text)
}

pub async fn update_task(id: Uuid, update: UpdateTaskRequest) -> Result<Task, String> {
    let body = serde_json::to_string(&update).map_err(|_| "Failed to serialize request")?;
    let text = send("PUT", &format!("{}/{}", API_BASE, id), Some(body)).await?;
    parse(&text)
}

pub async fn delete_task(id: Uuid) -> Result<(), String> {
    send("DELETE", &format!("{}/{}", API_BASE, id), None).await?;
    Ok(())
}

pub async fn summarize() -> Result<SummaryResponse, String> {
    let text = send("POST", &format!("{}/summarize", API_BASE), None).await?;
    parse(&text)
}
