//! Direct HTTP access to the sandboxed file tools.
//!
//! - `GET  /api/file-tools/config` — configured roots
//! - `POST /api/file-tools/list`   — list a directory
//! - `POST /api/file-tools/read`   — read a text file
//! - `POST /api/file-tools/create` — create a file under `output/`
//! - `POST /api/file-tools/edit`   — replace or append to a file

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use stepwise_tools::files::{FileContent, FileError, FileList, FileOperation};
use tracing::{error, info};

use crate::SharedState;

pub fn files_router() -> Router<SharedState> {
    Router::new()
        .route("/config", get(config_handler))
        .route("/list", post(list_handler))
        .route("/read", post(read_handler))
        .route("/create", post(create_handler))
        .route("/edit", post(edit_handler))
}

#[derive(Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub knowledge_base_path: String,
    pub output_path: String,
    pub available_directories: Vec<String>,
}

#[derive(Deserialize)]
struct ListRequest {
    directory: String,
}

#[derive(Deserialize)]
struct ReadRequest {
    filepath: String,
}

#[derive(Deserialize)]
struct CreateRequest {
    filepath: String,
    content: String,
}

#[derive(Deserialize)]
struct EditRequest {
    filepath: String,
    content: String,
    #[serde(default)]
    append: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Caller mistakes are 400s; I/O trouble is a 500 without internals.
fn api_error(op: &str, e: FileError) -> ApiError {
    match e {
        FileError::Io { .. } => {
            error!(operation = op, error = %e, "File operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    detail: format!("Failed to {op} file"),
                }),
            )
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                detail: other.to_string(),
            }),
        ),
    }
}

async fn config_handler(State(state): State<SharedState>) -> Json<DirectoryConfig> {
    let roots = state.files.roots();
    Json(DirectoryConfig {
        knowledge_base_path: roots.knowledge_base().display().to_string(),
        output_path: roots.output().display().to_string(),
        available_directories: vec!["knowledge_base".into(), "output".into()],
    })
}

async fn list_handler(
    State(state): State<SharedState>,
    Json(req): Json<ListRequest>,
) -> Result<Json<FileList>, ApiError> {
    info!(directory = %req.directory, "File API list");
    state
        .files
        .list(&req.directory)
        .await
        .map(Json)
        .map_err(|e| api_error("list", e))
}

async fn read_handler(
    State(state): State<SharedState>,
    Json(req): Json<ReadRequest>,
) -> Result<Json<FileContent>, ApiError> {
    info!(filepath = %req.filepath, "File API read");
    state
        .files
        .read(&req.filepath)
        .await
        .map(Json)
        .map_err(|e| api_error("read", e))
}

async fn create_handler(
    State(state): State<SharedState>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<FileOperation>, ApiError> {
    info!(filepath = %req.filepath, "File API create");
    state
        .files
        .create(&req.filepath, &req.content)
        .await
        .map(Json)
        .map_err(|e| api_error("create", e))
}

async fn edit_handler(
    State(state): State<SharedState>,
    Json(req): Json<EditRequest>,
) -> Result<Json<FileOperation>, ApiError> {
    info!(filepath = %req.filepath, append = req.append, "File API edit");
    state
        .files
        .edit(&req.filepath, &req.content, req.append)
        .await
        .map(Json)
        .map_err(|e| api_error("edit", e))
}
