use super::{ApiError, AppState};
use crate::config::OutputMode;
use crate::error::WorkbenchError;
use crate::selection::PageSelection;
use crate::session::{SessionConfig, SessionId};
use crate::toolkit::{MarkdownRequest, MergeRequest, OcrRequest, SplitRequest, TextOutput};
use crate::workspace::naming::upload_file_name;
use crate::workspace::LayoutPaths;
use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

type ApiResult<T> = Result<T, ApiError>;

const PDF_CONTENT_TYPES: [&str; 2] = ["application/pdf", "application/x-pdf"];
const DOWNLOAD_NOTE_HEADER: &str = "x-download-note";

// ============================================================================
// Health & sessions
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct SessionStarted {
    session_id: SessionId,
}

pub async fn start_session(State(state): State<AppState>) -> ApiResult<Json<SessionStarted>> {
    let session = state.store.create(SessionConfig::default())?;
    Ok(Json(SessionStarted {
        session_id: session.id,
    }))
}

#[derive(Serialize)]
pub struct SessionInfo {
    session_id: SessionId,
    created_at: DateTime<Utc>,
    paths: LayoutPaths,
}

pub async fn session_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionInfo>> {
    let id: SessionId = id.parse()?;
    let (session, workspace) = state.store.open_workspace(&id)?;
    Ok(Json(SessionInfo {
        session_id: session.id,
        created_at: session.created_at,
        paths: workspace.layout().clone(),
    }))
}

pub async fn destroy_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id: SessionId = id.parse()?;
    let existed = state.store.destroy(&id)?;
    Ok(Json(json!({
        "message": format!("Session {id} cleaned up"),
        "existed": existed,
    })))
}

// ============================================================================
// Upload
// ============================================================================

fn is_pdf_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    PDF_CONTENT_TYPES
        .iter()
        .any(|t| essence.eq_ignore_ascii_case(t))
}

pub async fn upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let toolkit = state.toolkit(&id)?;
    let input = toolkit.workspace().layout().input.clone();
    let mut saved: Vec<PathBuf> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        let Some(client_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().unwrap_or("").to_string();
        if !is_pdf_content_type(&content_type) {
            return Err(WorkbenchError::NotAPdf { name: client_name }.into());
        }

        let name = upload_file_name(&client_name)?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read '{client_name}': {e}")))?;

        let dest = input.join(&name);
        tokio::fs::write(&dest, &data)
            .await
            .map_err(|e| WorkbenchError::io(&dest, e))?;
        info!(session_id = %id, file = %name, bytes = data.len(), "Uploaded PDF");
        saved.push(dest);
    }

    if saved.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".into()));
    }
    Ok(Json(json!({
        "message": format!("Uploaded {} file(s)", saved.len()),
        "files": saved,
    })))
}

// ============================================================================
// Operations
// ============================================================================

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct OcrQuery {
    filename: Option<String>,
    #[serde(default = "default_true")]
    preprocess: bool,
    #[serde(default)]
    output: OutputMode,
    out_name: Option<String>,
}

pub async fn ocr(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OcrQuery>,
) -> ApiResult<Json<TextOutput>> {
    let toolkit = state.toolkit(&id)?;
    let req = OcrRequest {
        selector: query.filename,
        preprocess: query.preprocess,
        output: query.output,
        out_name: query.out_name,
    };
    let out = state.pool.run(move || toolkit.ocr_pdf(&req)).await?;
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
pub struct MarkdownQuery {
    filename: Option<String>,
    #[serde(default)]
    force_ocr: bool,
    #[serde(default)]
    output: OutputMode,
    out_name: Option<String>,
}

pub async fn to_markdown(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MarkdownQuery>,
) -> ApiResult<Json<Value>> {
    let toolkit = state.toolkit(&id)?;
    let req = MarkdownRequest {
        selector: query.filename,
        force_ocr: query.force_ocr,
        output: query.output,
        out_name: query.out_name,
    };
    let out = state.pool.run(move || toolkit.pdf_to_markdown(&req)).await?;
    Ok(Json(match out {
        TextOutput::Full { text, file_path } => {
            json!({ "markdown": text, "file_path": file_path })
        }
        TextOutput::Pages { pages, file_paths } => {
            json!({ "pages": pages, "file_paths": file_paths })
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct SplitQuery {
    filename: Option<String>,
    /// Comma-separated page numbers, e.g. `2,7,11`.
    pages: Option<String>,
    /// `start-end`; wins over `pages`.
    page_range: Option<String>,
    #[serde(default)]
    combined: bool,
}

pub async fn split_pages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SplitQuery>,
) -> ApiResult<Json<Value>> {
    let toolkit = state.toolkit(&id)?;
    let pages = query
        .pages
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(PageSelection::parse_list)
        .transpose()?;
    let selection = PageSelection::from_parts(pages, query.page_range.as_deref())?;
    let req = SplitRequest {
        selector: query.filename,
        selection,
        combined: query.combined,
    };
    let outputs = state.pool.run(move || toolkit.split_pages(&req)).await?;
    Ok(Json(json!({ "output_files": outputs })))
}

#[derive(Debug, Deserialize)]
pub struct MergeBody {
    filenames: Vec<String>,
    out_name: Option<String>,
}

pub async fn merge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MergeBody>,
) -> ApiResult<Json<Value>> {
    let toolkit = state.toolkit(&id)?;
    let req = MergeRequest {
        files: body.filenames,
        out_name: body.out_name,
    };
    let output = state.pool.run(move || toolkit.merge_pdfs(&req)).await?;
    Ok(Json(json!({ "output_file": output })))
}

// ============================================================================
// Download
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    name: Option<String>,
}

/// No `name`: zip everything. With `name`: best match by basename.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let toolkit = state.toolkit(&id)?;
    let artifacts = toolkit.artifacts();

    match query.name {
        None => {
            // Dropping the archive after it is read deletes it from temp/.
            let archive = state.pool.run(move || artifacts.zip_all()).await?;
            file_response(&archive, "application/zip", None).await
        }
        Some(name) => {
            let base = artifacts.layout().base.clone();
            let lookup = name.clone();
            let best = state.pool.run(move || artifacts.find_best(&lookup)).await?;
            let note = best.note(&base, &name);
            file_response(&best.path, "application/octet-stream", note).await
        }
    }
}

pub async fn download_path(
    State(state): State<AppState>,
    Path((id, rel)): Path<(String, String)>,
) -> ApiResult<Response> {
    let toolkit = state.toolkit(&id)?;
    let path = toolkit.artifacts().open_relative(&rel)?;
    file_response(&path, "application/octet-stream", None).await
}

async fn file_response(
    path: &std::path::Path,
    content_type: &'static str,
    note: Option<String>,
) -> ApiResult<Response> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| WorkbenchError::io(path, e))?;
    let filename = path
        .file_name()
        .map(|n| header_safe(&n.to_string_lossy()))
        .unwrap_or_else(|| "download".to_string());

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Body::from(bytes),
    )
        .into_response();

    if let Some(value) = note.and_then(|n| HeaderValue::from_str(&header_safe(&n)).ok()) {
        response.headers_mut().insert(DOWNLOAD_NOTE_HEADER, value);
    }
    Ok(response)
}

/// Header values must be visible ASCII; anything else becomes `_`.
fn header_safe(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_graphic() || c == ' ' {
                if c == '"' {
                    '_'
                } else {
                    c
                }
            } else {
                '_'
            }
        })
        .collect()
}
