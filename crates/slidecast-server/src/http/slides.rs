//! Slide deck upload and slide image serving.

use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use metrics::counter;
use serde::Serialize;
use slidecast_slides::{SlideError, is_pdf_name, is_valid_session_id, parse_slide_file_name};
use tracing::{debug, info, warn};

use crate::metrics::SLIDE_UPLOADS_TOTAL;
use crate::server::AppState;

/// Form field carrying the PDF.
pub const FILE_FIELD: &str = "sessionFile";

/// Form field carrying the session id.
pub const SESSION_FIELD: &str = "sessionId";

/// Fields of a `POST /upload` form. Clients may send them in any order.
#[derive(Debug, Default)]
struct UploadForm {
    session_id: String,
    file_name: String,
    file: Option<Bytes>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(FILE_FIELD) => {
                    form.file_name = field.file_name().unwrap_or_default().to_owned();
                    form.file = Some(field.bytes().await?);
                }
                Some(SESSION_FIELD) => form.session_id = field.text().await?,
                other => debug!(field = ?other, "ignoring upload field"),
            }
        }
        Ok(form)
    }
}

/// Body of every `/upload` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReply {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    slide_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn failure(status: StatusCode, message: &str) -> Response {
    let outcome = if status.is_client_error() { "rejected" } else { "failed" };
    counter!(SLIDE_UPLOADS_TOTAL, "outcome" => outcome).increment(1);
    let reply = UploadReply {
        success: false,
        slide_count: None,
        message: Some(message.to_owned()),
    };
    (status, Json(reply)).into_response()
}

/// POST /upload: a `multipart/form-data` body with the PDF in `sessionFile`
/// and the target session in `sessionId`. Stages the PDF, rasterizes it into
/// the session's slide directory and reports the slide count.
pub async fn upload(State(state): State<AppState>, multipart: Result<Multipart, MultipartRejection>) -> Response {
    let form = match multipart {
        Ok(multipart) => UploadForm::read(multipart).await,
        Err(rejection) => {
            debug!(error = %rejection, "upload is not a multipart form");
            return failure(StatusCode::BAD_REQUEST, "No file uploaded.");
        }
    };
    let form = match form {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "malformed upload form");
            return failure(e.status(), "Invalid upload.");
        }
    };

    let Some(file) = form.file.as_ref().filter(|f| !f.is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, "No file uploaded.");
    };
    if !is_valid_session_id(&form.session_id) {
        return failure(StatusCode::BAD_REQUEST, "Invalid session id.");
    }
    if !is_pdf_name(&form.file_name) {
        return failure(StatusCode::BAD_REQUEST, "Only PDF files are allowed.");
    }

    match convert(&state, &form.session_id, &form.file_name, file).await {
        Ok(slide_count) => {
            counter!(SLIDE_UPLOADS_TOTAL, "outcome" => "converted").increment(1);
            info!(session_id = %form.session_id, slide_count, "deck converted");
            let reply = UploadReply {
                success: true,
                slide_count: Some(slide_count),
                message: None,
            };
            (StatusCode::OK, Json(reply)).into_response()
        }
        Err(e) => {
            warn!(session_id = %form.session_id, error = %e, "deck conversion failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process PDF.")
        }
    }
}

async fn convert(state: &AppState, session_id: &str, file_name: &str, body: &[u8]) -> Result<u32, SlideError> {
    state.library.ensure_dirs().await?;
    let staged = state.library.staging_path(file_name);
    tokio::fs::write(&staged, body).await?;

    let outcome = state.rasterizer.convert(&staged, session_id).await;

    // the staged copy goes whatever the outcome
    if let Err(e) = tokio::fs::remove_file(&staged).await {
        warn!(path = %staged.display(), error = %e, "failed to remove staged upload");
    }
    Ok(outcome?.slide_count)
}

/// GET /slides/{session_id}/{file}: one slide image.
pub async fn slide(State(state): State<AppState>, Path((session_id, file)): Path<(String, String)>) -> Response {
    if !is_valid_session_id(&session_id) || parse_slide_file_name(&file).is_none() {
        return (StatusCode::BAD_REQUEST, "Invalid file request.").into_response();
    }
    let path = match state.library.slide_path(&session_id, &file) {
        Ok(path) => path,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid file request.").into_response(),
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "Slide not found.").into_response()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read slide");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
