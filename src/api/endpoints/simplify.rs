//! Report simplification endpoint.

use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::{Form, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::extraction::ReportInput;
use crate::pipeline::processor::ReportOutcome;

/// Multipart field carrying the report image.
pub const FILE_FIELD: &str = "report_file";
/// Multipart / form / JSON field carrying raw report text.
pub const TEXT_FIELD: &str = "report_text";

#[derive(Debug, Default, Deserialize)]
pub struct SimplifyRequest {
    #[serde(default)]
    pub report_text: Option<String>,
}

/// `POST /api/simplify`: run the full pipeline on one report.
///
/// Accepts `multipart/form-data` (`report_file`, `report_text`),
/// `application/json` or urlencoded `{ report_text }`. Any other body is
/// treated as carrying neither field.
pub async fn simplify(
    State(ctx): State<ApiContext>,
    request: Request,
) -> Result<Json<ReportOutcome>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("simplify", %request_id);

    let input = read_report_input(request).await?;
    span.in_scope(|| {
        tracing::info!(
            has_file = input.file.as_ref().is_some_and(|f| !f.is_empty()),
            has_text = input.text.is_some(),
            "Report received"
        )
    });

    let processor = ctx.processor.clone();
    let outcome = tokio::task::spawn_blocking(move || span.in_scope(|| processor.run(&input)))
        .await
        .map_err(|e| ApiError::Internal(format!("pipeline task failed: {e}")))??;

    Ok(Json(outcome))
}

async fn read_report_input(request: Request) -> Result<ReportInput, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        return read_multipart(multipart).await;
    }

    if content_type.starts_with("application/json") {
        let Json(body) = Json::<SimplifyRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        return Ok(ReportInput {
            file: None,
            text: body.report_text,
        });
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(body) = Form::<SimplifyRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        return Ok(ReportInput {
            file: None,
            text: body.report_text,
        });
    }

    // Other bodies carry no usable field.
    tracing::debug!(%content_type, "Ignoring body of unrecognized content type");
    Ok(ReportInput::default())
}

async fn read_multipart(mut multipart: Multipart) -> Result<ReportInput, ApiError> {
    let mut input = ReportInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            FILE_FIELD => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                input.file = Some(bytes.to_vec());
            }
            TEXT_FIELD => {
                input.text = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {
                tracing::debug!(field = %name, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(input)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        tracing::warn!("Failed to read multipart body: {err}");
        ApiError::BadRequest(err.body_text())
    }
}
