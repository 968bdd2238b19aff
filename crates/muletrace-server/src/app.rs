//! Router and request handlers.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use muletrace_core::error::AnalysisError;
use muletrace_core::types::AnalysisReport;
use muletrace_engine::Analyzer;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
}

impl AppState {
    /// Wrap an analyzer for sharing across handlers.
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .route("/export/csv", post(export_csv))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Structured error body: `{ "detail": ... }`, no stack traces.
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// Error wrapper selecting the status code from the error kind.
#[derive(Debug)]
struct ApiError(AnalysisError);

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self.0, "analysis failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(ErrorBody {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// `POST /analyze` — multipart upload with a `file` field.
async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AnalysisError::parse(format!("invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.csv").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AnalysisError::parse(format!("cannot read upload: {e}")))?
                .to_vec();
            upload = Some((filename, bytes));
            break;
        }
    }
    let (filename, bytes) =
        upload.ok_or_else(|| AnalysisError::parse("multipart field 'file' is required"))?;

    let analyzer = state.analyzer.clone();
    let report = tokio::task::spawn_blocking(move || analyzer.analyze(&bytes, &filename))
        .await
        .map_err(|e| AnalysisError::internal(format!("analysis task failed: {e}")))??;
    Ok(Json(report))
}

/// `GET /health`
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "muletrace",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /export/csv` — render a previously returned report as CSV.
async fn export_csv(Json(report): Json<AnalysisReport>) -> Result<Response, ApiError> {
    let body = render_csv(&report)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=muletrace_report.csv",
            ),
        ],
        body,
    )
        .into_response())
}

fn render_csv(report: &AnalysisReport) -> Result<String, AnalysisError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let write =
        |writer: &mut csv::Writer<Vec<u8>>, record: &[String]| -> Result<(), AnalysisError> {
            writer
                .write_record(record)
                .map_err(|e| AnalysisError::internal(format!("csv export failed: {e}")))
        };

    write(&mut writer, &["Suspicious Accounts".to_string()])?;
    write(
        &mut writer,
        &[
            "Account ID".to_string(),
            "Suspicion Score".to_string(),
            "Detected Patterns".to_string(),
            "Ring ID".to_string(),
        ],
    )?;
    for account in &report.suspicious_accounts {
        write(
            &mut writer,
            &[
                account.account_id.clone(),
                account.suspicion_score.to_string(),
                account.detected_patterns.join(", "),
                account.ring_id.clone().unwrap_or_else(|| "N/A".to_string()),
            ],
        )?;
    }

    write(&mut writer, &[String::new()])?;
    write(&mut writer, &["Fraud Rings".to_string()])?;
    write(
        &mut writer,
        &[
            "Ring ID".to_string(),
            "Pattern Type".to_string(),
            "Risk Score".to_string(),
            "Member Accounts".to_string(),
        ],
    )?;
    for ring in &report.fraud_rings {
        write(
            &mut writer,
            &[
                ring.ring_id.clone(),
                ring.pattern_type.to_string(),
                ring.risk_score.to_string(),
                ring.member_accounts.join(", "),
            ],
        )?;
    }

    write(&mut writer, &[String::new()])?;
    write(&mut writer, &["Summary".to_string()])?;
    write(&mut writer, &["Metric".to_string(), "Value".to_string()])?;
    write(
        &mut writer,
        &[
            "Total Accounts Analyzed".to_string(),
            report.summary.total_accounts_analyzed.to_string(),
        ],
    )?;
    write(
        &mut writer,
        &[
            "Suspicious Accounts Flagged".to_string(),
            report.summary.suspicious_accounts_flagged.to_string(),
        ],
    )?;
    write(
        &mut writer,
        &[
            "Fraud Rings Detected".to_string(),
            report.summary.fraud_rings_detected.to_string(),
        ],
    )?;
    write(
        &mut writer,
        &[
            "Processing Time (seconds)".to_string(),
            report.summary.processing_time_seconds.to_string(),
        ],
    )?;

    let bytes = writer
        .into_inner()
        .map_err(|e| AnalysisError::internal(format!("csv export failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AnalysisError::internal(format!("csv export failed: {e}")))
}
