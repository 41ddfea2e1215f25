use crate::api::get_embedded_asset;
use crate::config::{Config, EXPORT_FILE_NAME};
use crate::db::{Activity, Database, LogEntryRow, StoreError, ValueType};
use crate::export::{self, ExportOutcome};
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info, warn};

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2}$").expect("duration pattern is a valid regex")
});

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

impl ApiState {
    fn database(&self) -> anyhow::Result<Database> {
        Database::open(&self.config.db_path)
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/activities", get(activities_list))
        .route("/api/activity", post(activity_create))
        .route("/api/activity/:id", delete(activity_delete))
        .route("/api/logs/:year/:month", get(logs_for_month))
        .route("/api/logs_by_day", get(logs_for_day))
        .route("/api/log", post(log_create))
        .route("/api/log/:id", delete(log_delete))
        .route("/api/export", get(export_download).post(export_save))
        .fallback(get(static_assets))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateActivityPayload {
    name: Option<String>,
    value_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct CreateLogPayload {
    activity_id: Option<IdInput>,
    date: Option<String>,
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct MonthQuery {
    filter_ids: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DayQuery {
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportRequest {
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatedPayload {
    success: bool,
    id: i64,
}

#[derive(Debug, Serialize)]
struct SuccessPayload {
    success: bool,
}

const SUCCESS: SuccessPayload = SuccessPayload { success: true };

async fn activities_list(State(state): State<ApiState>) -> ApiResult<Json<Vec<Activity>>> {
    let activities = state.database()?.list_activities()?;
    Ok(Json(activities))
}

async fn activity_create(
    State(state): State<ApiState>,
    payload: Result<Json<CreateActivityPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedPayload>)> {
    let Json(payload) = payload?;

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Activity name is required".to_string()))?;

    let value_type = payload
        .value_type
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("value_type is required".to_string()))?
        .parse::<ValueType>()
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;

    let id = state.database()?.create_activity(name, value_type)?;
    info!(id, activity = %name, value_type = %value_type, "activity created");

    Ok((StatusCode::CREATED, Json(CreatedPayload { success: true, id })))
}

async fn activity_delete(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<SuccessPayload>> {
    let Path(id) = id?;
    let removed = state.database()?.delete_activity(id)?;
    info!(id, removed, "activity deleted");
    Ok(Json(SUCCESS))
}

async fn logs_for_month(
    State(state): State<ApiState>,
    period: Result<Path<(i32, u32)>, PathRejection>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<Vec<LogEntryRow>>> {
    let Path((year, month)) = period?;
    if !(1..=9999).contains(&year) {
        return Err(ApiError::BadRequest(format!("Invalid year: {year}")));
    }
    if !(1..=12).contains(&month) {
        return Err(ApiError::BadRequest(format!("Invalid month: {month}")));
    }

    let filter = parse_filter_ids(query.filter_ids.as_deref())?;
    let entries = state
        .database()?
        .log_entries_for_month(year, month, &filter)?;

    Ok(Json(entries))
}

async fn logs_for_day(
    State(state): State<ApiState>,
    Query(query): Query<DayQuery>,
) -> ApiResult<Json<Vec<LogEntryRow>>> {
    let date = query
        .date
        .as_deref()
        .filter(|date| !date.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'date' is required".to_string()))?;
    parse_canonical_date(date)?;

    let entries = state.database()?.log_entries_for_day(date)?;
    Ok(Json(entries))
}

async fn log_create(
    State(state): State<ApiState>,
    payload: Result<Json<CreateLogPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedPayload>)> {
    let Json(payload) = payload?;

    let activity_id = match payload.activity_id {
        Some(IdInput::Number(id)) => id,
        Some(IdInput::Text(raw)) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::BadRequest(format!("Invalid activity_id: {raw}")))?,
        None => return Err(ApiError::BadRequest("activity_id is required".to_string())),
    };

    let date = payload
        .date
        .as_deref()
        .filter(|date| !date.is_empty())
        .ok_or_else(|| ApiError::BadRequest("date is required".to_string()))?;
    parse_canonical_date(date)?;

    let value = normalize_value(payload.value)?;

    let database = state.database()?;
    let activity = database
        .activity(activity_id)?
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown activity: {activity_id}")))?;

    if let Some(value) = value.as_deref() {
        validate_value(activity.value_type, value)?;
    }

    let id = database.create_log_entry(activity_id, date, value.as_deref())?;
    info!(id, activity_id, date, "log entry created");

    Ok((StatusCode::CREATED, Json(CreatedPayload { success: true, id })))
}

async fn log_delete(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<SuccessPayload>> {
    let Path(id) = id?;
    let removed = state.database()?.delete_log_entry(id)?;
    info!(id, removed, "log entry deleted");
    Ok(Json(SUCCESS))
}

async fn export_download(State(state): State<ApiState>) -> ApiResult<Response> {
    let records = state.database()?.export_all()?;
    let content = export::render_export(&records)?;

    let mut response = Response::new(content.into_response().into_body());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{EXPORT_FILE_NAME}\""))?,
    );

    Ok(response)
}

async fn export_save(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<Json<ExportOutcome>> {
    // an empty body means "use the default export path"
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ExportRequest::default()
    } else {
        serde_json::from_slice::<ExportRequest>(&body)
            .map_err(|error| ApiError::BadRequest(format!("Invalid request body: {error}")))?
    };
    let target = match request.path {
        Some(raw) => export::resolve_output(&raw),
        None => Some(state.config.default_export_path()),
    };

    Ok(Json(export::write_export(
        &state.config.db_path,
        target.as_deref(),
    )))
}

async fn static_assets(uri: Uri) -> ApiResult<Response> {
    let path = uri.path();
    if path == "/api" || path.starts_with("/api/") {
        return Err(ApiError::NotFound(format!("Unknown API endpoint: {path}")));
    }

    match get_embedded_asset(path) {
        Some((bytes, mime)) => {
            let mut response = Response::new(bytes.into_response().into_body());
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_str(&mime)?);
            Ok(response)
        }
        None => Err(ApiError::NotFound("Static asset not found".to_string())),
    }
}

fn parse_filter_ids(raw: Option<&str>) -> ApiResult<Vec<i64>> {
    let Some(list) = raw.map(str::trim).filter(|list| !list.is_empty()) else {
        return Ok(Vec::new());
    };

    list.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid filter_ids value: '{part}'")))
        })
        .collect()
}

/// Accepts only zero-padded `YYYY-MM-DD` so that month prefix lookups stay exact.
fn parse_canonical_date(input: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .filter(|date| date.format("%Y-%m-%d").to_string() == input)
        .ok_or_else(|| {
            ApiError::BadRequest(format!("Invalid date format: {input}. Example: 2024-03-01"))
        })
}

fn normalize_value(raw: Option<Value>) -> ApiResult<Option<String>> {
    let text = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(_) => {
            return Err(ApiError::BadRequest(
                "value must be a string or a number".to_string(),
            ));
        }
    };

    Ok((!text.trim().is_empty()).then_some(text))
}

fn validate_value(value_type: ValueType, value: &str) -> ApiResult<()> {
    if value_type == ValueType::Duration && !DURATION_PATTERN.is_match(value) {
        return Err(ApiError::BadRequest(format!(
            "Invalid duration: {value}. Use HH:MM:SS"
        )));
    }
    Ok(())
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Conflict(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateName(_) => Self::Conflict(value.to_string()),
            StoreError::MissingActivity(_) => Self::BadRequest(value.to_string()),
            StoreError::Other(error) => Self::Internal(error),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", value.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        Self::BadRequest(format!("Invalid path parameter: {}", value.body_text()))
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(anyhow::Error::new(value).context("Invalid response header"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => {
                debug!(error = %message, "request rejected");
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::Conflict(message) => {
                warn!(error = %message, "request conflicts with existing data");
                (StatusCode::CONFLICT, message)
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(error) => {
                error!(error = %format!("{error:#}"), "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{error:#}"))
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
