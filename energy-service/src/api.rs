//! HTTP surface of the energy service.
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/api/readings` | POST | 201, the stored reading |
//! | `/api/readings?start&end` | GET | readings ordered by time |
//! | `/api/aggregates/daily?days` | GET | one bucket per day |
//! | `/api/summary` | GET | latest reading per device and total load |
//! | `/api/co2?days` | GET | energy and estimated CO2 for the window |
//! | `/api/health` | GET | liveness |
//!
//! Query parameters that fail to parse fall back to defaults instead of
//! rejecting the request.

use std::{path::Path, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use energy_client::{
    domain::{Co2Estimate, DailyBucket, Reading, Summary},
    ValidationError,
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{error::ApiError, service::EnergyService};

pub fn router(service: Arc<EnergyService>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/readings", get(get_readings).post(post_reading))
        .route("/api/aggregates/daily", get(get_daily_aggregates))
        .route("/api/summary", get(get_summary))
        .route("/api/co2", get(get_co2))
        .with_state(service)
}

/// The API router plus request tracing and, when configured, the static
/// frontend at `/`.
pub fn app(service: Arc<EnergyService>, static_dir: Option<&Path>) -> Router {
    let mut app = router(service);
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }
    app.layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Fields of an ingest request, extracted leniently from arbitrary JSON.
#[derive(Debug, PartialEq)]
struct IngestRequest {
    device: Option<String>,
    watts: f64,
    timestamp: Option<String>,
}

/// Accepts a JSON number or a numeric string.
fn parse_watts(value: Option<&Value>) -> Result<f64, ValidationError> {
    match value {
        Some(Value::Number(n)) => n.as_f64().ok_or(ValidationError::InvalidWatts),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| ValidationError::InvalidWatts),
        _ => Err(ValidationError::InvalidWatts),
    }
}

fn parse_ingest_body(body: &[u8]) -> Result<IngestRequest, ValidationError> {
    let data: serde_json::Map<String, Value> = match serde_json::from_slice(body) {
        Ok(Value::Object(map)) if !map.is_empty() => map,
        _ => return Err(ValidationError::MissingBody),
    };

    let device = match data.get("device") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    let watts = parse_watts(data.get("watts"))?;
    let timestamp = data
        .get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(IngestRequest {
        device,
        watts,
        timestamp,
    })
}

async fn post_reading(
    State(service): State<Arc<EnergyService>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Reading>), ApiError> {
    metrics::counter!("http_ingest_requests_total").increment(1);

    let req = match parse_ingest_body(&body) {
        Ok(req) => req,
        Err(e) => {
            metrics::counter!("http_ingest_rejected_total").increment(1);
            return Err(e.into());
        }
    };

    let reading = service
        .ingest(req.device, req.watts, req.timestamp.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(reading)))
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    start: Option<String>,
    end: Option<String>,
}

async fn get_readings(
    State(service): State<Arc<EnergyService>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let readings = service
        .query_readings(params.start.as_deref(), params.end.as_deref())
        .await?;
    Ok(Json(readings))
}

#[derive(Debug, Deserialize)]
struct DaysParams {
    days: Option<String>,
}

impl DaysParams {
    fn days(&self) -> Option<i64> {
        let raw = self.days.as_deref()?;
        match raw.trim().parse() {
            Ok(days) => Some(days),
            Err(_) => {
                tracing::debug!(days = raw, "unparsable days parameter, using default");
                None
            }
        }
    }
}

async fn get_daily_aggregates(
    State(service): State<Arc<EnergyService>>,
    Query(params): Query<DaysParams>,
) -> Result<Json<Vec<DailyBucket>>, ApiError> {
    Ok(Json(service.daily_aggregates(params.days()).await?))
}

async fn get_summary(State(service): State<Arc<EnergyService>>) -> Result<Json<Summary>, ApiError> {
    Ok(Json(service.summary().await?))
}

async fn get_co2(
    State(service): State<Arc<EnergyService>>,
    Query(params): Query<DaysParams>,
) -> Result<Json<Co2Estimate>, ApiError> {
    Ok(Json(service.co2(params.days()).await?))
}
