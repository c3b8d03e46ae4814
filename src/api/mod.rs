use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    CalculationResult, Frequency, Inputs, ObjectiveKind, calculate, default_tax_config,
    resolve_tax_config, tax_configs,
};
use crate::error::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApiObjective {
    #[serde(alias = "max-advantage", alias = "maxAdvantage")]
    MaxAdvantage,
    #[serde(alias = "donation-target", alias = "donationTarget")]
    DonationTarget,
    #[serde(alias = "net-cost-target", alias = "netCostTarget")]
    NetCostTarget,
}

impl From<ApiObjective> for ObjectiveKind {
    fn from(value: ApiObjective) -> Self {
        match value {
            ApiObjective::MaxAdvantage => ObjectiveKind::MaxAdvantage,
            ApiObjective::DonationTarget => ObjectiveKind::DonationTarget,
            ApiObjective::NetCostTarget => ObjectiveKind::NetCostTarget,
        }
    }
}

/// Flat form of `Inputs` for query strings. Missing fields take the product
/// defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculateQuery {
    year: Option<f64>,
    taxable_income: Option<f64>,
    frequency: Option<String>,
    objective: Option<ApiObjective>,
    amount: Option<f64>,
    cost: Option<f64>,
    expert_mode: Option<bool>,
    tr_face_value: Option<f64>,
    tr_quantity: Option<f64>,
    tr_employer_rate: Option<f64>,
    tr_employee_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TaxConfigQuery {
    year: Option<i32>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn inputs_from_query(query: CalculateQuery) -> Inputs {
    let mut inputs = Inputs::default();

    if let Some(v) = query.year {
        inputs.year = v;
    }
    if let Some(v) = query.taxable_income {
        inputs.taxable_income = v;
    }
    if let Some(v) = query.frequency.as_deref() {
        inputs.frequency = Frequency::from_label(v);
    }
    if let Some(v) = query.expert_mode {
        inputs.expert_mode = v;
    }
    if let Some(v) = query.tr_face_value {
        inputs.tr_face_value = v;
    }
    if let Some(v) = query.tr_quantity {
        inputs.tr_quantity = v;
    }
    if let Some(v) = query.tr_employer_rate {
        inputs.tr_employer_rate = v;
    }
    if let Some(v) = query.tr_employee_rate {
        inputs.tr_employee_rate = v;
    }
    inputs.override_objective(query.objective.map(Into::into), query.amount, query.cost);

    inputs
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/calculate",
            get(calculate_get_handler).post(calculate_post_handler),
        )
        .route("/api/tax-config", get(tax_config_handler))
        .route("/api/tax-configs", get(tax_configs_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "donation calculator API listening");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn calculate_get_handler(
    query: Result<Query<CalculateQuery>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(query) = query?;
    Ok(calculate_response(&inputs_from_query(query)))
}

async fn calculate_post_handler(
    body: Result<Json<Inputs>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(inputs) = body?;
    Ok(calculate_response(&inputs))
}

async fn tax_config_handler(
    query: Result<Query<TaxConfigQuery>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(query) = query?;
    let year = query.year.unwrap_or_else(|| default_tax_config().year);
    Ok(json_response(StatusCode::OK, resolve_tax_config(year)))
}

async fn tax_configs_handler() -> Response {
    json_response(StatusCode::OK, tax_configs())
}

fn calculate_response(inputs: &Inputs) -> Response {
    let result: CalculationResult = calculate(inputs);
    debug!(
        objective = ?result.objective.kind,
        donation = result.donation.total,
        achieved = result.objective.achieved,
        "calculation served"
    );
    json_response(StatusCode::OK, result)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Query(rejection) => rejection.status(),
            Error::Body(rejection) => rejection.status(),
            Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::ReadInput { .. } | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(%status, error = %self, "request rejected");
        error_response(status, &self.to_string())
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn inputs_from_query_string(query: &str) -> Result<Inputs, String> {
    let uri = format!("/api/calculate?{query}")
        .parse::<axum::http::Uri>()
        .map_err(|e| format!("invalid uri: {e}"))?;
    let Query(query) = Query::<CalculateQuery>::try_from_uri(&uri).map_err(|e| e.to_string())?;
    Ok(inputs_from_query(query))
}
