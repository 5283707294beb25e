use crate::Utils::config::Config;
use crate::Utils::plots::{PlotSettings, legend_form, render_comparison, sample_pair};
use crate::api::errors::IntegralError;
use crate::api::explanation::{definite_steps, explain, latex_form};
use crate::api::graph_store::GraphStore;
use crate::symbolic::symbolic_engine::Expr;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The only free variable of user expressions.
pub const VARIABLE: &str = "x";
pub const SESSION_HEADER: &str = "x-session-id";
pub const NO_GRAPH: &str = "No hay gráfica generada.";
pub const NO_BOUNDS: &str = "No se proporcionaron límites";

#[derive(Debug, Clone, Deserialize)]
pub struct IntegralRequest {
    pub expression: String,
    #[serde(default)]
    pub lower_limit: Option<f64>,
    #[serde(default)]
    pub upper_limit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegralResponse {
    pub indefinite_integral: String,
    pub defined_integral: String,
    pub explanation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /calculate-integral`; both shapes go out with status 200.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Solved(IntegralResponse),
    Failed(ErrorResponse),
}

/// What `solve` needs from the configuration.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    pub plot: PlotSettings,
    pub quadrature_intervals: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings::from(&Config::default())
    }
}

impl From<&Config> for SolverSettings {
    fn from(config: &Config) -> Self {
        SolverSettings {
            plot: PlotSettings {
                samples: config.samples,
                domain: config.domain,
                width: config.figure_width,
                height: config.figure_height,
            },
            quadrature_intervals: config.quadrature_intervals,
        }
    }
}

pub struct AppState {
    pub settings: SolverSettings,
    pub graphs: GraphStore,
}

impl AppState {
    pub fn new(config: &Config) -> Arc<AppState> {
        Arc::new(AppState {
            settings: SolverSettings::from(config),
            graphs: GraphStore::new(config.max_sessions),
        })
    }
}

/// Parse, integrate, explain and plot. Pure: the caller decides where the PNG goes.
pub fn solve(
    request: &IntegralRequest,
    settings: &SolverSettings,
) -> Result<(IntegralResponse, Vec<u8>), IntegralError> {
    let text = request.expression.as_str();
    let integrand = Expr::parse_expression(text).map_err(IntegralError::Parse)?;
    let antiderivative = integrand.integrate(VARIABLE).map_err(IntegralError::Integration)?;
    let printed = antiderivative.to_string();
    let indefinite_integral = latex_form(&printed);
    let mut explanation = explain(text, &indefinite_integral);

    let defined_integral = match (request.lower_limit, request.upper_limit) {
        (Some(lower), Some(upper)) => {
            let value = integrand
                .definite_from_antiderivative(
                    &antiderivative,
                    VARIABLE,
                    lower,
                    upper,
                    settings.quadrature_intervals,
                )
                .map_err(IntegralError::DefiniteIntegral)?;
            // no "-0" in the output
            let value = if value == 0.0 { 0.0 } else { value };
            explanation.extend(definite_steps(text, lower, upper, value));
            value.to_string()
        }
        _ => NO_BOUNDS.to_string(),
    };

    let samples = sample_pair(&integrand, &antiderivative, VARIABLE, &settings.plot)
        .map_err(IntegralError::Evaluation)?;
    let png = render_comparison(&samples, &legend_form(text), &legend_form(&printed), &settings.plot)
        .map_err(IntegralError::Plot)?;

    let response = IntegralResponse { indefinite_integral, defined_integral, explanation };
    Ok((response, png))
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub async fn calculate_integral(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<IntegralRequest>,
) -> Json<Reply> {
    let session = session_id(&headers);
    info!("integral requested: {:?}", request.expression);
    let worker_state = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || solve(&request, &worker_state.settings))
        .await
        .unwrap_or_else(|e| {
            error!("integration task failed: {}", e);
            Err(IntegralError::Evaluation(e.to_string()))
        });
    match outcome {
        Ok((response, png)) => {
            state.graphs.put(session.as_deref(), Bytes::from(png));
            info!("integral computed: {}", response.indefinite_integral);
            Json(Reply::Solved(response))
        }
        Err(e) => {
            match &e {
                IntegralError::Parse(reason) => warn!("parse error: {}", reason),
                other => warn!("{}", other),
            }
            Json(Reply::Failed(ErrorResponse { error: e.to_string() }))
        }
    }
}

pub async fn get_graph(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match state.graphs.get(session_id(&headers).as_deref()) {
        Some(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        None => Json(ErrorResponse { error: NO_GRAPH.to_string() }).into_response(),
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
