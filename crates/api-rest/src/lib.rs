//! # API REST
//!
//! REST API for syntgen.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation at `/api-docs/openapi.json`
//! - REST-specific concerns (query parsing, status codes, CORS)
//!
//! Generation itself is synchronous and runs on the blocking pool.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use syntgen_core::{
    framing, BuildOptions, DemographicConstraints, FramingInfo, GenerationError,
    GenerationOutput, GenerationRequest, GeneratorService, OutputFormat, Sex,
};
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Application state shared across REST handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<GeneratorService>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    pub enhancement_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageTypeRes {
    pub id: u32,
    pub label: String,
    pub hl7_grammar_family: String,
    pub specialty: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FramedRes {
    pub message_type_id: u32,
    pub message_type_label: String,
    pub format: String,
    pub message: String,
    /// Lower-case hex of `VT message FS CR`.
    pub tcp_framed_message_hex: String,
    #[schema(value_type = Object)]
    pub framing_info: FramingInfo,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateParams {
    /// Message type id, 1 to 31. Random when omitted.
    #[serde(rename = "type")]
    pub type_id: Option<u32>,
    /// `linear` (default), `nested` or `structured`.
    pub format: Option<String>,
    pub seed: Option<u64>,
    /// `M` or `F`.
    pub sex: Option<String>,
    pub age: Option<u8>,
    /// Rewrite narrative fields with the enhancement hook, if installed.
    pub enhance: Option<bool>,
    /// Wrap the output in an MLLP frame and return it as hex.
    pub tcp_framing: Option<bool>,
}

impl GenerateParams {
    fn into_request(self) -> Result<(GenerationRequest, bool), GenerationError> {
        let format = match self.format.as_deref() {
            Some(f) => f.parse::<OutputFormat>()?,
            None => OutputFormat::default(),
        };
        let sex = self.sex.as_deref().map(str::parse::<Sex>).transpose()?;
        let request = GenerationRequest {
            type_id: self.type_id,
            format,
            options: BuildOptions {
                seed: self.seed,
                demographics: DemographicConstraints { sex, age: self.age },
                enhance: self.enhance.unwrap_or(false),
                reference_time: None,
            },
        };
        Ok((request, self.tcp_framing.unwrap_or(false)))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, message_types, generate),
    components(schemas(HealthRes, MessageTypeRes, FramedRes))
)]
pub struct ApiDoc;

/// Builds the REST router around `service`.
pub fn router(service: GeneratorService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/message-types", get(message_types))
        .route("/generate", get(generate))
        .route("/api-docs/openapi.json", get(openapi))
        .layer(CorsLayer::permissive())
        .with_state(AppState {
            service: Arc::new(service),
        })
}

fn error_response(err: &GenerationError) -> (StatusCode, String) {
    if err.is_client_error() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else {
        tracing::error!("Generate error: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used by monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "syntgen REST API is alive".into(),
        enhancement_enabled: state.service.has_enhancement_hook(),
    })
}

#[utoipa::path(
    get,
    path = "/message-types",
    responses(
        (status = 200, description = "All supported message types", body = [MessageTypeRes])
    )
)]
/// List the message types that can be generated
#[axum::debug_handler]
async fn message_types(State(state): State<AppState>) -> Json<Vec<MessageTypeRes>> {
    let types = state
        .service
        .message_types()
        .iter()
        .map(|d| MessageTypeRes {
            id: d.id,
            label: d.label.to_string(),
            hl7_grammar_family: d.family.tag().to_string(),
            specialty: d.specialty.map(str::to_string),
        })
        .collect();
    Json(types)
}

#[utoipa::path(
    get,
    path = "/generate",
    params(GenerateParams),
    responses(
        (
            status = 200,
            description = "Message text, structured record, or FramedRes when tcp_framing=true",
            body = String
        ),
        (status = 400, description = "Unknown message type or bad parameter"),
        (status = 500, description = "Internal server error")
    )
)]
/// Generate one synthetic HL7 v2 message
///
/// # Errors
/// Returns `400 Bad Request` for an unknown type id or an invalid parameter, and
/// `500 Internal Server Error` if a generated value cannot be encoded.
#[axum::debug_handler]
async fn generate(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
) -> Result<Response, (StatusCode, String)> {
    let (request, tcp_framing) = params.into_request().map_err(|e| error_response(&e))?;
    let format = request.format;

    let service = state.service.clone();
    let generated = tokio::task::spawn_blocking(move || service.generate(&request))
        .await
        .map_err(|e| {
            tracing::error!("Generate task failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        })?
        .map_err(|e| error_response(&e))?;

    let definition = generated.definition;
    if tcp_framing {
        let message = generated
            .output
            .into_text()
            .map_err(|e| error_response(&e))?;
        let framed = framing::frame(&message).map_err(|e| error_response(&e))?;
        return Ok(Json(FramedRes {
            message_type_id: definition.id,
            message_type_label: definition.label.to_string(),
            format: format.to_string(),
            tcp_framed_message_hex: framed.to_hex(),
            framing_info: framed.info,
            message,
        })
        .into_response());
    }

    Ok(match generated.output {
        GenerationOutput::Structured(record) => Json(record).into_response(),
        GenerationOutput::Text(text) => {
            let content_type = match format {
                OutputFormat::Nested => "application/xml; charset=utf-8",
                _ => "text/plain; charset=utf-8",
            };
            ([(header::CONTENT_TYPE, content_type)], text).into_response()
        }
    })
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use syntgen_core::CoreConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        router(GeneratorService::new(CoreConfig::default()))
    }

    async fn fetch(uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app()
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("router is infallible");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, content_type, String::from_utf8(bytes.to_vec()).expect("utf-8"))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, _, body) = fetch("/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthRes = serde_json::from_str(&body).expect("json");
        assert!(health.ok);
        assert!(!health.enhancement_enabled);
    }

    #[tokio::test]
    async fn lists_all_message_types() {
        let (status, _, body) = fetch("/message-types").await;
        assert_eq!(status, StatusCode::OK);
        let types: Vec<MessageTypeRes> = serde_json::from_str(&body).expect("json");
        assert_eq!(types.len(), 31);
        assert_eq!(types[0].label, "Laboratory Order");
        assert_eq!(types[12].hl7_grammar_family, "ACK");
    }

    #[tokio::test]
    async fn generates_linear_text() {
        let (status, content_type, body) =
            fetch("/generate?type=10&format=linear&sex=M&age=49&seed=4").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap_or_default().starts_with("text/plain"));
        assert!(body.starts_with("MSH|^~\\&|HL7SYNTGEN10|"));
        assert_eq!(body.matches("\rPID|").count(), 1);
    }

    #[tokio::test]
    async fn generates_structured_record() {
        let (status, _, body) = fetch("/generate?type=13&format=structured").await;
        assert_eq!(status, StatusCode::OK);
        let record: serde_json::Value = serde_json::from_str(&body).expect("json");
        assert_eq!(record["message_type_label"], "Acknowledgement");
        assert_eq!(record["hl7_grammar_family"], "ACK");
        assert!(record["nested_xml_message"]
            .as_str()
            .expect("string")
            .starts_with("<ACK>"));
    }

    #[tokio::test]
    async fn frames_for_tcp() {
        let (status, _, body) = fetch("/generate?type=8&format=nested&tcp_framing=true").await;
        assert_eq!(status, StatusCode::OK);
        let framed: serde_json::Value = serde_json::from_str(&body).expect("json");
        let hex = framed["tcp_framed_message_hex"].as_str().expect("hex");
        assert!(hex.starts_with("0b3c5349555f533132"));
        assert!(hex.ends_with("1c0d"));
        assert_eq!(framed["framing_info"]["frame_overhead"], 3);
        assert_eq!(framed["message_type_label"], "OPD Appointment");
    }

    #[tokio::test]
    async fn bad_requests_are_400() {
        for uri in [
            "/generate?type=32",
            "/generate?type=0",
            "/generate?type=1&format=csv",
            "/generate?type=1&sex=X",
            "/generate?type=1&age=111",
            "/generate?type=abc",
        ] {
            let (status, _, _) = fetch(uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn serves_openapi_document() {
        let (status, _, body) = fetch("/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_str(&body).expect("json");
        assert!(doc["paths"]["/generate"].is_object());
        assert!(doc["paths"]["/message-types"].is_object());
    }
}
