use super::{AppState, REQUEST_ID_HEADER, SERVICE_NAME, VERSION};
use crate::logger;
use actix_web::{
    http::header::{HeaderName, HeaderValue},
    web, HttpResponse, ResponseError,
};
use serde_json::json;

/// `POST /generate`. The body is taken raw so malformed JSON surfaces as a
/// validation error in the usual envelope.
pub async fn generate(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let request_id = logger::new_request_id();

    let result = logger::with_request_id(
        request_id.clone(),
        state.orchestrator.generate(&request_id, &body),
    )
    .await;

    let mut response = match result {
        Ok(meme) => HttpResponse::Ok().json(meme),
        Err(error) => {
            log::error!("Request {} failed: {}", request_id, error);
            error.error_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": VERSION,
    }))
}

pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;
    let status = if config.is_ready() { "ready" } else { "not_ready" };

    HttpResponse::Ok().json(json!({
        "status": status,
        "configuration": {
            "text_generation_configured": config.text_generation.api_url.is_some(),
            "image_generation_configured": config.image_generation.api_url.is_some(),
            "text_generation_auth": config.text_generation.auth.kind(),
            "image_generation_auth": config.image_generation.auth.kind(),
        },
        "warnings": config.warnings(),
    }))
}

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "AI meme generator",
        "service": SERVICE_NAME,
        "version": VERSION,
        "generate": "/generate",
        "health": "/health",
    }))
}
