//! HTTP front door: synchronous quote generation and health reporting.

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use utoipa::ToSchema;

use crate::quote::models::{QuoteRecord, REQUIRED_FIELDS};
use crate::state::AppState;
use crate::ErrorResponse;

/// 400 payload listing the required fields absent from the request body.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MissingFieldsResponse {
    pub error: String,
    pub missing_fields: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub sqs_consumer_active: bool,
}

#[utoipa::path(
    tag = "Document Generation",
    post,
    path = "/generate/mbi-quote",
    request_body = QuoteRecord,
    responses(
        (status = 200, description = "Generated PDF document", content_type = "application/pdf"),
        (status = 400, description = "Missing required fields", body = MissingFieldsResponse),
        (status = 500, description = "PDF generation failed", body = ErrorResponse)
    )
)]
pub async fn generate_mbi_quote(
    body: web::Json<serde_json::Value>,
    data: web::Data<AppState>,
) -> impl Responder {
    let payload = body.into_inner();
    let Some(object) = payload.as_object() else {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("Request body must be a JSON object"));
    };

    // Presence-only check; blank values are the queue path's concern, the
    // synchronous path mirrors the original permissive contract.
    let missing_fields: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !object.contains_key(**field))
        .map(|field| field.to_string())
        .collect();

    if !missing_fields.is_empty() {
        return HttpResponse::BadRequest().json(MissingFieldsResponse {
            error: "Missing required fields".to_string(),
            missing_fields,
        });
    }

    let record: QuoteRecord = match serde_json::from_value(payload) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("Rejected malformed generate request: {e}");
            return HttpResponse::BadRequest()
                .json(ErrorResponse::bad_request("Request body is not a valid quote"));
        }
    };

    let quotation_number = record.quotation_number.clone();
    match data.renderer.render(&record).await {
        Ok(pdf) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"mbi-quote-{quotation_number}.pdf\""),
            ))
            .body(pdf),
        Err(e) => {
            // Internal error text stays in the logs.
            log::error!("Error generating PDF for quotation {quotation_number}: {e}");
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to generate PDF document"))
        }
    }
}

#[utoipa::path(
    tag = "Health",
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service liveness", body = HealthResponse)
    )
)]
pub async fn health(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        sqs_consumer_active: data.consumer.is_active(),
    })
}
