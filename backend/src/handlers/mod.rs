use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use shared::ApiError;
use uuid::Uuid;

use crate::middleware::auth::extract_context;
use crate::middleware::RequestContext;
use crate::models::AppState;
use crate::services::houses::HouseError;
use crate::services::ledger::LedgerError;
use crate::services::members::MemberError;
use crate::services::reports::ReportError;
use crate::services::summaries::SummaryError;

pub mod auth;
pub mod deposits;
pub mod expenses;
pub mod house;
pub mod meals;
pub mod members;
pub mod reports;
pub mod summaries;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .configure(auth::configure)
            .configure(house::configure)
            .configure(members::configure)
            .configure(meals::configure)
            .configure(deposits::configure)
            .configure(expenses::configure)
            .configure(reports::configure)
            .configure(summaries::configure),
    );
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = validation_error(format!("Invalid query parameters: {}", err));
    InternalError::from_response(err, response).into()
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = validation_error(format!("Invalid request body: {}", err));
    InternalError::from_response(err, response).into()
}

/// Decode the caller from the bearer token, or the 401 to send back
pub(crate) fn authenticate(req: &HttpRequest, state: &AppState) -> Result<RequestContext, HttpResponse> {
    extract_context(req, &state.config.jwt_secret).map_err(|_| {
        HttpResponse::Unauthorized().json(ApiError::new("unauthorized", "Invalid or missing token"))
    })
}

pub(crate) fn require_manager(ctx: &RequestContext) -> Result<(), HttpResponse> {
    if ctx.is_manager() {
        Ok(())
    } else {
        Err(HttpResponse::Forbidden().json(ApiError::new("forbidden", "Only the house manager can do this")))
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(ApiError::new("validation_error", format!("Invalid {} ID format", what)))
    })
}

pub(crate) fn internal_error(action: &str, err: impl std::fmt::Debug) -> HttpResponse {
    log::error!("Error {}: {:?}", action, err);
    HttpResponse::InternalServerError().json(ApiError::new("internal_error", format!("Failed {}", action)))
}

fn validation_error(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new("validation_error", message))
}

fn not_found(message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(ApiError::new("not_found", message))
}

pub(crate) fn house_error(action: &str, err: HouseError) -> HttpResponse {
    match err {
        HouseError::NotFound => not_found(err.to_string()),
        HouseError::Validation(msg) => validation_error(msg),
        other => internal_error(action, other),
    }
}

pub(crate) fn member_error(action: &str, err: MemberError) -> HttpResponse {
    match err {
        MemberError::NotFound => not_found(err.to_string()),
        MemberError::Validation(msg) => validation_error(msg),
        MemberError::AlreadyHasAccount | MemberError::Inactive => validation_error(err.to_string()),
        MemberError::DatabaseError(e) => internal_error(action, e),
    }
}

pub(crate) fn ledger_error(action: &str, err: LedgerError) -> HttpResponse {
    match err {
        LedgerError::NotFound | LedgerError::MemberNotFound => not_found(err.to_string()),
        LedgerError::Validation(msg) => validation_error(msg),
        LedgerError::InactiveMember => validation_error(err.to_string()),
        LedgerError::DatabaseError(e) => internal_error(action, e),
    }
}

pub(crate) fn report_error(action: &str, err: ReportError) -> HttpResponse {
    match err {
        ReportError::HouseNotFound | ReportError::MemberNotFound => not_found(err.to_string()),
        ReportError::Validation(msg) => validation_error(msg),
        ReportError::DatabaseError(e) => internal_error(action, e),
        ReportError::Settlement(e) => internal_error(action, e),
    }
}

pub(crate) fn summary_error(action: &str, err: SummaryError) -> HttpResponse {
    match err {
        SummaryError::NotFound => not_found(err.to_string()),
        SummaryError::Validation(msg) => validation_error(msg),
        SummaryError::DatabaseError(e) => internal_error(action, e),
        SummaryError::Settlement(e) => internal_error(action, e),
    }
}
