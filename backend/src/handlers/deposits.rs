use actix_web::{web, HttpRequest, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CreateDepositRequest, PeriodQuery};

use crate::handlers::{authenticate, ledger_error, parse_id, report_error, require_manager};
use crate::models::AppState;
use crate::services::deposits as deposit_service;
use crate::services::reports::{resolve_period, today_in};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/deposits")
            .route("", web::get().to(list_deposits))
            .route("", web::post().to(create_deposit))
            .route("/{id}", web::delete().to(delete_deposit)),
    );
}

async fn create_deposit(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateDepositRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }

    match deposit_service::create_deposit(&state.db, &ctx.house_id, &body.into_inner()).await {
        Ok(deposit) => Ok(HttpResponse::Created().json(ApiSuccess::new(deposit))),
        Err(e) => Ok(ledger_error("creating deposit", e)),
    }
}

async fn list_deposits(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    let period = match resolve_period(&query, today_in(state.config.timezone)) {
        Ok(period) => period,
        Err(e) => return Ok(report_error("resolving period", e)),
    };

    // Members only ever see their own deposits
    let member_id = if ctx.is_manager() {
        query.member_id
    } else {
        match ctx.member_id {
            Some(id) => Some(id),
            None => {
                return Ok(HttpResponse::Forbidden().json(ApiError::new(
                    "forbidden",
                    "Account is not linked to a member",
                )))
            }
        }
    };

    match deposit_service::list_deposits(&state.db, &ctx.house_id, period.key.period(), member_id.as_ref()).await {
        Ok(deposits) => Ok(HttpResponse::Ok().json(ApiSuccess::new(deposits))),
        Err(e) => Ok(ledger_error("listing deposits", e)),
    }
}

async fn delete_deposit(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }
    let deposit_id = match parse_id(&path.into_inner(), "deposit") {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    match deposit_service::delete_deposit(&state.db, &ctx.house_id, &deposit_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(ledger_error("deleting deposit", e)),
    }
}
