use actix_web::{web, HttpRequest, HttpResponse, Result};
use shared::{ApiSuccess, CreateExpenseRequest, PeriodQuery};

use crate::handlers::{authenticate, ledger_error, parse_id, report_error, require_manager};
use crate::models::AppState;
use crate::services::expenses as expense_service;
use crate::services::reports::{resolve_period, today_in};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/expenses")
            .route("", web::get().to(list_expenses))
            .route("", web::post().to(create_expense))
            .route("/{id}", web::delete().to(delete_expense)),
    );
}

async fn create_expense(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateExpenseRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }

    match expense_service::create_expense(&state.db, &ctx.house_id, &ctx.user_id, &body.into_inner()).await {
        Ok(expense) => Ok(HttpResponse::Created().json(ApiSuccess::new(expense))),
        Err(e) => Ok(ledger_error("creating expense", e)),
    }
}

async fn list_expenses(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }
    let period = match resolve_period(&query, today_in(state.config.timezone)) {
        Ok(period) => period,
        Err(e) => return Ok(report_error("resolving period", e)),
    };

    match expense_service::list_expenses(&state.db, &ctx.house_id, period.key.period()).await {
        Ok(expenses) => Ok(HttpResponse::Ok().json(ApiSuccess::new(expenses))),
        Err(e) => Ok(ledger_error("listing expenses", e)),
    }
}

async fn delete_expense(
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
    let expense_id = match parse_id(&path.into_inner(), "expense") {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    match expense_service::delete_expense(&state.db, &ctx.house_id, &expense_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(ledger_error("deleting expense", e)),
    }
}
