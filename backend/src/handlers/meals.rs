use actix_web::{web, HttpRequest, HttpResponse, Result};
use shared::{ApiSuccess, CreateMealRequest, DailyMealsRequest, PeriodQuery};

use crate::handlers::{authenticate, ledger_error, parse_id, report_error, require_manager};
use crate::models::AppState;
use crate::services::meals as meal_service;
use crate::services::reports::{resolve_period, today_in};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/meals")
            .route("", web::get().to(list_meals))
            .route("", web::post().to(record_meal))
            .route("/daily", web::post().to(record_daily_meals))
            .route("/{id}", web::delete().to(delete_meal)),
    );
}

async fn record_meal(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateMealRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }

    match meal_service::record_meal(&state.db, &ctx.house_id, &body.into_inner()).await {
        Ok(meal) => Ok(HttpResponse::Ok().json(ApiSuccess::new(meal))),
        Err(e) => Ok(ledger_error("recording meal", e)),
    }
}

async fn record_daily_meals(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<DailyMealsRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }

    match meal_service::record_daily_meals(&state.db, &ctx.house_id, &body.into_inner()).await {
        Ok(meals) => Ok(HttpResponse::Ok().json(ApiSuccess::new(meals))),
        Err(e) => Ok(ledger_error("recording daily meals", e)),
    }
}

async fn list_meals(
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

    match meal_service::list_meals(&state.db, &ctx.house_id, period.key.period(), query.member_id.as_ref()).await {
        Ok(meals) => Ok(HttpResponse::Ok().json(ApiSuccess::new(meals))),
        Err(e) => Ok(ledger_error("listing meals", e)),
    }
}

async fn delete_meal(state: web::Data<AppState>, req: HttpRequest, path: web::Path<String>) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }
    let meal_id = match parse_id(&path.into_inner(), "meal") {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    match meal_service::delete_meal(&state.db, &ctx.house_id, &meal_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(ledger_error("deleting meal", e)),
    }
}
