use actix_web::{web, HttpRequest, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CloseMonthRequest};

use crate::handlers::{authenticate, require_manager, summary_error};
use crate::models::AppState;
use crate::services::reports::today_in;
use crate::services::settlement::MonthKey;
use crate::services::summaries as summary_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/summaries")
            .route("", web::get().to(list_summaries))
            .route("/close", web::post().to(close_month))
            .route("/{month_year}", web::get().to(get_summary)),
    );
}

async fn close_month(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CloseMonthRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }
    let key = match MonthKey::new(body.year, body.month) {
        Some(key) => key,
        None => {
            return Ok(HttpResponse::BadRequest().json(ApiError::new(
                "validation_error",
                "Month must be between 1 and 12",
            )))
        }
    };

    match summary_service::close_month(
        &state.db,
        &ctx.house_id,
        &ctx.user_id,
        key,
        today_in(state.config.timezone),
    )
    .await
    {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiSuccess::new(summary))),
        Err(e) => Ok(summary_error("closing month", e)),
    }
}

async fn list_summaries(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }

    match summary_service::list_summaries(&state.db, &ctx.house_id).await {
        Ok(summaries) => Ok(HttpResponse::Ok().json(ApiSuccess::new(summaries))),
        Err(e) => Ok(summary_error("listing summaries", e)),
    }
}

async fn get_summary(state: web::Data<AppState>, req: HttpRequest, path: web::Path<String>) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }
    let key: MonthKey = match path.parse() {
        Ok(key) => key,
        Err(()) => {
            return Ok(HttpResponse::BadRequest().json(ApiError::new(
                "validation_error",
                "Month must be formatted as YYYY-MM",
            )))
        }
    };

    match summary_service::get_summary(&state.db, &ctx.house_id, key).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiSuccess::new(summary))),
        Err(e) => Ok(summary_error("fetching summary", e)),
    }
}
