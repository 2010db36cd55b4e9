use actix_web::{web, HttpRequest, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, UpdateHouseRequest};

use crate::handlers::{authenticate, house_error, internal_error, require_manager};
use crate::models::AppState;
use crate::services::houses as house_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/house")
            .route(web::get().to(get_house))
            .route(web::put().to(update_house)),
    );
}

async fn get_house(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    match house_service::get_house(&state.db, &ctx.house_id).await {
        Ok(Some(house)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(house))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiError::new("not_found", "House not found"))),
        Err(e) => Ok(internal_error("fetching house", e)),
    }
}

async fn update_house(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateHouseRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }

    match house_service::update_house(&state.db, &ctx.house_id, &body.into_inner()).await {
        Ok(house) => Ok(HttpResponse::Ok().json(ApiSuccess::new(house))),
        Err(e) => Ok(house_error("updating house", e)),
    }
}
