use actix_web::{web, HttpRequest, HttpResponse, Result};
use shared::{ApiSuccess, CreateMemberRequest, UpdateMemberRequest};

use crate::handlers::{authenticate, member_error, parse_id, require_manager};
use crate::models::AppState;
use crate::services::members as member_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/members")
            .route("", web::get().to(list_members))
            .route("", web::post().to(create_member))
            .route("/{id}", web::get().to(get_member))
            .route("/{id}", web::put().to(update_member))
            .route("/{id}/join-token", web::post().to(issue_join_token)),
    );
}

async fn list_members(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    match member_service::list_members(&state.db, &ctx.house_id).await {
        Ok(members) => Ok(HttpResponse::Ok().json(ApiSuccess::new(members))),
        Err(e) => Ok(member_error("listing members", e)),
    }
}

async fn create_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateMemberRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }

    match member_service::create_member(&state.db, &ctx.house_id, &body.into_inner()).await {
        Ok(member) => Ok(HttpResponse::Created().json(ApiSuccess::new(member))),
        Err(e) => Ok(member_error("creating member", e)),
    }
}

async fn get_member(state: web::Data<AppState>, req: HttpRequest, path: web::Path<String>) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }
    let member_id = match parse_id(&path.into_inner(), "member") {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    match member_service::get_member(&state.db, &ctx.house_id, &member_id).await {
        Ok(member) => Ok(HttpResponse::Ok().json(ApiSuccess::new(member))),
        Err(e) => Ok(member_error("fetching member", e)),
    }
}

async fn update_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateMemberRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = require_manager(&ctx) {
        return Ok(resp);
    }
    let member_id = match parse_id(&path.into_inner(), "member") {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    match member_service::update_member(&state.db, &ctx.house_id, &member_id, &body.into_inner()).await {
        Ok(member) => Ok(HttpResponse::Ok().json(ApiSuccess::new(member))),
        Err(e) => Ok(member_error("updating member", e)),
    }
}

async fn issue_join_token(
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
    let member_id = match parse_id(&path.into_inner(), "member") {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    match member_service::issue_join_token(
        &state.db,
        &ctx.house_id,
        &member_id,
        state.config.join_token_expiry_hours,
    )
    .await
    {
        Ok(token) => Ok(HttpResponse::Created().json(ApiSuccess::new(token))),
        Err(e) => Ok(member_error("issuing join token", e)),
    }
}
