use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, PeriodQuery, ReportView};
use uuid::Uuid;

use crate::handlers::{authenticate, internal_error, report_error, require_manager};
use crate::middleware::RequestContext;
use crate::models::AppState;
use crate::services::export::{export_filename, export_member_report};
use crate::services::reports::{self as report_service, resolve_period, today_in};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            .route("/member", web::get().to(member_dashboard))
            .route("/manager", web::get().to(manager_dashboard)),
    )
    .service(
        web::scope("/reports")
            .route("/member", web::get().to(member_report))
            .route("/member/export", web::get().to(export_report)),
    );
}

/// Whose report is being asked for; members may only ask for themselves
fn target_member(ctx: &RequestContext, requested: Option<Uuid>) -> Result<Uuid, HttpResponse> {
    let target = match requested.or(ctx.member_id) {
        Some(id) => id,
        None => {
            return Err(HttpResponse::BadRequest().json(ApiError::new(
                "validation_error",
                "member_id is required for accounts without a member record",
            )))
        }
    };

    if !ctx.can_view_member(&target) {
        return Err(HttpResponse::Forbidden().json(ApiError::new(
            "forbidden",
            "You can only view your own report",
        )));
    }
    Ok(target)
}

async fn member_dashboard(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    let member_id = match ctx.member_id {
        Some(id) => id,
        None => {
            return Ok(HttpResponse::NotFound().json(ApiError::new(
                "not_found",
                "Account is not linked to a member",
            )))
        }
    };
    let period = match resolve_period(&PeriodQuery::default(), today_in(state.config.timezone)) {
        Ok(period) => period,
        Err(e) => return Ok(report_error("resolving period", e)),
    };

    match report_service::member_monthly_report(&state.db, &ctx.house_id, &member_id, period.key).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiSuccess::new(report))),
        Err(e) => Ok(report_error("building member dashboard", e)),
    }
}

async fn manager_dashboard(
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

    match report_service::manager_dashboard(&state.db, &ctx.house_id, period.key).await {
        Ok(dashboard) => Ok(HttpResponse::Ok().json(ApiSuccess::new(dashboard))),
        Err(e) => Ok(report_error("building manager dashboard", e)),
    }
}

async fn member_report(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    let member_id = match target_member(&ctx, query.member_id) {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };
    let period = match resolve_period(&query, today_in(state.config.timezone)) {
        Ok(period) => period,
        Err(e) => return Ok(report_error("resolving period", e)),
    };

    match report_service::member_report(&state.db, &ctx.house_id, &member_id, period).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiSuccess::new(report))),
        Err(e) => Ok(report_error("building member report", e)),
    }
}

async fn export_report(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };
    let member_id = match target_member(&ctx, query.member_id) {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };
    let period = match resolve_period(&query, today_in(state.config.timezone)) {
        Ok(period) => period,
        Err(e) => return Ok(report_error("resolving period", e)),
    };

    let report = match report_service::member_report(&state.db, &ctx.house_id, &member_id, period).await {
        Ok(report) => report,
        Err(e) => return Ok(report_error("building member report", e)),
    };

    match export_member_report(&report) {
        Ok(bytes) => {
            log::info!(
                "{} report exported for member {}",
                if period.view == ReportView::Yearly { "Yearly" } else { "Monthly" },
                member_id
            );
            Ok(HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header(ContentDisposition {
                    disposition: DispositionType::Attachment,
                    parameters: vec![DispositionParam::Filename(export_filename(&report))],
                })
                .body(bytes))
        }
        Err(e) => Ok(internal_error("exporting report", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{bearer_for, manager, test_state};
    use crate::test_utils::seed_member;
    use actix_web::{http::StatusCode, test, App};
    use chrono::Utc;
    use serde_json::{json, Value};
    use shared::{Role, User};

    fn member_user(house_id: Uuid, member_id: Uuid) -> User {
        User {
            id: Uuid::new_v4(),
            username: "rahim".to_string(),
            email: "rahim@example.com".to_string(),
            role: Role::Member,
            house_id: Some(house_id),
            member_id: Some(member_id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn test_target_member_rules() {
        let house_id = Uuid::new_v4();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let member = RequestContext {
            user_id: Uuid::new_v4(),
            role: Role::Member,
            house_id,
            member_id: Some(me),
        };

        assert_eq!(target_member(&member, None).unwrap(), me);
        assert!(target_member(&member, Some(other)).is_err());

        let manager = RequestContext {
            role: Role::Manager,
            member_id: None,
            ..member
        };
        assert_eq!(target_member(&manager, Some(other)).unwrap(), other);
        assert!(target_member(&manager, None).is_err());
    }

    #[actix_web::test]
    async fn test_member_report_and_export() {
        let state = test_state().await;
        let (user, bearer) = manager(&state, "karim").await;
        let house_id = user.house_id.unwrap();
        let rahim = seed_member(&state.db, &house_id, "Rahim").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::handlers::configure_routes)).await;

        let requests = [
            ("/api/meals", json!({"member_id": rahim, "date": "2024-03-05", "meal_count": 40})),
            ("/api/deposits", json!({"member_id": rahim, "date": "2024-03-01", "amount": 2500})),
            ("/api/expenses", json!({"date": "2024-03-02", "category": "Rice", "amount": 2000})),
        ];
        for (uri, payload) in requests {
            let req = test::TestRequest::post()
                .uri(uri)
                .insert_header(("Authorization", bearer.clone()))
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success(), "{} failed", uri);
        }

        let member_bearer = bearer_for(&member_user(house_id, rahim));
        let req = test::TestRequest::get()
            .uri("/api/reports/member?view=monthly&month=3&year=2024")
            .insert_header(("Authorization", member_bearer.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["view"], "monthly");
        assert_eq!(body["data"]["house"]["meal_rate"], "50");
        assert_eq!(body["data"]["settlement"]["balance"], "500");

        let req = test::TestRequest::get()
            .uri("/api/reports/member/export?view=yearly&year=2024")
            .insert_header(("Authorization", member_bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap().to_str().unwrap(),
            "text/csv; charset=utf-8"
        );
        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("Month,Meal rate,Meals,Deposits,Cost,Balance\n"));
        assert!(text.contains("2024-03,50,40,2500,2000,500\n"));
    }

    #[actix_web::test]
    async fn test_member_cannot_open_manager_dashboard() {
        let state = test_state().await;
        let (user, bearer) = manager(&state, "karim").await;
        let house_id = user.house_id.unwrap();
        let rahim = seed_member(&state.db, &house_id, "Rahim").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::handlers::configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/dashboard/manager")
            .insert_header(("Authorization", bearer_for(&member_user(house_id, rahim))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/dashboard/manager?month=3&year=2024")
            .insert_header(("Authorization", bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["active_members"], 1);
    }
}
