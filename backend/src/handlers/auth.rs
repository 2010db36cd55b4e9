use actix_web::{web, HttpRequest, HttpResponse, Result};
use shared::{
    ApiError, ApiSuccess, AuthResponse, ChangePasswordRequest, JoinRequest, LoginRequest, RegisterManagerRequest,
    ResetPasswordRequest, SecurityQuestionRequest, User,
};

use crate::handlers::{authenticate, internal_error};
use crate::middleware::RateLimiter;
use crate::models::AppState;
use crate::services::auth::{self as auth_service, AuthError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/join", web::post().to(join))
            .route("/login", web::post().to(login))
            .route("/security-question", web::post().to(security_question))
            .route("/reset-password", web::post().to(reset_password))
            .route("/change-password", web::post().to(change_password))
            .route("/me", web::get().to(get_current_user)),
    );
}

fn rate_limited() -> HttpResponse {
    HttpResponse::TooManyRequests().json(ApiError::new(
        "rate_limited",
        "Too many failed attempts. Please try again later.",
    ))
}

/// Registration failures never commit anything; they all come back as 400
fn registration_error(err: AuthError) -> HttpResponse {
    match err {
        AuthError::Validation(msg) => HttpResponse::BadRequest().json(ApiError::new("validation_error", msg)),
        AuthError::UserAlreadyExists
        | AuthError::InvalidJoinToken
        | AuthError::ExpiredJoinToken
        | AuthError::MemberAlreadyRegistered => {
            HttpResponse::BadRequest().json(ApiError::new("registration_error", err.to_string()))
        }
        other => internal_error("registering account", other),
    }
}

fn issue_token(state: &AppState, user: User, created: bool) -> HttpResponse {
    match auth_service::create_jwt(&user, &state.config.jwt_secret, state.config.jwt_expiration_hours) {
        Ok(token) => {
            let body = ApiSuccess::new(AuthResponse { token, user });
            if created {
                HttpResponse::Created().json(body)
            } else {
                HttpResponse::Ok().json(body)
            }
        }
        Err(e) => internal_error("creating token", e),
    }
}

async fn register(state: web::Data<AppState>, body: web::Json<RegisterManagerRequest>) -> Result<HttpResponse> {
    match auth_service::register_manager(&state.db, &body.into_inner()).await {
        Ok(user) => Ok(issue_token(&state, user, true)),
        Err(e) => {
            log::warn!("Manager registration failed: {}", e);
            Ok(registration_error(e))
        }
    }
}

async fn join(state: web::Data<AppState>, body: web::Json<JoinRequest>) -> Result<HttpResponse> {
    match auth_service::join_house(&state.db, &body.into_inner()).await {
        Ok(user) => Ok(issue_token(&state, user, true)),
        Err(e) => {
            log::warn!("Join registration failed: {}", e);
            Ok(registration_error(e))
        }
    }
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse> {
    let request = body.into_inner();
    let key = RateLimiter::key_for(&request.username);

    if !state.login_rate_limiter.check(&key) {
        log::warn!("Login rate limit hit for {}", key);
        return Ok(rate_limited());
    }

    match auth_service::login_user(&state.db, &request).await {
        Ok(user) => {
            state.login_rate_limiter.clear(&key);
            Ok(issue_token(&state, user, false))
        }
        Err(AuthError::InvalidCredentials) => {
            state.login_rate_limiter.record(&key);
            log::warn!(
                "Failed login for {} ({} attempts left)",
                key,
                state.login_rate_limiter.remaining(&key)
            );
            Ok(HttpResponse::Unauthorized().json(ApiError::new(
                "unauthorized",
                "Invalid username or password",
            )))
        }
        Err(e) => Ok(internal_error("logging in", e)),
    }
}

async fn security_question(
    state: web::Data<AppState>,
    body: web::Json<SecurityQuestionRequest>,
) -> Result<HttpResponse> {
    match auth_service::get_security_question(&state.db, &body.username).await {
        Ok(question) => Ok(HttpResponse::Ok().json(ApiSuccess::new(question))),
        Err(AuthError::UserNotFound) => Ok(HttpResponse::NotFound().json(ApiError::new(
            "not_found",
            "User not found",
        ))),
        Err(e) => Ok(internal_error("fetching security question", e)),
    }
}

async fn reset_password(state: web::Data<AppState>, body: web::Json<ResetPasswordRequest>) -> Result<HttpResponse> {
    let request = body.into_inner();
    let key = RateLimiter::key_for(&request.username);

    if !state.reset_rate_limiter.check(&key) {
        log::warn!("Password reset rate limit hit for {}", key);
        return Ok(rate_limited());
    }

    match auth_service::reset_password(&state.db, &request).await {
        Ok(()) => {
            state.reset_rate_limiter.clear(&key);
            Ok(HttpResponse::NoContent().finish())
        }
        Err(AuthError::InvalidCredentials) => {
            state.reset_rate_limiter.record(&key);
            log::warn!("Failed password reset for {}", key);
            Ok(HttpResponse::Unauthorized().json(ApiError::new(
                "unauthorized",
                "Username or security answer is incorrect",
            )))
        }
        Err(AuthError::Validation(msg)) => Ok(HttpResponse::BadRequest().json(ApiError::new("validation_error", msg))),
        Err(e) => Ok(internal_error("resetting password", e)),
    }
}

async fn change_password(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    match auth_service::change_password(&state.db, &ctx.user_id, &body.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(AuthError::InvalidCredentials) => Ok(HttpResponse::Unauthorized().json(ApiError::new(
            "unauthorized",
            "Current password is incorrect",
        ))),
        Err(AuthError::Validation(msg)) => Ok(HttpResponse::BadRequest().json(ApiError::new("validation_error", msg))),
        Err(AuthError::UserNotFound) => Ok(HttpResponse::NotFound().json(ApiError::new(
            "not_found",
            "User not found",
        ))),
        Err(e) => Ok(internal_error("changing password", e)),
    }
}

async fn get_current_user(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let ctx = match authenticate(&req, &state) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    match auth_service::get_user_by_id(&state.db, &ctx.user_id).await {
        Ok(Some(user)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiError::new("not_found", "User not found"))),
        Err(e) => Ok(internal_error("fetching user", e)),
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{manager, test_state};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_register_then_me() {
        let state = test_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::handlers::configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": "karim",
                "email": "karim@example.com",
                "password": "password123",
                "house_name": "Green Villa",
                "security_question": "First pet?",
                "security_answer": "Tom"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["user"]["role"], "manager");

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/auth/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_short_password_is_validation_error() {
        let state = test_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::handlers::configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": "karim",
                "email": "karim@example.com",
                "password": "short",
                "house_name": "Green Villa",
                "security_question": "First pet?",
                "security_answer": "Tom"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "validation_error");
    }

    #[actix_web::test]
    async fn test_login_is_rate_limited() {
        let state = test_state().await;
        manager(&state, "karim").await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::handlers::configure_routes)).await;

        for _ in 0..5 {
            let req = test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({"username": "karim", "password": "wrong-password"}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": "Karim", "password": "password123"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_join_with_bad_token() {
        let state = test_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(crate::handlers::configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/join")
            .set_json(json!({
                "token": "deadbeef",
                "username": "rahim",
                "email": "rahim@example.com",
                "password": "password123",
                "security_question": "Home town?",
                "security_answer": "Sylhet"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "registration_error");
    }
}
