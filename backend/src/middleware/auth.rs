use actix_web::HttpRequest;
use shared::Role;
use uuid::Uuid;

use crate::services::auth as auth_service;

/// Who is calling and which house they act on.
///
/// Decoded from the bearer token on every request and passed explicitly
/// into services; nothing reads ambient session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub role: Role,
    pub house_id: Uuid,
    pub member_id: Option<Uuid>,
}

impl RequestContext {
    pub fn is_manager(&self) -> bool {
        self.role.can_manage_house()
    }

    /// Managers may look at anyone in their house, members only at themselves
    pub fn can_view_member(&self, member_id: &Uuid) -> bool {
        self.role.can_view_all_members() || self.member_id.as_ref() == Some(member_id)
    }
}

/// Extract the request context from the Authorization header
pub fn extract_context(req: &HttpRequest, jwt_secret: &str) -> Result<RequestContext, AuthMiddlewareError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or(AuthMiddlewareError::MissingToken)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthMiddlewareError::InvalidToken)?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AuthMiddlewareError::InvalidToken)?;

    let claims = auth_service::verify_jwt(token, jwt_secret)
        .map_err(|_| AuthMiddlewareError::InvalidToken)?;

    let parse = |value: &str| Uuid::parse_str(value).map_err(|_| AuthMiddlewareError::InvalidToken);

    Ok(RequestContext {
        user_id: parse(&claims.sub)?,
        role: claims.role.parse().map_err(|_| AuthMiddlewareError::InvalidToken)?,
        house_id: parse(&claims.house_id)?,
        member_id: claims.member_id.as_deref().map(parse).transpose()?,
    })
}

#[derive(Debug)]
pub enum AuthMiddlewareError {
    MissingToken,
    InvalidToken,
}

impl std::fmt::Display for AuthMiddlewareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMiddlewareError::MissingToken => write!(f, "Missing authorization token"),
            AuthMiddlewareError::InvalidToken => write!(f, "Invalid authorization token"),
        }
    }
}

impl std::error::Error for AuthMiddlewareError {}
