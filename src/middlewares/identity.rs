use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::errors::HandlerError;

/// Header installed by the upstream identity provider once it has
/// authenticated the caller. This service trusts it blindly; verifying it is
/// out of scope here.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller id, available as a request extension behind
/// [`require_user`].
#[derive(Debug, Clone)]
pub struct UserId(pub String);

pub async fn require_user(
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, HandlerError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let Some(user_id) = user_id else {
        return Err(HandlerError::HandlerError(
            StatusCode::UNAUTHORIZED,
            "User not authenticated".to_string(),
        ));
    };

    req.extensions_mut().insert(UserId(user_id));
    Ok(next.run(req).await)
}
