use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::Role,
    token::{Claims, TokenService},
};

/// AuthUser
///
/// The resolved identity of an authenticated request, rebuilt from token
/// claims alone. Handlers take it as an argument to learn who is calling.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("unauthorized".to_string())
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// AuthUser Extractor Implementation
///
/// 1. Reuse: if `require_authenticated` already ran, the identity is in the
///    request extensions and is returned as-is.
/// 2. Token Extraction: bearer token from the `Authorization` header.
/// 3. Verification: signature and expiry via `TokenService`.
///
/// Rejection: every failure yields the same generic 401 so callers cannot
/// tell a malformed token from an expired one.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = bearer_token(&parts.headers).ok_or_else(unauthorized)?;
        let tokens = TokenService::from_ref(state);

        match tokens.verify(token) {
            Ok(claims) => Ok(claims.into()),
            Err(e) => {
                tracing::debug!(reason = %e, "bearer token rejected");
                Err(unauthorized())
            }
        }
    }
}

/// require_authenticated
///
/// Route-layer middleware guarding every protected endpoint. The `AuthUser`
/// extractor rejects with 401 before this body runs; on success the identity
/// is attached to the request for downstream layers and handlers.
pub async fn require_authenticated(
    auth_user: AuthUser,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// require_role
///
/// Second layer for role-gated endpoints, installed with
/// `middleware::from_fn_with_state(Role::Admin, require_role)` inside
/// `require_authenticated`. Authenticated callers with another role get 403.
pub async fn require_role(
    State(required): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(user) = request.extensions().get::<AuthUser>() else {
        return Err(unauthorized());
    };

    if user.role != required {
        tracing::warn!(
            user_id = %user.id,
            role = %user.role,
            required = %required,
            "role check failed"
        );
        return Err(AppError::Forbidden(format!("{required} role required")));
    }

    Ok(next.run(request).await)
}
