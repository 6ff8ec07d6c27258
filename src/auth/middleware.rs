use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AttendanceError;
use crate::model::role::Role;
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

/// Verify the bearer token and attach the caller as [`AuthUser`]. Failures
/// answer 401 with the usual `{"message"}` body.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match authenticate(req.headers(), &config.jwt_secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(e) => {
            tracing::info!(error = %e, path = %req.path(), "Rejected request");
            let resp = e.error_response();
            Ok(req.into_response(resp))
        }
    }
}

fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthUser, AttendanceError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AttendanceError::unauthenticated("Missing Authorization header"))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AttendanceError::unauthenticated("Authorization header must be a Bearer token")
        })?;

    let claims = verify_token(token, secret)
        .map_err(|e| AttendanceError::unauthenticated(format!("Invalid or expired token: {e}")))?;

    let role = Role::from_id(claims.role)
        .ok_or_else(|| AttendanceError::unauthenticated("Invalid role"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Claims, TokenType};
    use actix_web::http::header::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "middleware-secret";

    fn signed(role: u8) -> String {
        let claims = Claims {
            user_id: 7,
            sub: "jane".into(),
            role,
            exp: 4_000_000_000,
            jti: "m-1".into(),
            token_type: TokenType::Access,
            employee_id: Some(1),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn valid_bearer_token_yields_the_caller() {
        let user = authenticate(
            &with_authorization(&format!("Bearer {}", signed(Role::Employee.id()))),
            SECRET,
        )
        .unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.employee_id, Some(1));
    }

    #[test]
    fn unusable_credentials_are_unauthenticated() {
        let token = signed(Role::Employee.id());
        let cases = [
            HeaderMap::new(),
            with_authorization(&token),
            with_authorization(&format!("Basic {token}")),
            with_authorization("Bearer not-a-jwt"),
            with_authorization(&format!("Bearer {}", signed(42))),
        ];

        for headers in cases {
            let err = authenticate(&headers, SECRET).unwrap_err();
            assert!(matches!(err, AttendanceError::Unauthenticated(_)), "{err}");
        }

        let wrong_secret = authenticate(&with_authorization(&format!("Bearer {token}")), "other");
        assert!(matches!(wrong_secret, Err(AttendanceError::Unauthenticated(_))));
    }
}
