//! Caller identity.
//!
//! Sessions are issued by the external identity provider; its gateway
//! forwards the authenticated user id and role as request headers.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::principal::{Principal, Role};
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AppError> {
    let user_id = header(headers, USER_ID_HEADER)
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or(AppError::Unauthorized)?;

    let role = match header(headers, USER_ROLE_HEADER).map(str::to_ascii_lowercase) {
        None => Role::Customer,
        Some(role) if role == "customer" => Role::Customer,
        Some(role) if role == "admin" => Role::Admin,
        Some(role) => {
            log::warn!("Rejected unknown role '{}' for user {}", role, user_id);
            return Err(AppError::Unauthorized);
        }
    };

    Ok(Principal { user_id, role })
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = principal_from_headers(req.headers());
        if result.is_err() {
            log::warn!("Missing or invalid identity on {} {}", req.method(), req.path());
        }
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn defaults_to_customer_role() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .to_http_request();
        let principal = principal_from_headers(req.headers()).unwrap();
        assert_eq!(principal, Principal::customer(id));
    }

    #[test]
    fn admin_role_is_case_insensitive() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .insert_header((USER_ROLE_HEADER, "Admin"))
            .to_http_request();
        assert!(principal_from_headers(req.headers()).unwrap().is_admin());
    }

    #[test]
    fn missing_or_malformed_identity_is_unauthorized() {
        let none = TestRequest::default().to_http_request();
        assert!(matches!(
            principal_from_headers(none.headers()),
            Err(AppError::Unauthorized)
        ));

        let bad = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert!(principal_from_headers(bad.headers()).is_err());

        let odd_role = TestRequest::default()
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .insert_header((USER_ROLE_HEADER, "superuser"))
            .to_http_request();
        assert!(principal_from_headers(odd_role.headers()).is_err());
    }
}
