use crate::models::auth::AuthError;
use crate::models::User;
use actix_web::http::header::{self, CacheControl, CacheDirective};
use actix_web::{HttpRequest, HttpResponse};
use serde_json::json;

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// `302 Found` to `location`; never cached, since the target depends on
    /// the session at the time of the request
    #[must_use]
    pub fn redirect(location: &str) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, location))
            .insert_header(CacheControl(vec![CacheDirective::NoStore]))
            .finish()
    }

    /// Redirect to `location` carrying `message` in the `error` query parameter
    #[must_use]
    pub fn error_redirect(location: &str, message: &str) -> HttpResponse {
        Self::redirect(&error_url(location, message))
    }

    /// Error redirect that also keeps the post-authentication target in `rd`
    ///
    /// `rd` must already be validated.
    #[must_use]
    pub fn error_redirect_with_target(
        location: &str,
        message: &str,
        rd: Option<&str>,
    ) -> HttpResponse {
        let mut redirect_url = error_url(location, message);
        if let Some(target) = rd {
            redirect_url.push_str("&rd=");
            redirect_url.push_str(&urlencoding::encode(target));
        }
        Self::redirect(&redirect_url)
    }

    #[must_use]
    pub fn auth_success_json(user: Option<&User>) -> HttpResponse {
        HttpResponse::Ok()
            .insert_header(CacheControl(vec![CacheDirective::NoStore]))
            .json(json!({
                "success": true,
                "user": user,
            }))
    }

    /// JSON failure body; the status reflects who is at fault
    #[must_use]
    pub fn auth_failure_json(error: &AuthError) -> HttpResponse {
        let mut builder = match error.kind().http_status() {
            400 => HttpResponse::BadRequest(),
            401 => HttpResponse::Unauthorized(),
            403 => HttpResponse::Forbidden(),
            409 => HttpResponse::Conflict(),
            429 => HttpResponse::TooManyRequests(),
            504 => HttpResponse::GatewayTimeout(),
            503 => HttpResponse::ServiceUnavailable(),
            _ => HttpResponse::BadGateway(),
        };
        builder
            .insert_header(CacheControl(vec![CacheDirective::NoStore]))
            .json(json!({
                "success": false,
                "error": error.message(),
                "kind": error.kind(),
            }))
    }
}

/// Whether the client asked for JSON rather than an HTML redirect
#[must_use]
pub fn wants_json(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

fn error_url(location: &str, message: &str) -> String {
    let separator = if location.contains('?') { '&' } else { '?' };
    format!("{location}{separator}error={}", urlencoding::encode(message))
}
