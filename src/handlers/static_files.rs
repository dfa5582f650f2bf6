use super::helpers::get_login_page;
use super::types::LoginQuery;
use crate::authentication::ServiceContainer;
use crate::models::HealthResponse;
use crate::utils::redirect_validator::validate_post_auth_redirect;
use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{web, HttpResponse, Result};

/// Health check endpoint
///
/// # Errors
/// Returns an error if health status cannot be determined
pub async fn health() -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: "Authgate is running".to_string(),
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Login and sign-up page
///
/// Shows the `error` query parameter when a failed credential call
/// redirected here. A valid `rd` is carried into the form.
///
/// # Errors
/// Never fails; the page falls back to generated HTML
pub async fn login_page(
    query: web::Query<LoginQuery>,
    services: web::Data<ServiceContainer>,
) -> Result<HttpResponse> {
    let rd = query
        .rd
        .as_deref()
        .and_then(|target| validate_post_auth_redirect(target).ok());
    let page = get_login_page(services.settings(), query.error.as_deref(), rd.as_deref());

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .body(page))
}
