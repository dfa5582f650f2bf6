// Credential handlers: sign-up, sign-in, sign-out and the session view
use super::types::CredentialRequest;
use crate::authentication::ServiceContainer;
use crate::models::auth::AuthResult;
use crate::models::User;
use crate::utils::logging::LoggingHelper;
use crate::utils::redirect_validator::{redirect_or, validate_post_auth_redirect};
use crate::utils::response_builder::{wants_json, ResponseBuilder};
use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{web, Either, HttpRequest, HttpResponse};
use log::warn;

/// Form or JSON body of a credential request
pub type CredentialBody = Either<web::Json<CredentialRequest>, web::Form<CredentialRequest>>;

fn into_request(body: CredentialBody) -> CredentialRequest {
    match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    }
}

/// `POST /auth/sign_up`: register a new account
pub async fn sign_up(
    req: HttpRequest,
    body: CredentialBody,
    services: web::Data<ServiceContainer>,
) -> HttpResponse {
    LoggingHelper::log_request_debug(&req, "sign_up");
    let request = into_request(body);
    let outcome = services
        .credentials()
        .register(&request.email, &request.password)
        .await;
    respond_to_credentials(&req, &services, outcome, request.rd.as_deref()).await
}

/// `POST /auth/sign_in`: authenticate an existing account
pub async fn sign_in(
    req: HttpRequest,
    body: CredentialBody,
    services: web::Data<ServiceContainer>,
) -> HttpResponse {
    LoggingHelper::log_request_debug(&req, "sign_in");
    let request = into_request(body);
    let outcome = services
        .credentials()
        .authenticate(&request.email, &request.password)
        .await;
    respond_to_credentials(&req, &services, outcome, request.rd.as_deref()).await
}

/// `GET|POST /auth/sign_out`: end the provider session
///
/// Waits briefly for the watcher to clear the shared context so the next
/// page load sees the signed-out state.
pub async fn sign_out(req: HttpRequest, services: web::Data<ServiceContainer>) -> HttpResponse {
    LoggingHelper::log_request_debug(&req, "sign_out");
    let login_path = &services.settings().application.login_path;

    match services.credentials().deauthenticate().await {
        Ok(previous) => {
            if previous.is_some()
                && !services
                    .session()
                    .wait_for_sign_out(services.settings().session_sync_timeout())
                    .await
            {
                warn!("Session context still shows a user after sign-out");
            }
            if wants_json(&req) {
                ResponseBuilder::auth_success_json(previous.as_ref())
            } else {
                ResponseBuilder::redirect(login_path)
            }
        }
        Err(e) if wants_json(&req) => ResponseBuilder::auth_failure_json(&e),
        Err(e) => ResponseBuilder::error_redirect(login_path, e.message()),
    }
}

/// `GET /auth/session`: the shared session context as JSON
pub async fn session_info(services: web::Data<ServiceContainer>) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .json(services.session().current())
}

async fn respond_to_credentials(
    req: &HttpRequest,
    services: &ServiceContainer,
    outcome: AuthResult<User>,
    rd: Option<&str>,
) -> HttpResponse {
    let application = &services.settings().application;

    match outcome {
        Ok(user) => {
            // The follow-up request for the protected view must not race the watcher
            if !services
                .session()
                .wait_for_user(&user, services.settings().session_sync_timeout())
                .await
            {
                warn!(
                    "Session context did not reflect {} within {}ms",
                    user.email, application.session_sync_timeout_ms
                );
            }
            if wants_json(req) {
                ResponseBuilder::auth_success_json(Some(&user))
            } else {
                ResponseBuilder::redirect(&redirect_or(rd, &application.profile_path))
            }
        }
        Err(e) if wants_json(req) => ResponseBuilder::auth_failure_json(&e),
        Err(e) => {
            // Keep the post-login target so the retry lands in the same place
            let target = rd
                .filter(|t| !t.is_empty())
                .and_then(|t| validate_post_auth_redirect(t).ok());
            ResponseBuilder::error_redirect_with_target(
                &application.login_path,
                e.message(),
                target.as_deref(),
            )
        }
    }
}
