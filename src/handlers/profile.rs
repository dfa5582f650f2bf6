// Protected profile view
use super::helpers::render_profile_page;
use crate::authentication::ServiceContainer;
use crate::gate::{ProtectedView, ViewDecision};
use crate::utils::response_builder::ResponseBuilder;
use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{web, HttpResponse};
use log::debug;

/// `GET /profile`: render for a signed-in user, otherwise redirect to login
pub async fn profile(services: web::Data<ServiceContainer>) -> HttpResponse {
    let gate = ProtectedView::from_settings(services.settings());

    match gate.evaluate(&services.session().current()) {
        ViewDecision::Redirect { location, .. } => {
            debug!("Protected view requested without a session, redirecting to {location}");
            ResponseBuilder::redirect(&location)
        }
        ViewDecision::Render(view) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .insert_header(CacheControl(vec![CacheDirective::NoStore]))
            .body(render_profile_page(&view)),
    }
}
