//! Response assertions for handler tests

use actix_web::dev::ServiceResponse;
use actix_web::http::header;

/// Assert a `302 Found` to `location` that must not be cached
///
/// # Panics
///
/// Panics if the response is not such a redirect.
pub fn assert_redirect<B>(response: &ServiceResponse<B>, location: &str) {
    assert_eq!(
        response.status().as_u16(),
        302,
        "Expected redirect to {location}, got {}",
        response.status()
    );
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some(location),
        "Unexpected Location header"
    );
    assert_eq!(
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
        Some("no-store"),
        "Redirect must not be cacheable"
    );
}

/// Assert a redirect to `login_path` carrying an `error` query parameter
///
/// # Panics
///
/// Panics if the response does not redirect to the login page with an error.
pub fn assert_error_redirect<B>(response: &ServiceResponse<B>, login_path: &str) {
    assert_eq!(response.status().as_u16(), 302);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(
        location.starts_with(&format!("{login_path}?error=")),
        "Expected error redirect to {login_path}, got {location}"
    );
}
