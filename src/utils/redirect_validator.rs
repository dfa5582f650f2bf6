//! Post-authentication redirect validation
//!
//! The `rd` parameter of the credential endpoints may only name a path on this
//! origin. Anything that could leave it (scheme, protocol-relative `//`,
//! backslashes, encoded variants of those) is rejected.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MAX_REDIRECT_LEN: usize = 2048;

static PATH_TRAVERSAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\.").expect("valid traversal regex"));

// A scheme prefix or a run of slashes that makes a URL protocol-relative
static PROTOCOL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*:)|(?:/{2,})").expect("valid protocol regex")
});

// Control characters, encoded CR/LF/NUL, backslashes and invisible separators
static SUSPICIOUS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[\x00-\x1F\x7F-\x9F]|%(?:00|0[ad]|09|5c)|\\|[\u{200E}\u{200F}\u{2000}-\u{200A}\u{2060}-\u{2064}]",
    )
    .expect("valid suspicious-character regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirectError {
    #[error("redirect target is empty")]
    Empty,
    #[error("redirect target exceeds {MAX_REDIRECT_LEN} characters")]
    TooLong,
    #[error("redirect target must be a path on this site")]
    NotRelative,
    #[error("redirect target contains path traversal")]
    Traversal,
    #[error("redirect target contains a protocol or host")]
    Protocol,
    #[error("redirect target contains forbidden characters")]
    Suspicious,
}

/// Validate a post-authentication redirect target
///
/// Returns the target unchanged when it is a plain same-origin path.
///
/// # Errors
///
/// Returns the first [`RedirectError`] the target trips over.
pub fn validate_post_auth_redirect(target: &str) -> Result<String, RedirectError> {
    debug!("Validating post-authentication redirect: {target}");

    if target.is_empty() {
        return Err(RedirectError::Empty);
    }
    if target.len() > MAX_REDIRECT_LEN {
        warn!("Excessively long redirect target: {} characters", target.len());
        return Err(RedirectError::TooLong);
    }
    if !target.starts_with('/') {
        warn!("Rejected non-relative redirect target: {target}");
        return Err(RedirectError::NotRelative);
    }

    for variant in decoded_variants(target) {
        check_patterns(target, &variant)?;
    }

    Ok(target.to_string())
}

/// Validate `target`, falling back to `default` when it is absent or rejected
#[must_use]
pub fn redirect_or(target: Option<&str>, default: &str) -> String {
    target
        .filter(|t| !t.is_empty())
        .and_then(|t| validate_post_auth_redirect(t).ok())
        .unwrap_or_else(|| default.to_string())
}

fn check_patterns(original: &str, candidate: &str) -> Result<(), RedirectError> {
    if PATH_TRAVERSAL_PATTERN.is_match(candidate) {
        warn!("Path traversal in redirect target: {original}");
        return Err(RedirectError::Traversal);
    }
    if PROTOCOL_PATTERN.is_match(candidate) || candidate.contains(':') {
        warn!("Protocol injection in redirect target: {original}");
        return Err(RedirectError::Protocol);
    }
    if SUSPICIOUS_PATTERN.is_match(candidate) || candidate.contains('@') {
        warn!("Suspicious characters in redirect target: {original}");
        return Err(RedirectError::Suspicious);
    }
    Ok(())
}

/// The raw target plus its single and double URL-decoded forms
fn decoded_variants(target: &str) -> Vec<String> {
    let mut variants = vec![target.to_string()];

    if let Ok(once) = urlencoding::decode(target) {
        if once != target {
            let once = once.into_owned();
            let twice = urlencoding::decode(&once)
                .ok()
                .map(std::borrow::Cow::into_owned)
                .filter(|twice| *twice != once);
            variants.push(once);
            variants.extend(twice);
        }
    }
    variants
}
