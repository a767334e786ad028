//! Redaction of credentials from provider error messages.
//!
//! Messages pass through [`redact_error_message`] before they are logged,
//! stored on a unit as `last_error`, or shown to the user.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern to match URLs with embedded credentials
static URL_WITH_CREDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://)[^:@\s]+:[^@\s]+@").expect("credential URL pattern is valid")
});

/// Pattern to match `key=` query parameters (Gemini accepts the API key this way)
static KEY_QUERY_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([?&]key=)[^&\s]+").expect("key query pattern is valid")
});

/// Pattern to match potential API keys (long alphanumeric strings)
static POTENTIAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_-])[A-Za-z0-9_-]{32,}(?:[^A-Za-z0-9_-]|$)")
        .expect("potential key pattern is valid")
});

/// Redact sensitive information from an error message.
///
/// - URLs with embedded credentials lose their userinfo
/// - `key=` query parameters lose their value
/// - runs of 32+ key-like characters are replaced
#[must_use]
pub fn redact_error_message(message: &str) -> String {
    let redacted = URL_WITH_CREDS.replace_all(message, "$1[REDACTED]@");
    let redacted = KEY_QUERY_PARAM.replace_all(&redacted, "${1}[REDACTED]");
    let redacted = POTENTIAL_KEY.replace_all(&redacted, "[REDACTED_KEY]");

    redacted.to_string()
}
