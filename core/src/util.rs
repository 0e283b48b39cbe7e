//! Input checks for values that end up in HTTP requests

use anyhow::{bail, Context, Result};
use reqwest::header::HeaderValue;

/// Reject values that cannot travel in an HTTP header.
///
/// Control characters (including CR, LF and NUL) and DEL are refused with the
/// offending position so a pasted key with a stray newline is easy to spot.
pub fn sanitize_for_header(value: &str, field_name: &str) -> Result<String> {
    if value.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    if let Some((index, ch)) = value.char_indices().find(|(_, c)| c.is_ascii_control()) {
        bail!(
            "{} contains a control character at position {} ({:#04x})",
            field_name,
            index,
            ch as u32
        );
    }

    Ok(value.to_string())
}

/// Validate an API key for the `x-goog-api-key` header.
pub fn validate_api_key(api_key: &str) -> Result<HeaderValue> {
    let trimmed = api_key.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        bail!("API key is empty or set to 'none'");
    }

    sanitize_for_header(trimmed, "API key")?;

    let mut value = HeaderValue::from_str(trimmed).with_context(|| {
        format!(
            "API key is not a valid header value ({} characters)",
            trimmed.len()
        )
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Normalize a base URL: trimmed, scheme checked, no trailing slash.
pub fn sanitize_base_url(url: &str, field_name: &str) -> Result<String> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        bail!(
            "{} must start with 'http://' or 'https://'. Got: {}",
            field_name,
            trimmed
        );
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}
