//! Input validation and normalization
//!
//! User-supplied names and URLs pass through here before they reach
//! the store. Errors always name the field that failed so dialogs can
//! surface them inline.

use crate::error::{WebletError, WebletResult};
use url::Url;

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 50;
const USER_AGENT_MAX_LEN: usize = 500;

/// Validate a webapp display name and return the trimmed form.
pub fn validate_name(name: &str) -> WebletResult<String> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(WebletError::validation("name cannot be empty"));
    }
    if trimmed.chars().count() < NAME_MIN_LEN {
        return Err(WebletError::validation(format!(
            "name must be at least {NAME_MIN_LEN} characters"
        )));
    }
    if trimmed.chars().count() > NAME_MAX_LEN {
        return Err(WebletError::validation(format!(
            "name must be at most {NAME_MAX_LEN} characters"
        )));
    }

    Ok(trimmed.to_string())
}

/// Validate a webapp URL and return the normalized form.
///
/// A missing scheme defaults to `https`; any explicit scheme other
/// than http(s) is rejected. The returned string is the trimmed
/// input, scheme-prefixed when needed, guaranteed to parse as an
/// absolute http(s) URL with a non-empty host.
pub fn validate_url(url: &str) -> WebletResult<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(WebletError::validation("url cannot be empty"));
    }

    // "://" means the user supplied a scheme; only a scheme-less
    // input gets the https default.
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| WebletError::validation(format!("url is not valid: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(WebletError::validation(format!(
            "url scheme must be http or https, got {}",
            parsed.scheme()
        )));
    }

    let host_ok = parsed
        .host_str()
        .is_some_and(|h| h.chars().any(|c| c.is_ascii_alphanumeric()));
    if !host_ok {
        return Err(WebletError::validation("url has no host"));
    }

    Ok(candidate)
}

/// Validate a custom user-agent override. Empty means "use default".
pub fn validate_user_agent(user_agent: &str) -> WebletResult<()> {
    if user_agent.is_empty() {
        return Ok(());
    }
    if user_agent.len() > USER_AGENT_MAX_LEN {
        return Err(WebletError::validation(format!(
            "user agent must be at most {USER_AGENT_MAX_LEN} characters"
        )));
    }
    if !user_agent.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(WebletError::validation(
            "user agent must contain alphanumeric characters",
        ));
    }
    Ok(())
}

/// Sanitize a string for use as a filename.
pub fn sanitize_filename(filename: &str) -> String {
    let mut sanitized: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();

    sanitized = sanitized.trim_matches(['.', ' ']).to_string();

    if sanitized.len() > 255 {
        sanitized.truncate(255);
    }

    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_trimmed() {
        assert_eq!(validate_name("  Example  ").unwrap(), "Example");
    }

    #[test]
    fn test_name_length_limits() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("A").is_err());
        assert!(validate_name("Ab").is_ok());
        assert!(validate_name(&"x".repeat(50)).is_ok());
        assert!(validate_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_name_error_mentions_field() {
        let err = validate_name("A").unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_url_scheme_defaulted_to_https() {
        assert_eq!(validate_url("example.com").unwrap(), "https://example.com");
        assert_eq!(
            validate_url("  mail.example.com/inbox ").unwrap(),
            "https://mail.example.com/inbox"
        );
    }

    #[test]
    fn test_url_existing_scheme_preserved() {
        assert_eq!(
            validate_url("http://example.com/app").unwrap(),
            "http://example.com/app"
        );
        assert_eq!(
            validate_url("https://example.com/").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_url_rejects_non_http_schemes() {
        assert!(validate_url("ftp://a.example/").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("javascript://example.com").is_err());
    }

    #[test]
    fn test_url_rejects_garbage() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
        assert!(validate_url("https://").is_err());
    }

    #[test]
    fn test_url_error_mentions_field() {
        let err = validate_url("not a url").unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_user_agent_limits() {
        assert!(validate_user_agent("").is_ok());
        assert!(validate_user_agent("Mozilla/5.0").is_ok());
        assert!(validate_user_agent(&"x".repeat(501)).is_err());
        assert!(validate_user_agent("----").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_filename("  .name. "), "name");
        assert_eq!(sanitize_filename(""), "unnamed");
    }
}
