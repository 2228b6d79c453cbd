use base64::{engine::general_purpose::STANDARD, Engine as _};
use camgate_core::models::BasicCredentials;

/// Decode an `Authorization: Basic <base64(user:pass)>` header value.
///
/// Returns `None` for any other scheme or an undecodable payload.
pub fn parse_basic_authorization(value: &str) -> Option<BasicCredentials> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(user_pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(user_pass))
    }

    #[test]
    fn test_parse_basic_authorization() {
        let creds = parse_basic_authorization(&header("cam:secret")).unwrap();
        assert_eq!(creds.username, "cam");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn test_password_may_contain_colons() {
        let creds = parse_basic_authorization(&header("svc:to:ken")).unwrap();
        assert_eq!(creds.username, "svc");
        assert_eq!(creds.password, "to:ken");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let value = header("cam:secret").replace("Basic", "bAsIc");
        assert!(parse_basic_authorization(&value).is_some());
    }

    #[test]
    fn test_rejects_other_schemes_and_garbage() {
        assert!(parse_basic_authorization("Bearer abc").is_none());
        assert!(parse_basic_authorization("Basic !!!").is_none());
        assert!(parse_basic_authorization(&header("no-colon")).is_none());
        assert!(parse_basic_authorization("Basic").is_none());
    }
}
