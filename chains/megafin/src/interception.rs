//! Detection of edge-network interception pages.
//!
//! The API sits behind Cloudflare, which can answer with an HTML block or
//! challenge page (sometimes with status 200) instead of JSON. Every response
//! is checked here before it is decoded.

/// Exact, case-sensitive markers of known interception pages.
pub const INTERCEPTION_MARKERS: [&str; 3] = [
    "title>Access denied | api.megafin.xyz used Cloudflare to restrict access</title>",
    "<title>Just a moment...</title>",
    "<title>Attention Required! ",
];

pub fn is_intercepted(body: &[u8]) -> bool {
    INTERCEPTION_MARKERS
        .iter()
        .any(|marker| contains(body, marker.as_bytes()))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_marker_is_detected() {
        for marker in INTERCEPTION_MARKERS {
            let page = format!("<html><head>{}</head><body>..</body></html>", marker);
            assert!(is_intercepted(page.as_bytes()), "missed {}", marker);
        }
    }

    #[test]
    fn test_json_is_not_intercepted() {
        let body = br#"{"result":{"balance":{"MGF":1.5,"USDC":0.1}}}"#;
        assert!(!is_intercepted(body));
        assert!(!is_intercepted(b""));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!is_intercepted(b"<TITLE>Just a moment...</TITLE>"));
        assert!(!is_intercepted(b"<title>just a moment...</title>"));
    }

    #[test]
    fn test_similar_text_is_not_a_match() {
        assert!(!is_intercepted(b"Access denied for this wallet"));
        assert!(!is_intercepted(b"<title>Just a moment</title>"));
        assert!(!is_intercepted(b"Attention Required! please retry"));
        assert!(!is_intercepted(
            b"title>Access denied | example.com used Cloudflare to restrict access</title>"
        ));
    }

    #[test]
    fn test_marker_inside_status_200_page() {
        let page = b"<!DOCTYPE html><html><head><title>Attention Required! | Cloudflare</title>";
        assert!(is_intercepted(page));
    }
}
