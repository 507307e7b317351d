use std::collections::HashMap;

/// Parse query parameters from a URI string.
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use ripple::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/path?user=john&page=2");
/// assert_eq!(params.get("user"), Some(&"john".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&') {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get a string parameter from parsed query params with optional default
pub fn get_string(params: &HashMap<String, String>, key: &str, default: Option<&str>) -> Option<String> {
    params.get(key)
        .cloned()
        .or_else(|| default.map(|d| d.to_string()))
}

/// Get a positive integer parameter; missing, unparsable, or zero values
/// fall back to the default rather than failing.
pub fn get_positive_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params.get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encoded_values() {
        let params = parse_query_params("/api/users/search?q=jo%20hn&page=3");
        assert_eq!(params.get("q"), Some(&"jo hn".to_string()));
        assert_eq!(params.get("page"), Some(&"3".to_string()));
    }

    #[test]
    fn positive_int_falls_back_on_garbage() {
        let params = parse_query_params("/p?page=abc&limit=0&ok=7");
        assert_eq!(get_positive_int(&params, "page", 1), 1);
        assert_eq!(get_positive_int(&params, "limit", 20), 20);
        assert_eq!(get_positive_int(&params, "ok", 1), 7);
        assert_eq!(get_positive_int(&params, "missing", 5), 5);
    }

    #[test]
    fn no_query_string_yields_empty_map() {
        assert!(parse_query_params("/api/posts").is_empty());
    }
}
