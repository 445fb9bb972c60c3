//! Photo-URL normalisation for report documents.
//!
//! Reporter clients have written photo references under several field names
//! over time. Precedence: a non-empty `photoUrls` array wins, then a
//! non-blank `photoUrl` string, then a scan of the remaining fields for
//! photo-like keys (strings and arrays of strings) and `url`-like scalar
//! keys (de-duplicated). The first element of the result is the canonical
//! main reported photo.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref PHOTO_KEY_REGEX: Regex = Regex::new(r"(?i)photo|image|img|picture").unwrap();
    static ref URL_KEY_REGEX: Regex = Regex::new(r"(?i)url").unwrap();
}

/// Extract the ordered photo-URL list from a report document's fields
pub fn extract_photo_urls(fields: &Map<String, Value>) -> Vec<String> {
    // 1) canonical: photoUrls (array)
    if let Some(Value::Array(entries)) = fields.get("photoUrls") {
        let urls: Vec<String> = entries.iter().filter_map(stringify).collect();
        if !urls.is_empty() {
            return urls;
        }
    }

    // 2) single canonical: photoUrl (string)
    if let Some(url) = fields.get("photoUrl").and_then(Value::as_str) {
        let url = url.trim();
        if !url.is_empty() {
            return vec![url.to_string()];
        }
    }

    // 3) fallback: any key that looks like photo/image/url
    let mut urls = Vec::new();
    for (key, value) in fields {
        if PHOTO_KEY_REGEX.is_match(key) {
            match value {
                Value::Array(entries) => {
                    urls.extend(entries.iter().filter_map(stringify));
                }
                other => {
                    if let Some(url) = stringify(other) {
                        urls.push(url);
                    }
                }
            }
        }
        if URL_KEY_REGEX.is_match(key) {
            if let Some(url) = value.as_str() {
                let url = url.trim();
                if !url.is_empty() && !urls.iter().any(|u| u == url) {
                    urls.push(url.to_string());
                }
            }
        }
    }
    urls
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
