//! Structured fields embedded in proposal descriptions.
//!
//! Treasury proposals carry their metadata inside the free-form
//! `description` string, in one of two encodings:
//!
//! ```text
//! {"title": "Q3 grant", "proposal_action": "stake"}
//! * Title: Q3 grant <br>* Proposal Action: stake
//! ```
//!
//! Keys are compared case-insensitively with spaces, dashes and underscores
//! ignored, so `proposal_action`, `Proposal Action` and `proposalAction`
//! all address the same field.

use regex::Regex;
use std::sync::OnceLock;

/// Line separator used by the markdown encoding
pub const FIELD_SEPARATOR: &str = " <br>";

fn field_line_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\*\s*([^:]+?)\s*:\s*(.*?)\s*$").ok())
        .as_ref()
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Extract a single field from a proposal description.
pub fn decode_field(description: &str, key: &str) -> Option<String> {
    let wanted = normalize_key(key);

    if let Ok(serde_json::Value::Object(map)) =
        serde_json::from_str::<serde_json::Value>(description.trim())
    {
        return map.iter().find_map(|(k, v)| {
            if normalize_key(k) != wanted {
                return None;
            }
            match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            }
        });
    }

    description
        .split("<br>")
        .flat_map(|chunk| chunk.lines())
        .filter_map(|line| field_line_regex()?.captures(line))
        .find(|caps| normalize_key(&caps[1]) == wanted)
        .map(|caps| caps[2].to_string())
}

/// Decode every `* Key: value` line, in order of appearance.
pub fn decode_fields(description: &str) -> Vec<(String, String)> {
    description
        .split("<br>")
        .flat_map(|chunk| chunk.lines())
        .filter_map(|line| field_line_regex()?.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Encode fields in the markdown form understood by the dashboard.
pub fn encode_description<K, V>(fields: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fields
        .iter()
        .filter(|(_, v)| !v.as_ref().is_empty())
        .map(|(k, v)| format!("* {}: {}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_markdown_field() {
        let desc = "* Title: Q3 grant <br>* Summary: pay the auditors <br>* Proposal Action: stake";
        assert_eq!(decode_field(desc, "title").as_deref(), Some("Q3 grant"));
        assert_eq!(
            decode_field(desc, "proposal_action").as_deref(),
            Some("stake")
        );
        assert_eq!(decode_field(desc, "notes"), None);
    }

    #[test]
    fn test_decode_json_field() {
        let desc = r#"{"title":"Swap","proposal_action":"asset-exchange","amountIn":12}"#;
        assert_eq!(
            decode_field(desc, "Proposal Action").as_deref(),
            Some("asset-exchange")
        );
        assert_eq!(decode_field(desc, "amount_in").as_deref(), Some("12"));
    }

    #[test]
    fn test_plain_description_has_no_fields() {
        assert_eq!(decode_field("just a note", "title"), None);
        assert!(decode_fields("just a note").is_empty());
    }

    #[test]
    fn test_encode_skips_empty_values() {
        let encoded = encode_description(&[("Title", "Grant"), ("Notes", ""), ("Recipient", "bob.near")]);
        assert_eq!(encoded, "* Title: Grant <br>* Recipient: bob.near");
        assert_eq!(decode_field(&encoded, "recipient").as_deref(), Some("bob.near"));
    }

    #[test]
    fn test_value_may_contain_colons() {
        let desc = "* Url: https://example.org/a";
        assert_eq!(decode_field(desc, "url").as_deref(), Some("https://example.org/a"));
    }
}
