// src/analyze/salvage.rs
//! Recovering JSON from model output. Each stage is a pure `&str -> Option<T>`;
//! `salvage` tries them in order and the caller decides how to degrade.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^```(?:json)?\s*").unwrap());
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// Which stage produced the value; logged so prompt regressions are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Strict,
    Fenced,
    Braced,
    Repaired,
}

pub fn strict<T: DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_str(raw.trim()).ok()
}

/// Drop a leading ```` ```json ```` and a trailing ```` ``` ````.
pub fn strip_fences(raw: &str) -> String {
    let t = raw.trim();
    let t = FENCE_OPEN.replace(t, "");
    FENCE_CLOSE.replace(&t, "").trim().to_string()
}

pub fn fenced<T: DeserializeOwned>(raw: &str) -> Option<T> {
    strict(&strip_fences(raw))
}

/// Text between the first `{` and the last `}`, inclusive.
pub fn extract_braces(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

pub fn braced<T: DeserializeOwned>(raw: &str) -> Option<T> {
    strict(extract_braces(&strip_fences(raw))?)
}

pub fn remove_trailing_commas(raw: &str) -> String {
    TRAILING_COMMA.replace_all(raw, "$1").into_owned()
}

pub fn repaired<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let cleaned = strip_fences(raw);
    let body = extract_braces(&cleaned)?;
    strict(&remove_trailing_commas(body))
}

/// Run the stages in order; `None` means the caller should degrade.
pub fn salvage<T: DeserializeOwned>(raw: &str) -> Option<(T, Stage)> {
    if let Some(v) = strict(raw) {
        return Some((v, Stage::Strict));
    }
    if let Some(v) = fenced(raw) {
        return Some((v, Stage::Fenced));
    }
    if let Some(v) = braced(raw) {
        return Some((v, Stage::Braced));
    }
    repaired(raw).map(|v| (v, Stage::Repaired))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn stages_fire_in_order() {
        let (_, s) = salvage::<Value>(r#"{"a":1}"#).unwrap();
        assert_eq!(s, Stage::Strict);

        let (_, s) = salvage::<Value>("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(s, Stage::Fenced);

        let (_, s) = salvage::<Value>("Here you go:\n{\"a\":1}\nEnjoy!").unwrap();
        assert_eq!(s, Stage::Braced);

        let (v, s) = salvage::<Value>("Sure! {\"a\":[1,2,],\"b\":{\"c\":3,},}").unwrap();
        assert_eq!(s, Stage::Repaired);
        assert_eq!(v["a"][1], 2);
    }

    #[test]
    fn prose_degrades() {
        assert!(salvage::<Value>("I could not find any trends today.").is_none());
        assert!(salvage::<Value>("} backwards {").is_none());
    }

    #[test]
    fn fence_without_language_tag() {
        assert_eq!(strip_fences("```\n{}\n```"), "{}");
    }
}
