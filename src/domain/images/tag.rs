use std::collections::BTreeSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// Placeholder token marking where an image goes: ***label***
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*\*([^*\r\n]+)\*\*\*").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Builds a tag from its label, e.g. `"1"` becomes `***1***`.
    pub fn from_label(label: &str) -> Self {
        Tag(format!("***{label}***"))
    }

    /// Accepts only a string that is exactly one placeholder token.
    pub fn parse(token: &str) -> Option<Self> {
        let cap = TAG_RE.captures(token)?;
        let whole = cap.get(0)?;
        if whole.start() == 0 && whole.end() == token.len() {
            Some(Tag(token.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn label(&self) -> &str {
        &self.0[3..self.0.len() - 3]
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All placeholder tokens in `document`, deduplicated and in ascending order.
pub fn extract_tags(document: &str) -> Vec<Tag> {
    let set: BTreeSet<&str> = TAG_RE
        .find_iter(document)
        .map(|m| m.as_str())
        .collect();
    set.into_iter().map(|s| Tag(s.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(|t| t.label()).collect()
    }

    #[test]
    fn empty_document_has_no_tags() {
        assert!(extract_tags("").is_empty());
    }

    #[test]
    fn sorted_and_deduplicated() {
        let doc = "see ***2*** then ***1*** and again ***2***\n***b*** ***a***";
        let tags = extract_tags(doc);
        assert_eq!(labels(&tags), vec!["1", "2", "a", "b"]);
    }

    #[test]
    fn near_matches_are_ignored() {
        assert!(extract_tags("**1*** and ***2** and ** 3 **").is_empty());
        assert!(extract_tags("******").is_empty());
        assert!(extract_tags("***a\nb***").is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let doc = "Problem ***3***: compute. ***1*** ***3***";
        let first = extract_tags(doc);
        let rebuilt = first
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(extract_tags(&rebuilt), first);
        assert_eq!(extract_tags(doc), first);
    }

    #[test]
    fn parse_requires_exact_token() {
        assert_eq!(Tag::parse("***7***"), Some(Tag::from_label("7")));
        assert_eq!(Tag::parse(" ***7***"), None);
        assert_eq!(Tag::parse("***7"), None);
        assert_eq!(Tag::from_label("fig-a").label(), "fig-a");
    }
}
