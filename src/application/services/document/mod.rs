use crate::domain::images::AssignmentMap;

/// How a resolved image is embedded when its placeholder is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceStyle {
    #[default]
    Markdown,
    Latex,
}

impl ReferenceStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "latex" | "tex" => Some(Self::Latex),
            _ => None,
        }
    }

    pub fn render(self, url: &str) -> String {
        match self {
            Self::Markdown => format!("![]({url})"),
            Self::Latex => format!("\\includegraphics{{{url}}}"),
        }
    }
}

/// Rewrites placeholders into image references, with one level of undo.
#[derive(Debug, Clone, Default)]
pub struct DocumentCommitter {
    text: String,
    snapshot: Option<String>,
    style: ReferenceStyle,
}

impl DocumentCommitter {
    pub fn new(text: impl Into<String>, style: ReferenceStyle) -> Self {
        Self {
            text: text.into(),
            snapshot: None,
            style,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// A user edit. The undo snapshot no longer applies and is dropped.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.snapshot = None;
    }

    /// Replaces every occurrence of each resolved tag. Returns whether the
    /// text changed; only then is the pre-commit text kept for undo. Any
    /// older snapshot is discarded either way.
    pub fn commit(&mut self, assignments: &AssignmentMap) -> bool {
        let mut next = self.text.clone();
        for (tag, url) in assignments.iter() {
            let Some(url) = url else {
                continue;
            };
            if next.contains(tag.as_str()) {
                next = next.replace(tag.as_str(), &self.style.render(url));
            }
        }
        if next == self.text {
            self.snapshot = None;
            return false;
        }
        self.snapshot = Some(std::mem::replace(&mut self.text, next));
        tracing::debug!(tags = assignments.len(), "document_commit_applied");
        true
    }

    pub fn can_undo(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Restores the text from before the last commit.
    pub fn undo(&mut self) -> bool {
        match self.snapshot.take() {
            Some(previous) => {
                self.text = previous;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::images::Tag;

    fn resolved(pairs: &[(&str, &str)]) -> AssignmentMap {
        let mut map = AssignmentMap::new();
        let tags: Vec<Tag> = pairs.iter().map(|(l, _)| Tag::from_label(l)).collect();
        map.reconcile(&tags);
        for (tag, (_, url)) in tags.iter().zip(pairs) {
            map.resolve(tag, url.to_string());
        }
        map
    }

    #[test]
    fn commit_replaces_every_occurrence() {
        let mut c = DocumentCommitter::new(
            "A ***1*** B ***2*** C ***1***",
            ReferenceStyle::Markdown,
        );
        let map = resolved(&[("1", "https://x/a.png"), ("2", "https://x/b.png")]);
        assert!(c.commit(&map));
        assert_eq!(
            c.text(),
            "A ![](https://x/a.png) B ![](https://x/b.png) C ![](https://x/a.png)"
        );
        assert!(c.can_undo());
        assert!(c.undo());
        assert_eq!(c.text(), "A ***1*** B ***2*** C ***1***");
        assert!(!c.undo());
    }

    #[test]
    fn latex_style() {
        let mut c = DocumentCommitter::new("$x$ ***fig***", ReferenceStyle::Latex);
        assert!(c.commit(&resolved(&[("fig", "https://x/f.png")])));
        assert_eq!(c.text(), "$x$ \\includegraphics{https://x/f.png}");
    }

    #[test]
    fn unresolved_tags_are_left_alone() {
        let mut map = AssignmentMap::new();
        map.reconcile(&[Tag::from_label("1")]);
        let mut c = DocumentCommitter::new("***1***", ReferenceStyle::Markdown);
        assert!(!c.commit(&map));
        assert!(!c.can_undo());
        assert_eq!(c.text(), "***1***");
    }

    #[test]
    fn edit_discards_snapshot() {
        let mut c = DocumentCommitter::new("***1***", ReferenceStyle::Markdown);
        assert!(c.commit(&resolved(&[("1", "u")])));
        c.edit("rewritten");
        assert!(!c.can_undo());
        assert!(!c.undo());
        assert_eq!(c.text(), "rewritten");
    }

    #[test]
    fn second_commit_replaces_snapshot() {
        let mut c = DocumentCommitter::new("***1***", ReferenceStyle::Markdown);
        assert!(c.commit(&resolved(&[("1", "u")])));
        c.edit("![](u) ***2***");
        assert!(c.commit(&resolved(&[("2", "v")])));
        assert!(c.undo());
        assert_eq!(c.text(), "![](u) ***2***");
        assert!(!c.can_undo());
    }

    #[test]
    fn style_parsing() {
        assert_eq!(ReferenceStyle::parse("LaTeX"), Some(ReferenceStyle::Latex));
        assert_eq!(ReferenceStyle::parse("md"), Some(ReferenceStyle::Markdown));
        assert_eq!(ReferenceStyle::parse("html"), None);
    }
}
