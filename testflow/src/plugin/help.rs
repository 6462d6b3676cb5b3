//! Help text collected from plugins.

use serde::Serialize;

/// One titled block of help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpSection {
    /// Section heading; empty for text written before any heading.
    pub title: String,
    /// Paragraphs in the order written.
    pub paragraphs: Vec<String>,
}

/// Collects what a plugin's `help` writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HelpText {
    sections: Vec<HelpSection>,
}

impl HelpText {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new section.
    pub fn output_section(&mut self, title: impl Into<String>) -> &mut Self {
        self.sections.push(HelpSection {
            title: title.into(),
            paragraphs: Vec::new(),
        });
        self
    }

    /// Adds a paragraph to the current section.
    pub fn output_text(&mut self, text: impl Into<String>) -> &mut Self {
        if self.sections.is_empty() {
            self.output_section("");
        }
        if let Some(section) = self.sections.last_mut() {
            section.paragraphs.push(text.into());
        }
        self
    }

    /// Sections written so far.
    #[must_use]
    pub fn sections(&self) -> &[HelpSection] {
        &self.sections
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Plain text rendering: headings flush left, paragraphs indented.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if !section.title.is_empty() {
                out.push_str(&section.title);
                out.push('\n');
            }
            for paragraph in &section.paragraphs {
                out.push_str("  ");
                out.push_str(paragraph);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sections() {
        let mut help = HelpText::new();
        help.output_section("SampleRunJUnit")
            .output_text("This test demonstrates a JUnit test run.");

        assert_eq!(
            help.render(),
            "SampleRunJUnit\n  This test demonstrates a JUnit test run.\n\n"
        );
    }

    #[test]
    fn test_text_without_section() {
        let mut help = HelpText::new();
        help.output_text("loose text");

        assert_eq!(help.sections().len(), 1);
        assert_eq!(help.sections()[0].title, "");
        assert_eq!(help.render(), "  loose text\n\n");
    }
}
