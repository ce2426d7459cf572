//! Prompt templates for summarization.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::error::LlmError;

static TEMPLATE_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// Template names shipped with the library. These cannot be removed.
pub const BUILTIN_TEMPLATES: &[&str] = &[
    "default",
    "academic_paper",
    "meeting_notes",
    "data_analysis",
    "literature_review",
];

const DEFAULT_TEMPLATE: &str = "Analyze the following document and produce a research summary.\n\n\
Content:\n{content}\n\n\
Cover the key information, the main points, the important conclusions and any follow-up suggestions.\n\nSummary:";

const ACADEMIC_PAPER_TEMPLATE: &str = "Analyze the following academic paper.\n\n\
Content:\n{content}\n\n\
Report on the research background and purpose, methods, main findings, conclusions, and limitations.\n\nReport:";

const MEETING_NOTES_TEMPLATE: &str = "Organize the following meeting notes.\n\n\
Content:\n{content}\n\n\
Produce a structured summary covering the topic, participants, discussion points, decisions and action items.\n\nSummary:";

const DATA_ANALYSIS_TEMPLATE: &str = "Analyze the following data report.\n\n\
Content:\n{content}\n\n\
Cover the data overview, key metrics, trends, anomalies and recommended actions.\n\nReport:";

const LITERATURE_REVIEW_TEMPLATE: &str = "Review the following literature.\n\n\
Content:\n{content}\n\n\
Cover the field overview, main theoretical positions, methods, research gaps and future directions.\n\nReview:";

/// Named prompt templates with a `{content}` slot.
pub struct PromptLibrary {
    templates: FxHashMap<String, String>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        let mut templates = FxHashMap::default();
        templates.insert("default".to_string(), DEFAULT_TEMPLATE.to_string());
        templates.insert(
            "academic_paper".to_string(),
            ACADEMIC_PAPER_TEMPLATE.to_string(),
        );
        templates.insert(
            "meeting_notes".to_string(),
            MEETING_NOTES_TEMPLATE.to_string(),
        );
        templates.insert(
            "data_analysis".to_string(),
            DATA_ANALYSIS_TEMPLATE.to_string(),
        );
        templates.insert(
            "literature_review".to_string(),
            LITERATURE_REVIEW_TEMPLATE.to_string(),
        );
        Self { templates }
    }

    /// Register or replace a custom template. Rejects templates without a
    /// `{content}` slot since rendering would drop the document entirely.
    pub fn add(&mut self, name: &str, template: &str) -> Result<(), LlmError> {
        if !Self::variables(template).iter().any(|v| v == "content") {
            return Err(LlmError::Template {
                name: name.to_string(),
                reason: "template has no {content} slot".to_string(),
            });
        }
        self.templates.insert(name.to_string(), template.to_string());
        Ok(())
    }

    /// Fill the named template's `{content}` slot.
    pub fn render(&self, name: &str, content: &str) -> Result<String, LlmError> {
        let template = self.templates.get(name).ok_or_else(|| LlmError::Template {
            name: name.to_string(),
            reason: "unknown template".to_string(),
        })?;
        Ok(template.replace("{content}", content))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn variables(template: &str) -> Vec<String> {
        TEMPLATE_SLOT
            .captures_iter(template)
            .map(|c| c[1].to_string())
            .collect()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_present() {
        let lib = PromptLibrary::new();
        for name in BUILTIN_TEMPLATES {
            assert!(lib.contains(name), "missing builtin {name}");
        }
    }

    #[test]
    fn render_fills_content_slot() {
        let lib = PromptLibrary::new();
        let prompt = lib.render("default", "DOC BODY").unwrap();
        assert!(prompt.contains("DOC BODY"));
        assert!(!prompt.contains("{content}"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let lib = PromptLibrary::new();
        let err = lib.render("nope", "x").unwrap_err();
        assert!(matches!(err, LlmError::Template { name, .. } if name == "nope"));
    }

    #[test]
    fn custom_template_requires_content_slot() {
        let mut lib = PromptLibrary::new();
        assert!(lib.add("bad", "no slot here").is_err());
        lib.add("good", "summarize: {content}").unwrap();
        assert_eq!(lib.render("good", "X").unwrap(), "summarize: X");
    }
}
