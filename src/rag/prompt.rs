use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("Prompt template is missing the {{{0}}} placeholder")]
    MissingPlaceholder(String),

    #[error("Prompt template has unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("No value supplied for placeholder {{{0}}}")]
    MissingValue(String),
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder regex is valid"))
}

/// Text with named `{slot}` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// The template must use every declared variable and nothing else.
    pub fn new(template: &str, variables: &[&str]) -> Result<Self, PromptError> {
        let declared: BTreeSet<&str> = variables.iter().copied().collect();
        let found: BTreeSet<&str> = placeholder_regex()
            .captures_iter(template)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        if let Some(unknown) = found.difference(&declared).next() {
            return Err(PromptError::UnknownPlaceholder(unknown.to_string()));
        }
        if let Some(missing) = declared.difference(&found).next() {
            return Err(PromptError::MissingPlaceholder(missing.to_string()));
        }

        Ok(Self {
            template: template.to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
        })
    }

    /// Question-answering template with `{context}` and `{question}`
    pub fn qa(template: &str) -> Result<Self, PromptError> {
        Self::new(template, &["context", "question"])
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Fill every placeholder in one pass; substituted values are not
    /// scanned again.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, PromptError> {
        if let Some(missing) = self
            .variables
            .iter()
            .find(|var| !values.iter().any(|(k, _)| k == var))
        {
            return Err(PromptError::MissingValue(missing.clone()));
        }

        let rendered = placeholder_regex().replace_all(&self.template, |caps: &regex::Captures| {
            let name = &caps[1];
            values
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        });

        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PROMPT_TEMPLATE;

    #[test]
    fn test_default_template_is_valid() {
        let prompt = PromptTemplate::qa(DEFAULT_PROMPT_TEMPLATE).unwrap();
        assert_eq!(prompt.variables(), &["context", "question"]);
    }

    #[test]
    fn test_render() {
        let prompt = PromptTemplate::qa("Context: {context}\nQuestion: {question}").unwrap();
        let text = prompt
            .render(&[("context", "Fever is a symptom."), ("question", "What is fever?")])
            .unwrap();
        assert_eq!(text, "Context: Fever is a symptom.\nQuestion: What is fever?");
    }

    #[test]
    fn test_values_not_rescanned() {
        let prompt = PromptTemplate::qa("{context} | {question}").unwrap();
        let text = prompt
            .render(&[("context", "{question}"), ("question", "q")])
            .unwrap();
        assert_eq!(text, "{question} | q");
    }

    #[test]
    fn test_missing_placeholder() {
        assert_eq!(
            PromptTemplate::qa("Question: {question}"),
            Err(PromptError::MissingPlaceholder("context".to_string()))
        );
    }

    #[test]
    fn test_unknown_placeholder() {
        assert_eq!(
            PromptTemplate::qa("{context} {question} {history}"),
            Err(PromptError::UnknownPlaceholder("history".to_string()))
        );
    }

    #[test]
    fn test_missing_value() {
        let prompt = PromptTemplate::qa("{context} {question}").unwrap();
        assert_eq!(
            prompt.render(&[("context", "c")]),
            Err(PromptError::MissingValue("question".to_string()))
        );
    }
}
