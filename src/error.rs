use thiserror::Error;

/// Conditions raised while turning an article into generated content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("Prompt template `{0}` is missing from the settings")]
    MissingTemplate(String),

    #[error("Prompt template `{template}` references unknown placeholder `{{{key}}}`")]
    MissingPlaceholder { template: String, key: String },

    #[error("Prompt template `{template}` has an unbalanced brace")]
    MalformedTemplate { template: String },

    #[error("The {0} call returned no content")]
    EmptyResponse(String),
}
