use crate::core::dom::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageSizeError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Element {0} is no longer attached to the document")]
    ElementDetached(NodeId),

    #[error("Element is not a select control: {0}")]
    NotASelect(NodeId),

    #[error("Option index {index} out of range for select {select}")]
    OptionOutOfRange { select: NodeId, index: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid URL pattern: {0}")]
    InvalidUrlPattern(#[from] regex::Error),

    #[error("Site registry error: {0}")]
    Registry(String),

    #[error("Settings store unavailable: {0}")]
    SettingsUnavailable(String),

    #[error("Notifier unavailable: {0}")]
    NotifierUnavailable(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PageSizeError>;

impl PageSizeError {
    /// Errors caused by the page changing underneath an evaluation pass.
    /// These degrade to "strategy failed" rather than being reported.
    pub fn is_transient_dom_error(&self) -> bool {
        matches!(
            self,
            PageSizeError::ElementDetached(_)
                | PageSizeError::NotASelect(_)
                | PageSizeError::OptionOutOfRange { .. }
        )
    }
}
