pub mod document;
pub mod element;
pub mod options;
pub mod state;

pub use document::HtmlDocument;
pub use element::DomElement;
pub use options::{max_option, numeric_options, parse_leading_int, NumericOption};
pub use state::{DispatchedEvent, DocumentState};
