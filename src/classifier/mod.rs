//! Heuristics for recognizing pagination controls on unknown sites.

pub mod load_more;
pub mod page_size;
pub mod signature;

pub use load_more::LoadMoreClassifier;
pub use page_size::PageSizeClassifier;
pub use signature::CandidateElement;
