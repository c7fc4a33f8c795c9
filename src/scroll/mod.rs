//! Automatic load-more clicking.

pub mod controller;
pub mod proximity;

pub use controller::{InfiniteScrollController, LoadMoreState};
pub use proximity::ProximityObserver;
