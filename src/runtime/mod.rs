//! Per-page event loop: timers, runtime messages and the session that ties
//! detection and infinite scroll to a page.

pub mod messages;
pub mod scheduler;
pub mod session;

pub use messages::{MessageResponse, RuntimeMessage};
pub use scheduler::{Scheduler, Task, TaskId};
pub use session::PageSession;
