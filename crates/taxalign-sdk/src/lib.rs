//! High-level comparison session API for taxalign.
//!
//! [`ComparisonSession`] owns one merge engine, its registered views, the
//! propagation contexts, and a cached classification report: one complete
//! comparison, and one mutation domain. Hosts embedding a session in a
//! multi-threaded runtime serialize access behind one mutex; everything in
//! the session is `Send`.

pub mod error;
pub mod session;

pub use error::{SdkError, SdkResult};
pub use session::ComparisonSession;
