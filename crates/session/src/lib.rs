//! Folio Session Library
//!
//! Document session lifecycle: opening a document behind a locator, serving
//! cached page handles and natural sizes, and the monotonic aspect-ratio
//! cache layout estimation runs on.

pub mod session;
pub mod sizes;

pub use session::{DocumentSession, SessionError, SessionState, SessionStatus};
pub use sizes::{SizeCache, DEFAULT_PAGE_RATIO};
