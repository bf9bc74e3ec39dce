// Homeserver access: the session collaborator and history pagination.

pub mod error;
pub mod http;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod pagination;
pub mod session;
mod sync;

pub use error::{NetError, Result};
pub use http::HttpSession;
#[cfg(any(test, feature = "memory"))]
pub use memory::MemorySession;
pub use pagination::{fetch_direction, merged_history, DirectionFetch, MergedHistory};
pub use session::{Direction, Page, PaginationCursor, Session, SyncAnchor};
