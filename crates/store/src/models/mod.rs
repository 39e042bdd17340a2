//! Data models
//!
//! Row-level types for the platform tables. Raw interaction data
//! (`users`, `videos`, `event`) is read-only to the pipeline; everything
//! else is written by it.

mod aggregate;
mod event;
mod transaction;
mod user;
mod video;
mod window;

pub use aggregate::VideoAggregate;
pub use event::{EventKind, ViewerEvent};
pub use transaction::{Transaction, TxDirection, TxStatus};
pub use user::User;
pub use video::Video;
pub use window::{RevenueWindow, VideoRevShare};
