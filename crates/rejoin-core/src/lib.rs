//! rejoin-core library.
//!
//! # Conventions
//!
//! - **Errors**: fallible operations return [`error::Result`] with a
//!   [`RejoinError`] carrying a stable [`ErrorCode`].
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod archive;
pub mod changelog;
pub mod config;
pub mod detect;
pub mod editor;
pub mod error;
pub mod index;
pub mod lock;
pub mod markup;
pub mod session;

pub use changelog::ChangeLogEntry;
pub use config::{Config, PersistMode};
pub use detect::{Suggestion, detect};
pub use editor::{Editor, SaveReport};
pub use error::{ErrorCode, RejoinError};
pub use index::DocumentIndex;
pub use session::{Current, Session, SessionState, UndoRecord};
