//! Edit Session - external editor sessions for a browser native-messaging host
//!
//! A client sends `new_text`; the host writes the text to a private temp
//! file, opens the user's editor on it, streams every save back as
//! `text_update`, and sends `death_notice` once the editor exits and the
//! file is gone.
//!
//! # Example
//!
//! ```no_run
//! use edit_session::{Host, HostConfig, SessionRegistry, TempStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(SessionRegistry::new());
//!     let store = TempStore::open("/tmp/exteditor".as_ref(), registry).unwrap();
//!     let host = Host::new(Arc::new(store), HostConfig::default());
//!
//!     let report = host.serve(tokio::io::stdin(), tokio::io::stdout()).await;
//!     std::process::exit(report.exit_code());
//! }
//! ```

pub mod editor;
mod error;
mod host;
mod outbound;
pub mod position;
mod registry;
mod session;
mod store;
mod watcher;

pub use error::{EditorError, HostError, SessionError, StoreError, TemplateError, WatchError};
pub use host::{DEFAULT_MAX_FRAME_BYTES, DEFAULT_OUTBOUND_QUEUE, Host, HostConfig, ShutdownReport};
pub use outbound::Outbound;
pub use position::CaretPosition;
pub use registry::SessionRegistry;
pub use session::{Session, SessionContext, SessionState};
pub use store::{TempFile, TempStore, sanitize_stem};
pub use watcher::ChangeWatcher;
