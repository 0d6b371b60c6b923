//! markstream: streaming display controller for external markdown components
//!
//! A growing text, fed by a whole string, a lazy sequence, a deferred
//! callable, a remote byte stream or a push-based socket, is shown through
//! one identity-stable slot of an external renderer:
//!
//! - `identity` derives the slot identity and guards against duplicates
//! - `stream` accumulates fragments into an append-only buffer
//! - `render` turns each increment into clear-then-replace host instructions
//! - `display` ties them together behind `markdown`, `stream_markdown` and
//!   `diff_viewer`
//!
//! The `server`, `config` and `logging` modules back the `markstream` binary.

pub mod component;
pub mod config;
pub mod display;
pub mod error;
pub mod identity;
pub mod logging;
pub mod render;
pub mod server;
pub mod stream;

pub use component::{DiffViewerArgs, RenderOptions, Theme};
pub use display::{diff_viewer, markdown, stream_markdown, MarkdownCall};
pub use error::{Error, Result};
pub use identity::SlotIdentity;
pub use render::{RenderContext, RenderHost, SessionState};
pub use stream::{Fragment, FragmentSource};
