//! Render dispatch: turning slot updates into host instructions
//!
//! The render host is whatever owns the screen: a browser tab fed over SSE,
//! a WebSocket peer, a JSON-lines log. It receives two kinds of instruction,
//! always in this order for a given update:
//!
//! 1. `clear` the slot, so the next write replaces rather than appends
//! 2. `replace` the slot with the full, current content
//!
//! Hosts report back the component's interaction value, if they have one.

mod context;
mod dispatcher;
mod hosts;
mod session;

pub use context::RenderContext;
pub use dispatcher::SlotWriter;
pub use hosts::{ChannelHost, HostReceiver, JsonLinesHost, RecordingHost};
pub use session::SessionState;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identity::SlotIdentity;

/// Unit of work submitted to the external renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub slot: SlotIdentity,
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    /// Strictly increasing per writer
    pub sequence: u64,
    /// Flat argument object the component reads its props from
    pub args: Value,
}

impl UpdateMessage {
    /// Content carried by this update, if the component has any
    pub fn content(&self) -> Option<&str> {
        self.args.get("content").and_then(Value::as_str)
    }
}

/// Instruction enqueued on a render host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostInstruction {
    Clear { slot: SlotIdentity },
    Replace(UpdateMessage),
}

/// The external render-pass host
pub trait RenderHost {
    /// Reset the slot's visual content
    fn clear(&mut self, slot: &SlotIdentity) -> Result<()>;

    /// Enqueue a replace-element instruction
    ///
    /// Returns the component's current interaction value, if any.
    fn replace(&mut self, update: UpdateMessage) -> Result<Option<Value>>;
}

impl<H: RenderHost + ?Sized> RenderHost for &mut H {
    fn clear(&mut self, slot: &SlotIdentity) -> Result<()> {
        (**self).clear(slot)
    }

    fn replace(&mut self, update: UpdateMessage) -> Result<Option<Value>> {
        (**self).replace(update)
    }
}
