//! Explicit render context
//!
//! Everything a display call touches besides its own arguments: the slot
//! registry of the current pass, the session store that outlives passes, and
//! the host that receives instructions. The render-pass owner creates one per
//! pass (or calls [`RenderContext::next_pass`] between passes).

use super::{RenderHost, SessionState};
use crate::identity::RenderPass;

pub struct RenderContext<'s, H> {
    pub pass: RenderPass,
    pub session: &'s mut SessionState,
    pub host: H,
    /// Frontend dev server; `None` serves the bundled components
    pub dev_server: Option<String>,
}

impl<'s, H: RenderHost> RenderContext<'s, H> {
    pub fn new(session: &'s mut SessionState, host: H, page: Option<String>) -> Self {
        Self {
            pass: RenderPass::new(page),
            session,
            host,
            dev_server: None,
        }
    }

    pub fn with_dev_server(mut self, base: impl Into<String>) -> Self {
        self.dev_server = Some(base.into());
        self
    }

    /// Start the next render pass on the same page
    pub fn next_pass(&mut self) {
        tracing::trace!("Render pass reset ({} slot(s) released)", self.pass.len());
        self.pass.reset();
    }

    pub fn into_host(self) -> H {
        self.host
    }
}
