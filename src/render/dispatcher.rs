//! Slot writer: identity resolution plus clear-then-submit
//!
//! One writer addresses one logical slot for the length of a call or stream.
//! It owns the slot's registry claim, so it can keep re-resolving the same
//! identity on every increment while any other element reaching that
//! identity or key in the same pass is rejected.

use serde_json::Value;

use super::{RenderContext, RenderHost, UpdateMessage};
use crate::component::{Component, ComponentArgs};
use crate::error::{Error, Result};
use crate::identity::{compute_identity, IdentityInput, Scope, SlotIdentity, SlotOwner};

pub struct SlotWriter {
    component: Component,
    key: Option<String>,
    form_id: Option<String>,
    owner: SlotOwner,
    sequence: u64,
    /// Slot and content length of the last submission
    last: Option<(SlotIdentity, usize)>,
}

impl SlotWriter {
    pub fn new<H: RenderHost>(
        ctx: &mut RenderContext<'_, H>,
        component: Component,
        key: Option<String>,
        form_id: Option<String>,
    ) -> Self {
        Self {
            component,
            key,
            form_id,
            owner: ctx.pass.new_owner(),
            sequence: 0,
            last: None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Number of updates submitted so far
    pub fn submitted(&self) -> u64 {
        self.sequence
    }

    /// Identity of the most recent submission
    pub fn slot(&self) -> Option<&SlotIdentity> {
        self.last.as_ref().map(|(slot, _)| slot)
    }

    /// Resolve the slot for these arguments without submitting anything
    pub fn resolve<H: RenderHost>(
        &self,
        ctx: &RenderContext<'_, H>,
        args_json: &str,
    ) -> SlotIdentity {
        let scope = Scope {
            form_id: self.form_id.clone(),
            page: ctx.pass.page().map(String::from),
        };
        compute_identity(IdentityInput {
            component: self.component.name,
            url: self.component.url.as_deref(),
            key: self.key.as_deref(),
            scope: &scope,
            args_json,
        })
    }

    /// Clear the slot and submit `args` as its new content
    ///
    /// Returns the interaction value reported by the host.
    pub fn submit<H: RenderHost>(
        &mut self,
        ctx: &mut RenderContext<'_, H>,
        args: ComponentArgs,
    ) -> Result<Option<Value>> {
        let args_json = args.to_json()?;
        let slot = self.resolve(ctx, &args_json);
        ctx.pass.register(&slot, self.component.name, self.owner)?;

        let content_len = args.content_len().unwrap_or(0);
        if let Some((last_slot, last_len)) = &self.last {
            if *last_slot == slot && content_len < *last_len {
                return Err(Error::ContentRegressed {
                    slot,
                    previous: *last_len,
                    next: content_len,
                });
            }
        }

        ctx.host.clear(&slot)?;
        self.sequence += 1;
        let update = UpdateMessage {
            slot: slot.clone(),
            component: self.component.name.to_string(),
            url: self.component.url.clone(),
            form_id: self.form_id.clone(),
            sequence: self.sequence,
            args: args.into_value(),
        };
        let value = ctx.host.replace(update)?;

        tracing::debug!(
            "Submitted update #{} to {} ({} bytes)",
            self.sequence,
            slot,
            content_len
        );
        self.last = Some((slot, content_len));
        Ok(value)
    }
}
