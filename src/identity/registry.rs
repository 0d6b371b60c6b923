//! Per-render-pass slot registry
//!
//! Tracks which identities and user keys have been claimed during the current
//! render pass. A slot may be registered any number of times by the owner
//! that claimed it (each increment of a stream does exactly that), but a
//! second owner reaching the same identity or key is a configuration error.
//!
//! Clearing the registry is the render-pass owner's job: call
//! [`RenderPass::reset`] (or build a new pass) at the start of every pass.

use std::collections::HashMap;

use super::{user_key_from_identity, SlotIdentity};
use crate::error::{Error, Result};

/// Opaque handle for whoever is writing into a slot during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotOwner(u64);

/// Registry of identities claimed during one render pass
#[derive(Debug, Default)]
pub struct RenderPass {
    /// Page script hash mixed into every identity of this pass
    page: Option<String>,
    ids: HashMap<SlotIdentity, SlotOwner>,
    user_keys: HashMap<String, SlotOwner>,
    next_owner: u64,
}

impl RenderPass {
    pub fn new(page: Option<String>) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Page script hash of this pass
    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }

    /// Hand out a fresh owner handle
    pub fn new_owner(&mut self) -> SlotOwner {
        self.next_owner += 1;
        SlotOwner(self.next_owner)
    }

    /// Claim `identity` (and its user key) for `owner`
    ///
    /// `component` is only used to name the element in error messages.
    pub fn register(
        &mut self,
        identity: &SlotIdentity,
        component: &str,
        owner: SlotOwner,
    ) -> Result<()> {
        if let Some(key) = user_key_from_identity(identity) {
            match self.user_keys.get(key) {
                Some(existing) if *existing != owner => {
                    return Err(Error::DuplicateKey {
                        key: key.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    self.user_keys.insert(key.to_string(), owner);
                }
            }
        }

        match self.ids.get(identity) {
            Some(existing) if *existing != owner => Err(Error::DuplicateIdentity {
                component: component.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.ids.insert(identity.clone(), owner);
                Ok(())
            }
        }
    }

    /// Whether `identity` has been claimed this pass
    pub fn contains(&self, identity: &SlotIdentity) -> bool {
        self.ids.contains_key(identity)
    }

    /// Number of slots claimed this pass
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forget every claim, keeping the page
    pub fn reset(&mut self) {
        self.ids.clear();
        self.user_keys.clear();
    }
}
