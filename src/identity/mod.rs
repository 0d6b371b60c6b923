//! Slot identity resolution
//!
//! A slot identity decides which on-screen element an update lands in. It is
//! derived from the component name, the caller's key and the enclosing scope:
//!
//! - With a key, call arguments are left out of the hash, so content can
//!   change between calls while the renderer keeps diffing the same slot.
//! - Without a key, the serialized arguments are hashed too. Any argument
//!   change then produces a new slot, since nothing else tells "same slot,
//!   new content" apart from "a different slot".
//!
//! Keyed identities look like `$$ID-<hex>-<user key>` so the user key can be
//! read back out of an identity without a lookup table. Keyless identities
//! stop after the hash (`$$ID-<hex>`), so no user key can be mistaken for
//! "no key".

mod registry;

pub use registry::{RenderPass, SlotOwner};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Element kind every component instance is registered under
pub const ELEMENT_KIND: &str = "component_instance";

const ID_PREFIX: &str = "$$ID";
const HASH_HEX_LEN: usize = 32;

/// Deterministic identifier of one addressable output region
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotIdentity(String);

impl SlotIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Enclosing form and page of an element
///
/// Elements on different pages or in different forms never share a slot,
/// even when they use the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub form_id: Option<String>,
    pub page: Option<String>,
}

impl Scope {
    pub fn page(page: impl Into<String>) -> Self {
        Self {
            form_id: None,
            page: Some(page.into()),
        }
    }

    pub fn with_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }
}

/// Inputs for one identity computation
#[derive(Debug, Clone, Copy)]
pub struct IdentityInput<'a> {
    pub component: &'a str,
    pub url: Option<&'a str>,
    pub key: Option<&'a str>,
    pub scope: &'a Scope,
    /// Serialized call arguments; only hashed when `key` is `None`
    pub args_json: &'a str,
}

/// Compute the identity of a slot
pub fn compute_identity(input: IdentityInput<'_>) -> SlotIdentity {
    let mut hasher = Sha256::new();
    hash_field(&mut hasher, "element_type", ELEMENT_KIND);
    hash_field(&mut hasher, "name", input.component);
    hash_field(&mut hasher, "url", input.url.unwrap_or(""));
    // Empty form ids mean "not in a form"
    if let Some(form_id) = input.scope.form_id.as_deref().filter(|f| !f.is_empty()) {
        hash_field(&mut hasher, "form_id", form_id);
    }
    if let Some(page) = input.scope.page.as_deref() {
        hash_field(&mut hasher, "active_script_hash", page);
    }

    match input.key {
        Some(key) => hash_field(&mut hasher, "user_key", key),
        None => hash_field(&mut hasher, "json_args", input.args_json),
    }

    let digest = format!("{:x}", hasher.finalize());
    let hash = &digest[..HASH_HEX_LEN];
    SlotIdentity(match input.key {
        Some(key) => format!("{}-{}-{}", ID_PREFIX, hash, key),
        None => format!("{}-{}", ID_PREFIX, hash),
    })
}

/// Recover the user key embedded in an identity
///
/// Returns `None` for identities computed without a key.
pub fn user_key_from_identity(identity: &SlotIdentity) -> Option<&str> {
    let rest = identity.0.strip_prefix(ID_PREFIX)?.strip_prefix('-')?;
    // The hash is fixed-width hex; everything after its separator is the key
    rest.get(HASH_HEX_LEN..)?.strip_prefix('-')
}

/// Length-prefix each field so adjacent values can't run together
fn hash_field(hasher: &mut Sha256, name: &str, value: &str) {
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
