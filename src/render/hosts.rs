//! Render hosts shipped with the crate

use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use super::{HostInstruction, RenderHost, UpdateMessage};
use crate::error::{Error, Result};
use crate::identity::SlotIdentity;

/// In-memory host that records every instruction
///
/// Interaction values can be primed with [`RecordingHost::set_value`] to act
/// like a front-end that reported a value back.
#[derive(Debug, Default)]
pub struct RecordingHost {
    instructions: Vec<HostInstruction>,
    values: HashMap<SlotIdentity, Value>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instructions(&self) -> &[HostInstruction] {
        &self.instructions
    }

    /// Replace updates only, in submission order
    pub fn updates(&self) -> Vec<&UpdateMessage> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                HostInstruction::Replace(update) => Some(update),
                HostInstruction::Clear { .. } => None,
            })
            .collect()
    }

    /// Content of every replace update, in submission order
    pub fn contents(&self) -> Vec<String> {
        self.updates()
            .into_iter()
            .filter_map(|u| u.content().map(String::from))
            .collect()
    }

    pub fn set_value(&mut self, slot: SlotIdentity, value: Value) {
        self.values.insert(slot, value);
    }
}

impl RenderHost for RecordingHost {
    fn clear(&mut self, slot: &SlotIdentity) -> Result<()> {
        self.instructions
            .push(HostInstruction::Clear { slot: slot.clone() });
        Ok(())
    }

    fn replace(&mut self, update: UpdateMessage) -> Result<Option<Value>> {
        let value = self.values.get(&update.slot).cloned();
        self.instructions.push(HostInstruction::Replace(update));
        Ok(value)
    }
}

/// Host that forwards instructions to another task
///
/// Every update carries the slot's full content, so a reader that falls
/// behind only needs the latest one. Pending instructions are coalesced per
/// slot: a new replace overwrites the one still waiting, and a clear is
/// dropped while that slot already has something pending. The queue holds at
/// most one clear and one replace per slot, however slow the reader is.
pub struct ChannelHost {
    shared: Arc<Shared>,
}

/// Receiving half of a [`ChannelHost`]
pub struct HostReceiver {
    shared: Arc<Shared>,
}

struct Shared {
    mailbox: Mutex<Mailbox>,
    ready: Notify,
}

#[derive(Default)]
struct Mailbox {
    queue: VecDeque<HostInstruction>,
    host_dropped: bool,
    receiver_dropped: bool,
}

impl Shared {
    fn mailbox(&self) -> MutexGuard<'_, Mailbox> {
        match self.mailbox.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Mailbox {
    fn pending_for(&self, slot: &SlotIdentity) -> bool {
        self.queue.iter().any(|i| instruction_slot(i) == slot)
    }

    fn push(&mut self, instruction: HostInstruction) {
        match instruction {
            HostInstruction::Clear { slot } => {
                // a pending replace for this slot already supersedes the clear
                if !self.pending_for(&slot) {
                    self.queue.push_back(HostInstruction::Clear { slot });
                }
            }
            HostInstruction::Replace(update) => {
                let waiting = self.queue.iter().position(|i| {
                    matches!(i, HostInstruction::Replace(pending) if pending.slot == update.slot)
                });
                let instruction = HostInstruction::Replace(update);
                match waiting {
                    Some(at) => self.queue[at] = instruction,
                    None => self.queue.push_back(instruction),
                }
            }
        }
    }
}

fn instruction_slot(instruction: &HostInstruction) -> &SlotIdentity {
    match instruction {
        HostInstruction::Clear { slot } => slot,
        HostInstruction::Replace(update) => &update.slot,
    }
}

impl ChannelHost {
    pub fn channel() -> (Self, HostReceiver) {
        let shared = Arc::new(Shared {
            mailbox: Mutex::new(Mailbox::default()),
            ready: Notify::new(),
        });
        (
            Self {
                shared: shared.clone(),
            },
            HostReceiver { shared },
        )
    }

    /// Instructions waiting for the receiver
    pub fn pending(&self) -> usize {
        self.shared.mailbox().queue.len()
    }

    fn send(&self, instruction: HostInstruction) -> Result<()> {
        {
            let mut mailbox = self.shared.mailbox();
            if mailbox.receiver_dropped {
                return Err(Error::Transport("render host disconnected".to_string()));
            }
            mailbox.push(instruction);
        }
        self.shared.ready.notify_one();
        Ok(())
    }
}

impl Drop for ChannelHost {
    fn drop(&mut self) {
        self.shared.mailbox().host_dropped = true;
        self.shared.ready.notify_one();
    }
}

impl HostReceiver {
    /// Next pending instruction; `None` once the host is gone and drained
    pub async fn recv(&mut self) -> Option<HostInstruction> {
        loop {
            {
                let mut mailbox = self.shared.mailbox();
                if let Some(instruction) = mailbox.queue.pop_front() {
                    return Some(instruction);
                }
                if mailbox.host_dropped {
                    return None;
                }
            }
            self.shared.ready.notified().await;
        }
    }
}

impl Drop for HostReceiver {
    fn drop(&mut self) {
        let mut mailbox = self.shared.mailbox();
        mailbox.receiver_dropped = true;
        mailbox.queue.clear();
    }
}

impl RenderHost for ChannelHost {
    fn clear(&mut self, slot: &SlotIdentity) -> Result<()> {
        self.send(HostInstruction::Clear { slot: slot.clone() })
    }

    fn replace(&mut self, update: UpdateMessage) -> Result<Option<Value>> {
        self.send(HostInstruction::Replace(update))?;
        Ok(None)
    }
}

/// Host that writes each instruction as one JSON line
pub struct JsonLinesHost<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesHost<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, instruction: &HostInstruction) -> Result<()> {
        let line = serde_json::to_string(instruction).map_err(|source| Error::Serialization {
            argument: "instruction".to_string(),
            source,
        })?;
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

impl<W: Write> RenderHost for JsonLinesHost<W> {
    fn clear(&mut self, slot: &SlotIdentity) -> Result<()> {
        self.write(&HostInstruction::Clear { slot: slot.clone() })
    }

    fn replace(&mut self, update: UpdateMessage) -> Result<Option<Value>> {
        self.write(&HostInstruction::Replace(update))?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{compute_identity, IdentityInput, Scope};
    use serde_json::json;

    fn update(content: &str) -> UpdateMessage {
        keyed_update("demo", content)
    }

    fn keyed_update(key: &str, content: &str) -> UpdateMessage {
        UpdateMessage {
            slot: compute_identity(IdentityInput {
                component: "streamlit_markdown",
                url: None,
                key: Some(key),
                scope: &Scope::default(),
                args_json: "{}",
            }),
            component: "streamlit_markdown".to_string(),
            url: None,
            form_id: None,
            sequence: 1,
            args: json!({ "content": content }),
        }
    }

    #[test]
    fn test_json_lines_host_writes_one_line_per_instruction() {
        let mut host = JsonLinesHost::new(Vec::new());
        let msg = update("Th");
        host.clear(&msg.slot).unwrap();
        host.replace(msg).unwrap();

        let out = String::from_utf8(host.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let clear: HostInstruction = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(clear, HostInstruction::Clear { .. }));
        let replace: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(replace["op"], "replace");
        assert_eq!(replace["args"]["content"], "Th");
    }

    #[test]
    fn test_channel_host_reports_disconnect() {
        let (mut host, rx) = ChannelHost::channel();
        drop(rx);
        let err = host.replace(update("x")).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_channel_host_delivers_in_order() {
        let (mut host, mut rx) = ChannelHost::channel();
        let msg = update("Th");
        host.clear(&msg.slot).unwrap();
        host.replace(msg).unwrap();
        drop(host);

        assert!(matches!(rx.recv().await, Some(HostInstruction::Clear { .. })));
        match rx.recv().await {
            Some(HostInstruction::Replace(update)) => assert_eq!(update.content(), Some("Th")),
            other => panic!("expected replace, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_slow_reader_only_sees_latest_content() {
        let (mut host, mut rx) = ChannelHost::channel();
        let mut content = String::new();
        for _ in 0..2000 {
            content.push_str(&"x".repeat(50));
            let msg = update(&content);
            host.clear(&msg.slot).unwrap();
            host.replace(msg).unwrap();
        }
        assert_eq!(host.pending(), 2);
        drop(host);

        assert!(matches!(rx.recv().await, Some(HostInstruction::Clear { .. })));
        match rx.recv().await {
            Some(HostInstruction::Replace(update)) => {
                assert_eq!(update.content().map(str::len), Some(100_000))
            }
            other => panic!("expected replace, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_never_follows_its_replace() {
        let (mut host, mut rx) = ChannelHost::channel();
        let first = update("a");
        host.clear(&first.slot).unwrap();
        host.replace(first).unwrap();
        // reader takes the clear, then falls behind
        assert!(matches!(rx.recv().await, Some(HostInstruction::Clear { .. })));

        let second = update("ab");
        host.clear(&second.slot).unwrap();
        host.replace(second).unwrap();
        assert_eq!(host.pending(), 1);
        match rx.recv().await {
            Some(HostInstruction::Replace(update)) => assert_eq!(update.content(), Some("ab")),
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slots_coalesce_independently() {
        let (mut host, mut rx) = ChannelHost::channel();
        for (key, content) in [("left", "a"), ("right", "b"), ("left", "ab")] {
            let msg = keyed_update(key, content);
            host.clear(&msg.slot).unwrap();
            host.replace(msg).unwrap();
        }
        drop(host);

        let mut contents = Vec::new();
        while let Some(instruction) = rx.recv().await {
            if let HostInstruction::Replace(update) = instruction {
                contents.push(update.content().unwrap_or_default().to_string());
            }
        }
        assert_eq!(contents, vec!["ab", "b"]);
    }

    #[test]
    fn test_recording_host_returns_primed_value() {
        let mut host = RecordingHost::new();
        let msg = update("x");
        host.set_value(msg.slot.clone(), json!({"clicked": true}));
        assert_eq!(host.replace(msg).unwrap(), Some(json!({"clicked": true})));
        assert_eq!(host.contents(), vec!["x"]);
    }
}
