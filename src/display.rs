//! Public display entry points
//!
//! `markdown` shows a finished string in one update, `stream_markdown` grows
//! one slot from a fragment source, and `diff_viewer` shows a text diff. All
//! of them take the explicit [`RenderContext`] of the current pass.

use serde_json::Value;
use std::fmt;

use crate::component::{Component, DiffViewerArgs, RenderOptions, RenderState};
use crate::error::{Error, Result};
use crate::render::{RenderContext, RenderHost, SessionState, SlotWriter};
use crate::stream::{drive, FragmentSource};

/// Characters of the final text quoted in the completion log line
const PREVIEW_CHARS: usize = 40;

/// Change callback, fired with the component's new value
pub type ChangeCallback = Box<dyn FnMut(&Value) + Send>;

/// Per-call settings of a markdown element
#[derive(Default)]
pub struct MarkdownCall {
    /// Stable key; required for streaming
    pub key: Option<String>,
    pub form_id: Option<String>,
    /// Returned while the front-end has not reported a value
    pub default: Option<Value>,
    on_change: Option<ChangeCallback>,
}

impl MarkdownCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn in_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Call `callback` whenever the component reports a different value
    ///
    /// Only keyed elements track their value between passes.
    pub fn on_change(mut self, callback: impl FnMut(&Value) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for MarkdownCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownCall")
            .field("key", &self.key)
            .field("form_id", &self.form_id)
            .field("default", &self.default)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

/// Show `content` in one update
///
/// Returns the component's value, or the call's default when the front-end
/// has not reported one yet.
pub fn markdown<H: RenderHost>(
    ctx: &mut RenderContext<'_, H>,
    content: &str,
    options: &RenderOptions,
    mut call: MarkdownCall,
) -> Result<Option<Value>> {
    let component = Component::markdown(ctx.dev_server.as_deref());
    let mut writer = SlotWriter::new(ctx, component, call.key.clone(), call.form_id.clone());
    let value = submit_markdown(
        ctx,
        &mut writer,
        options,
        &mut call,
        content,
        &RenderState::Complete,
    )?;
    Ok(value.or(call.default))
}

/// Show a growing text in one slot
///
/// Every non-empty fragment produces one replace update carrying the whole
/// buffer so far, marked `running`. Once the source is exhausted the slot
/// gets one closing update marked `complete`. If the stream fails, the
/// closing update is marked `error` instead and keeps the content shown so
/// far. `options` stay fixed for the whole stream. Returns the final text.
///
/// Whole and deferred sources have a single fragment, so their one update is
/// already the complete one.
///
/// Multi-fragment sources need a key: without one the slot identity would
/// follow the content and every increment would mount a new element.
pub async fn stream_markdown<H: RenderHost>(
    ctx: &mut RenderContext<'_, H>,
    source: FragmentSource,
    options: RenderOptions,
    mut call: MarkdownCall,
) -> Result<String> {
    let component = Component::markdown(ctx.dev_server.as_deref());
    let multi_fragment = source.is_multi_fragment();
    if multi_fragment && call.key.is_none() {
        return Err(Error::MissingKey {
            component: component.name.to_string(),
        });
    }

    let mut writer = SlotWriter::new(ctx, component, call.key.clone(), call.form_id.clone());
    tracing::debug!("Streaming markdown into key {:?}", writer.key());

    let increment_state = if multi_fragment {
        RenderState::Running
    } else {
        RenderState::Complete
    };
    let mut shown = String::new();
    let result = drive(source, |buffer| {
        submit_markdown(ctx, &mut writer, &options, &mut call, buffer, &increment_state)?;
        shown.clear();
        shown.push_str(buffer);
        Ok(())
    })
    .await;

    match result {
        Ok(text) => {
            if multi_fragment || writer.submitted() == 0 {
                submit_markdown(ctx, &mut writer, &options, &mut call, &text, &RenderState::Complete)?;
            }
            tracing::debug!(
                "Stream into {:?} finished after {} update(s): {}",
                writer.key(),
                writer.submitted(),
                preview(&text)
            );
            Ok(text)
        }
        Err(e) => {
            // Leave the slot visibly halted rather than showing a stale buffer
            let halted = RenderState::Error(e.to_string());
            if let Err(halt_err) =
                submit_markdown(ctx, &mut writer, &options, &mut call, &shown, &halted)
            {
                tracing::debug!("Could not mark {:?} as halted: {}", writer.key(), halt_err);
            }
            Err(e)
        }
    }
}

/// Build one markdown update, submit it, and track the reported value
fn submit_markdown<H: RenderHost>(
    ctx: &mut RenderContext<'_, H>,
    writer: &mut SlotWriter,
    options: &RenderOptions,
    call: &mut MarkdownCall,
    content: &str,
    state: &RenderState,
) -> Result<Option<Value>> {
    let args = options.payload(content, call.key.as_deref(), call.default.as_ref(), state)?;
    let value = writer.submit(ctx, args)?;
    if let Some(key) = call.key.as_deref() {
        notify_change(ctx.session, key, value.as_ref(), call.on_change.as_mut());
    }
    Ok(value)
}

/// First few characters of `text`, for log lines
fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Show a text diff
pub fn diff_viewer<H: RenderHost>(
    ctx: &mut RenderContext<'_, H>,
    diff: &DiffViewerArgs,
    key: Option<&str>,
) -> Result<()> {
    let component = Component::diff_viewer(ctx.dev_server.as_deref());
    let mut writer = SlotWriter::new(ctx, component, key.map(String::from), None);
    writer.submit(ctx, diff.payload(key)?)?;
    Ok(())
}

fn prev_value_key(key: &str) -> String {
    format!("_{}_cv_prev", key)
}

/// Record the component value under `key` and fire the callback if it moved
fn notify_change(
    session: &mut SessionState,
    key: &str,
    value: Option<&Value>,
    on_change: Option<&mut ChangeCallback>,
) {
    let current = value.cloned().unwrap_or(Value::Null);
    let prev_key = prev_value_key(key);
    let previous = session.get(&prev_key).cloned().unwrap_or(Value::Null);
    if previous == current {
        return;
    }

    tracing::trace!("Component value for '{}' changed", key);
    session.set(key, current.clone());
    session.set(prev_key, current.clone());
    if let Some(callback) = on_change {
        callback(&current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Theme;
    use crate::render::{HostInstruction, RecordingHost};
    use crate::stream::Fragment;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn context(session: &mut SessionState) -> RenderContext<'_, RecordingHost> {
        RenderContext::new(session, RecordingHost::new(), Some("main".to_string()))
    }

    #[tokio::test]
    async fn test_quick_fox_scenario() {
        let mut session = SessionState::new();
        let mut ctx = context(&mut session);

        let text = stream_markdown(
            &mut ctx,
            FragmentSource::from_iter(["Th", "e q", "uick"]),
            RenderOptions::default(),
            MarkdownCall::keyed("demo"),
        )
        .await
        .unwrap();

        assert_eq!(text, "The quick");
        let updates = ctx.host.updates();
        assert_eq!(updates.len(), 4);
        assert!(updates.iter().all(|u| u.slot == updates[0].slot));
        assert!(updates[0].slot.as_str().ends_with("-demo"));
        assert_eq!(
            ctx.host.contents(),
            vec!["Th", "The q", "The quick", "The quick"]
        );
        let sequences: Vec<u64> = updates.iter().map(|u| u.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);

        // three growing updates, then the closing one
        let states: Vec<&str> = updates
            .iter()
            .map(|u| u.args["state"].as_str().unwrap())
            .collect();
        assert_eq!(states, vec!["running", "running", "running", "complete"]);
        assert_eq!(updates[2].args["partial"], true);
        assert_eq!(updates[3].args["partial"], false);
    }

    #[tokio::test]
    async fn test_whole_source_matches_batch_display() {
        let mut batch_session = SessionState::new();
        let mut batch = context(&mut batch_session);
        markdown(
            &mut batch,
            "# Done",
            &RenderOptions::default(),
            MarkdownCall::keyed("demo"),
        )
        .unwrap();

        let mut stream_session = SessionState::new();
        let mut streamed = context(&mut stream_session);
        stream_markdown(
            &mut streamed,
            FragmentSource::whole("# Done"),
            RenderOptions::default(),
            MarkdownCall::keyed("demo"),
        )
        .await
        .unwrap();

        assert_eq!(batch.host.instructions(), streamed.host.instructions());
        assert_eq!(streamed.host.updates()[0].args["state"], "complete");
    }

    #[tokio::test]
    async fn test_stream_without_key_fails_before_pulling() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let source = FragmentSource::from_iter((0..3).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Fragment::from(format!("{i}"))
        }));

        let mut session = SessionState::new();
        let mut ctx = context(&mut session);
        let err = stream_markdown(&mut ctx, source, RenderOptions::default(), MarkdownCall::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingKey { .. }));
        assert_eq!(pulled.load(Ordering::SeqCst), 0);
        assert!(ctx.host.instructions().is_empty());
    }

    #[tokio::test]
    async fn test_whole_source_needs_no_key() {
        let mut session = SessionState::new();
        let mut ctx = context(&mut session);
        let text = stream_markdown(
            &mut ctx,
            FragmentSource::whole("static"),
            RenderOptions::default(),
            MarkdownCall::new(),
        )
        .await
        .unwrap();
        assert_eq!(text, "static");
        let slot = &ctx.host.updates()[0].slot;
        assert_eq!(crate::identity::user_key_from_identity(slot), None);
    }

    #[tokio::test]
    async fn test_options_fixed_for_whole_stream() {
        let mut session = SessionState::new();
        let mut ctx = context(&mut session);
        let options = RenderOptions::default()
            .with_theme(Theme::Orange)
            .with_css("h1", "color: red;");

        stream_markdown(
            &mut ctx,
            FragmentSource::from_iter(["a", "b", "c"]),
            options,
            MarkdownCall::keyed("themed"),
        )
        .await
        .unwrap();

        for update in ctx.host.updates() {
            assert_eq!(update.args["background_color"], "orange");
            assert_eq!(update.args["custom_css"], json!({"h1": "color: red;"}));
            assert_eq!(update.args["options_version"], 1);
        }
    }

    #[tokio::test]
    async fn test_invalid_fragment_halts_slot_visibly() {
        let mut session = SessionState::new();
        let mut ctx = context(&mut session);
        let fragments: Vec<Fragment> = vec!["The q".into(), vec![0xc3, 0x28].into()];

        let err = stream_markdown(
            &mut ctx,
            FragmentSource::from_iter(fragments),
            RenderOptions::default(),
            MarkdownCall::keyed("demo"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.partial_content(), Some("The q"));
        assert_eq!(ctx.host.contents(), vec!["The q", "The q"]);

        let updates = ctx.host.updates();
        let last = updates.last().unwrap();
        assert_eq!(last.slot, updates[0].slot);
        assert_eq!(last.args["state"], "error");
        assert_eq!(last.args["partial"], true);
        assert!(last.args["error"]
            .as_str()
            .unwrap()
            .contains("not valid UTF-8"));
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_shown_content() {
        let mut session = SessionState::new();
        let mut ctx = context(&mut session);
        let items: Vec<Result<Fragment>> = vec![
            Ok("Hello ".into()),
            Ok("wor".into()),
            Err(Error::Transport("connection reset".to_string())),
        ];

        let err = stream_markdown(
            &mut ctx,
            FragmentSource::from_stream(futures::stream::iter(items)),
            RenderOptions::default(),
            MarkdownCall::keyed("demo"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        let updates = ctx.host.updates();
        let last = updates.last().unwrap();
        assert_eq!(last.content(), Some("Hello wor"));
        assert_eq!(last.args["state"], "error");
        assert_eq!(
            last.args["error"],
            "fragment transport failed: connection reset"
        );
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let text = "é".repeat(PREVIEW_CHARS + 5);
        assert_eq!(preview(&text).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_markdown_returns_default_until_host_reports() {
        let mut session = SessionState::new();
        let mut ctx = context(&mut session);
        let value = markdown(
            &mut ctx,
            "hi",
            &RenderOptions::default(),
            MarkdownCall::keyed("greeting").with_default(json!("fallback")),
        )
        .unwrap();
        assert_eq!(value, Some(json!("fallback")));
    }

    #[test]
    fn test_change_callback_fires_once_per_new_value() {
        let mut session = SessionState::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for pass in 0..3 {
            let mut ctx = context(&mut session);

            // The front-end reports a value from the second pass onward
            if pass > 0 {
                let writer = SlotWriter::new(
                    &mut ctx,
                    Component::markdown(None),
                    Some("chat".to_string()),
                    None,
                );
                let id = writer.resolve(&ctx, "{}");
                ctx.host.set_value(id, json!({"clicked": true}));
            }

            let counter = fired.clone();
            markdown(
                &mut ctx,
                "hi",
                &RenderOptions::default(),
                MarkdownCall::keyed("chat").on_change(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(session.get("chat"), Some(&json!({"clicked": true})));
        assert!(session.contains("_chat_cv_prev"));
    }

    #[test]
    fn test_duplicate_keys_in_one_pass_rejected() {
        let mut session = SessionState::new();
        let mut ctx = context(&mut session);
        let options = RenderOptions::default();
        markdown(&mut ctx, "one", &options, MarkdownCall::keyed("dup")).unwrap();
        let err = markdown(&mut ctx, "two", &options, MarkdownCall::keyed("dup")).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref key } if key == "dup"));
    }

    #[test]
    fn test_identical_keyless_calls_collide() {
        let mut session = SessionState::new();
        let mut ctx = context(&mut session);
        let diff = DiffViewerArgs::new("a", "b");
        diff_viewer(&mut ctx, &diff, None).unwrap();
        let err = diff_viewer(&mut ctx, &diff, None).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentity { .. }));

        // a key tells them apart
        diff_viewer(&mut ctx, &diff, Some("second")).unwrap();
        let replaces = ctx
            .host
            .instructions()
            .iter()
            .filter(|i| matches!(i, HostInstruction::Replace(_)))
            .count();
        assert_eq!(replaces, 2);
    }
}
