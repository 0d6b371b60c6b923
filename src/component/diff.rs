//! Diff viewer arguments

use serde::Serialize;

use super::ComponentArgs;
use crate::error::Result;

/// Arguments of the side-by-side diff viewer
///
/// Field names go over the wire in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffViewerArgs {
    pub old_text: String,
    pub new_text: String,
    /// Two columns instead of a unified view
    pub split_view: bool,
    pub disabled_word_diff: bool,
    pub left_title: Option<String>,
    pub right_title: Option<String>,
    pub use_dark_theme: bool,
    /// Unchanged lines shown around each hunk
    pub extra_lines_surrounding_diff: u32,
    pub hide_line_numbers: bool,
    /// Line ids such as `L-12` or `R-3`
    pub highlight_lines: Vec<String>,
}

impl DiffViewerArgs {
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            old_text: old_text.into(),
            new_text: new_text.into(),
            split_view: true,
            disabled_word_diff: false,
            left_title: None,
            right_title: None,
            use_dark_theme: false,
            extra_lines_surrounding_diff: 3,
            hide_line_numbers: false,
            highlight_lines: Vec::new(),
        }
    }

    pub fn titled(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.left_title = Some(left.into());
        self.right_title = Some(right.into());
        self
    }

    pub fn payload(&self, key: Option<&str>) -> Result<ComponentArgs> {
        ComponentArgs::new()
            .arg("oldText", &self.old_text)?
            .arg("newText", &self.new_text)?
            .arg("splitView", &self.split_view)?
            .arg("disabledWordDiff", &self.disabled_word_diff)?
            .arg("leftTitle", &self.left_title)?
            .arg("rightTitle", &self.right_title)?
            .arg("useDarkTheme", &self.use_dark_theme)?
            .arg("extraLinesSurroundingDiff", &self.extra_lines_surrounding_diff)?
            .arg("hideLineNumbers", &self.hide_line_numbers)?
            .arg("highlightLines", &self.highlight_lines)?
            .arg("key", &key)
    }
}
