//! Markdown renderer display options
//!
//! `RenderOptions` is the configuration bundle passed unchanged with every
//! increment of a stream. Optional fields are always filled in before they
//! reach the renderer, so it never sees a half-specified configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ComponentArgs;
use crate::error::Result;

/// Version of the payload shape produced by [`RenderOptions::payload`]
pub const OPTIONS_VERSION: u32 = 1;

/// Background/border/text scheme of the rendered block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Blue,
    Orange,
    #[default]
    Green,
}

impl Theme {
    /// Parse theme string from config or query parameters
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "blue" => Self::Blue,
            "orange" => Self::Orange,
            "green" => Self::Green,
            _ => Self::Green, // Default to green for unknown values
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Orange => "orange",
            Self::Green => "green",
        }
    }

    /// Color palette the renderer uses for this theme
    pub fn palette(&self) -> BTreeMap<String, String> {
        let (background, border, text) = match self {
            Self::Blue => ("#eff6ff", "#bfdbfe", "#1e3a8a"),
            Self::Orange => ("#ffedd5", "#fed7aa", "#7c2d12"),
            Self::Green => ("#f0fdf4", "#bbf7d0", "#14532d"),
        };
        BTreeMap::from([
            ("background".to_string(), background.to_string()),
            ("border".to_string(), border.to_string()),
            ("text".to_string(), text.to_string()),
        ])
    }
}

/// Mermaid diagram theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MermaidTheme {
    Default,
    Forest,
    Dark,
    Neutral,
    Base,
}

impl MermaidTheme {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Some(Self::Default),
            "forest" => Some(Self::Forest),
            "dark" => Some(Self::Dark),
            "neutral" => Some(Self::Neutral),
            "base" => Some(Self::Base),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Forest => "forest",
            Self::Dark => "dark",
            Self::Neutral => "neutral",
            Self::Base => "base",
        }
    }
}

/// Progress of the content shown in a slot
///
/// Sent with every update so the renderer can tell a growing buffer from a
/// finished one, and a halted stream from either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    /// More content is expected
    Running,
    Complete,
    /// The stream halted; the content is what was shown before the failure
    Error(String),
}

impl RenderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error(_) => "error",
        }
    }

    /// Whether the content may be missing a tail
    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::Complete)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Display options for the markdown renderer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Render markdown, mermaid and LaTeX (false shows the raw text)
    pub rich_content: bool,
    pub theme: Theme,
    /// `None` lets the renderer use its own mermaid theme
    pub mermaid_theme: Option<MermaidTheme>,
    /// Extra CSS applied inside mermaid diagrams
    pub mermaid_theme_css: Option<String>,
    /// Raw CSS override per semantic tag (`h1`, `table`, `code`, ...)
    pub custom_css: BTreeMap<String, String>,
    /// `None` falls back to the theme's palette
    pub custom_color: Option<BTreeMap<String, String>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            rich_content: true,
            theme: Theme::Green,
            mermaid_theme: None,
            mermaid_theme_css: None,
            custom_css: BTreeMap::new(),
            custom_color: None,
        }
    }
}

impl RenderOptions {
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_rich_content(mut self, rich_content: bool) -> Self {
        self.rich_content = rich_content;
        self
    }

    pub fn with_css(mut self, tag: impl Into<String>, css: impl Into<String>) -> Self {
        self.custom_css.insert(tag.into(), css.into());
        self
    }

    /// Palette sent to the renderer
    pub fn effective_palette(&self) -> BTreeMap<String, String> {
        self.custom_color
            .clone()
            .unwrap_or_else(|| self.theme.palette())
    }

    /// Build the argument object for one update
    pub fn payload(
        &self,
        content: &str,
        key: Option<&str>,
        default: Option<&serde_json::Value>,
        state: &RenderState,
    ) -> Result<ComponentArgs> {
        ComponentArgs::new()
            .arg("content", content)?
            .arg("state", state.as_str())?
            .arg("partial", &state.is_partial())?
            .opt_arg("error", state.message().as_ref())?
            .arg("richContent", &self.rich_content)?
            .arg("background_color", self.theme.as_str())?
            // Streaming front-ends read the theme under this name
            .arg("theme_color", self.theme.as_str())?
            .opt_arg("mermaid_theme", self.mermaid_theme.as_ref())?
            .opt_arg("mermaid_theme_CSS", self.mermaid_theme_css.as_ref())?
            .arg("custom_css", &self.custom_css)?
            .arg("custom_color", &self.effective_palette())?
            .arg("key", &key)?
            .arg("default", &default)?
            .arg("options_version", &OPTIONS_VERSION)
    }
}
