//! Default display options for rendered streams

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::component::{MermaidTheme, RenderOptions, Theme};

/// Display defaults applied when a request doesn't override them
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub theme: Theme,
    pub rich_content: bool,
    pub mermaid_theme: Option<MermaidTheme>,
    pub mermaid_theme_css: Option<String>,
    /// Per-tag CSS overrides (`h1`, `table`, `code`, ...)
    pub custom_css: BTreeMap<String, String>,
    /// Palette override; the theme's palette when absent
    pub custom_color: Option<BTreeMap<String, String>>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let options = RenderOptions::default();
        Self {
            theme: options.theme,
            rich_content: options.rich_content,
            mermaid_theme: options.mermaid_theme,
            mermaid_theme_css: options.mermaid_theme_css,
            custom_css: options.custom_css,
            custom_color: options.custom_color,
        }
    }
}

/// Render settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileRender {
    pub theme: Option<String>,
    pub rich_content: Option<bool>,
    pub mermaid_theme: Option<String>,
    pub mermaid_theme_css: Option<String>,
    pub custom_css: Option<BTreeMap<String, String>>,
    pub custom_color: Option<BTreeMap<String, String>>,
}

impl RenderConfig {
    /// Resolve the section, noting values that had to be replaced
    pub fn from_file(file: Option<FileRender>, warnings: &mut Vec<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let theme = match file.theme {
            Some(raw) => {
                let theme = Theme::from_str(&raw);
                if !theme.as_str().eq_ignore_ascii_case(raw.trim()) {
                    warnings.push(format!(
                        "[render] unknown theme {:?}, using {}",
                        raw,
                        theme.as_str()
                    ));
                }
                theme
            }
            None => defaults.theme,
        };

        let mermaid_theme = match file.mermaid_theme {
            Some(raw) => {
                let parsed = MermaidTheme::from_str(&raw);
                if parsed.is_none() {
                    warnings.push(format!(
                        "[render] unknown mermaid_theme {:?}, letting the renderer choose",
                        raw
                    ));
                }
                parsed
            }
            None => defaults.mermaid_theme,
        };

        Self {
            theme,
            rich_content: file.rich_content.unwrap_or(defaults.rich_content),
            mermaid_theme,
            mermaid_theme_css: file.mermaid_theme_css.or(defaults.mermaid_theme_css),
            custom_css: file.custom_css.unwrap_or(defaults.custom_css),
            custom_color: file.custom_color.or(defaults.custom_color),
        }
    }

    /// Display options for one stream
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            rich_content: self.rich_content,
            theme: self.theme,
            mermaid_theme: self.mermaid_theme,
            mermaid_theme_css: self.mermaid_theme_css.clone(),
            custom_css: self.custom_css.clone(),
            custom_color: self.custom_color.clone(),
        }
    }
}
