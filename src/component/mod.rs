//! Front-end component declarations and argument marshalling
//!
//! The renderers themselves ship as a pre-built bundle; this side only names
//! the component, says where the bundle is served from, and turns typed
//! options into the flat JSON object the bundle reads its props from.

pub mod diff;
pub mod markdown;

pub use diff::DiffViewerArgs;
pub use markdown::{MermaidTheme, RenderOptions, RenderState, Theme, OPTIONS_VERSION};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Name the markdown renderer bundle is registered under
pub const MARKDOWN: &str = "streamlit_markdown";

/// Name the diff viewer bundle is registered under
pub const DIFF_VIEWER: &str = "st_diff_viewer";

/// A declared front-end component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: &'static str,
    /// Dev server URL; `None` means the bundled build is served
    pub url: Option<String>,
}

impl Component {
    /// Component served from its bundled build
    pub const fn bundled(name: &'static str) -> Self {
        Self { name, url: None }
    }

    /// Component served from a frontend dev server
    ///
    /// The URL follows the `<base>/component/<name>.<name>` layout the
    /// component dev servers expose.
    pub fn dev_server(name: &'static str, base: &str) -> Self {
        Self {
            name,
            url: Some(format!(
                "{}/component/{}.{}",
                base.trim_end_matches('/'),
                name,
                name
            )),
        }
    }

    pub fn markdown(dev_server: Option<&str>) -> Self {
        match dev_server {
            Some(base) => Self::dev_server(MARKDOWN, base),
            None => Self::bundled(MARKDOWN),
        }
    }

    pub fn diff_viewer(dev_server: Option<&str>) -> Self {
        match dev_server {
            Some(base) => Self::dev_server(DIFF_VIEWER, base),
            None => Self::bundled(DIFF_VIEWER),
        }
    }
}

/// Flat JSON argument object handed to a component
///
/// Keys are kept sorted, so the same arguments always serialize to the same
/// string (keyless identities hash that string).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComponentArgs(Map<String, Value>);

impl ComponentArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one named argument
    pub fn arg<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|source| Error::Serialization {
            argument: name.to_string(),
            source,
        })?;
        self.0.insert(name.to_string(), value);
        Ok(self)
    }

    /// Add an argument only when it is present
    pub fn opt_arg<T: Serialize>(self, name: &str, value: Option<&T>) -> Result<Self> {
        match value {
            Some(value) => self.arg(name, value),
            None => Ok(self),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Length in bytes of the `content` argument, if any
    pub fn content_len(&self) -> Option<usize> {
        self.0.get("content").and_then(Value::as_str).map(str::len)
    }

    /// Serialized form used for identities and the wire
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.0).map_err(|source| Error::Serialization {
            argument: "<arguments>".to_string(),
            source,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use std::collections::BTreeMap;

    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("no JSON form"))
        }
    }

    #[test]
    fn test_dev_server_url_layout() {
        let component = Component::markdown(Some("http://localhost:35335/"));
        assert_eq!(
            component.url.as_deref(),
            Some("http://localhost:35335/component/streamlit_markdown.streamlit_markdown")
        );
        assert_eq!(Component::diff_viewer(None).url, None);
    }

    #[test]
    fn test_serialization_error_names_argument() {
        let err = ComponentArgs::new()
            .arg("content", "ok")
            .unwrap()
            .arg("callback", &Unrepresentable)
            .unwrap_err();
        assert!(matches!(err, Error::Serialization { ref argument, .. } if argument == "callback"));
    }

    #[test]
    fn test_args_serialize_in_stable_order() {
        let a = ComponentArgs::new()
            .arg("zeta", &1)
            .unwrap()
            .arg("alpha", &2)
            .unwrap();
        let b = ComponentArgs::new()
            .arg("alpha", &2)
            .unwrap()
            .arg("zeta", &1)
            .unwrap();
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        assert_eq!(a.to_json().unwrap(), r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn test_opt_arg_skips_missing() {
        let none: Option<&BTreeMap<String, String>> = None;
        let args = ComponentArgs::new().opt_arg("custom_css", none).unwrap();
        assert!(args.get("custom_css").is_none());
    }
}
