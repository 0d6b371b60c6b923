//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use std::collections::BTreeMap;

use super::{level_name, Config};

/// Quote a value as a TOML basic string
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

/// Render a string map as a TOML table section
///
/// Empty maps become a commented example so the section stays discoverable.
fn table_to_toml(header: &str, map: &BTreeMap<String, String>, example: &str) -> String {
    if map.is_empty() {
        return format!("# [{}]\n# {}\n", header, example);
    }

    let mut output = format!("[{}]\n", header);
    for (key, value) in map {
        output.push_str(&format!("{} = {}\n", toml_string(key), toml_string(value)));
    }
    output
}

impl Config {
    /// Serialize the [render] section, including its sub-tables
    pub(super) fn render_to_toml(&self) -> String {
        let render = &self.render;
        let mermaid_theme = match render.mermaid_theme {
            Some(theme) => format!("mermaid_theme = \"{}\"", theme.as_str()),
            None => "# mermaid_theme = \"forest\"  # default, forest, dark, neutral, base".to_string(),
        };
        let mermaid_css = match &render.mermaid_theme_css {
            Some(css) => format!("mermaid_theme_css = {}", toml_string(css)),
            None => "# mermaid_theme_css = \".node rect { fill: #eee; }\"".to_string(),
        };

        let mut output = format!(
            r#"# Default display options (requests may override theme and rich_content)
[render]
theme = "{theme}"  # green, blue, orange
rich_content = {rich}
{mermaid_theme}
{mermaid_css}

"#,
            theme = render.theme.as_str(),
            rich = render.rich_content,
        );

        output.push_str(&table_to_toml(
            "render.custom_css",
            &render.custom_css,
            "h1 = \"color: #14532d;\"",
        ));
        output.push('\n');
        match &render.custom_color {
            Some(colors) => output.push_str(&table_to_toml(
                "render.custom_color",
                colors,
                "background = \"#f0fdf4\"",
            )),
            None => output.push_str(
                "# Palette override (defaults to the theme's palette)\n\
                 # [render.custom_color]\n\
                 # background = \"#f0fdf4\"\n\
                 # border = \"#bbf7d0\"\n\
                 # text = \"#14532d\"\n",
            ),
        }
        output
    }

    /// Serialize the [logging] section
    pub(super) fn logging_to_toml(&self) -> String {
        let mut output = format!(
            "# Logging (RUST_LOG overrides the level)\n[logging]\nlevel = \"{}\"  # trace, debug, info, warn, error\n\n",
            level_name(self.logging.level)
        );
        match &self.logging.file {
            Some(file) => output.push_str(&format!(
                "# JSON copy of the log\n[logging.file]\ndir = {}\nprefix = {}\nrotation = \"{}\"  # hourly, daily, never\n",
                toml_string(&file.dir.display().to_string()),
                toml_string(&file.prefix),
                file.rotation,
            )),
            None => output.push_str(
                "# Uncomment to also write a JSON copy of the log\n\
                 # [logging.file]\n\
                 # dir = \"./logs\"\n\
                 # rotation = \"daily\"  # hourly, daily, never\n",
            ),
        }
        output
    }

    /// Serialize config to TOML format
    pub fn to_toml(&self) -> String {
        let dev_server = match &self.dev_server {
            Some(url) => format!("dev_server = {}", toml_string(url)),
            None => "# dev_server = \"http://localhost:3001\"".to_string(),
        };
        let allowed_upstreams = if self.allowed_upstreams.is_empty() {
            "# allowed_upstreams = [\"https://models.example.com/v1/stream/\"]".to_string()
        } else {
            let entries: Vec<String> = self
                .allowed_upstreams
                .iter()
                .map(|url| toml_string(url))
                .collect();
            format!("allowed_upstreams = [{}]", entries.join(", "))
        };

        format!(
            r#"# markstream configuration

# Demonstration server bind address
bind_addr = "{bind}"

# Frontend dev server serving the components (bundled build when unset)
{dev_server}

# Remote bases /render may stream from with ?url= (the server itself is always allowed)
{allowed_upstreams}

{render}
# Simulated token streams
[simulation]
char_chunk_min = {char_min}
char_chunk_max = {char_max}
char_delay_ms = {char_delay}
token_chunk_min = {token_min}
token_chunk_max = {token_max}
token_delay_ms = {token_delay}

{logging}"#,
            bind = self.bind_addr,
            dev_server = dev_server,
            allowed_upstreams = allowed_upstreams,
            render = self.render_to_toml(),
            char_min = self.simulation.char_chunk_min,
            char_max = self.simulation.char_chunk_max,
            char_delay = self.simulation.char_delay_ms,
            token_min = self.simulation.token_chunk_min,
            token_max = self.simulation.token_chunk_max,
            token_delay = self.simulation.token_delay_ms,
            logging = self.logging_to_toml(),
        )
    }

    /// Save config to the config file
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = Self::config_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config path",
            ));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml())
    }
}
