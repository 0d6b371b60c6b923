// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - serve: run the demonstration server (default)
// - render: stream a file or remote endpoint and print host instructions
// - config --show/--reset/--edit/--path: configuration management

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use markstream::config::{Config, ENV_OVERRIDES, VERSION};
use markstream::render::JsonLinesHost;
use markstream::stream::http_fragments;
use markstream::{stream_markdown, FragmentSource, MarkdownCall, RenderContext, SessionState, Theme};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::Command;

/// markstream - streaming display controller for markdown components
#[derive(Parser)]
#[command(name = "markstream")]
#[command(version = VERSION)]
#[command(about = "Stream growing markdown into one renderer slot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the demonstration server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Stream content into a slot and print each host instruction as JSON
    Render(RenderArgs),

    /// Manage configuration
    Config {
        /// Show effective configuration and where each part comes from
        #[arg(long, group = "action")]
        show: bool,

        /// Rewrite the config file with defaults, keeping a .bak copy
        #[arg(long, group = "action")]
        reset: bool,

        /// Open the config file in $VISUAL or $EDITOR, then validate it
        #[arg(long, group = "action")]
        edit: bool,

        /// Print the config file path
        #[arg(long, group = "action")]
        path: bool,
    },
}

#[derive(Args)]
pub struct RenderArgs {
    /// Slot key
    #[arg(long)]
    pub key: String,

    /// Stream this file line by line
    #[arg(long, conflicts_with = "url")]
    pub file: Option<PathBuf>,

    /// Stream the body of this URL (e.g. a simulated token endpoint)
    #[arg(long)]
    pub url: Option<String>,

    /// Theme: green, blue, orange
    #[arg(long)]
    pub theme: Option<String>,

    /// Show raw text instead of rendered markdown
    #[arg(long)]
    pub plain: bool,
}

/// What `markstream config` was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    Path,
    Show,
    Reset,
    Edit,
    Usage,
}

/// The config action requested on the command line, if any
pub fn config_action(cli: &Cli) -> Option<ConfigAction> {
    let Some(Commands::Config {
        show,
        reset,
        edit,
        path,
    }) = &cli.command
    else {
        return None;
    };

    Some(if *path {
        ConfigAction::Path
    } else if *show {
        ConfigAction::Show
    } else if *reset {
        ConfigAction::Reset
    } else if *edit {
        ConfigAction::Edit
    } else {
        ConfigAction::Usage
    })
}

/// Run a config action; these never start the server
pub fn run_config(action: ConfigAction) -> Result<()> {
    if action == ConfigAction::Usage {
        println!("Usage: markstream config [--show|--reset|--edit|--path]");
        return Ok(());
    }

    let path = Config::config_path().context("Could not determine the config file location")?;
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => {
            let config = Config::load()?;
            let overrides: Vec<&str> = ENV_OVERRIDES
                .into_iter()
                .filter(|name| std::env::var_os(name).is_some())
                .collect();
            print!("{}", describe_config(&config, &path, &overrides));
        }
        ConfigAction::Reset => match reset_config(&path)? {
            Some(backup) => println!(
                "Config reset to defaults: {} (previous file kept as {})",
                path.display(),
                backup.display()
            ),
            None => println!("Config written with defaults: {}", path.display()),
        },
        ConfigAction::Edit => edit_config(&path)?,
        ConfigAction::Usage => {}
    }
    Ok(())
}

/// Effective configuration as TOML, annotated with where it came from
fn describe_config(config: &Config, path: &Path, overrides: &[&str]) -> String {
    let mut out = String::from("# Effective configuration (env > file > defaults)\n\n");
    out.push_str(&config.to_toml());
    out.push('\n');

    if path.exists() {
        out.push_str(&format!("# File: {}\n", path.display()));
    } else {
        out.push_str("# File: none, built-in defaults\n");
    }
    if !overrides.is_empty() {
        out.push_str(&format!("# Overridden by: {}\n", overrides.join(", ")));
    }
    for warning in &config.warnings {
        out.push_str(&format!("# Warning: {}\n", warning));
    }
    out
}

/// Write the default config to `path`
///
/// An existing file is renamed to `<name>.bak` first; returns that path.
fn reset_config(path: &Path) -> Result<Option<PathBuf>> {
    let backup = if path.exists() {
        let backup = path.with_extension("toml.bak");
        std::fs::rename(path, &backup)
            .with_context(|| format!("Failed to back up {}", path.display()))?;
        Some(backup)
    } else {
        None
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, Config::default().to_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(backup)
}

/// Editor command from `$VISUAL`/`$EDITOR`, split into program and arguments
fn editor_command(visual: Option<String>, editor: Option<String>) -> Vec<String> {
    let configured = visual
        .into_iter()
        .chain(editor)
        .find(|cmd| !cmd.trim().is_empty());
    match configured {
        Some(cmd) => cmd.split_whitespace().map(String::from).collect(),
        None if cfg!(windows) => vec!["notepad".to_string()],
        None => vec!["vi".to_string()],
    }
}

fn edit_config(path: &Path) -> Result<()> {
    if !path.exists() {
        reset_config(path)?;
        println!("Created {}", path.display());
    }

    let command = editor_command(std::env::var("VISUAL").ok(), std::env::var("EDITOR").ok());
    let Some((program, args)) = command.split_first() else {
        anyhow::bail!("No editor configured; set $EDITOR");
    };
    let status = Command::new(program)
        .args(args)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to launch editor '{}'", program))?;
    if !status.success() {
        anyhow::bail!("Editor exited with {}", status);
    }

    // Catch mistakes now rather than on the next start
    let config = Config::from_file(path)?;
    if config.warnings.is_empty() {
        println!("{} is valid", path.display());
    }
    for warning in &config.warnings {
        println!("Warning: {}", warning);
    }
    Ok(())
}

/// Stream the requested content through the controller to stdout
pub async fn run_render(config: &Config, args: RenderArgs) -> Result<()> {
    let source = match (&args.file, &args.url) {
        (Some(path), _) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let lines = std::io::BufReader::new(file)
                .lines()
                .collect::<std::io::Result<Vec<String>>>()
                .with_context(|| format!("Failed to read {}", path.display()))?;
            FragmentSource::from_iter(lines.into_iter().map(|line| line + "\n"))
        }
        (None, Some(url)) => {
            let client = reqwest::Client::new();
            http_fragments(&client, url).await?
        }
        (None, None) => anyhow::bail!("either --file or --url is required"),
    };

    let mut render = config.render.clone();
    if let Some(theme) = &args.theme {
        render.theme = Theme::from_str(theme);
    }
    if args.plain {
        render.rich_content = false;
    }

    let stdout = std::io::stdout();
    let mut session = SessionState::new();
    let mut ctx = RenderContext::new(&mut session, JsonLinesHost::new(stdout.lock()), None);
    ctx.dev_server = config.dev_server.clone();

    let text = stream_markdown(
        &mut ctx,
        source,
        render.options(),
        MarkdownCall::keyed(args.key.clone()),
    )
    .await
    .with_context(|| format!("Streaming into '{}' failed", args.key))?;

    tracing::info!("Rendered {} bytes into '{}'", text.len(), args.key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::parse_from(["markstream"]);
        assert!(cli.command.is_none());
        assert_eq!(config_action(&cli), None);
    }

    #[test]
    fn test_config_flags_map_to_actions() {
        let action = |flags: &[&str]| {
            let args = ["markstream", "config"].iter().chain(flags);
            config_action(&Cli::parse_from(args))
        };
        assert_eq!(action(&[]), Some(ConfigAction::Usage));
        assert_eq!(action(&["--show"]), Some(ConfigAction::Show));
        assert_eq!(action(&["--edit"]), Some(ConfigAction::Edit));
        assert!(Cli::try_parse_from(["markstream", "config", "--show", "--reset"]).is_err());
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("markstream-cli-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_reset_keeps_a_backup() {
        let path = temp_dir("reset").join("config.toml");
        assert_eq!(reset_config(&path).unwrap(), None);

        std::fs::write(&path, "bind_addr = \"0.0.0.0:9000\"\n").unwrap();
        let backup = reset_config(&path).unwrap().unwrap();
        assert_eq!(backup.file_name().unwrap(), "config.toml.bak");
        assert!(std::fs::read_to_string(&backup).unwrap().contains("0.0.0.0:9000"));

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_describe_names_sources_and_warnings() {
        let path = temp_dir("describe").join("config.toml");
        let mut config = Config::default();
        config.warnings.push("[render] unknown theme \"purple\", using green".to_string());

        let text = describe_config(&config, &path, &["MARKSTREAM_THEME"]);
        assert!(text.contains("# File: none, built-in defaults"));
        assert!(text.contains("# Overridden by: MARKSTREAM_THEME"));
        assert!(text.contains("# Warning: [render] unknown theme"));
        assert!(text.contains("[simulation]"));
    }

    #[test]
    fn test_editor_command_prefers_visual_and_splits_args() {
        assert_eq!(
            editor_command(Some("code --wait".to_string()), Some("nano".to_string())),
            vec!["code", "--wait"]
        );
        assert_eq!(
            editor_command(Some(" ".to_string()), Some("nano".to_string())),
            vec!["nano"]
        );
        assert!(!editor_command(None, None).is_empty());
    }

    #[test]
    fn test_render_args_parse() {
        let cli = Cli::parse_from([
            "markstream",
            "render",
            "--key",
            "demo",
            "--url",
            "http://127.0.0.1:8000/simulated_token_stream?text=hi",
            "--plain",
        ]);
        match cli.command {
            Some(Commands::Render(args)) => {
                assert_eq!(args.key, "demo");
                assert!(args.plain);
                assert!(args.file.is_none());
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_file_and_url_conflict() {
        let parsed = Cli::try_parse_from([
            "markstream",
            "render",
            "--key",
            "demo",
            "--file",
            "notes.md",
            "--url",
            "http://localhost",
        ]);
        assert!(parsed.is_err());
    }
}
