//! Waymark - a navigable markdown viewer for the terminal.
//!
//! # Usage
//!
//! ```bash
//! waymark README.md
//! waymark https://raw.githubusercontent.com/rust-lang/rust/master/README.md
//! waymark --theme light --width 100 README.md
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use waymark::config::{self, ConfigFlags, ThemeMode};
use waymark::document::NavElement;
use waymark::fetch::{is_http_url, ContentFetcher, ContentProvider, FileHttpProvider};
use waymark::render::styled::{StyledRenderer, Theme};
use waymark::session::Session;
use waymark::ui::App;

/// A navigable markdown viewer with link traversal and history
#[derive(Parser, Debug)]
#[command(name = "waymark", version, about, long_about = None)]
struct Cli {
    /// Markdown file or HTTP(S) URL to view
    #[arg(value_name = "FILE_OR_URL")]
    target: String,

    /// Color theme for rendering (defaults to auto-detection)
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,

    /// Word-wrap width (0 = terminal width)
    #[arg(long)]
    width: Option<u16>,

    /// Maximum history entries per direction
    #[arg(long)]
    history_max: Option<usize>,

    /// Always scroll on anchor jumps, even when the target is visible
    #[arg(long)]
    scroll_anchors: bool,

    /// Extra directory to try when resolving relative links (repeatable)
    #[arg(long, value_name = "DIR")]
    search_root: Vec<PathBuf>,
}

impl Cli {
    fn as_flags(&self) -> ConfigFlags {
        ConfigFlags {
            theme: self.theme,
            width: self.width,
            history_max: self.history_max,
            scroll_anchors: self.scroll_anchors,
            search_roots: self.search_root.clone(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let file_flags = config::load_config_flags(&config::global_config_path())
        .unwrap_or_default()
        .union(&config::load_config_flags(&config::local_override_path()).unwrap_or_default());
    let flags = file_flags.union(&cli.as_flags());

    let theme = match flags.theme.unwrap_or(ThemeMode::Auto) {
        ThemeMode::Auto => Theme::detect(),
        ThemeMode::Light => Theme::light(),
        ThemeMode::Dark => Theme::dark(),
    };

    let mut search_roots = flags.search_roots.clone();
    if search_roots.is_empty() {
        search_roots.push(PathBuf::from("."));
    }

    let provider = FileHttpProvider::new(search_roots.clone());
    let (content, source_path) = load_initial(&cli.target, &provider)?;

    let mut session = Session::new()
        .with_renderer(Box::new(StyledRenderer::new(theme)))
        .with_always_scroll_to_anchor(flags.scroll_anchors);
    if let Some(max) = flags.history_max {
        session = session.with_history_max(max);
    }
    if let Some(width) = flags.width.filter(|&w| w > 0) {
        session.set_width(width);
    }
    session
        .load_with_source(&content, &source_path, false)
        .context("failed to render initial document")?;

    let fetcher = ContentFetcher::new(Box::new(provider), search_roots);
    App::new(session, fetcher)
        .with_fixed_width(flags.width.is_some_and(|w| w > 0))
        .run()
        .context("application error")
}

/// Loads the initial document from a file path or URL.
fn load_initial(target: &str, provider: &FileHttpProvider) -> Result<(String, String)> {
    if is_http_url(target) {
        let elem = NavElement::link(target, target, "");
        let content = provider
            .fetch_content(&elem)
            .with_context(|| format!("failed to fetch {target}"))?;
        return Ok((content, target.to_string()));
    }

    let path = std::fs::canonicalize(target)
        .with_context(|| format!("file not found: {target}"))?;
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((content, path.to_string_lossy().into_owned()))
}
