//! Configuration flags.
//!
//! Flags come from two places: a flag file (global config dir, overridden by
//! a local `.waymarkrc`) and the command line. Both share one token syntax,
//! so the file is just CLI flags, one or more per line, with `#` comments.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub theme: Option<ThemeMode>,
    /// Word-wrap width; 0 or unset means "use the terminal width".
    pub width: Option<u16>,
    pub history_max: Option<usize>,
    /// Always scroll on anchor jumps, even when the target is visible.
    pub scroll_anchors: bool,
    /// Extra directories to try when resolving relative links.
    pub search_roots: Vec<PathBuf>,
}

impl ConfigFlags {
    /// Merges `other` over `self`: booleans accumulate, options prefer
    /// `other`, search roots concatenate in order.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut search_roots = self.search_roots.clone();
        search_roots.extend(other.search_roots.iter().cloned());
        Self {
            theme: other.theme.or(self.theme),
            width: other.width.or(self.width),
            history_max: other.history_max.or(self.history_max),
            scroll_anchors: self.scroll_anchors || other.scroll_anchors,
            search_roots,
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("waymark").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("waymark")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("waymark").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("waymark")
                .join("config");
        }
    }

    PathBuf::from(".waymarkrc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".waymarkrc")
}

/// Loads configuration flags from a file at the given path.
///
/// A missing file is an empty config, not an error.
///
/// # Errors
/// Returns an error if the config file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token == "--scroll-anchors" {
            flags.scroll_anchors = true;
        } else if token == "--theme" {
            if let Some(next) = tokens.get(i + 1) {
                flags.theme = parse_theme(next);
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--theme=") {
            flags.theme = parse_theme(value);
        } else if token == "--width" {
            if let Some(next) = tokens.get(i + 1) {
                flags.width = next.parse().ok();
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--width=") {
            flags.width = value.parse().ok();
        } else if token == "--history-max" {
            if let Some(next) = tokens.get(i + 1) {
                flags.history_max = next.parse().ok();
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--history-max=") {
            flags.history_max = value.parse().ok();
        } else if token == "--search-root" {
            if let Some(next) = tokens.get(i + 1) {
                flags.search_roots.push(PathBuf::from(next));
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--search-root=") {
            flags.search_roots.push(PathBuf::from(value));
        }
        i += 1;
    }
    flags
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "auto" => Some(ThemeMode::Auto),
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}
