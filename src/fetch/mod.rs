//! Content fetching on link activation.
//!
//! The session never does I/O itself. When the user activates a link, the
//! host hands the element to a [`ContentFetcher`], which retrieves the
//! target through a [`ContentProvider`] and loads it into the session with
//! a history push. Internal anchor links (`#slug`) never reach the fetcher;
//! the host calls [`crate::session::Session::scroll_to_anchor`] directly.

mod resolver;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::document::{ElementKind, NavElement};
use crate::session::Session;

pub use resolver::{is_http_url, resolve_link_path, ResolveError};

/// Errors surfaced to the host by [`ContentFetcher::on_select`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("element is not a link")]
    NotLink,
    #[error("content is empty")]
    EmptyContent,
    #[error("fetch content for {url:?}")]
    Provider {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("load fetched content")]
    Load(#[source] anyhow::Error),
}

/// Retrieves content for a navigation element.
///
/// Implementations decide HTTP versus local access based on the URL scheme.
pub trait ContentProvider {
    fn fetch_content(&self, elem: &NavElement) -> Result<String>;
}

/// Handles link activation by fetching content and loading it into a
/// session.
pub struct ContentFetcher {
    provider: Box<dyn ContentProvider>,
    search_roots: Vec<PathBuf>,
}

impl ContentFetcher {
    pub fn new(provider: Box<dyn ContentProvider>, search_roots: Vec<PathBuf>) -> Self {
        Self {
            provider,
            search_roots,
        }
    }

    /// Fetches the link target and replaces the session content, pushing the
    /// current page onto back history.
    ///
    /// The new source path is the link URL resolved against the element's
    /// own source path and the configured search roots; HTTP(S) URLs are
    /// kept verbatim.
    pub fn on_select(&self, session: &mut Session, elem: &NavElement) -> Result<(), FetchError> {
        if elem.kind != ElementKind::Link {
            return Err(FetchError::NotLink);
        }

        let content = self
            .provider
            .fetch_content(elem)
            .map_err(|source| FetchError::Provider {
                url: elem.destination.clone(),
                source,
            })?;
        if content.is_empty() {
            return Err(FetchError::EmptyContent);
        }

        let mut new_source_path = elem.destination.clone();
        if !is_http_url(&elem.destination) && !elem.source_path.is_empty() {
            if let Ok(resolved) =
                resolve_link_path(&elem.destination, &elem.source_path, &self.search_roots)
            {
                if !resolved.is_empty() {
                    new_source_path = resolved;
                }
            }
        }

        session
            .load_with_source(&content, &new_source_path, true)
            .map_err(FetchError::Load)
    }

    /// Like [`on_select`](Self::on_select), but renders failures as a
    /// markdown error page in the session instead of returning them.
    /// Activating a non-link is silently ignored.
    pub fn on_select_or_show_error(&self, session: &mut Session, elem: &NavElement) {
        match self.on_select(session, elem) {
            Ok(()) | Err(FetchError::NotLink) => {}
            Err(err) => {
                let page = error_page(&elem.destination, &err);
                let _ = session.load_with_source(&page, &elem.source_path, true);
            }
        }
    }
}

fn error_page(url: &str, err: &FetchError) -> String {
    let mut detail = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        detail.push_str(&format!("\n{cause}"));
        source = cause.source();
    }
    format!("# Error\n\nFailed to load `{url}`:\n\n```\n{detail}\n```")
}

/// Splits a URL into its path and fragment parts.
///
/// `page.md#section` activates as a fetch of `page.md` followed by an anchor
/// jump to `section`.
pub fn split_fragment(url: &str) -> (&str, Option<&str>) {
    match url.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (url, None),
    }
}

/// Fetches HTTP(S) URLs over the network and anything else from the local
/// filesystem, resolving relative paths first.
pub struct FileHttpProvider {
    search_roots: Vec<PathBuf>,
    agent: ureq::Agent,
}

impl FileHttpProvider {
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        Self {
            search_roots,
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(15))
                .build(),
        }
    }
}

impl ContentProvider for FileHttpProvider {
    fn fetch_content(&self, elem: &NavElement) -> Result<String> {
        let url = &elem.destination;
        if url.is_empty() {
            return Ok(String::new());
        }

        let resolved = resolve_link_path(url, &elem.source_path, &self.search_roots)
            .with_context(|| format!("failed to resolve path {url:?}"))?;

        if is_http_url(&resolved) {
            tracing::debug!(url = %resolved, "fetching remote content");
            let response = self
                .agent
                .get(&resolved)
                .call()
                .with_context(|| format!("failed to fetch {resolved:?}"))?;
            return response
                .into_string()
                .context("failed to read response body");
        }

        std::fs::read_to_string(&resolved)
            .with_context(|| format!("failed to read local file {resolved:?}"))
    }
}
