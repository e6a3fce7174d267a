// src/filter/mod.rs - Content filter service: whitelist-aware blocklist replacement

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::FilterConfig;
use crate::types::{FilterDirection, InboundMessage};

pub mod automaton;
pub mod dictionary;
pub mod planner;
#[cfg(feature = "hot_reload")]
pub mod watcher;

use automaton::Automaton;
use dictionary::{load_dictionary_file, LoadedDictionary};

/// Longest text accepted for filtering, in code points
pub const MAX_TEXT_CHARS: usize = 5000;

/// Marks text carrying an embedded base64 image; such text skips the length
/// limit and is returned untouched when over it
pub const MEDIA_MARKER: &str = "[CQ:image,file=base64://";

/// Why a piece of text was not filtered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterRejection {
    #[error("error: no text to filter")]
    EmptyText,

    #[error("error: text exceeds the maximum length ({limit} characters)")]
    TooLong { chars: usize, limit: usize },
}

/// Pattern and node counts for one automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomatonStats {
    pub patterns: usize,
    pub nodes: usize,
}

impl From<&Automaton> for AutomatonStats {
    fn from(automaton: &Automaton) -> Self {
        Self {
            patterns: automaton.pattern_count(),
            nodes: automaton.node_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub inbound: AutomatonStats,
    pub outbound: AutomatonStats,
    pub whitelist: AutomatonStats,
}

/// The three built automatons plus the switches that govern their use.
///
/// Built once, then only read; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FilterService {
    inbound: Automaton,
    outbound: Automaton,
    whitelist: Automaton,
    sanitize_enabled: bool,
    /// Normalized dictionary contents as last written, keyed by path
    sources: Vec<(PathBuf, String)>,
}

impl FilterService {
    /// Assemble a service from already built automatons
    pub fn new(inbound: Automaton, outbound: Automaton, whitelist: Automaton) -> Self {
        Self {
            inbound,
            outbound,
            whitelist,
            sanitize_enabled: true,
            sources: Vec::new(),
        }
    }

    /// Toggle inbound message sanitizing
    pub fn with_sanitizing(mut self, enabled: bool) -> Self {
        self.sanitize_enabled = enabled;
        self
    }

    /// Load all three dictionaries named by `config` and build the service.
    ///
    /// Each dictionary file is normalized and rewritten on disk as a side
    /// effect. Any failure aborts the whole load so a half-built service is
    /// never returned.
    pub async fn load(config: &FilterConfig) -> Result<Self> {
        let default = config.default_change_word.as_str();

        let inbound = load_dictionary_file(
            &config.blocklist_path(FilterDirection::Inbound),
            default,
        )
        .await
        .context("Failed to load inbound dictionary")?;
        let outbound = load_dictionary_file(
            &config.blocklist_path(FilterDirection::Outbound),
            default,
        )
        .await
        .context("Failed to load outbound dictionary")?;
        let whitelist = load_dictionary_file(&config.whitelist_path(), default)
            .await
            .context("Failed to load whitelist dictionary")?;

        let mut sources = Vec::with_capacity(3);
        let mut take = |loaded: LoadedDictionary| {
            sources.push((loaded.path, loaded.contents));
            loaded.automaton
        };
        let inbound = take(inbound);
        let outbound = take(outbound);
        let whitelist = take(whitelist);

        let service = Self {
            inbound,
            outbound,
            whitelist,
            sanitize_enabled: config.enable_change_word,
            sources,
        };
        let stats = service.stats();
        info!(
            "Content filter ready: {} inbound, {} outbound, {} whitelist pattern(s)",
            stats.inbound.patterns, stats.outbound.patterns, stats.whitelist.patterns
        );
        Ok(service)
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            inbound: AutomatonStats::from(&self.inbound),
            outbound: AutomatonStats::from(&self.outbound),
            whitelist: AutomatonStats::from(&self.whitelist),
        }
    }

    pub fn sanitize_enabled(&self) -> bool {
        self.sanitize_enabled
    }

    /// Dictionary contents written by the last load, looked up by file name
    pub fn dictionary_snapshot(&self, file_name: &OsStr) -> Option<&str> {
        self.sources
            .iter()
            .find(|(path, _)| path.file_name() == Some(file_name))
            .map(|(_, contents)| contents.as_str())
    }

    fn blocklist(&self, direction: FilterDirection) -> &Automaton {
        match direction {
            FilterDirection::Inbound => &self.inbound,
            FilterDirection::Outbound => &self.outbound,
        }
    }

    /// Filter `text` against the blocklist for `direction`
    pub fn check(&self, direction: FilterDirection, text: &str) -> Result<String, FilterRejection> {
        if text.is_empty() {
            warn!("Rejected {} filter request: empty text", direction.as_str());
            return Err(FilterRejection::EmptyText);
        }

        let chars = text.chars().count();
        if chars > MAX_TEXT_CHARS {
            if text.contains(MEDIA_MARKER) {
                debug!("Passing through {} chars of media payload unfiltered", chars);
                return Ok(text.to_string());
            }
            warn!(
                "Rejected {} filter request: {} characters exceeds limit of {}",
                direction.as_str(),
                chars,
                MAX_TEXT_CHARS
            );
            return Err(FilterRejection::TooLong {
                chars,
                limit: MAX_TEXT_CHARS,
            });
        }

        let protected = self.whitelist.match_positions(text);
        let replacements = self.blocklist(direction).find_replacements(text, &protected);
        if replacements.is_empty() {
            return Ok(text.to_string());
        }

        debug!(
            "{} filter: {} replacement(s), {} protected span(s)",
            direction.as_str(),
            replacements.len(),
            protected.len()
        );
        Ok(planner::rewrite(text, replacements))
    }

    pub fn check_inbound(&self, text: &str) -> Result<String, FilterRejection> {
        self.check(FilterDirection::Inbound, text)
    }

    pub fn check_outbound(&self, text: &str) -> Result<String, FilterRejection> {
        self.check(FilterDirection::Outbound, text)
    }

    /// Text-in, text-out: a rejection comes back as its description
    pub fn filter(&self, direction: FilterDirection, text: &str) -> String {
        self.check(direction, text)
            .unwrap_or_else(|rejection| rejection.to_string())
    }

    /// Filter content arriving from end users
    pub fn filter_inbound(&self, text: &str) -> String {
        self.filter(FilterDirection::Inbound, text)
    }

    /// Filter content about to be delivered to the platform
    pub fn filter_outbound(&self, text: &str) -> String {
        self.filter(FilterDirection::Outbound, text)
    }

    /// Filter the content and author name of an inbound event in place.
    ///
    /// Does nothing when sanitizing is disabled. Empty fields are left alone.
    pub fn sanitize_inbound(&self, message: &mut InboundMessage) {
        if !self.sanitize_enabled {
            return;
        }
        if !message.content.is_empty() {
            message.content = self.filter_inbound(&message.content);
        }
        if !message.author.is_empty() {
            message.author = self.filter_inbound(&message.author);
        }
    }
}

/// Handle to the current filter service, swappable as a whole.
///
/// Callers take a snapshot and scan without holding the lock.
#[derive(Clone)]
pub struct SharedFilter {
    inner: Arc<RwLock<Arc<FilterService>>>,
}

impl SharedFilter {
    pub fn new(service: FilterService) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(service))),
        }
    }

    pub async fn current(&self) -> Arc<FilterService> {
        self.inner.read().await.clone()
    }

    /// Replace the service; snapshots already taken keep the old one
    pub async fn replace(&self, service: FilterService) {
        *self.inner.write().await = Arc::new(service);
    }
}
