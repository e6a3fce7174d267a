// src/types/mod.rs - Shared types for the content filter and its gateway callers

use serde::{Deserialize, Serialize};

/// A protected (whitelisted) span, inclusive code-point indices into the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether a blocklist match of `match_len` code points ending at `end`
    /// counts as protected by this span.
    ///
    /// Written as a length/endpoint relation: the match must end inside the
    /// span and the span must reach back at least `match_len` code points
    /// from `end`. Since the match starts at `end - match_len + 1`, this is
    /// the same as the match lying inside `[start, end]` of the span.
    pub fn protects(&self, end: usize, match_len: usize) -> bool {
        let reach = end as isize - self.start as isize + 1;
        reach >= match_len as isize && end <= self.end
    }
}

/// A span to be substituted, inclusive code-point indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Replacement {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Which blocklist a piece of text is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterDirection {
    /// Content arriving from end users
    Inbound,
    /// Content the gateway is about to deliver to the platform
    Outbound,
}

impl FilterDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterDirection::Inbound => "inbound",
            FilterDirection::Outbound => "outbound",
        }
    }
}

impl std::str::FromStr for FilterDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" | "inbound" => Ok(FilterDirection::Inbound),
            "out" | "outbound" => Ok(FilterDirection::Outbound),
            other => Err(format!("Unknown filter direction: {}", other)),
        }
    }
}

/// Inbound chat event as handed over by the gateway before dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub platform: String,
    pub channel: String,
    pub author: String,
    pub content: String,
}
