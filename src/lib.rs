//! # Content Filter for Chat Gateways
//!
//! Multi-pattern text filtering for a chat bridge: every message crossing the
//! gateway is scanned against a blocklist with an Aho-Corasick automaton, and
//! matched phrases are replaced unless a whitelisted phrase covers them.
//!
//! ## Features
//!
//! - **Code-point matching**: patterns and spans are counted in Unicode code
//!   points, never bytes
//! - **Whitelist suppression**: a second automaton marks protected spans that
//!   blocklist matches inside them cannot touch
//! - **Deterministic overlap handling**: overlapping replacements are merged
//!   before a single left-to-right rewrite
//! - **Self-normalizing dictionaries**: `pattern####replacement` files are
//!   rewritten on load so every line names its replacement
//! - **Escape-sequence resistance**: each pattern is also matched in its
//!   `\uXXXX` spelling
//! - **Hot reload**: dictionaries can be rebuilt and swapped in while running
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wordguard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_or_create(std::path::Path::new("config.yml")).await?;
//!     let filter = FilterService::load(&config).await?;
//!
//!     println!("{}", filter.filter_inbound("text from a user"));
//!     println!("{}", filter.filter_outbound("text for the platform"));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod filter;
pub mod types;

// Re-export commonly used items
pub mod prelude {
    pub use crate::config::{load_or_create, FilterConfig};
    pub use crate::filter::automaton::{Automaton, PatternTrie};
    pub use crate::filter::{FilterRejection, FilterService, SharedFilter};
    #[cfg(feature = "hot_reload")]
    pub use crate::filter::watcher::DictionaryWatcher;
    pub use crate::types::{FilterDirection, InboundMessage, Position, Replacement};
    pub use anyhow::Result;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
