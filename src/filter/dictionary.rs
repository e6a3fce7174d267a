// src/filter/dictionary.rs - Dictionary parsing, normalization and loading

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::automaton::{Automaton, PatternTrie};

/// Separates a pattern from its replacement on a dictionary line
pub const DELIMITER: &str = "####";

/// One usable pattern from a dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub pattern: String,
    pub replacement: String,
}

/// A dictionary after every line has been made explicit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedDictionary {
    pub entries: Vec<DictionaryEntry>,
    /// Lines as they will be written back, in source order
    pub lines: Vec<String>,
    /// How many lines gained the default replacement
    pub rewritten: usize,
}

impl NormalizedDictionary {
    /// File contents for the normalized dictionary, one line per entry
    pub fn to_file_contents(&self) -> String {
        let mut contents = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            contents.push_str(line);
            contents.push('\n');
        }
        contents
    }

    /// Build an automaton holding every entry and its escaped variant
    pub fn build_automaton(&self) -> Automaton {
        let mut trie = PatternTrie::new();
        insert_entries(&mut trie, &self.entries);
        trie.build()
    }
}

/// Normalize dictionary source text.
///
/// Each line is `pattern####replacement`. A line without a replacement, or
/// with an empty one, is rewritten to carry `default_replacement`. Empty
/// lines are kept as they are and contribute no pattern.
pub fn normalize(source: &str, default_replacement: &str) -> NormalizedDictionary {
    let mut dictionary = NormalizedDictionary::default();

    for line in source.lines() {
        // Blank lines survive the write-back untouched and add no pattern
        if line.is_empty() {
            dictionary.lines.push(String::new());
            continue;
        }

        let mut parts = line.split(DELIMITER);
        let pattern = parts.next().unwrap_or_default();
        let replacement = match parts.next() {
            Some(replacement) if !replacement.is_empty() => {
                dictionary.lines.push(line.to_string());
                replacement
            }
            _ => {
                dictionary
                    .lines
                    .push(format!("{}{}{}", pattern, DELIMITER, default_replacement));
                dictionary.rewritten += 1;
                default_replacement
            }
        };

        if !pattern.is_empty() {
            dictionary.entries.push(DictionaryEntry {
                pattern: pattern.to_string(),
                replacement: replacement.to_string(),
            });
        }
    }

    dictionary
}

/// Encode every UTF-16 code unit of `pattern` as a `\uXXXX` escape
pub fn escape_utf16(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() * 6);
    for unit in pattern.encode_utf16() {
        let _ = write!(escaped, "\\u{:04x}", unit);
    }
    escaped
}

/// Insert each entry twice: literally and as its escaped encoding
pub fn insert_entries(trie: &mut PatternTrie, entries: &[DictionaryEntry]) {
    for entry in entries {
        trie.insert(&entry.pattern, &entry.replacement);
        trie.insert(&escape_utf16(&entry.pattern), &entry.replacement);
    }
}

/// A dictionary file loaded into an automaton
#[derive(Debug, Clone)]
pub struct LoadedDictionary {
    pub path: PathBuf,
    pub automaton: Automaton,
    /// Exactly what was written back to `path`
    pub contents: String,
}

/// Load a dictionary file into a fresh automaton.
///
/// A missing file is created empty first. After the automaton is built the
/// normalized dictionary is written back over the file, so loading always
/// rewrites it; edits made to the file during the load are lost.
pub async fn load_dictionary_file(path: &Path, default_replacement: &str) -> Result<LoadedDictionary> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dictionary directory {}", parent.display()))?;
        }
        fs::write(path, "")
            .await
            .with_context(|| format!("Failed to create dictionary {}", path.display()))?;
        warn!("Dictionary {} not found, created an empty one", path.display());
    }

    let source = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read dictionary {}", path.display()))?;

    let dictionary = normalize(&source, default_replacement);
    let automaton = dictionary.build_automaton();

    let contents = dictionary.to_file_contents();
    fs::write(path, &contents)
        .await
        .with_context(|| format!("Failed to write back dictionary {}", path.display()))?;

    if dictionary.rewritten > 0 {
        debug!(
            "Normalized {} line(s) of {} with the default replacement",
            dictionary.rewritten,
            path.display()
        );
    }
    info!(
        "Loaded {} pattern(s) from {} ({} automaton nodes)",
        dictionary.entries.len(),
        path.display(),
        automaton.node_count()
    );

    Ok(LoadedDictionary {
        path: path.to_path_buf(),
        automaton,
        contents,
    })
}
