// src/filter/automaton.rs - Aho-Corasick automaton over Unicode code points

use log::debug;
use std::collections::{HashMap, VecDeque};
use std::iter::Enumerate;
use std::str::Chars;

use crate::types::{Position, Replacement};

/// Index of a node inside the automaton's arena
pub type NodeId = usize;

/// The root always lives at arena slot zero
pub const ROOT: NodeId = 0;

/// Data carried by a node where a complete pattern ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    /// Pattern length in code points
    pub length: usize,
    /// Text substituted for the pattern
    pub replacement: String,
}

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<char, NodeId>,
    /// `None` until failure links are built
    fail: Option<NodeId>,
    terminal: Option<Terminal>,
}

/// Mutable trie that patterns are inserted into before the automaton is built
#[derive(Debug, Clone)]
pub struct PatternTrie {
    nodes: Vec<Node>,
    patterns: usize,
}

impl Default for PatternTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            patterns: 0,
        }
    }

    /// Insert `pattern` with its replacement text.
    ///
    /// Matching is exact, code point for code point. Re-inserting a pattern
    /// overwrites its replacement. The empty pattern is ignored since the root
    /// never reports a match.
    pub fn insert(&mut self, pattern: &str, replacement: &str) {
        let mut node = ROOT;
        let mut length = 0;

        for ch in pattern.chars() {
            node = match self.nodes[node].children.get(&ch) {
                Some(&next) => next,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[node].children.insert(ch, id);
                    id
                }
            };
            length += 1;
        }

        if length == 0 {
            return;
        }

        let slot = &mut self.nodes[node].terminal;
        if slot.is_none() {
            self.patterns += 1;
        }
        *slot = Some(Terminal {
            length,
            replacement: replacement.to_string(),
        });
    }

    /// Number of distinct patterns stored
    pub fn len(&self) -> usize {
        self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns == 0
    }

    /// Compute failure links and freeze the trie into a scannable automaton
    pub fn build(mut self) -> Automaton {
        self.build_fail_pointers();
        Automaton {
            nodes: self.nodes,
            patterns: self.patterns,
        }
    }

    /// Breadth-first pass: every child's failure link points at the longest
    /// proper suffix of its path that is also a path from the root.
    fn build_fail_pointers(&mut self) {
        self.nodes[ROOT].fail = Some(ROOT);
        let mut queue = VecDeque::from([ROOT]);

        while let Some(current) = queue.pop_front() {
            let children: Vec<(char, NodeId)> = self.nodes[current]
                .children
                .iter()
                .map(|(&ch, &id)| (ch, id))
                .collect();

            for (ch, child) in children {
                let fail = if current == ROOT {
                    ROOT
                } else {
                    // BFS order guarantees `current` already has its link
                    let mut probe = self.nodes[current].fail.unwrap_or(ROOT);
                    loop {
                        if let Some(&next) = self.nodes[probe].children.get(&ch) {
                            break next;
                        }
                        if probe == ROOT {
                            break ROOT;
                        }
                        probe = self.nodes[probe].fail.unwrap_or(ROOT);
                    }
                };
                self.nodes[child].fail = Some(fail);
                queue.push_back(child);
            }
        }
    }
}

/// A built automaton. Immutable; safe to share across threads for scanning.
#[derive(Debug, Clone)]
pub struct Automaton {
    nodes: Vec<Node>,
    patterns: usize,
}

impl Default for Automaton {
    fn default() -> Self {
        PatternTrie::new().build()
    }
}

/// One dictionary pattern ending at `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub end: usize,
    pub terminal: &'a Terminal,
}

impl Match<'_> {
    pub fn start(&self) -> usize {
        self.end + 1 - self.terminal.length
    }
}

impl Automaton {
    /// Build an automaton from `(pattern, replacement)` pairs
    pub fn from_patterns<'p, I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = (&'p str, &'p str)>,
    {
        let mut trie = PatternTrie::new();
        for (pattern, replacement) in patterns {
            trie.insert(pattern, replacement);
        }
        trie.build()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Failure link of `id`, `None` if the id is out of range
    pub fn fail_link(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.fail)
    }

    /// Stream `text` through the automaton, reporting every pattern that ends
    /// at each position. At a single position matches come longest first.
    pub fn scan<'a>(&'a self, text: &'a str) -> Scan<'a> {
        Scan {
            automaton: self,
            chars: text.chars().enumerate(),
            state: ROOT,
            chain: None,
        }
    }

    /// Spans of every match in `text`, used as protected spans when this
    /// automaton is a whitelist
    pub fn match_positions(&self, text: &str) -> Vec<Position> {
        self.scan(text)
            .map(|m| Position::new(m.start(), m.end))
            .collect()
    }

    /// Blocklist scan with whitelist suppression.
    ///
    /// At each position the longest match not covered by a protected span is
    /// recorded and shorter matches ending there are skipped. A position
    /// where every match is protected records nothing.
    pub fn find_replacements(&self, text: &str, protected: &[Position]) -> Vec<Replacement> {
        let mut state = ROOT;
        let mut replacements = Vec::new();

        for (i, ch) in text.chars().enumerate() {
            state = self.step(state, ch);

            let chosen = self
                .outputs(state)
                .find(|terminal| !protected.iter().any(|pos| pos.protects(i, terminal.length)));

            if let Some(terminal) = chosen {
                let start = i + 1 - terminal.length;
                debug!("Blocked span [{}, {}] -> {:?}", start, i, terminal.replacement);
                replacements.push(Replacement::new(start, i, terminal.replacement.clone()));
            }
        }

        replacements
    }

    fn step(&self, mut state: NodeId, ch: char) -> NodeId {
        loop {
            if let Some(&next) = self.nodes[state].children.get(&ch) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.nodes[state].fail.unwrap_or(ROOT);
        }
    }

    /// Terminals on the failure chain of `state`, deepest first
    fn outputs(&self, state: NodeId) -> impl Iterator<Item = &Terminal> + '_ {
        std::iter::successors(Some(state), move |&id| self.nodes[id].fail)
            .take_while(|&id| id != ROOT)
            .filter_map(move |id| self.nodes[id].terminal.as_ref())
    }
}

/// Iterator returned by [`Automaton::scan`]
pub struct Scan<'a> {
    automaton: &'a Automaton,
    chars: Enumerate<Chars<'a>>,
    state: NodeId,
    /// Position and node still to be walked on the current failure chain
    chain: Option<(usize, NodeId)>,
}

impl<'a> Iterator for Scan<'a> {
    type Item = Match<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((end, id)) = self.chain.take() {
                if id != ROOT {
                    let node = &self.automaton.nodes[id];
                    self.chain = node.fail.map(|fail| (end, fail));
                    if let Some(terminal) = node.terminal.as_ref() {
                        return Some(Match { end, terminal });
                    }
                    continue;
                }
            }

            let (i, ch) = self.chars.next()?;
            self.state = self.automaton.step(self.state, ch);
            self.chain = Some((i, self.state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> Automaton {
        Automaton::from_patterns([("he", "1"), ("she", "2"), ("his", "3"), ("hers", "4")])
    }

    #[test]
    fn test_insert_counts_distinct_patterns() {
        let mut trie = PatternTrie::new();
        trie.insert("abc", "x");
        trie.insert("ab", "y");
        trie.insert("abc", "z");
        trie.insert("", "ignored");
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn test_reinsert_last_replacement_wins() {
        let automaton = Automaton::from_patterns([("abc", "first"), ("abc", "second")]);
        let matches: Vec<_> = automaton.scan("abc").collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].terminal.replacement, "second");
    }

    #[test]
    fn test_fail_links_unset_before_build() {
        let mut trie = PatternTrie::new();
        trie.insert("abc", "x");
        assert!(trie.nodes.iter().all(|node| node.fail.is_none()));
    }

    #[test]
    fn test_every_node_has_fail_link_after_build() {
        let automaton = classic();
        assert!(automaton.node_count() > 1);
        for id in 0..automaton.node_count() {
            assert!(automaton.fail_link(id).is_some(), "node {} has no failure link", id);
        }
        assert_eq!(automaton.fail_link(ROOT), Some(ROOT));
    }

    #[test]
    fn test_fail_link_points_to_longest_suffix() {
        let automaton = classic();
        let she = "she".chars().fold(ROOT, |state, ch| automaton.step(state, ch));
        let he = "he".chars().fold(ROOT, |state, ch| automaton.step(state, ch));
        assert_eq!(automaton.fail_link(she), Some(he));
    }

    #[test]
    fn test_scan_reports_nested_matches_longest_first() {
        let automaton = classic();
        let found: Vec<(usize, usize, &str)> = automaton
            .scan("ushers")
            .map(|m| (m.start(), m.end, m.terminal.replacement.as_str()))
            .collect();
        assert_eq!(found, vec![(1, 3, "2"), (2, 3, "1"), (2, 5, "4")]);
    }

    #[test]
    fn test_scan_counts_code_points_not_bytes() {
        let automaton = Automaton::from_patterns([("敏感", "**")]);
        let found: Vec<_> = automaton.scan("这是敏感词").map(|m| (m.start(), m.end)).collect();
        assert_eq!(found, vec![(2, 3)]);
    }

    #[test]
    fn test_empty_automaton_never_matches() {
        let automaton = Automaton::default();
        assert_eq!(automaton.scan("anything at all").count(), 0);
        assert!(automaton.find_replacements("anything", &[]).is_empty());
    }

    #[test]
    fn test_find_replacements_prefers_longest_unprotected() {
        let automaton = Automaton::from_patterns([("bad", "B"), ("verybad", "V")]);
        let found = automaton.find_replacements("so verybad", &[]);
        assert_eq!(found, vec![Replacement::new(3, 9, "V")]);
    }

    #[test]
    fn test_find_replacements_respects_protected_spans() {
        let automaton = Automaton::from_patterns([("bad", "B"), ("verybad", "V")]);
        // A span covering "verybad" also covers its suffix "bad".
        let protected = [Position::new(3, 9)];
        assert!(automaton.find_replacements("so verybad", &protected).is_empty());

        // Protect only "very": "verybad" now ends outside, so it wins.
        let protected = [Position::new(3, 6)];
        assert_eq!(
            automaton.find_replacements("so verybad", &protected),
            vec![Replacement::new(3, 9, "V")]
        );
    }

    #[test]
    fn test_whitelist_containment_is_endpoint_and_length_relation() {
        // Blocklist match starting before the whitelisted span is not protected.
        let blocklist = Automaton::from_patterns([("akey", "X")]);
        let whitelist = Automaton::from_patterns([("key", "")]);
        let text = "akey";
        let protected = whitelist.match_positions(text);
        assert_eq!(protected, vec![Position::new(1, 3)]);
        assert_eq!(
            blocklist.find_replacements(text, &protected),
            vec![Replacement::new(0, 3, "X")]
        );

        // Blocklist match ending after the whitelisted span is not protected.
        let blocklist = Automaton::from_patterns([("keys", "X")]);
        let protected = whitelist.match_positions("keys");
        assert_eq!(
            blocklist.find_replacements("keys", &protected),
            vec![Replacement::new(0, 3, "X")]
        );

        // Exactly the whitelisted span is protected.
        let blocklist = Automaton::from_patterns([("key", "X")]);
        let protected = whitelist.match_positions("key");
        assert!(blocklist.find_replacements("key", &protected).is_empty());
    }
}
