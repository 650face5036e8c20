use crate::cmdset::CmdSet;
use crate::command::CommandKind;

use std::collections::{BTreeMap, HashSet};

/// One auto-generated help entry.
#[derive(Debug, Clone)]
pub struct HelpEntry {
    pub key: String,
    pub aliases: Vec<String>,
    pub category: String,
    pub text: String,
}

/// Help index synthesized from an aggregated cmdset.
///
/// System commands and commands with auto-help disabled are skipped. When
/// a merged set carries duplicate keys, the winning (earlier) command is
/// the one documented.
#[derive(Debug, Default)]
pub struct HelpIndex {
    categories: BTreeMap<String, Vec<HelpEntry>>,
}

impl HelpIndex {
    pub fn build(set: &CmdSet) -> Self {
        let mut categories: BTreeMap<String, Vec<HelpEntry>> = BTreeMap::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for cmd in set.iter() {
            if cmd.kind() == CommandKind::System || !cmd.auto_help() {
                continue;
            }
            if !seen.insert(cmd.key()) {
                continue;
            }
            categories
                .entry(cmd.category().to_string())
                .or_default()
                .push(HelpEntry {
                    key: cmd.key().to_string(),
                    aliases: cmd.aliases().to_vec(),
                    category: cmd.category().to_string(),
                    text: cmd.doc().to_string(),
                });
        }

        for entries in categories.values_mut() {
            entries.sort_by(|a, b| a.key.cmp(&b.key));
        }

        Self { categories }
    }

    /// Category names, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Entries in one category, sorted by key.
    pub fn entries(&self, category: &str) -> &[HelpEntry] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up an entry by key or alias.
    pub fn find(&self, name: &str) -> Option<&HelpEntry> {
        let name = name.to_lowercase();
        self.categories.values().flatten().find(|entry| {
            entry.key == name || entry.aliases.iter().any(|a| *a == name)
        })
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
