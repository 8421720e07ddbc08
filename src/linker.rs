//! Library link placeholders in contract bytecode.
//!
//! solc >= 0.5 reserves `__$<34 hex chars>$__` for each unresolved library,
//! where the hex chars are the start of keccak256 of the library's fully
//! qualified name. Older compilers wrote `__<name>` padded with underscores.
//! Both tokens are 40 characters long, the width of a hex address.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::debug;

use crate::signature::keccak256;

pub const PLACEHOLDER_LEN: usize = 40;
pub const PATTERN_LEN: usize = 34;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPlaceholder {
    /// Exact token found in the bytecode
    pub link_pattern: String,
    pub library_name: String,
}

/// Hash prefix solc derives from a library's fully qualified name
pub fn link_pattern(fully_qualified: &str) -> String {
    let hash = hex::encode(keccak256(fully_qualified.as_bytes()));
    hash[..PATTERN_LEN].to_string()
}

/// `contracts/Math.sol:Math` -> `Math`
pub fn library_short_name(fully_qualified: &str) -> &str {
    fully_qualified.rsplit(':').next().unwrap_or(fully_qualified)
}

/// Known libraries indexed by link pattern
#[derive(Debug, Clone, Default)]
pub struct LibraryCatalogue {
    by_pattern: HashMap<String, String>,
}

impl LibraryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library by plain or fully qualified name
    pub fn insert(&mut self, name: &str) {
        self.by_pattern
            .entry(link_pattern(name))
            .or_insert_with(|| library_short_name(name).to_string());
    }

    pub fn resolve(&self, pattern: &str) -> Option<&str> {
        self.by_pattern.get(&pattern.to_ascii_lowercase()).map(String::as_str)
    }
}

pub struct Linker {
    placeholder: Regex,
}

impl Linker {
    pub fn new() -> Self {
        let placeholder = Regex::new(r"__\$([0-9a-fA-F]{34})\$__|__([A-Za-z0-9_./:\-]{38})")
            .unwrap_or_else(|e| unreachable!("placeholder regex is valid: {}", e));
        Self { placeholder }
    }

    /// Every distinct placeholder in `bytecode`, in order of first occurrence
    pub fn find_placeholders(&self, bytecode: &str, catalogue: &LibraryCatalogue) -> Vec<LibraryPlaceholder> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for captures in self.placeholder.captures_iter(bytecode) {
            let token = &captures[0];
            if !seen.insert(token.to_string()) {
                continue;
            }

            let library_name = if let Some(pattern) = captures.get(1) {
                catalogue
                    .resolve(pattern.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| pattern.as_str().to_string())
            } else {
                let padded = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
                library_short_name(padded.trim_end_matches('_')).to_string()
            };

            debug!("Found library placeholder {} for {}", token, library_name);
            found.push(LibraryPlaceholder {
                link_pattern: token.to_string(),
                library_name,
            });
        }

        found
    }
}

impl Default for Linker {
    fn default() -> Self {
        Self::new()
    }
}
