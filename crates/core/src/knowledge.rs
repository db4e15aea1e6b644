//! Clinic knowledge lookup behind a narrow trait.
//!
//! Index construction and storage are external concerns; the executor only
//! ever asks for the best snippets for a query.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use std::path::Path;

/// Read-only retrieval interface used by the information tool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Returns up to `top_k` snippets, most relevant first.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>>;
}

/// In-memory snippet index ranked by fuzzy matching.
///
/// Snippets are loaded once at startup from a plain-text file with `###`
/// separator lines between entries.
pub struct SnippetIndex {
    snippets: Vec<String>,
    matcher: SkimMatcherV2,
}

impl SnippetIndex {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge file {}", path.display()))?;
        Ok(Self::from_text(&text))
    }

    pub fn from_text(text: &str) -> Self {
        let snippets = text
            .split("###")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            snippets,
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}

#[async_trait]
impl KnowledgeBase for SnippetIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let mut scored: Vec<(i64, &String)> = self
            .snippets
            .iter()
            .filter_map(|snippet| {
                self.matcher
                    .fuzzy_match(snippet, query)
                    .map(|score| (score, snippet))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, snippet)| snippet.clone())
            .collect())
    }
}
