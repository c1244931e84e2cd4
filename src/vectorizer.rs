// Bag-of-words counting — vocabulary construction and aggregate term counts.
//
// This is the counting collaborator of the semantic aggregator. It builds a
// fixed vocabulary (term -> stable index) from a training corpus and produces
// one aggregate occurrence count per vocabulary term. Per-document counts are
// never retained — the aggregator only cares about corpus-wide totals.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use regex_lite::Regex;
use tracing::info;

/// Configuration passed through to the counting stage.
///
/// Mirrors the usual bag-of-words vectorizer knobs: lowercasing, the token
/// pattern, stop words, n-gram range, and document-frequency filtering.
#[derive(Debug, Clone)]
pub struct VectorizerConfig {
    /// Lowercase documents before tokenizing.
    pub lowercase: bool,
    /// Regex matched repeatedly against each document to extract tokens.
    /// The default keeps word runs of two or more characters.
    pub token_pattern: String,
    /// Tokens dropped before counting. Empty by default — the CLI injects
    /// an English stop word list, the library stays language-neutral.
    pub stop_words: Vec<String>,
    /// Inclusive n-gram range. (1, 1) means unigrams only; n-grams are
    /// joined with a single space, e.g. "buy shoes".
    pub ngram_range: (usize, usize),
    /// Drop terms appearing in fewer than this many documents.
    pub min_df: usize,
    /// Drop terms appearing in more than this fraction of documents.
    pub max_df: f64,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            token_pattern: "[A-Za-z0-9_]{2,}".to_string(),
            stop_words: Vec::new(),
            ngram_range: (1, 1),
            min_df: 1,
            max_df: 1.0,
        }
    }
}

/// Bag-of-words counter with a fixed, fit-once vocabulary.
///
/// Vocabulary iteration order is first-encounter order across the training
/// corpus — deterministic for a given corpus, but not sorted.
pub struct CountVectorizer {
    config: VectorizerConfig,
    token_re: Regex,
    stop_words: HashSet<String>,
    /// term -> index; empty until `fit` has run.
    vocabulary: HashMap<String, usize>,
    /// index -> term, in vocabulary order.
    terms: Vec<String>,
}

impl CountVectorizer {
    /// Build a vectorizer from config. Fails on an invalid token pattern,
    /// an invalid n-gram range, or document-frequency bounds out of range.
    pub fn new(config: VectorizerConfig) -> Result<Self> {
        let (min_n, max_n) = config.ngram_range;
        if min_n == 0 || min_n > max_n {
            anyhow::bail!("Invalid ngram_range ({min_n}, {max_n}): need 1 <= min <= max");
        }
        if config.min_df == 0 {
            anyhow::bail!("min_df must be at least 1");
        }
        if config.max_df <= 0.0 || config.max_df > 1.0 {
            anyhow::bail!(
                "max_df must be in (0, 1], got {}",
                config.max_df
            );
        }

        let token_re = Regex::new(&config.token_pattern)
            .with_context(|| format!("Invalid token pattern: {}", config.token_pattern))?;

        let stop_words: HashSet<String> = config.stop_words.iter().cloned().collect();

        Ok(Self {
            config,
            token_re,
            stop_words,
            vocabulary: HashMap::new(),
            terms: Vec::new(),
        })
    }

    /// Whether `fit` has produced a vocabulary.
    pub fn is_fitted(&self) -> bool {
        !self.terms.is_empty()
    }

    /// The fitted vocabulary in index order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Extract the terms of one document: tokenize, drop stop words,
    /// expand to the configured n-gram range.
    fn analyze(&self, document: &str) -> Vec<String> {
        let text = if self.config.lowercase {
            document.to_lowercase()
        } else {
            document.to_string()
        };

        let tokens: Vec<&str> = self
            .token_re
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .collect();

        let (min_n, max_n) = self.config.ngram_range;
        if min_n == 1 && max_n == 1 {
            return tokens.into_iter().map(str::to_string).collect();
        }

        let mut out = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                out.push(window.join(" "));
            }
        }
        out
    }

    /// Build the vocabulary from a training corpus.
    ///
    /// Terms enter the vocabulary in first-encounter order, then document
    /// frequency filtering (min_df / max_df) is applied and surviving terms
    /// are re-indexed in the same relative order. Refitting replaces any
    /// previous vocabulary wholesale.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        if documents.is_empty() {
            anyhow::bail!("Cannot fit on an empty corpus — no documents given");
        }

        // First-encounter order plus per-term document frequency.
        let mut order: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let doc_terms = self.analyze(doc);
            let unique: HashSet<&String> = doc_terms.iter().collect();
            for term in &doc_terms {
                if seen.insert(term.clone()) {
                    order.push(term.clone());
                }
            }
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let n_docs = documents.len();
        let max_count = self.config.max_df * n_docs as f64;

        let mut terms = Vec::new();
        let mut vocabulary = HashMap::new();
        for term in order {
            let df = doc_freq.get(&term).copied().unwrap_or(0);
            if df < self.config.min_df || df as f64 > max_count {
                continue;
            }
            vocabulary.insert(term.clone(), terms.len());
            terms.push(term);
        }

        if terms.is_empty() {
            anyhow::bail!(
                "Corpus of {n_docs} documents produced an empty vocabulary — \
                 documents may be empty or fully filtered"
            );
        }

        info!(
            documents = n_docs,
            vocabulary = terms.len(),
            "Fitted vocabulary"
        );

        self.vocabulary = vocabulary;
        self.terms = terms;
        Ok(())
    }

    /// Aggregate occurrence count per vocabulary term across the given
    /// documents. Tokens outside the fitted vocabulary are ignored.
    pub fn counts(&self, documents: &[String]) -> Result<Vec<u64>> {
        if !self.is_fitted() {
            anyhow::bail!("Vectorizer is not fitted — call fit() first");
        }

        let mut counts = vec![0u64; self.terms.len()];
        for doc in documents {
            for term in self.analyze(doc) {
                if let Some(&idx) = self.vocabulary.get(&term) {
                    counts[idx] += 1;
                }
            }
        }
        Ok(counts)
    }

    /// Fit the vocabulary and count in one pass over the corpus.
    pub fn fit_counts(&mut self, documents: &[String]) -> Result<Vec<u64>> {
        self.fit(documents)?;
        self.counts(documents)
    }
}
