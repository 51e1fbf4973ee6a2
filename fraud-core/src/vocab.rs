//! Vocabulary encoder
//!
//! Builds a word→index mapping from a training corpus and turns text into
//! fixed-length integer sequences. Index 0 is reserved for unknown tokens and padding.
//!
//! Sequences are padded with zeros on the right and truncated from the end, so the
//! first `max_len` tokens of a message are always the ones the classifier sees.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::{FraudError, Result};

/// Index used for padding and out-of-vocabulary tokens
pub const PAD_INDEX: u32 = 0;

/// Split text into lowercased word tokens.
///
/// Tokens are runs of alphanumeric characters; an apostrophe inside a word is kept
/// (`let's` stays one token), leading/trailing apostrophes are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|s| s.trim_matches('\''))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Word → index mapping, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyFile", into = "VocabularyFile")]
pub struct Vocabulary {
    /// Tokens ordered by index (`tokens[i]` has index `i + 1`)
    tokens: Vec<String>,
    index: HashMap<String, u32>,
    max_size: usize,
}

/// On-disk form; the lookup table is rebuilt on load
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VocabularyFile {
    max_size: usize,
    tokens: Vec<String>,
}

impl TryFrom<VocabularyFile> for Vocabulary {
    type Error = FraudError;

    fn try_from(file: VocabularyFile) -> Result<Self> {
        Vocabulary::from_tokens(file.tokens, file.max_size)
    }
}

impl From<Vocabulary> for VocabularyFile {
    fn from(vocab: Vocabulary) -> Self {
        Self {
            max_size: vocab.max_size,
            tokens: vocab.tokens,
        }
    }
}

impl Vocabulary {
    /// Build from a corpus, keeping at most `max_size` tokens.
    ///
    /// Indices are assigned by descending frequency; ties keep first-seen order.
    pub fn build<I, S>(corpus: I, max_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut seen = 0usize;

        for message in corpus {
            for token in tokenize(message.as_ref()) {
                let entry = counts.entry(token).or_insert_with(|| {
                    seen += 1;
                    (0, seen)
                });
                entry.0 += 1;
            }
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(token, (count, first_seen))| (token, count, first_seen))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(max_size);

        let tokens: Vec<String> = ranked.into_iter().map(|(token, _, _)| token).collect();
        let index = Self::index_of(&tokens);

        Self {
            tokens,
            index,
            max_size,
        }
    }

    /// Rebuild from an ordered token list (used when loading artifacts)
    pub fn from_tokens(tokens: Vec<String>, max_size: usize) -> Result<Self> {
        if tokens.len() > max_size {
            return Err(FraudError::IncompatibleArtifact(format!(
                "vocabulary holds {} tokens but cap is {}",
                tokens.len(),
                max_size
            )));
        }

        let index = Self::index_of(&tokens);
        if index.len() != tokens.len() || tokens.iter().any(|t| t.is_empty()) {
            return Err(FraudError::IncompatibleArtifact(
                "vocabulary contains duplicate or empty tokens".to_string(),
            ));
        }

        Ok(Self {
            tokens,
            index,
            max_size,
        })
    }

    fn index_of(tokens: &[String]) -> HashMap<String, u32> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i as u32 + 1))
            .collect()
    }

    /// Index of a token, [`PAD_INDEX`] if unknown
    pub fn lookup(&self, token: &str) -> u32 {
        self.index.get(token).copied().unwrap_or(PAD_INDEX)
    }

    /// Token stored at an index
    pub fn token(&self, index: u32) -> Option<&str> {
        if index == PAD_INDEX {
            return None;
        }
        self.tokens.get(index as usize - 1).map(String::as_str)
    }

    /// Number of real tokens (excluding the reserved index)
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Size of an index space covering every assigned index plus padding
    pub fn index_space(&self) -> usize {
        self.tokens.len() + 1
    }

    /// Stable SHA-256 fingerprint of cap and ordered tokens
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.max_size.to_le_bytes());
        for token in &self.tokens {
            hasher.update(token.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Encode a message to exactly `max_len` indices
    pub fn encode(&self, message: &str, max_len: usize) -> EncodedSequence {
        let mut ids: Vec<u32> = tokenize(message)
            .iter()
            .take(max_len)
            .map(|token| self.lookup(token))
            .collect();
        ids.resize(max_len, PAD_INDEX);
        EncodedSequence(ids)
    }
}

/// Fixed-length integer sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedSequence(Vec<u32>);

impl EncodedSequence {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Known (non-padding) indices, in order
    pub fn known(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied().filter(|&id| id != PAD_INDEX)
    }

    pub fn non_zero_count(&self) -> usize {
        self.known().count()
    }
}

impl From<Vec<u32>> for EncodedSequence {
    fn from(ids: Vec<u32>) -> Self {
        Self(ids)
    }
}
