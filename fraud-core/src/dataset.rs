//! Labelled training data
//!
//! Two columns per line: label and message text. Both `label<TAB>message`
//! (SMS Spam Collection layout) and `label,message` (CSV export) are accepted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{FraudError, Result};

/// Binary class of a training example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    /// Numeric target used by the classifier
    pub fn target(&self) -> f64 {
        match self {
            Label::Ham => 0.0,
            Label::Spam => 1.0,
        }
    }
}

impl FromStr for Label {
    type Err = FraudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "spam" | "fraud" | "1" => Ok(Label::Spam),
            "ham" | "legitimate" | "0" => Ok(Label::Ham),
            other => Err(FraudError::Dataset(format!("unknown label '{}'", other))),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Ham => f.write_str("ham"),
            Label::Spam => f.write_str("spam"),
        }
    }
}

/// One labelled message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub label: Label,
    pub message: String,
}

impl Example {
    pub fn new(label: Label, message: impl Into<String>) -> Self {
        Self {
            label,
            message: message.into(),
        }
    }
}

/// In-memory training corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    examples: Vec<Example>,
}

impl Dataset {
    pub fn new(examples: Vec<Example>) -> Self {
        Self { examples }
    }

    /// Read a dataset file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FraudError::Dataset(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse dataset text
    pub fn parse(content: &str) -> Result<Self> {
        let mut examples = Vec::new();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let (label, message) = split_record(line).ok_or_else(|| {
                FraudError::Dataset(format!("line {}: expected two columns", lineno + 1))
            })?;

            // Header row of CSV exports
            if lineno == 0 && label.trim().eq_ignore_ascii_case("label") {
                continue;
            }

            let label = label.parse::<Label>().map_err(|_| {
                FraudError::Dataset(format!(
                    "line {}: unknown label '{}'",
                    lineno + 1,
                    label.trim()
                ))
            })?;

            examples.push(Example {
                label,
                message: unquote(message),
            });
        }

        Ok(Self { examples })
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// (spam, ham) counts
    pub fn counts(&self) -> (usize, usize) {
        let spam = self
            .examples
            .iter()
            .filter(|e| e.label == Label::Spam)
            .count();
        (spam, self.examples.len() - spam)
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.examples.iter().map(|e| e.message.as_str())
    }

    pub fn labels(&self) -> Vec<Label> {
        self.examples.iter().map(|e| e.label).collect()
    }
}

impl FromIterator<(Label, String)> for Dataset {
    fn from_iter<T: IntoIterator<Item = (Label, String)>>(iter: T) -> Self {
        Self {
            examples: iter
                .into_iter()
                .map(|(label, message)| Example { label, message })
                .collect(),
        }
    }
}

fn split_record(line: &str) -> Option<(&str, &str)> {
    line.split_once('\t').or_else(|| line.split_once(','))
}

fn unquote(field: &str) -> String {
    let trimmed = field.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}
