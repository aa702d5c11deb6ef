//! Operation tags recorded in the history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The tool operation that produced a history entry.
///
/// The known set is closed. Tags read back from storage that fall outside it
/// are kept verbatim in [`Operation::Other`] so they still round-trip and only
/// affect how the entry is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    Merge,
    Split,
    Compress,
    Convert,
    Ocr,
    Reorder,
    Delete,
    /// Unrecognized tag.
    Other(String),
}

impl Operation {
    /// Every known operation, in the order the history screen lists them.
    pub const ALL: [Operation; 7] = [
        Operation::Merge,
        Operation::Split,
        Operation::Compress,
        Operation::Convert,
        Operation::Ocr,
        Operation::Reorder,
        Operation::Delete,
    ];

    /// The tag stored in the `history.operation` column.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Merge => "merge",
            Self::Split => "split",
            Self::Compress => "compress",
            Self::Convert => "convert",
            Self::Ocr => "ocr",
            Self::Reorder => "reorder",
            Self::Delete => "delete",
            Self::Other(tag) => tag,
        }
    }

    /// Whether this is one of the known operations.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for Operation {
    fn from(tag: &str) -> Self {
        match tag {
            "merge" => Self::Merge,
            "split" => Self::Split,
            "compress" => Self::Compress,
            "convert" => Self::Convert,
            "ocr" => Self::Ocr,
            "reorder" => Self::Reorder,
            "delete" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Operation {
    fn from(tag: String) -> Self {
        match Operation::from(tag.as_str()) {
            Self::Other(_) => Self::Other(tag),
            known => known,
        }
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Operation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Operation::from(s))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
