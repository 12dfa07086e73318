use serde::{Deserialize, Serialize};

/// The source's opaque, monotonically advancing position token (a GTID set
/// string, for example). Parsing is delegated to the log-reader library;
/// the pipeline treats it as an opaque comparable-by-identity string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionToken(String);

impl PositionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for PositionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The physical binlog file name and byte offset; a coarser companion to
/// the position token, carried alongside it on every committed batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileOffset {
    pub file: String,
    pub offset: u64,
}

impl FileOffset {
    pub fn new(file: impl Into<String>, offset: u64) -> Self {
        Self {
            file: file.into(),
            offset,
        }
    }
}

/// A fully-qualified source coordinate: the pairing of position token and
/// file+offset that identifies a prefix of the source's committed history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub token: PositionToken,
    pub file_offset: FileOffset,
}

impl Coordinate {
    pub fn new(token: PositionToken, file: impl Into<String>, offset: u64) -> Self {
        Self {
            token,
            file_offset: FileOffset::new(file, offset),
        }
    }
}
