//! Magic-number signature database
//!
//! The database is a JSON document of ordered entries; each entry is a list
//! of `(offset, hex bytes)` tests that must all match. The first matching
//! entry wins.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::container::inspect_zip;

/// Database shipped with the crate
const BUILTIN_DATABASE: &[u8] = include_bytes!("../../assets/signatures.json");

/// Type reported for zero-length files
pub const EMPTY_FILE_TYPE: &str = "inode/x-empty";

/// How much of a file is inspected for the textual fallback
const TEXT_SNIFF_LEN: usize = 8192;

/// Signature database errors
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid signature database: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid signature bytes for {mime}: {error}")]
    InvalidHex {
        mime: String,
        #[source]
        error: hex::FromHexError,
    },

    #[error("Signature for {0} has no tests")]
    EmptySignature(String),

    #[error("Container inspection failed: {0}")]
    Container(String),
}

#[derive(Debug, Deserialize)]
struct RawDatabase {
    #[serde(default)]
    text_fallback: Option<String>,
    entries: Vec<RawSignature>,
}

#[derive(Debug, Deserialize)]
struct RawSignature {
    mime: String,
    #[serde(default)]
    container: bool,
    tests: Vec<RawTest>,
}

#[derive(Debug, Deserialize)]
struct RawTest {
    offset: usize,
    hex: String,
}

/// One byte test at a fixed offset
#[derive(Debug, Clone)]
struct ByteTest {
    offset: usize,
    bytes: Vec<u8>,
}

impl ByteTest {
    fn matches(&self, header: &[u8]) -> bool {
        header
            .get(self.offset..self.offset + self.bytes.len())
            .map(|window| window == self.bytes.as_slice())
            .unwrap_or(false)
    }

    fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }
}

/// A database entry
#[derive(Debug, Clone)]
pub struct Signature {
    mime: String,
    /// ZIP container that may be refined by container inspection
    container: bool,
    tests: Vec<ByteTest>,
}

impl Signature {
    pub fn mime(&self) -> &str {
        &self.mime
    }

    fn matches(&self, header: &[u8]) -> bool {
        self.tests.iter().all(|test| test.matches(header))
    }
}

/// Loaded signature database
#[derive(Debug, Clone)]
pub struct SignatureDatabase {
    entries: Vec<Signature>,
    text_fallback: Option<String>,
    header_len: usize,
}

impl SignatureDatabase {
    /// Parse a database blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let raw: RawDatabase = serde_json::from_slice(bytes)?;

        let mut entries = Vec::with_capacity(raw.entries.len());
        for entry in raw.entries {
            if entry.tests.is_empty() {
                return Err(SignatureError::EmptySignature(entry.mime));
            }
            let mut tests = Vec::with_capacity(entry.tests.len());
            for test in entry.tests {
                let bytes = hex::decode(&test.hex).map_err(|error| SignatureError::InvalidHex {
                    mime: entry.mime.clone(),
                    error,
                })?;
                tests.push(ByteTest {
                    offset: test.offset,
                    bytes,
                });
            }
            entries.push(Signature {
                mime: entry.mime,
                container: entry.container,
                tests,
            });
        }

        let header_len = entries
            .iter()
            .flat_map(|entry| entry.tests.iter().map(ByteTest::end))
            .max()
            .unwrap_or(0);

        Ok(Self {
            entries,
            text_fallback: raw.text_fallback,
            header_len,
        })
    }

    /// The database embedded in the crate
    pub fn builtin() -> Result<Self, SignatureError> {
        Self::from_bytes(BUILTIN_DATABASE)
    }

    /// Load from `path`, or the builtin database when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, SignatureError> {
        match path {
            Some(path) => {
                let bytes = std::fs::read(path)?;
                Self::from_bytes(&bytes)
            }
            None => Self::builtin(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry matching the given file header
    pub fn match_header(&self, header: &[u8]) -> Option<&Signature> {
        self.entries.iter().find(|entry| entry.matches(header))
    }

    /// Detect the MIME type of a file
    ///
    /// Zero-length files report `EMPTY_FILE_TYPE`.
    pub fn detect(&self, path: &Path) -> Result<Option<String>, SignatureError> {
        Ok(self.lookup(path)?.map(SignatureHit::into_mime))
    }

    /// Like `detect`, but tells magic-number hits from the textual fallback
    pub fn lookup(&self, path: &Path) -> Result<Option<SignatureHit>, SignatureError> {
        let sniff_len = self.header_len.max(TEXT_SNIFF_LEN);
        let mut header = Vec::with_capacity(sniff_len);
        File::open(path)?
            .take(sniff_len as u64)
            .read_to_end(&mut header)?;

        if header.is_empty() {
            return Ok(Some(SignatureHit::Magic(EMPTY_FILE_TYPE.to_string())));
        }

        if let Some(signature) = self.match_header(&header) {
            if signature.container {
                match inspect_zip(path) {
                    Ok(Some(refined)) => return Ok(Some(SignatureHit::Magic(refined))),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(path = %path.display(), "Container inspection failed: {}", e);
                    }
                }
            }
            return Ok(Some(SignatureHit::Magic(signature.mime.clone())));
        }

        if looks_textual(&header) {
            return Ok(self.text_fallback.clone().map(SignatureHit::Text));
        }

        Ok(None)
    }
}

/// Answer of the signature database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureHit {
    /// A magic-number entry matched
    Magic(String),
    /// No entry matched but the header reads as text
    Text(String),
}

impl SignatureHit {
    pub fn mime(&self) -> &str {
        match self {
            SignatureHit::Magic(mime) | SignatureHit::Text(mime) => mime,
        }
    }

    pub fn into_mime(self) -> String {
        match self {
            SignatureHit::Magic(mime) | SignatureHit::Text(mime) => mime,
        }
    }
}

/// Valid UTF-8 without NUL bytes; a multi-byte sequence cut at the end of
/// the sniffing window is tolerated
fn looks_textual(header: &[u8]) -> bool {
    if header.contains(&0) {
        return false;
    }
    match std::str::from_utf8(header) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}
