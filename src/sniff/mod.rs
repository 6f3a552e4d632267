//! MIME type detection
//!
//! Layers, first answer wins:
//!
//! 1. Magic-number signature database (with ZIP container probing)
//! 2. Type declared by the content resolver
//! 3. Guess from the file name
//! 4. Guess from the first bytes of the stream
//! 5. Static extension table
//!
//! The database's plain-text fallback is the one soft answer: layers 2 and 3
//! may replace it with a more specific textual type.

mod container;
mod mime_table;
mod signature;
mod sniffer;
mod stream;

pub use container::inspect_zip;
pub use mime_table::{extension_for_mime, mime_for_extension};
pub use signature::{
    Signature, SignatureDatabase, SignatureError, SignatureHit, EMPTY_FILE_TYPE,
};
pub use sniffer::{Detection, SniffLayer, SniffRequest, TypeSniffer};
pub use stream::{guess_from_bytes, guess_from_stream};

#[cfg(test)]
pub(crate) use container::fixtures;
