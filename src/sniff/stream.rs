//! Guess a content type from the first bytes of a stream
//!
//! A small fixed rule set, independent of the signature database, so it
//! still answers when the database could not be loaded.

use std::io::{self, Read};

const PEEK_LEN: usize = 16;

/// Guess a MIME type from the leading bytes of `reader`
pub fn guess_from_stream<R: Read>(reader: &mut R) -> io::Result<Option<&'static str>> {
    let mut buf = [0u8; PEEK_LEN];
    let mut filled = 0;
    while filled < PEEK_LEN {
        let read = reader.read(&mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(guess_from_bytes(&buf[..filled]))
}

fn at(bytes: &[u8], index: usize) -> u8 {
    bytes.get(index).copied().unwrap_or(0xFF)
}

/// Guess a MIME type from a byte prefix
pub fn guess_from_bytes(bytes: &[u8]) -> Option<&'static str> {
    let c = |i: usize| at(bytes, i);

    if bytes.starts_with(&[0xCA, 0xFE, 0xBA, 0xBE]) {
        return Some("application/java-vm");
    }
    if bytes.starts_with(&[0xAC, 0xED]) {
        return Some("application/x-java-serialized-object");
    }

    if c(0) == b'<' {
        if c(1) == b'!' {
            return Some("text/html");
        }
        let lowered: Vec<u8> = bytes.iter().map(u8::to_ascii_lowercase).collect();
        if lowered.starts_with(b"<html")
            || lowered.starts_with(b"<head")
            || lowered.starts_with(b"<body")
        {
            return Some("text/html");
        }
        if bytes.starts_with(b"<?xml") {
            return Some("application/xml");
        }
    }

    // Byte order marks followed by an XML declaration
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) && bytes[3..].starts_with(b"<?xml") {
        return Some("application/xml");
    }
    if bytes.starts_with(&[0xFE, 0xFF, 0x00, b'<', 0x00, b'?', 0x00, b'x']) {
        return Some("application/xml");
    }
    if bytes.starts_with(&[0xFF, 0xFE, b'<', 0x00, b'?', 0x00, b'x', 0x00]) {
        return Some("application/xml");
    }

    if bytes.starts_with(b"GIF8") {
        return Some("image/gif");
    }
    if bytes.starts_with(b"#def") {
        return Some("image/x-bitmap");
    }
    if bytes.starts_with(b"! XPM2") {
        return Some("image/x-pixmap");
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        match c(3) {
            0xE0 | 0xEE => return Some("image/jpeg"),
            0xE1 if bytes.get(6..10) == Some(b"Exif".as_slice()) => return Some("image/jpeg"),
            _ => {}
        }
    }
    if bytes.starts_with(b".snd") || bytes.starts_with(b"dns.") {
        return Some("audio/basic");
    }
    if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WAVE".as_slice()) {
        return Some("audio/x-wav");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup() {
        assert_eq!(guess_from_bytes(b"<!DOCTYPE html>"), Some("text/html"));
        assert_eq!(guess_from_bytes(b"<HTML><BODY>"), Some("text/html"));
        assert_eq!(guess_from_bytes(b"<?xml version="), Some("application/xml"));
        assert_eq!(guess_from_bytes(b"\xEF\xBB\xBF<?xml ver"), Some("application/xml"));
    }

    #[test]
    fn test_images_and_audio() {
        assert_eq!(guess_from_bytes(b"GIF87a"), Some("image/gif"));
        assert_eq!(guess_from_bytes(b"\xFF\xD8\xFF\xE0\0\x10JFIF"), Some("image/jpeg"));
        assert_eq!(guess_from_bytes(b"\xFF\xD8\xFF\xE1\0\x10Exif\0\0"), Some("image/jpeg"));
        assert_eq!(guess_from_bytes(b"RIFF\0\0\0\0WAVEfmt "), Some("audio/x-wav"));
        assert_eq!(guess_from_bytes(b".snd\0\0\0\x18"), Some("audio/basic"));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(guess_from_bytes(b""), None);
        assert_eq!(guess_from_bytes(b"plain words"), None);
        assert_eq!(guess_from_bytes(b"%PDF-1.4"), None);
    }

    #[test]
    fn test_short_reads_are_accumulated() {
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }

        let mut reader = Trickle(b"\x89PNG\r\n\x1a\n\0\0");
        assert_eq!(guess_from_stream(&mut reader).unwrap(), Some("image/png"));
    }
}
