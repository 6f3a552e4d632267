//! ZIP container inspection
//!
//! OpenDocument, EPUB and Office Open XML files are all ZIP archives. A
//! generic ZIP signature hit is refined here by looking inside the archive.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use super::signature::SignatureError;

/// Longest `mimetype` entry we are willing to read
const MAX_MIMETYPE_LEN: u64 = 256;

const OOXML_PARTS: &[(&str, &str)] = &[
    (
        "word/",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (
        "xl/",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    (
        "ppt/",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
];

/// More specific type of a ZIP-based document, if recognizable
pub fn inspect_zip(path: &Path) -> Result<Option<String>, SignatureError> {
    let file = File::open(path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| SignatureError::Container(e.to_string()))?;

    // ODF and EPUB store their type in a leading `mimetype` entry
    if let Ok(entry) = archive.by_name("mimetype") {
        let mut declared = String::new();
        entry
            .take(MAX_MIMETYPE_LEN)
            .read_to_string(&mut declared)?;
        let declared = declared.trim();
        if declared.contains('/') && !declared.contains(char::is_whitespace) {
            return Ok(Some(declared.to_string()));
        }
    }

    let has_content_types = archive.file_names().any(|name| name == "[Content_Types].xml");
    if !has_content_types {
        return Ok(None);
    }

    for (prefix, mime) in OOXML_PARTS {
        if archive.file_names().any(|name| name.starts_with(prefix)) {
            return Ok(Some(mime.to_string()));
        }
    }

    Ok(None)
}


#[cfg(test)]
mod tests {
    use super::fixtures::write_zip;
    use super::*;

    #[test]
    fn test_inspect_opendocument() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.odt");
        write_zip(
            &path,
            &[
                ("mimetype", "application/vnd.oasis.opendocument.text"),
                ("content.xml", "<office:document-content/>"),
            ],
        );

        assert_eq!(
            inspect_zip(&path).unwrap().as_deref(),
            Some("application/vnd.oasis.opendocument.text")
        );
    }

    #[test]
    fn test_inspect_ooxml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.xlsx");
        write_zip(
            &path,
            &[
                ("[Content_Types].xml", "<Types/>"),
                ("xl/workbook.xml", "<workbook/>"),
            ],
        );

        assert_eq!(
            inspect_zip(&path).unwrap().as_deref(),
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
        );
    }

    #[test]
    fn test_inspect_plain_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        write_zip(&path, &[("readme.txt", "hello")]);

        assert_eq!(inspect_zip(&path).unwrap(), None);
    }

    #[test]
    fn test_inspect_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"PK\x03\x04 not really a zip").unwrap();

        assert!(inspect_zip(&path).is_err());
    }
}
