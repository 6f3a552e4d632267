//! Static extension <-> MIME table
//!
//! The first row for a MIME type names its canonical extension.

const TABLE: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    // OpenDocument
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ott", "application/vnd.oasis.opendocument.text-template"),
    ("fodt", "application/vnd.oasis.opendocument.text-flat-xml"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("ots", "application/vnd.oasis.opendocument.spreadsheet-template"),
    ("fods", "application/vnd.oasis.opendocument.spreadsheet-flat-xml"),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("otp", "application/vnd.oasis.opendocument.presentation-template"),
    ("fodp", "application/vnd.oasis.opendocument.presentation-flat-xml"),
    ("odg", "application/vnd.oasis.opendocument.graphics"),
    ("otg", "application/vnd.oasis.opendocument.graphics-template"),
    ("fodg", "application/vnd.oasis.opendocument.graphics-flat-xml"),
    // Office Open XML
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    // Legacy office
    ("doc", "application/msword"),
    ("xls", "application/vnd.ms-excel"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("rtf", "application/rtf"),
    ("pages", "application/x-iwork-pages-sffpages"),
    ("numbers", "application/x-iwork-numbers-sffnumbers"),
    ("key", "application/x-iwork-keynote-sffkey"),
    // Text
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xml", "text/xml"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("ics", "text/calendar"),
    ("vcf", "text/vcard"),
    ("md", "text/markdown"),
    // Images
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("svg", "image/svg+xml"),
    ("psd", "image/vnd.adobe.photoshop"),
    ("djvu", "image/vnd.djvu"),
    ("tga", "image/x-tga"),
    ("dxf", "image/vnd.dxf"),
    // Audio / video
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("wav", "audio/x-wav"),
    ("amr", "audio/amr"),
    ("mp4", "video/mp4"),
    ("3gp", "video/3gpp"),
    ("webm", "video/webm"),
    // Archives
    ("epub", "application/epub+zip"),
    ("zip", "application/zip"),
    ("ps", "application/postscript"),
    ("eps", "application/postscript"),
];

/// Strip parameters (`; charset=...`) and normalize case
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// MIME type registered for an extension
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// Canonical extension for a MIME type
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = essence(mime);
    TABLE
        .iter()
        .find(|(_, candidate)| *candidate == mime)
        .map(|(ext, _)| *ext)
}
