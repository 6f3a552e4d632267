//! Remote eligibility policy
//!
//! Prefix classifier deciding which types may be escalated to a cloud
//! viewer. The first whitelist prefix that matches is authoritative; the
//! blacklist is consulted only once a whitelist prefix has matched.

/// Types the cloud viewers can display, by prefix, in priority order
pub const MIME_WHITELIST: &[&str] = &[
    "text/",
    "image/",
    "video/",
    "audio/",
    // markup
    "application/json",
    "application/xml",
    "text/css",
    "application/css-stylesheet",
    "application/xhtml",
    "application/x-httpd-php",
    "text/php",
    "application/php",
    "application/x-php",
    "application/x-javascript",
    "text/javascript",
    "text/x-java-source",
    "text/java",
    "text/x-java",
    "application/ms-java",
    "application/rtf",
    // photoshop
    "image/photoshop",
    "image/x-photoshop",
    "image/psd",
    "application/photoshop",
    "application/psd",
    "zz-application/zz-winassoc-psd",
    // pdf
    "application/pdf",
    "application/x-pdf",
    "application/acrobat",
    "applications/vnd.pdf",
    "text/pdf",
    "text/x-pdf",
    // opendocument
    "application/vnd.oasis.opendocument",
    "application/x-vnd.oasis.opendocument",
    // office open xml
    "application/vnd.openxmlformats-officedocument",
    // word
    "application/msword",
    "application/doc",
    "appl/text",
    "application/vnd.msword",
    "application/vnd.ms-word",
    "application/winword",
    "application/word",
    "application/x-msw6",
    "application/x-msword",
    // excel
    "application/vnd.ms-excel",
    "application/msexcel",
    "application/x-msexcel",
    "application/x-ms-excel",
    "application/x-excel",
    "application/x-dos_ms_excel",
    "application/xls",
    // powerpoint
    "application/vnd.ms-powerpoint",
    "application/mspowerpoint",
    "application/ms-powerpoint",
    "application/mspowerpnt",
    "application/vnd-mspowerpoint",
    "application/powerpoint",
    "application/x-powerpoint",
    // apple
    "application/x-iwork",
    "application/vnd.apple",
    // postscript
    "application/postscript",
    "application/eps",
    "application/x-eps",
    "image/eps",
    "image/x-eps",
    // autocad
    "application/dxf",
    "application/x-autocad",
    "application/x-dxf",
    "drawing/x-dxf",
    "image/vnd.dxf",
    "image/x-autocad",
    "image/x-dxf",
    "zz-application/zz-winassoc-dxf",
    // zip
    "application/zip",
    "application/x-zip",
    "application/x-zip-compressed",
    "application/x-compress",
    "application/x-compressed",
    "multipart/x-zip",
];

/// Subtypes the cloud viewers reject even though their family is whitelisted
pub const MIME_BLACKLIST: &[&str] = &[
    "image/x-tga",
    "image/vnd.djvu",
    "image/g3fax",
    "audio/amr",
    "text/calendar",
    "text/vcard",
    "video/3gpp",
];

/// Whitelist/blacklist prefix classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityPolicy {
    whitelist: Vec<String>,
    blacklist: Vec<String>,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::new(MIME_WHITELIST.iter().copied(), MIME_BLACKLIST.iter().copied())
    }
}

impl EligibilityPolicy {
    /// Policy over custom prefix tables
    pub fn new<W, B>(whitelist: W, blacklist: B) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            whitelist: whitelist.into_iter().map(Into::into).collect(),
            blacklist: blacklist.into_iter().map(Into::into).collect(),
        }
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// Whether `mime` may be escalated to a remote viewer
    pub fn is_eligible(&self, mime: &str) -> bool {
        let Some(matched) = self
            .whitelist
            .iter()
            .find(|prefix| mime.starts_with(prefix.as_str()))
        else {
            return false;
        };

        let rejected = self
            .blacklist
            .iter()
            .find(|prefix| mime.starts_with(prefix.as_str()));
        if let Some(rejected) = rejected {
            tracing::debug!(mime = %mime, whitelist = %matched, blacklist = %rejected, "Type rejected");
            return false;
        }
        true
    }
}
