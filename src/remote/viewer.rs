//! Cloud viewer URLs

use serde::{Deserialize, Serialize};

/// Generic viewer, used for most types
pub const GENERIC_VIEWER_TEMPLATE: &str = "https://docs.google.com/viewer?embedded=true&url=";

/// Office-style viewer, used for types the office loader claims
pub const OFFICE_VIEWER_TEMPLATE: &str = "https://view.officeapps.live.com/op/view.aspx?src=";

/// Server-side endpoint that streams an uploaded object back out
pub const DEFAULT_DOWNLOAD_ENDPOINT: &str =
    "https://us-central1-admob-app-id-9025061963.cloudfunctions.net/download";

/// Which viewer renders an escalated document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerTemplate {
    Generic,
    Office,
}

/// Viewer templates plus the download endpoint they embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerUrls {
    pub generic_template: String,
    pub office_template: String,
    pub download_endpoint: String,
}

impl Default for ViewerUrls {
    fn default() -> Self {
        Self {
            generic_template: GENERIC_VIEWER_TEMPLATE.to_string(),
            office_template: OFFICE_VIEWER_TEMPLATE.to_string(),
            download_endpoint: DEFAULT_DOWNLOAD_ENDPOINT.to_string(),
        }
    }
}

impl ViewerUrls {
    pub fn with_download_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.download_endpoint = endpoint.into();
        self
    }

    fn template(&self, template: ViewerTemplate) -> &str {
        match template {
            ViewerTemplate::Generic => &self.generic_template,
            ViewerTemplate::Office => &self.office_template,
        }
    }

    /// Download URL for an uploaded `{uid}/{id}.{ext}` path
    pub fn download_url(&self, file_path: &str) -> String {
        format!("{}?filePath={}", self.download_endpoint, file_path)
    }

    /// Viewer URL embedding the (encoded) download URL
    pub fn viewer_url(&self, template: ViewerTemplate, file_path: &str) -> String {
        let download_url = self.download_url(file_path);
        format!(
            "{}{}",
            self.template(template),
            urlencoding::encode(&download_url)
        )
    }
}
