use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

use crate::archive::ArchiveError;
use crate::browser::FetchError;
use crate::config::ConfigError;
use crate::extract::DomError;
use crate::reconstruct::{HostError, ReconstructError};

#[derive(Debug, Error)]
pub enum H2dError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Image fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Scene host error: {0}")]
    Host(#[from] HostError),

    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    #[error("Configuration error: {0}")]
    Settings(#[from] ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl H2dError {
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            H2dError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            H2dError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity/proxy/VPN and retry.",
            ),
            H2dError::Fetch(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity or rerun with --offline to record images as URL references.",
            ),
            H2dError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify URL/format (e.g., https://example.com).",
            ),
            H2dError::Image(e) => ErrorPayload::new(
                ErrorCategory::Image,
                e.to_string(),
                "Verify image path/format and readability.",
            ),
            H2dError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON/serialization inputs; run with --verbose for details.",
            ),
            H2dError::Archive(e) if e.is_structural() => ErrorPayload::new(
                ErrorCategory::Archive,
                e.to_string(),
                "The archive opened but its page data is incomplete; recapture the page.",
            ),
            H2dError::Archive(e) => ErrorPayload::new(
                ErrorCategory::Archive,
                e.to_string(),
                "Verify the input is an archive written by `h2d capture`; run `h2d inspect` to list its entries.",
            ),
            H2dError::Dom(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "The page changed while it was being read; retry the capture.",
            ),
            H2dError::Host(e) => ErrorPayload::new(
                ErrorCategory::Reconstruct,
                e.to_string(),
                "Add the missing fonts with --font or relax the page styles; run with --verbose for details.",
            ),
            H2dError::Reconstruct(e) => ErrorPayload::new(
                ErrorCategory::Reconstruct,
                e.to_string(),
                "Run `h2d inspect` on the archive to confirm it holds visible elements.",
            ),
            H2dError::Settings(e) => config_payload(&e.to_string()),
            H2dError::Config(msg) => config_payload(msg),
            H2dError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

fn config_payload(msg: &str) -> ErrorPayload {
    let lower = msg.to_ascii_lowercase();
    let remediation = if lower.contains("playwright npm package is missing") {
        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`)."
    } else if lower.contains("chromium executable") {
        "Run `npx playwright install chromium` (or `playwright install chromium`) to download the browser."
    } else if lower.contains("spawn playwright helper")
        || lower.contains("node command")
        || lower.contains("not found on path")
    {
        "Install Node.js and ensure the node binary is on PATH; rerun after installing Playwright if needed."
    } else if lower.contains("timeout") {
        "Try increasing --nav-timeout/--network-idle-timeout/--process-timeout or ensure the page loads without blocking."
    } else if lower.contains("snapshot") {
        "Check the --snapshot file is JSON produced by the capture script (url, title, viewport, nodes)."
    } else if lower.contains("file not found") {
        "Verify the file exists; use an absolute path or run from the working directory."
    } else if lower.contains("font") {
        "Set a non-empty fallback_font_family/fallback_font_style under [reconstruct]."
    } else {
        "Check flags/paths (e.g., --viewport WIDTHxHEIGHT) and config values."
    };
    ErrorPayload::new(ErrorCategory::Config, msg.to_string(), remediation)
}

pub type Result<T> = std::result::Result<T, H2dError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Archive,
    Reconstruct,
    Image,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_payload_includes_playwright_remediation() {
        let err = H2dError::Config(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        );
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Config);
        let remediation = payload.remediation.unwrap_or_default();
        assert!(
            remediation.contains("npm install playwright"),
            "expected remediation to mention npm install playwright, got: {remediation}"
        );
    }

    #[test]
    fn config_payload_uses_default_remediation_for_other_messages() {
        let err = H2dError::Config("Some other config issue".to_string());
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.contains("Check flags/paths"),
            "expected default remediation for generic config errors"
        );
    }

    #[test]
    fn config_payload_includes_node_install_hint() {
        let err = H2dError::Config(
            "Unable to spawn Playwright helper; 'node' was not found on PATH".to_string(),
        );
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.to_ascii_lowercase().contains("node"),
            "expected node install/path remediation, got: {remediation}"
        );
    }

    #[test]
    fn config_payload_includes_timeout_hint() {
        let err = H2dError::Config(
            "Playwright error (status error): Timeout navigating to https://example.com"
                .to_string(),
        );
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.contains("--nav-timeout"),
            "expected timeout remediation, got: {remediation}"
        );
    }

    #[test]
    fn config_payload_includes_chromium_install_hint() {
        let err =
            H2dError::Config("chromium executable is missing; reinstall Playwright".to_string());
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation
                .to_ascii_lowercase()
                .contains("playwright install chromium"),
            "expected remediation to mention playwright install chromium, got: {remediation}"
        );
    }

    #[test]
    fn archive_errors_use_archive_category() {
        let err = H2dError::from(ArchiveError::MissingEntry(crate::archive::DATA_ENTRY));
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Archive);
        assert!(payload.message.contains("data.json"));
    }

    #[test]
    fn zero_success_reconstruction_is_reconstruct_category() {
        let err = H2dError::from(ReconstructError::NothingCreated { errors: 3 });
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Reconstruct);
        assert!(payload.message.contains("Failed to create any elements (3 errors)"));
    }

    #[test]
    fn category_serializes_lowercase() {
        let payload = ErrorPayload::new(ErrorCategory::Reconstruct, "x".into(), "y");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["category"], "reconstruct");
        assert_eq!(json["remediation"], "y");
    }
}
