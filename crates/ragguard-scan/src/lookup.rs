use async_trait::async_trait;
use thiserror::Error;

use ragguard_types::models::Verdict;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("reputation service is not configured")]
    NotConfigured,

    #[error("request to reputation service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reputation service returned HTTP {0}")]
    Status(u16),

    #[error("malformed response from reputation service: {0}")]
    Malformed(String),
}

/// The file handed to a reputation lookup.
#[derive(Debug, Clone, Copy)]
pub struct ScanSubject<'a> {
    pub file_name: &'a str,
    pub sha256: &'a str,
    pub bytes: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub verdict: Verdict,
    pub report_link: String,
    pub details: Option<String>,
}

/// An external threat-intelligence service that classifies a file.
///
/// One call per uploaded file; implementations do not retry.
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn scan(&self, subject: ScanSubject<'_>) -> Result<ScanOutcome, ScanError>;
}

/// Stand-in used when no API key is configured. Every scan fails, so uploads
/// are refused rather than stored unchecked.
#[derive(Debug, Default)]
pub struct UnconfiguredLookup;

#[async_trait]
impl ReputationLookup for UnconfiguredLookup {
    async fn scan(&self, _subject: ScanSubject<'_>) -> Result<ScanOutcome, ScanError> {
        Err(ScanError::NotConfigured)
    }
}
