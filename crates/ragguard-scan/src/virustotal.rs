//! VirusTotal v3 client.
//!
//! Known files are classified from their last analysis by hash. Files the
//! service has never seen are uploaded and their analysis polled a bounded
//! number of times; an analysis that does not finish in time yields a
//! `warning` verdict rather than an error.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};

use ragguard_types::models::Verdict;

use crate::lookup::{ReputationLookup, ScanError, ScanOutcome, ScanSubject};

pub const DEFAULT_BASE_URL: &str = "https://www.virustotal.com/api/v3";
const GUI_FILE_URL: &str = "https://www.virustotal.com/gui/file";

#[derive(Debug, Clone)]
pub struct VirusTotalConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
}

impl VirusTotalConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            poll_attempts: 10,
            poll_interval: Duration::from_secs(2),
        }
    }
}

// ── Response shapes (only the fields we read) ───────────────────────────

/// Engine counts from an analysis, e.g. `{"malicious": 2, "suspicious": 0,
/// "undetected": 60, "harmless": 8, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisStats {
    #[serde(default)]
    pub malicious: u64,
    #[serde(default)]
    pub suspicious: u64,
    #[serde(flatten)]
    pub other: BTreeMap<String, u64>,
}

impl AnalysisStats {
    pub fn total(&self) -> u64 {
        self.malicious + self.suspicious + self.other.values().sum::<u64>()
    }

    pub fn verdict(&self) -> Verdict {
        if self.malicious > 0 {
            Verdict::Malicious
        } else if self.suspicious > 0 {
            Verdict::Warning
        } else {
            Verdict::Clean
        }
    }

    pub fn summary(&self) -> String {
        format!("{}/{} engines flagged this file", self.malicious, self.total())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    attributes: FileAttributes,
}

#[derive(Debug, Deserialize)]
struct FileAttributes {
    last_analysis_stats: AnalysisStats,
}

#[derive(Debug, Deserialize)]
struct UploadedObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisObject {
    attributes: AnalysisAttributes,
}

#[derive(Debug, Deserialize)]
struct AnalysisAttributes {
    status: String,
    #[serde(default)]
    stats: Option<AnalysisStats>,
}

pub fn report_link(sha256: &str) -> String {
    format!("{}/{}", GUI_FILE_URL, sha256)
}

fn outcome(sha256: &str, stats: &AnalysisStats) -> ScanOutcome {
    ScanOutcome {
        verdict: stats.verdict(),
        report_link: report_link(sha256),
        details: Some(stats.summary()),
    }
}

// ── Client ──────────────────────────────────────────────────────────────

pub struct VirusTotalClient {
    http: reqwest::Client,
    config: VirusTotalConfig,
}

impl VirusTotalClient {
    pub fn new(config: VirusTotalConfig) -> Result<Self, ScanError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Last analysis for a known hash, or `None` if the service has never seen it.
    async fn file_report(&self, sha256: &str) -> Result<Option<AnalysisStats>, ScanError> {
        let resp = self
            .http
            .get(self.url(&format!("files/{}", sha256)))
            .header("x-apikey", &self.config.api_key)
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {
                let body: Envelope<FileObject> = resp
                    .json()
                    .await
                    .map_err(|e| ScanError::Malformed(e.to_string()))?;
                Ok(Some(body.data.attributes.last_analysis_stats))
            }
            StatusCode::NOT_FOUND => Ok(None),
            other => Err(ScanError::Status(other.as_u16())),
        }
    }

    /// Upload a file for analysis; returns the analysis id.
    async fn submit(&self, subject: ScanSubject<'_>) -> Result<String, ScanError> {
        let part = Part::bytes(subject.bytes.to_vec())
            .file_name(subject.file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("files"))
            .header("x-apikey", &self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(ScanError::Status(resp.status().as_u16()));
        }

        let body: Envelope<UploadedObject> = resp
            .json()
            .await
            .map_err(|e| ScanError::Malformed(e.to_string()))?;
        Ok(body.data.id)
    }

    /// Poll an analysis until it completes or the attempt budget runs out.
    async fn await_analysis(&self, analysis_id: &str) -> Result<Option<AnalysisStats>, ScanError> {
        for attempt in 1..=self.config.poll_attempts {
            let resp = self
                .http
                .get(self.url(&format!("analyses/{}", analysis_id)))
                .header("x-apikey", &self.config.api_key)
                .send()
                .await?;

            if resp.status() != StatusCode::OK {
                return Err(ScanError::Status(resp.status().as_u16()));
            }

            let body: Envelope<AnalysisObject> = resp
                .json()
                .await
                .map_err(|e| ScanError::Malformed(e.to_string()))?;

            let attrs = body.data.attributes;
            if attrs.status == "completed" {
                return attrs
                    .stats
                    .map(Some)
                    .ok_or_else(|| ScanError::Malformed("completed analysis without stats".into()));
            }

            debug!(
                "Analysis {} is {} (attempt {}/{})",
                analysis_id, attrs.status, attempt, self.config.poll_attempts
            );
            if attempt < self.config.poll_attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl ReputationLookup for VirusTotalClient {
    async fn scan(&self, subject: ScanSubject<'_>) -> Result<ScanOutcome, ScanError> {
        if let Some(stats) = self.file_report(subject.sha256).await? {
            info!("Hash {} known: {}", subject.sha256, stats.summary());
            return Ok(outcome(subject.sha256, &stats));
        }

        info!("Hash {} unknown, uploading {} for analysis", subject.sha256, subject.file_name);
        let analysis_id = self.submit(subject).await?;

        match self.await_analysis(&analysis_id).await? {
            Some(stats) => Ok(outcome(subject.sha256, &stats)),
            None => {
                warn!("Analysis {} did not complete in time", analysis_id);
                Ok(ScanOutcome {
                    verdict: Verdict::Warning,
                    report_link: report_link(subject.sha256),
                    details: Some("analysis pending".to_string()),
                })
            }
        }
    }
}
