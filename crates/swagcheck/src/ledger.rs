//! Attempt ledger: one record per execution of a test item.
//!
//! Records are appended by the post-call hook (always, passed or failed) and
//! enriched once during teardown, after the browser has finalized video and
//! trace files. Enrichment addresses a record by its attempt number.

use crate::artifacts::ArtifactFlags;
use crate::evidence::FailureEvidence;
use crate::result::{SwagError, SwagResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Outcome of one attempt's call phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttemptStatus {
    /// Body completed
    Passed,
    /// Body failed (assertion, driver error, setup error)
    Failed,
}

impl AttemptStatus {
    /// Report icon
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Passed => "✔",
            Self::Failed => "❌",
        }
    }

    /// Lowercase label, also used as a CSS class
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

/// One attempt of one test item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    /// Call-phase outcome
    pub status: AttemptStatus,
    /// Call-phase wall clock
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Failure text; absent when passed
    #[serde(default)]
    pub error: Option<String>,
    /// Page URL at failure; absent when passed or unavailable
    #[serde(default)]
    pub url: Option<String>,
    /// Presence flags, resolved at enrichment
    #[serde(default)]
    pub artifacts: ArtifactFlags,
    /// Promoted evidence directory
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
    /// Loaded evidence for the failure panel
    #[serde(skip)]
    pub evidence: Option<FailureEvidence>,
    #[serde(skip)]
    enriched: bool,
}

impl AttemptRecord {
    /// A passed attempt
    #[must_use]
    pub fn passed(attempt: u32, duration: Duration) -> Self {
        Self {
            attempt,
            status: AttemptStatus::Passed,
            duration,
            error: None,
            url: None,
            artifacts: ArtifactFlags::default(),
            artifact_dir: None,
            evidence: None,
            enriched: false,
        }
    }

    /// A failed attempt
    #[must_use]
    pub fn failed(attempt: u32, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            status: AttemptStatus::Failed,
            error: Some(error.into()),
            ..Self::passed(attempt, duration)
        }
    }

    /// Set the URL recorded at failure time
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Whether the attempt failed
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == AttemptStatus::Failed
    }

    /// Whether teardown already enriched this record
    #[must_use]
    pub const fn is_enriched(&self) -> bool {
        self.enriched
    }

    /// Reload evidence from `artifact_dir` (records read back from JSON)
    pub fn reload_evidence(&mut self) -> SwagResult<()> {
        if let Some(dir) = &self.artifact_dir {
            if dir.is_dir() {
                self.evidence = Some(FailureEvidence::load(dir)?);
            }
        }
        Ok(())
    }
}

/// Values filled in by teardown once artifacts are final
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    /// Presence flags
    pub artifacts: ArtifactFlags,
    /// URL read back from `url.txt`
    pub url: Option<String>,
    /// Promoted evidence directory
    pub artifact_dir: Option<PathBuf>,
    /// Loaded evidence
    pub evidence: Option<FailureEvidence>,
}

/// Ordered attempt records of one test item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptLedger {
    records: Vec<AttemptRecord>,
}

impl AttemptLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next attempt number
    #[must_use]
    pub fn next_attempt(&self) -> u32 {
        u32::try_from(self.records.len()).map_or(u32::MAX, |n| n + 1)
    }

    /// Append a record; its attempt number must be the next one
    pub fn append(&mut self, record: AttemptRecord) -> SwagResult<()> {
        let expected = self.next_attempt();
        if record.attempt != expected {
            return Err(SwagError::ledger(format!(
                "attempt {} appended where {expected} was expected",
                record.attempt
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Record for attempt number `attempt`
    #[must_use]
    pub fn get(&self, attempt: u32) -> Option<&AttemptRecord> {
        self.records.iter().find(|r| r.attempt == attempt)
    }

    /// Enrich the record for `attempt`; fails if absent or already enriched
    pub fn enrich(&mut self, attempt: u32, enrichment: Enrichment) -> SwagResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.attempt == attempt)
            .ok_or_else(|| SwagError::ledger(format!("no record for attempt {attempt}")))?;
        if record.enriched {
            return Err(SwagError::ledger(format!(
                "attempt {attempt} was already enriched"
            )));
        }
        record.artifacts = enrichment.artifacts;
        if enrichment.url.is_some() {
            record.url = enrichment.url;
        }
        record.artifact_dir = enrichment.artifact_dir;
        record.evidence = enrichment.evidence;
        record.enriched = true;
        Ok(())
    }

    /// Records in attempt order
    #[must_use]
    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no attempt ran
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Last record
    #[must_use]
    pub fn last(&self) -> Option<&AttemptRecord> {
        self.records.last()
    }

    /// Number of failed attempts
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failed()).count()
    }

    /// Attempt numbers run 1..=len without gaps
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.records
            .iter()
            .zip(1u32..)
            .all(|(record, expected)| record.attempt == expected)
    }

    /// Reload evidence for every record that points at an artifact dir
    pub fn reload_evidence(&mut self) -> SwagResult<()> {
        for record in &mut self.records {
            record.reload_evidence()?;
        }
        Ok(())
    }

    /// Read a ledger serialized with [`AttemptLedger::save`]
    pub fn load(path: &Path) -> SwagResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let ledger: Self = serde_json::from_str(&text)?;
        if !ledger.is_contiguous() {
            return Err(SwagError::ledger(format!(
                "{}: attempt numbers are not contiguous from 1",
                path.display()
            )));
        }
        Ok(ledger)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> SwagResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
