//! The audit pipeline: index, orphan manifest, classify, redact, snapshot.
//!
//! Classification and redaction are tied together by type: the classifier
//! is the only producer of [`ClassifiedConfig`], [`redact`] is the only
//! producer of [`RedactedConfig`], and the snapshot and renderers accept
//! nothing else.

pub mod record;

pub use record::{ClassifiedConfig, ConfigRecord, RedactedConfig, DIFF_UNAVAILABLE_NOTE};

use crate::archive::{ArchiveExtractor, Rpm2CpioExtractor};
use crate::classify::{ClassifyOptions, Classifier};
use crate::collect::tool_runner::{ToolRunner, ToolRunnerBuilder};
use crate::config::{AuditConfig, ResolvedConfig};
use crate::logging::{event_names, generate_run_id, Stage};
use crate::package::{PackageIndex, PackageSource, RpmSource};
use crate::retrieve::PristineRetriever;
use crate::snapshot::{Snapshot, SnapshotMeta};
use chrono::Utc;
use drift_common::Result;
use drift_redact::RedactionEngine;
use tracing::info;

/// External commands an audit may run.
pub const AUDIT_COMMANDS: [&str; 3] = ["rpm", "dnf", "rpm2cpio"];

/// Run every classified record through the redaction engine.
///
/// Excluded paths are replaced wholesale; everything else has its content
/// and diff scanned. The redaction log keeps one entry per replacement.
pub fn redact(classified: ClassifiedConfig, engine: &RedactionEngine) -> RedactedConfig {
    let (records, warnings) = classified.into_parts();
    let mut redacted = Vec::with_capacity(records.len());
    let mut log = Vec::new();

    for record in records {
        let result = engine.redact_file(record.path(), record.content(), record.diff());
        log.extend(result.records);
        redacted.push(record.with_redacted(result.content, result.diff));
    }

    info!(
        target: event_names::REDACT_FINISHED,
        stage = %Stage::Redact,
        files = redacted.len(),
        redactions = log.len(),
        "redaction pass complete"
    );
    RedactedConfig::new(redacted, log, warnings)
}

/// What a finished run hands back.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    /// Input for renderers.
    pub redacted: RedactedConfig,
    /// The document to persist.
    pub snapshot: Snapshot,
}

/// One audit of one host.
#[derive(Debug, Clone)]
pub struct AuditRun {
    config: AuditConfig,
    config_hash: Option<String>,
    run_id: String,
}

impl AuditRun {
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            config_hash: None,
            run_id: generate_run_id(),
        }
    }

    /// Run with a loaded config; its file hash lands in the snapshot.
    pub fn from_resolved(resolved: ResolvedConfig) -> Self {
        Self {
            config_hash: resolved.hash,
            ..Self::new(resolved.config)
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Tool runner restricted to the audit's commands and limits.
    pub fn tool_runner(&self) -> ToolRunner {
        ToolRunnerBuilder::new()
            .timeout(self.config.tool_timeout())
            .max_output(self.config.max_output_bytes)
            .allow_commands(AUDIT_COMMANDS)
            .build()
    }

    /// Audit the host through `rpm`, `dnf` and `rpm2cpio`.
    pub fn execute(&self) -> Result<AuditOutcome> {
        let runner = self.tool_runner();
        let source = RpmSource::new(runner.clone(), self.config.host_root.clone());
        self.execute_with(&source, Box::new(Rpm2CpioExtractor::new(runner)))
    }

    /// Audit with an explicit package source and archive extractor.
    pub fn execute_with(
        &self,
        source: &dyn PackageSource,
        extractor: Box<dyn ArchiveExtractor>,
    ) -> Result<AuditOutcome> {
        self.config.validate()?;
        // Fail before touching the host if the pattern table is broken.
        let engine = RedactionEngine::new()?;

        let prefix = self.config.config_prefix();
        info!(
            target: event_names::RUN_STARTED,
            stage = %Stage::Init,
            run_id = %self.run_id,
            host_root = %self.config.host_root.display(),
            config_root = %prefix,
            config_diffs = self.config.config_diffs,
            "audit started"
        );

        let index = PackageIndex::build(source, &prefix);
        info!(
            target: event_names::INDEX_BUILT,
            stage = %Stage::Index,
            modified = index.verification().len(),
            "package index ready"
        );

        let retriever = PristineRetriever::new(self.config.cache_dirs(), extractor);
        let (orphans, manifest_warnings) = retriever.orphan_manifest(&index, &prefix);
        info!(
            target: event_names::MANIFEST_BUILT,
            stage = %Stage::Manifest,
            orphan_paths = orphans.len(),
            "orphan manifest ready"
        );

        let options = ClassifyOptions {
            config_diffs: self.config.config_diffs,
            skip_generated_noise: self.config.skip_generated_noise,
        };
        let mut classified = Classifier::new(&self.config.host_root, &prefix, &index)
            .with_options(options)
            .with_orphans(&orphans)
            .with_retriever(&retriever)
            .classify();
        info!(
            target: event_names::CLASSIFY_FINISHED,
            stage = %Stage::Classify,
            files = classified.len(),
            "classification finished"
        );

        let mut earlier = index.warnings().to_vec();
        earlier.extend(manifest_warnings);
        classified.prepend_warnings(earlier);

        let redacted = redact(classified, &engine);

        let meta = SnapshotMeta {
            run_id: self.run_id.clone(),
            host_root: self.config.host_root.display().to_string(),
            config_root: prefix,
            generated_at: Utc::now(),
            config_diffs: self.config.config_diffs,
            config_hash: self.config_hash.clone(),
        };
        let snapshot = Snapshot::new(redacted.clone(), meta);
        info!(
            target: event_names::RUN_FINISHED,
            stage = %Stage::Snapshot,
            run_id = %self.run_id,
            files = snapshot.files().len(),
            redactions = snapshot.redactions().len(),
            warnings = snapshot.warnings().len(),
            "audit finished"
        );

        Ok(AuditOutcome { redacted, snapshot })
    }
}
