//! Read-only access to cached package archives.
//!
//! Nothing is unpacked to disk: the production extractor streams the rpm
//! payload through `rpm2cpio` into memory and reads the cpio archive in
//! process.

pub mod cpio;

use crate::collect::tool_runner::ToolRunner;
use drift_common::Result;
use std::path::Path;
use tracing::debug;

/// Member-level access to a package archive.
pub trait ArchiveExtractor {
    /// Bytes of the member at `member` (leading `./` or `/` ignored), or
    /// `None` when the archive has no such regular file.
    fn extract(&self, archive: &Path, member: &str) -> Result<Option<Vec<u8>>>;

    /// Normalized paths of every regular file in the archive.
    fn list(&self, archive: &Path) -> Result<Vec<String>>;
}

/// Extractor that runs `rpm2cpio` and parses its stdout.
#[derive(Debug, Clone)]
pub struct Rpm2CpioExtractor {
    runner: ToolRunner,
}

impl Rpm2CpioExtractor {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    fn payload(&self, archive: &Path) -> Result<Vec<u8>> {
        let archive_arg = archive.display().to_string();
        let output = self
            .runner
            .run("rpm2cpio", &[archive_arg.as_str()])?
            .require_success()?;
        debug!(
            archive = %archive.display(),
            bytes = output.stdout.len(),
            "read rpm payload"
        );
        Ok(output.stdout)
    }
}

impl ArchiveExtractor for Rpm2CpioExtractor {
    fn extract(&self, archive: &Path, member: &str) -> Result<Option<Vec<u8>>> {
        let payload = self.payload(archive)?;
        cpio::extract_member(&payload, member)
    }

    fn list(&self, archive: &Path) -> Result<Vec<String>> {
        let payload = self.payload(archive)?;
        cpio::list_members(&payload)
    }
}
