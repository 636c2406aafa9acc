//! Classifier tests against real host trees on disk.
//!
//! The package database is a fixture source; everything else (walk, reads,
//! cpio parsing, diffs) runs for real. Archives in the fixture cache are raw
//! `newc` streams read straight from disk.

use drift_common::{ConfigKind, Result, VerificationRecord};
use drift_core::archive::{cpio, ArchiveExtractor};
use drift_core::audit::DIFF_UNAVAILABLE_NOTE;
use drift_core::package::{InstalledPackage, PackageIndex, PackageSource};
use drift_core::retrieve::{default_cache_dirs, PristineRetriever};
use drift_core::{Classifier, ClassifyOptions};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct FixtureSource {
    verify: Vec<VerificationRecord>,
    owners: Vec<(String, String)>,
    installed: Vec<&'static str>,
    removed: Vec<String>,
}

impl PackageSource for FixtureSource {
    fn verify_all(&self) -> Result<Vec<VerificationRecord>> {
        Ok(self.verify.clone())
    }

    fn installed(&self) -> Result<Vec<InstalledPackage>> {
        Ok(self
            .installed
            .iter()
            .filter_map(|line| InstalledPackage::parse(line))
            .collect())
    }

    fn file_owners(&self) -> Result<Vec<(String, String)>> {
        Ok(self.owners.clone())
    }

    fn removed_packages(&self) -> Result<Vec<String>> {
        Ok(self.removed.clone())
    }
}

/// Treats each cached "rpm" as a bare cpio payload.
struct CpioFileExtractor;

impl ArchiveExtractor for CpioFileExtractor {
    fn extract(&self, archive: &Path, member: &str) -> Result<Option<Vec<u8>>> {
        cpio::extract_member(&fs::read(archive)?, member)
    }

    fn list(&self, archive: &Path) -> Result<Vec<String>> {
        cpio::list_members(&fs::read(archive)?)
    }
}

fn write(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn cache_archive(host: &Path, file_name: &str, members: &[(&str, &str)]) {
    let members: Vec<(&str, u32, &[u8])> = members
        .iter()
        .map(|(name, data)| (*name, 0o100644, data.as_bytes()))
        .collect();
    write(
        host,
        &format!("var/cache/dnf/baseos/packages/{}", file_name),
        cpio::write_newc(&members),
    );
}

fn owner(path: &str, package: &str) -> (String, String) {
    (path.to_string(), package.to_string())
}

/// A small host: one modified owned file, one pristine owned file, two
/// operator files.
fn basic_host() -> (tempfile::TempDir, FixtureSource) {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/ssh/sshd_config", "PermitRootLogin no\n");
    write(host.path(), "etc/ssh/moduli", "# moduli\n");
    write(host.path(), "etc/myapp/app.conf", "listen=8080\n");
    write(host.path(), "etc/cron.d/backup", "0 2 * * * root /usr/local/bin/backup\n");

    let source = FixtureSource {
        verify: vec![VerificationRecord::new("/etc/ssh/sshd_config", "S.5....T.")],
        owners: vec![
            owner("/etc/ssh/sshd_config", "openssh-server"),
            owner("/etc/ssh/moduli", "openssh"),
        ],
        installed: vec!["0:openssh-server-8.7p1-38.el9.x86_64", "0:openssh-8.7p1-38.el9.x86_64"],
        ..Default::default()
    };
    (host, source)
}

fn paths_and_kinds(records: &[drift_core::ConfigRecord]) -> Vec<(String, ConfigKind)> {
    records
        .iter()
        .map(|r| (r.path().to_string(), r.kind()))
        .collect()
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_one_record_per_file_with_expected_kinds() {
    let (host, source) = basic_host();
    let index = PackageIndex::build(&source, "/etc");
    let classified = Classifier::new(host.path(), "/etc", &index).classify();

    assert_eq!(
        paths_and_kinds(classified.records()),
        vec![
            ("/etc/ssh/sshd_config".to_string(), ConfigKind::OwnedModified),
            ("/etc/cron.d/backup".to_string(), ConfigKind::Unowned),
            ("/etc/myapp/app.conf".to_string(), ConfigKind::Unowned),
        ]
    );

    let sshd = &classified.records()[0];
    assert_eq!(sshd.verification_flags(), Some("S.5....T."));
    assert_eq!(sshd.owning_package(), Some("openssh-server"));
    assert_eq!(sshd.content(), "PermitRootLogin no\n");
    assert_eq!(sshd.diff(), None);
    assert!(classified.warnings().is_empty());
}

#[test]
fn test_modified_wins_even_without_ownership() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/sudoers", "root ALL=(ALL) ALL\n");
    let source = FixtureSource {
        verify: vec![VerificationRecord::new("/etc/sudoers", ".M.......").with_package("sudo")],
        ..Default::default()
    };
    let index = PackageIndex::build(&source, "/etc");
    let classified = Classifier::new(host.path(), "etc", &index).classify();

    assert_eq!(classified.len(), 1);
    assert_eq!(classified.records()[0].kind(), ConfigKind::OwnedModified);
    assert_eq!(classified.records()[0].owning_package(), Some("sudo"));
}

#[test]
fn test_modified_records_in_path_order_before_walk() {
    let host = tempfile::tempdir().unwrap();
    for rel in ["etc/b.conf", "etc/a.conf", "etc/z/operator.conf", "etc/c.conf"] {
        write(host.path(), rel, "x=1\n");
    }
    let source = FixtureSource {
        verify: vec![
            VerificationRecord::new("/etc/c.conf", "S.5....T."),
            VerificationRecord::new("/etc/a.conf", "S.5....T."),
        ],
        owners: vec![owner("/etc/b.conf", "base")],
        ..Default::default()
    };
    let index = PackageIndex::build(&source, "/etc");
    let classified = Classifier::new(host.path(), "/etc", &index).classify();

    let paths: Vec<&str> = classified.records().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/etc/a.conf", "/etc/c.conf", "/etc/z/operator.conf"]);
}

#[test]
fn test_vanished_and_out_of_root_records_skipped() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/present.conf", "a=1\n");
    write(host.path(), "usr/lib/tmpfiles.d/x.conf", "d /run/x\n");
    let source = FixtureSource {
        verify: vec![
            VerificationRecord::new("/etc/gone.conf", "missing"),
            VerificationRecord::new("/etc/present.conf", "S.5....T."),
            VerificationRecord::new("/usr/lib/tmpfiles.d/x.conf", "S.5....T."),
        ],
        ..Default::default()
    };
    let index = PackageIndex::build(&source, "/etc");
    let classified = Classifier::new(host.path(), "/etc", &index).classify();

    assert_eq!(
        paths_and_kinds(classified.records()),
        vec![("/etc/present.conf".to_string(), ConfigKind::OwnedModified)]
    );
}

#[test]
fn test_modified_directory_is_not_a_record() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/cups/cupsd.conf", "Listen localhost:631\n");
    write(host.path(), "etc/cups/printers.conf", "<Printer lab>\n");
    // rpm -Va reports mode and mtime drift on package-owned directories.
    let source = FixtureSource {
        verify: vec![
            VerificationRecord::new("/etc/cups", ".M.....T.").with_package("cups"),
            VerificationRecord::new("/etc/cups/cupsd.conf", "S.5....T.").with_package("cups"),
        ],
        owners: vec![owner("/etc/cups/printers.conf", "cups")],
        ..Default::default()
    };
    let index = PackageIndex::build(&source, "/etc");
    let classified = Classifier::new(host.path(), "/etc", &index).classify();

    assert_eq!(
        paths_and_kinds(classified.records()),
        vec![("/etc/cups/cupsd.conf".to_string(), ConfigKind::OwnedModified)]
    );
    assert_eq!(classified.records()[0].content(), "Listen localhost:631\n");
    assert!(classified.warnings().is_empty());
}

#[test]
fn test_non_utf8_content_captured_lossily() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/latin1.conf", b"name=caf\xe9\n");
    let index = PackageIndex::build(&FixtureSource::default(), "/etc");
    let classified = Classifier::new(host.path(), "/etc", &index).classify();

    assert_eq!(classified.records()[0].content(), "name=caf\u{FFFD}\n");
}

#[cfg(unix)]
#[test]
fn test_symlinked_file_included_and_dangling_link_ignored() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/real.conf", "a=1\n");
    std::os::unix::fs::symlink(host.path().join("etc/real.conf"), host.path().join("etc/link.conf"))
        .unwrap();
    std::os::unix::fs::symlink(host.path().join("etc/nowhere"), host.path().join("etc/dangling"))
        .unwrap();
    let index = PackageIndex::build(&FixtureSource::default(), "/etc");
    let classified = Classifier::new(host.path(), "/etc", &index).classify();

    let paths: Vec<&str> = classified.records().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/etc/link.conf", "/etc/real.conf"]);
    assert_eq!(classified.records()[0].content(), "a=1\n");
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_and_directory_do_not_stop_the_walk() {
    use std::os::unix::fs::PermissionsExt;

    // root reads through mode 000.
    if unsafe { libc::geteuid() } == 0 {
        return;
    }
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/locked.conf", "password=hidden\n");
    write(host.path(), "etc/open.conf", "a=1\n");
    write(host.path(), "etc/private/inner.conf", "b=2\n");
    write(host.path(), "etc/zeta/after.conf", "c=3\n");
    let locked = host.path().join("etc/locked.conf");
    let private = host.path().join("etc/private");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    fs::set_permissions(&private, fs::Permissions::from_mode(0o000)).unwrap();

    let index = PackageIndex::build(&FixtureSource::default(), "/etc");
    let classified = Classifier::new(host.path(), "/etc", &index).classify();

    fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    let paths: Vec<&str> = classified.records().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/etc/locked.conf", "/etc/open.conf", "/etc/zeta/after.conf"]);
    assert_eq!(classified.records()[0].kind(), ConfigKind::Unowned);
    assert_eq!(classified.records()[0].content(), "");
    assert_eq!(classified.records()[1].content(), "a=1\n");

    assert_eq!(classified.warnings().len(), 1);
    assert_eq!(classified.warnings()[0].source, "classify.walk");
    assert!(classified.warnings()[0].message.contains("private"));
}

#[test]
fn test_missing_config_root_is_a_warning() {
    let host = tempfile::tempdir().unwrap();
    let index = PackageIndex::build(&FixtureSource::default(), "/etc");
    let classified = Classifier::new(host.path(), "/etc", &index).classify();

    assert!(classified.is_empty());
    assert_eq!(classified.warnings().len(), 1);
    assert_eq!(classified.warnings()[0].source, "classify.walk");
}

// ============================================================================
// Noise filter
// ============================================================================

#[test]
fn test_noise_filter_off_by_default() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/machine-id", "0123456789abcdef\n");
    write(host.path(), "etc/myapp/app.conf", "a=1\n");
    let index = PackageIndex::build(&FixtureSource::default(), "/etc");

    let all = Classifier::new(host.path(), "/etc", &index).classify();
    assert_eq!(all.len(), 2);

    let filtered = Classifier::new(host.path(), "/etc", &index)
        .with_options(ClassifyOptions {
            skip_generated_noise: true,
            ..Default::default()
        })
        .classify();
    let paths: Vec<&str> = filtered.records().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/etc/myapp/app.conf"]);
}

// ============================================================================
// Orphans
// ============================================================================

#[test]
fn test_orphaned_file_from_removed_package_archive() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/old-daemon/daemon.conf", "workers=4\n");
    write(host.path(), "etc/myapp/app.conf", "a=1\n");
    cache_archive(
        host.path(),
        "old-daemon-1.0-3.el9.x86_64.rpm",
        &[
            ("./etc/old-daemon/daemon.conf", "workers=1\n"),
            ("./usr/sbin/old-daemon", "\x7fELF"),
        ],
    );
    let source = FixtureSource {
        removed: vec!["old-daemon".into()],
        ..Default::default()
    };
    let index = PackageIndex::build(&source, "/etc");
    let retriever = PristineRetriever::new(default_cache_dirs(host.path()), Box::new(CpioFileExtractor));
    let (orphans, warnings) = retriever.orphan_manifest(&index, "/etc");
    assert!(warnings.is_empty());
    assert_eq!(orphans.len(), 1);

    let classified = Classifier::new(host.path(), "/etc", &index)
        .with_orphans(&orphans)
        .classify();

    let daemon = classified
        .records()
        .iter()
        .find(|r| r.path() == "/etc/old-daemon/daemon.conf")
        .unwrap();
    assert_eq!(daemon.kind(), ConfigKind::Orphaned);
    assert_eq!(daemon.owning_package(), Some("old-daemon"));

    let app = classified
        .records()
        .iter()
        .find(|r| r.path() == "/etc/myapp/app.conf")
        .unwrap();
    assert_eq!(app.kind(), ConfigKind::Unowned);
}

#[test]
fn test_orphan_without_archive_falls_back_to_unowned() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/old-daemon/daemon.conf", "workers=4\n");
    let source = FixtureSource {
        removed: vec!["old-daemon".into()],
        ..Default::default()
    };
    let index = PackageIndex::build(&source, "/etc");
    let retriever = PristineRetriever::new(default_cache_dirs(host.path()), Box::new(CpioFileExtractor));
    let (orphans, warnings) = retriever.orphan_manifest(&index, "/etc");

    assert!(orphans.is_empty());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].source, "orphan.manifest");

    let classified = Classifier::new(host.path(), "/etc", &index)
        .with_orphans(&orphans)
        .classify();
    assert_eq!(classified.records()[0].kind(), ConfigKind::Unowned);
}

#[test]
fn test_owned_path_never_orphaned() {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/shared.conf", "a=1\n");
    let index = PackageIndex::build(
        &FixtureSource {
            owners: vec![owner("/etc/shared.conf", "current-owner")],
            ..Default::default()
        },
        "/etc",
    );
    let mut orphans = BTreeMap::new();
    orphans.insert("/etc/shared.conf".to_string(), "old-owner".to_string());

    let classified = Classifier::new(host.path(), "/etc", &index)
        .with_orphans(&orphans)
        .classify();
    assert!(classified.is_empty());
}

// ============================================================================
// Diffs
// ============================================================================

fn diff_host() -> (tempfile::TempDir, FixtureSource) {
    let host = tempfile::tempdir().unwrap();
    write(host.path(), "etc/httpd/conf/httpd.conf", "Listen 8080\nUser apache\n");
    write(host.path(), "etc/httpd/conf.d/ssl.conf", "SSLEngine on\n");
    write(host.path(), "etc/chrony.conf", "pool 2.rhel.pool.ntp.org iburst\n");
    cache_archive(
        host.path(),
        "httpd-2.4.57-5.el9.x86_64.rpm",
        &[
            ("./etc/httpd/conf/httpd.conf", "Listen 80\nUser apache\n"),
            ("./etc/httpd/conf.d/ssl.conf", "SSLEngine on\n"),
        ],
    );
    let source = FixtureSource {
        verify: vec![
            VerificationRecord::new("/etc/httpd/conf/httpd.conf", "S.5....T."),
            VerificationRecord::new("/etc/httpd/conf.d/ssl.conf", ".......T."),
            VerificationRecord::new("/etc/chrony.conf", "S.5....T."),
        ],
        owners: vec![
            owner("/etc/httpd/conf/httpd.conf", "httpd"),
            owner("/etc/httpd/conf.d/ssl.conf", "httpd"),
            owner("/etc/chrony.conf", "chrony"),
        ],
        installed: vec!["0:httpd-2.4.57-5.el9.x86_64", "0:chrony-4.3-1.el9.x86_64"],
        ..Default::default()
    };
    (host, source)
}

#[test]
fn test_diff_against_cached_package() {
    let (host, source) = diff_host();
    let index = PackageIndex::build(&source, "/etc");
    let retriever = PristineRetriever::new(default_cache_dirs(host.path()), Box::new(CpioFileExtractor));
    let classified = Classifier::new(host.path(), "/etc", &index)
        .with_options(ClassifyOptions {
            config_diffs: true,
            ..Default::default()
        })
        .with_retriever(&retriever)
        .classify();

    let by_path = |p: &str| {
        classified
            .records()
            .iter()
            .find(|r| r.path() == p)
            .unwrap()
            .clone()
    };

    let httpd = by_path("/etc/httpd/conf/httpd.conf");
    let diff = httpd.diff().unwrap();
    assert!(diff.starts_with("--- original\n+++ current\n"));
    assert!(diff.contains("-Listen 80\n"));
    assert!(diff.contains("+Listen 8080\n"));
    assert_eq!(httpd.content(), "Listen 8080\nUser apache\n");

    // Only the mtime differs: identical content, empty diff.
    let ssl = by_path("/etc/httpd/conf.d/ssl.conf");
    assert_eq!(ssl.diff(), Some(""));

    // No cached chrony archive: full content plus the provenance note.
    let chrony = by_path("/etc/chrony.conf");
    assert_eq!(chrony.diff(), None);
    assert_eq!(
        chrony.content(),
        format!("pool 2.rhel.pool.ntp.org iburst\n{}", DIFF_UNAVAILABLE_NOTE)
    );
}

#[test]
fn test_no_diffs_unless_enabled() {
    let (host, source) = diff_host();
    let index = PackageIndex::build(&source, "/etc");
    let retriever = PristineRetriever::new(default_cache_dirs(host.path()), Box::new(CpioFileExtractor));
    let classified = Classifier::new(host.path(), "/etc", &index)
        .with_retriever(&retriever)
        .classify();

    for record in classified.records() {
        assert_eq!(record.diff(), None);
        assert!(!record.content().contains("# NOTE:"));
    }
}
