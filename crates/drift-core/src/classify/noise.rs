//! System-generated files that show up as unowned on every host.
//!
//! Used only when `skip_generated_noise` is enabled.

use once_cell::sync::Lazy;
use regex::RegexSet;

const NOISE_EXACT: &[&str] = &[
    // machine identity
    "/etc/machine-id",
    "/etc/adjtime",
    "/etc/hostname",
    "/etc/localtime",
    "/etc/machine-info",
    // lock and stamp files
    "/etc/.pwd.lock",
    "/etc/.updated",
    // default systemd links
    "/etc/systemd/system/default.target",
    "/etc/systemd/system/dbus.service",
    "/etc/systemd/user/dbus.service",
    // network
    "/etc/resolv.conf",
    "/etc/NetworkManager/NetworkManager-intern.conf",
    // runtime state
    "/etc/ld.so.cache",
    "/etc/udev/hwdb.bin",
    "/etc/tuned/active_profile",
    "/etc/tuned/profile_mode",
    "/etc/tuned/bootcmdline",
    // generated trust bundles
    "/etc/pki/java/cacerts",
    "/etc/pki/tls/cert.pem",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/pki/tls/certs/ca-bundle.trust.crt",
    // installer
    "/etc/sysconfig/anaconda",
    "/etc/sysconfig/kernel",
    // package manager
    "/etc/dnf/dnf.conf",
    "/etc/yum.conf",
];

static NOISE_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        // shadow-utils backups: /etc/passwd-, /etc/shadow-, ...
        r"^/etc/(passwd|shadow|group|gshadow|subuid|subgid)-$",
        r"^/etc/systemd/(system|user)/[^/]+\.wants/",
        r"^/etc/pki/ca-trust/extracted/",
        r"^/etc/pki/product-default/",
        r"^/etc/sysconfig/network-scripts/readme-[^/]*\.txt$",
        r"^/etc/ssh/ssh_host_[^/]*_key(\.pub)?$",
        r"^/etc/lvm/(archive|backup|devices)/",
        r"^/etc/alternatives/",
        r"^/etc/selinux/[^/]+/policy/",
        r"^/etc/selinux/[^/]+/contexts/files/[^/]*\.bin$",
        r"^/etc/firewalld/.*\.old$",
    ])
    .unwrap()
});

/// Whether host-absolute `path` is a known system-generated file.
pub fn is_generated_noise(path: &str) -> bool {
    NOISE_EXACT.contains(&path) || NOISE_PATTERNS.is_match(path)
}
