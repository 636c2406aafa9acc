//! In-memory reader for SVR4 `newc` / `crc` cpio streams (the payload
//! format `rpm2cpio` emits).
//!
//! Layout per entry: a 110-byte ASCII header (6-byte magic, then 13 fields
//! of 8 hex digits), the NUL-terminated name padded to a 4-byte boundary,
//! then the file data padded to a 4-byte boundary. The stream ends with an
//! entry named `TRAILER!!!`.

use drift_common::{Error, Result};

const HEADER_LEN: usize = 110;
const MAGIC_NEWC: &[u8; 6] = b"070701";
const MAGIC_CRC: &[u8; 6] = b"070702";
const TRAILER: &str = "TRAILER!!!";

const S_IFMT: u32 = 0o170000;
const S_IFREG: u32 = 0o100000;

/// One archive member, borrowing its data from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpioEntry<'a> {
    /// Name as stored (may start with `./`).
    pub name: String,
    pub ino: u32,
    pub mode: u32,
    pub nlink: u32,
    pub data: &'a [u8],
}

impl CpioEntry<'_> {
    pub fn is_regular_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    /// Name with leading `./` and `/` removed.
    pub fn member_path(&self) -> &str {
        normalize_member_name(&self.name)
    }
}

/// Strip the leading `./` and `/` that rpm payloads carry, so
/// `./etc/foo`, `/etc/foo` and `etc/foo` all compare equal.
pub fn normalize_member_name(name: &str) -> &str {
    let mut name = name;
    loop {
        if let Some(rest) = name.strip_prefix("./") {
            name = rest;
        } else if let Some(rest) = name.strip_prefix('/') {
            name = rest;
        } else {
            return name;
        }
    }
}

/// Iterator over the members of a cpio stream.
///
/// Yields an error and then stops on the first malformed header.
#[derive(Debug, Clone)]
pub struct CpioReader<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> CpioReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            done: false,
        }
    }

    fn next_entry(&mut self) -> Result<Option<CpioEntry<'a>>> {
        let stream: &'a [u8] = self.data;
        let header = stream
            .get(self.pos..self.pos + HEADER_LEN)
            .ok_or_else(|| malformed(self.pos, "truncated header"))?;

        let magic = &header[..6];
        if magic != MAGIC_NEWC && magic != MAGIC_CRC {
            return Err(malformed(self.pos, "bad magic"));
        }

        let field = |index: usize| -> Result<u32> {
            let start = 6 + index * 8;
            let text = std::str::from_utf8(&header[start..start + 8])
                .map_err(|_| malformed(self.pos, "non-ASCII header field"))?;
            u32::from_str_radix(text, 16).map_err(|_| malformed(self.pos, "bad hex field"))
        };

        let ino = field(0)?;
        let mode = field(1)?;
        let nlink = field(4)?;
        let file_size = field(6)? as usize;
        let name_size = field(11)? as usize;

        let name_start = self.pos + HEADER_LEN;
        let name_end = name_start
            .checked_add(name_size)
            .ok_or_else(|| malformed(self.pos, "name size overflow"))?;
        let raw_name = stream
            .get(name_start..name_end)
            .ok_or_else(|| malformed(self.pos, "truncated name"))?;
        let raw_name = raw_name.strip_suffix(&[0]).unwrap_or(raw_name);
        let name = String::from_utf8_lossy(raw_name).into_owned();

        let data_start = align4(name_end);
        let data_end = data_start
            .checked_add(file_size)
            .ok_or_else(|| malformed(self.pos, "file size overflow"))?;

        if name == TRAILER {
            return Ok(None);
        }

        let data = stream
            .get(data_start..data_end)
            .ok_or_else(|| malformed(self.pos, "truncated data"))?;

        self.pos = align4(data_end);
        Ok(Some(CpioEntry {
            name,
            ino,
            mode,
            nlink,
            data,
        }))
    }
}

impl<'a> Iterator for CpioReader<'a> {
    type Item = Result<CpioEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn align4(n: usize) -> usize {
    n.saturating_add(3) & !3
}

fn malformed(offset: usize, what: &str) -> Error {
    Error::ArchiveFormat(format!("{} at offset {}", what, offset))
}

/// Bytes of the regular-file member at `path`, or `None` if absent.
///
/// For hard-linked members the data sits on the last link; earlier links
/// have size zero and are resolved by inode.
pub fn extract_member(archive: &[u8], path: &str) -> Result<Option<Vec<u8>>> {
    let wanted = normalize_member_name(path);
    let mut pending_link: Option<u32> = None;

    for entry in CpioReader::new(archive) {
        let entry = entry?;
        if !entry.is_regular_file() {
            continue;
        }
        if let Some(ino) = pending_link {
            if entry.ino == ino && !entry.data.is_empty() {
                return Ok(Some(entry.data.to_vec()));
            }
            continue;
        }
        if entry.member_path() == wanted {
            if entry.data.is_empty() && entry.nlink > 1 {
                pending_link = Some(entry.ino);
                continue;
            }
            return Ok(Some(entry.data.to_vec()));
        }
    }

    Ok(pending_link.map(|_| Vec::new()))
}

/// Normalized paths of every regular-file member.
pub fn list_members(archive: &[u8]) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for entry in CpioReader::new(archive) {
        let entry = entry?;
        if entry.is_regular_file() {
            paths.push(entry.member_path().to_string());
        }
    }
    Ok(paths)
}

/// Build a `newc` archive from `(name, mode, data)` members.
///
/// Used to produce fixtures; rpm payloads are never written by confdrift.
pub fn write_newc(members: &[(&str, u32, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut push = |name: &str, mode: u32, ino: u32, data: &[u8]| {
        let header = format!(
            "070701{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}",
            ino,
            mode,
            0,
            0,
            1,
            0,
            data.len(),
            0,
            0,
            0,
            0,
            name.len() + 1,
            0
        );
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        while out.len() % 4 != 0 {
            out.push(0);
        }
        out.extend_from_slice(data);
        while out.len() % 4 != 0 {
            out.push(0);
        }
    };
    for (i, (name, mode, data)) in members.iter().enumerate() {
        push(name, *mode, i as u32 + 1, data);
    }
    push(TRAILER, 0, 0, &[]);
    out
}
