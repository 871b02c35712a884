//! Discovery of local ROM files.
//!
//! Handles:
//! - Top-level files of the ROM folder (hidden files are skipped)
//! - `.m3u` subdirectories holding the discs of one game (ES-DE convention)

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use retro_audit_lib::LocalRomRecord;

const CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Build ROM records for every file in `folder`, sorted by path.
///
/// Record ids are paths relative to `folder`, so they stay stable between
/// runs. With `hash` set, each file's CRC32 is computed as well.
pub(crate) fn scan_rom_folder(
    folder: &Path,
    hash: bool,
    mut on_file: impl FnMut(usize, usize, &Path),
) -> std::io::Result<Vec<LocalRomRecord>> {
    let files = collect_files(folder)?;
    let total = files.len();
    let mut records = Vec::with_capacity(total);

    for (i, path) in files.iter().enumerate() {
        on_file(i, total, path);
        let relative = path.strip_prefix(folder).unwrap_or(path);
        let id = relative.to_string_lossy().replace('\\', "/");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.clone());

        let mut record = LocalRomRecord::new(id, file_name)
            .with_size(std::fs::metadata(path)?.len());
        if hash {
            record = record.with_checksum(compute_crc32(path)?);
        }
        records.push(record);
    }

    Ok(records)
}

fn collect_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries: Vec<std::fs::DirEntry> = std::fs::read_dir(folder)?.flatten().collect();
    entries.sort_by_key(|e| e.path());

    for entry in &entries {
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_file() {
            files.push(path);
        } else if path.is_dir()
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("m3u"))
        {
            let mut discs: Vec<PathBuf> = std::fs::read_dir(&path)?
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file() && !is_hidden(p))
                .collect();
            discs.sort();
            files.extend(discs);
        }
    }

    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// CRC32 of a whole file as lowercase hex.
fn compute_crc32(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:08x}", hasher.finalize()))
}
