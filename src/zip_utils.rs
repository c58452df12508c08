use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::PatchError;

/// Map archive-level failures onto the pipeline taxonomy: a malformed or
/// truncated archive is `CorruptArchive`, everything else is `Extract`.
fn classify(zip_path: &Path, e: ZipError) -> PatchError {
    match &e {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            PatchError::CorruptArchive {
                path: zip_path.to_path_buf(),
                message: e.to_string(),
            }
        }
        _ => PatchError::extract(e.to_string()),
    }
}

/// Stream one entry's data out to disk.
///
/// A read failure here means the compressed stream itself is truncated or
/// mangled (the central directory parsed fine), so it counts as
/// `CorruptArchive`; only write-side failures are plain `Extract` errors.
fn copy_entry_data<R: Read, W: Write>(
    zip_path: &Path,
    entry: &mut R,
    out: &mut W,
) -> Result<(), PatchError> {
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = match entry.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) => {
                return Err(PatchError::CorruptArchive {
                    path: zip_path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        out.write_all(&buf[..n])
            .map_err(|e| PatchError::extract(e.to_string()))?;
    }
}

/// Extracts a zip to `dest_dir`, emitting progress as
/// `(done_entries, total_entries, detail)`.
///
/// Entries that would land outside `dest_dir` (Zip Slip) fail the whole
/// extraction rather than being skipped.
pub fn extract_zip_with_progress<F>(
    zip_path: &Path,
    dest_dir: &Path,
    mut on_progress: F,
) -> Result<(), PatchError>
where
    F: FnMut(u64, u64, Option<String>),
{
    let file = File::open(zip_path).map_err(|e| PatchError::extract(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| classify(zip_path, e))?;

    let total_entries = archive.len() as u64;
    let mut extracted: u64 = 0;
    on_progress(0, total_entries, Some("Starting...".to_string()));

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| classify(zip_path, e))?;
        let entry_name = entry.name().to_string();

        let Some(safe_rel) = entry.enclosed_name().map(|p| p.to_owned()) else {
            return Err(PatchError::extract(format!(
                "archive entry escapes the target directory: {entry_name}"
            )));
        };

        let out_path = dest_dir.join(safe_rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| PatchError::extract(e.to_string()))?;
            extracted = extracted.saturating_add(1);
            on_progress(extracted, total_entries, Some(entry_name));
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PatchError::extract(e.to_string()))?;
        }

        let mut out_file =
            File::create(&out_path).map_err(|e| PatchError::extract(e.to_string()))?;
        copy_entry_data(zip_path, &mut entry, &mut out_file)?;

        extracted = extracted.saturating_add(1);
        on_progress(extracted, total_entries, Some(entry_name));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, body) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_preserving_relative_structure() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("patch.zip");
        write_archive(
            &zip_path,
            &[
                ("한글패치 v1/readme.txt", b"hello".as_slice()),
                ("한글패치 v1/Data/script.bin", b"bytes".as_slice()),
            ],
        );

        let out = dir.path().join("out");
        let mut seen: Vec<(u64, u64)> = vec![];
        extract_zip_with_progress(&zip_path, &out, |done, total, _| seen.push((done, total)))
            .unwrap();

        assert_eq!(
            std::fs::read(out.join("한글패치 v1").join("readme.txt")).unwrap(),
            b"hello"
        );
        assert_eq!(
            std::fs::read(out.join("한글패치 v1").join("Data").join("script.bin")).unwrap(),
            b"bytes"
        );
        assert_eq!(seen.first(), Some(&(0, 2)));
        assert_eq!(seen.last(), Some(&(2, 2)));
    }

    #[test]
    fn garbage_bytes_are_a_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("broken.zip");
        std::fs::write(&zip_path, b"PK this is not really an archive").unwrap();

        let err = extract_zip_with_progress(&zip_path, dir.path(), |_, _, _| {}).unwrap_err();
        assert!(matches!(err, PatchError::CorruptArchive { .. }), "{err}");
    }

    #[test]
    fn mangled_entry_data_is_a_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("mangled.zip");
        let body = vec![b'a'; 64 * 1024];
        write_archive(&zip_path, &[("payload/blob.bin", body.as_slice())]);

        // Zero a slice of the entry's compressed stream, leaving the central
        // directory intact so the archive still opens and lists fine.
        let mut bytes = std::fs::read(&zip_path).unwrap();
        for b in &mut bytes[48..78] {
            *b = 0;
        }
        std::fs::write(&zip_path, &bytes).unwrap();

        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        let err = extract_zip_with_progress(&zip_path, &out, |_, _, _| {}).unwrap_err();
        assert!(matches!(err, PatchError::CorruptArchive { .. }), "{err}");
    }

    #[test]
    fn traversal_entry_fails_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("evil.zip");
        write_archive(&zip_path, &[("../evil.txt", b"nope".as_slice())]);

        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        let err = extract_zip_with_progress(&zip_path, &out, |_, _, _| {}).unwrap_err();
        assert!(matches!(err, PatchError::Extract { .. }), "{err}");
        assert!(!dir.path().join("evil.txt").exists());
    }
}
