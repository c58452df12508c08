use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::chapters::PayloadLayout;
use crate::downloader;
use crate::error::PatchError;
use crate::progress::ProgressSink;
use crate::zip_utils;

/// Substring marking the payload folder in standard patch archives.
pub const PATCH_FOLDER_MARKER: &str = "패치";
/// Payload directory name in Hou+-style archives.
pub const DATA_DIR_NAME: &str = "Data";

const ARCHIVE_FILE_NAME: &str = "patch.zip";

fn sorted_child_dirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return vec![];
    };
    let mut out: Vec<PathBuf> = rd
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    out.sort();
    out
}

/// Locate the directory that actually holds the files to install.
///
/// Returns `None` when the archive has no recognizable payload; callers
/// treat that as "skip this chapter", never as a reason to touch the
/// destination.
pub fn resolve_payload_root(extracted_root: &Path, layout: PayloadLayout) -> Option<PathBuf> {
    match layout {
        PayloadLayout::PatchFolder => find_patch_folder(extracted_root),
        PayloadLayout::DataFolder => find_data_folder(extracted_root),
    }
}

/// First immediate child directory (lexicographic order) whose name contains
/// the patch marker. Ordering keeps the pick stable when several match.
fn find_patch_folder(extracted_root: &Path) -> Option<PathBuf> {
    sorted_child_dirs(extracted_root).into_iter().find(|p| {
        p.file_name()
            .and_then(|s| s.to_str())
            .map(|n| n.contains(PATCH_FOLDER_MARKER))
            .unwrap_or(false)
    })
}

/// Breadth-first walk (children in lexicographic order) for a directory
/// literally named `Data`; the shallowest match wins.
fn find_data_folder(extracted_root: &Path) -> Option<PathBuf> {
    let mut queue = std::collections::VecDeque::from([extracted_root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let children = sorted_child_dirs(&dir);
        if children
            .iter()
            .any(|c| c.file_name().is_some_and(|n| n == DATA_DIR_NAME))
        {
            return Some(dir.join(DATA_DIR_NAME));
        }
        queue.extend(children);
    }
    None
}

fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut out = vec![];
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(rd) = std::fs::read_dir(&dir) else {
            continue;
        };
        for e in rd.flatten() {
            let path = e.path();
            let Ok(ty) = e.file_type() else { continue };
            if ty.is_dir() {
                stack.push(path);
            } else if ty.is_file() {
                out.push(path);
            }
        }
    }
    out
}

fn copy_one(from: &Path, to: &Path) -> Result<(), String> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    std::fs::copy(from, to).map_err(|e| e.to_string())?;

    let md = std::fs::metadata(from).map_err(|e| e.to_string())?;
    let mtime = filetime::FileTime::from_last_modification_time(&md);
    filetime::set_file_mtime(to, mtime).map_err(|e| e.to_string())?;
    Ok(())
}

/// Copy every file under `payload_root` into `destination`, overwriting
/// whatever is already there (no backups). A file that fails to copy is
/// reported and skipped; it never stops the rest of the copy.
fn copy_payload(payload_root: &Path, destination: &Path, sink: &dyn ProgressSink) -> u64 {
    let files = collect_files(payload_root);
    let mut copied: u64 = 0;

    for file_path in &files {
        let Ok(rel) = file_path.strip_prefix(payload_root) else {
            continue;
        };
        let target = destination.join(rel);
        match copy_one(file_path, &target) {
            Ok(()) => copied = copied.saturating_add(1),
            Err(e) => {
                log::warn!(
                    "failed to copy {} -> {}: {e}",
                    file_path.display(),
                    target.display()
                );
                sink.status(&format!(
                    "파일을 복사하는 중 문제가 생겼어요: {} -> {} ({e})",
                    file_path.display(),
                    target.display()
                ));
            }
        }
    }

    copied
}

/// Extract an already-downloaded archive into `staging_root`, find the
/// payload and overlay it onto `destination`.
///
/// `Ok(false)` means the archive carried no recognizable payload; the
/// destination is left untouched in that case. `Ok(true)` means the payload
/// was found and processed, even if individual files failed to copy.
pub fn apply_patch_archive(
    zip_path: &Path,
    staging_root: &Path,
    destination: &Path,
    sink: &dyn ProgressSink,
    layout: PayloadLayout,
) -> Result<bool, PatchError> {
    sink.status("패치 파일을 풀고 있어요.");
    match zip_utils::extract_zip_with_progress(zip_path, staging_root, |_, _, _| {}) {
        Ok(()) => {}
        Err(e @ PatchError::CorruptArchive { .. }) => {
            sink.status("압축 파일이 망가진 것 같아요. 패치 파일을 다시 받아야 해요.");
            return Err(e);
        }
        Err(e) => {
            sink.status(&format!("압축을 푸는 중에 문제가 생겼어요: {e}"));
            return Err(e);
        }
    }
    sink.status(&format!(
        "압축을 다 풀었어요. 위치: {}",
        staging_root.display()
    ));

    let Some(payload_root) = resolve_payload_root(staging_root, layout) else {
        let missing = match layout {
            PayloadLayout::PatchFolder => "한글 패치 폴더",
            PayloadLayout::DataFolder => "'Data' 폴더",
        };
        sink.status(&format!(
            "패치 파일 안에서 {missing}를 찾지 못해서 적용할 수 없어요."
        ));
        return Ok(false);
    };

    sink.status("패치 파일을 적용하는 중이에요. 조금만 기다려 주세요.");
    let copied = copy_payload(&payload_root, destination, sink);
    log::info!(
        "Copied {copied} files from {} into {}",
        payload_root.display(),
        destination.display()
    );

    sink.status(&format!(
        "패치를 다 적용했어요. 대상 경로: {}",
        destination.display()
    ));
    Ok(true)
}

/// Full pipeline for one chapter: staging area, fetch, extract, overlay.
///
/// The staging directory lives exactly as long as this call and is removed
/// on every exit path, error or not.
pub fn apply_patch(
    client: &reqwest::blocking::Client,
    file_id: &str,
    destination: &Path,
    sink: &dyn ProgressSink,
    layout: PayloadLayout,
) -> Result<bool, PatchError> {
    let staging = TempDir::new().map_err(PatchError::Staging)?;
    let zip_path = staging.path().join(ARCHIVE_FILE_NAME);

    downloader::fetch_drive_file(client, file_id, &zip_path, sink)?;
    sink.status(&format!(
        "다운로드가 끝났어요. 저장 위치: {}",
        zip_path.display()
    ));

    apply_patch_archive(&zip_path, staging.path(), destination, sink, layout)
}
