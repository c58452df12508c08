pub mod chapters;
pub mod downloader;
pub mod error;
pub mod logger;
pub mod patcher;
pub mod progress;
pub mod steam;
pub mod vdf;
pub mod zip_utils;

use std::path::PathBuf;

use crate::chapters::Chapter;
use crate::progress::ProgressSink;

/// Result surface of one batch run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Display names of the chapters whose patch was applied.
    pub patched: Vec<String>,
}

/// Patch every selected chapter, one after another, on the calling thread.
///
/// Callers dispatch this onto a worker thread and hand the presentation side
/// a `ChannelSink`. This loop is the final catch boundary: an unresolved
/// install path or a failed fetch/extract is reported through the sink and
/// the batch moves on to the next chapter.
pub fn run_batch(
    client: &reqwest::blocking::Client,
    selected: &[Chapter],
    library_paths: &[PathBuf],
    sink: &dyn ProgressSink,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for chapter in selected {
        let Some(game_path) = steam::find_game_install_path(library_paths, &chapter.name) else {
            sink.status(&format!(
                "{}의 설치 폴더를 찾을 수 없어서 건너뛰었어요.",
                chapter.display_name
            ));
            continue;
        };

        sink.status(&format!(
            "{}의 설치 경로를 찾았어요: {}",
            chapter.display_name,
            game_path.display()
        ));

        match patcher::apply_patch(
            client,
            &chapter.drive_file_id,
            &game_path,
            sink,
            chapter.layout,
        ) {
            Ok(true) => outcome.patched.push(chapter.display_name.clone()),
            Ok(false) => {
                log::warn!("no payload found in the archive for {}", chapter.name);
            }
            Err(e) => {
                log::error!("patch failed for {}: {e}", chapter.name);
                sink.status(&format!(
                    "{}에 패치를 적용하는 중 문제가 생겼어요: {e}",
                    chapter.display_name
                ));
            }
        }
    }

    outcome
}
