use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::steam;

/// How the payload folder is located inside an extracted patch archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadLayout {
    /// A top-level folder whose name contains the patch marker.
    #[default]
    PatchFolder,
    /// A `Data` directory somewhere in the tree (Hou+ style archives).
    DataFolder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    /// Steam install folder name under `steamapps/common`.
    pub name: String,
    pub display_name: String,
    pub drive_file_id: String,

    #[serde(default)]
    pub layout: PayloadLayout,

    /// Filled in by `probe_installed`, never read from a manifest.
    #[serde(skip)]
    pub installed: bool,
}

fn chapter(name: &str, display_name: &str, drive_file_id: &str) -> Chapter {
    Chapter {
        name: name.to_string(),
        display_name: display_name.to_string(),
        drive_file_id: drive_file_id.to_string(),
        layout: PayloadLayout::PatchFolder,
        installed: false,
    }
}

/// The shipped chapter table.
///
/// Drive file ids are per-chapter data, not behavior; a `chapters.json`
/// manifest can override the whole table (see `load_manifest`).
pub fn builtin_chapters() -> Vec<Chapter> {
    vec![
        chapter(
            "Higurashi When They Cry",
            "오니카쿠시 편 (챕터 1)",
            "1J2FmtLdf72iU0M8PY7WE6L_DVU2ziw3S",
        ),
        chapter(
            "Higurashi 02 - Watanagashi",
            "와타나가시 편 (챕터 2)",
            "1KrEgh4CvKDP4DPulR3GIqGo_Ms1ciCkm",
        ),
        chapter(
            "Higurashi 03 - Tatarigoroshi",
            "타타리고로시 편 (챕터 3)",
            "1XFiYcOQt41s57GKPsLbrC8kblJwHG2D5",
        ),
        chapter(
            "Higurashi 04 - Himatsubushi",
            "히마츠부시 편 (챕터 4)",
            "1Z6SJLRZO8KkYIQs_C3BVnWfaWWrL4poa",
        ),
        chapter(
            "Higurashi When They Cry Hou - Ch. 5 Meakashi",
            "메아카시 편 (챕터 5)",
            "1K25opRd1HtJGWLl9DWzcsvWMKqaZaU_P",
        ),
        chapter(
            "Higurashi When They Cry Hou - Ch.6 Tsumihoroboshi",
            "츠미호로보시 편 (챕터 6)",
            "1si3l8EYlZFfI8DVtpJT4WAY_I0VEEnEz",
        ),
        chapter(
            "Higurashi When They Cry Hou - Ch.7 Minagoroshi",
            "미나고로시 편 (챕터 7)",
            "1AsbW4Oozy76YySHRIQT0sp3rSejryDp8",
        ),
        // Upstream distributes the same archive for chapters 6 and 8.
        chapter(
            "Higurashi When They Cry Hou - Ch.8 Matsuribayashi",
            "마츠리바야시 편 (챕터 8)",
            "1si3l8EYlZFfI8DVtpJT4WAY_I0VEEnEz",
        ),
        chapter(
            "Higurashi When They Cry Hou - Rei",
            "쓰르라미 울 적에 례",
            "13wdP3jz5FvaVi0PBZ_6WsiCK591VkEYS",
        ),
        Chapter {
            layout: PayloadLayout::DataFolder,
            ..chapter(
                "Higurashi When They Cry Hou+",
                "쓰르라미 울 적에 봉+",
                "1kAA5JDB-gFa_mEglHqAvvt8SFV7s3Npb",
            )
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterManifest {
    #[allow(dead_code)]
    pub version: u32,
    pub chapters: Vec<Chapter>,
}

/// Load a chapter table override from a local `chapters.json`.
///
/// Format: `{ "version": 1, "chapters": [...] }`
pub fn load_manifest(path: &Path) -> Result<Vec<Chapter>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let manifest: ChapterManifest = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    Ok(manifest.chapters)
}

/// Refresh each chapter's `installed` flag against the library roots.
pub fn probe_installed(chapters: &mut [Chapter], library_paths: &[PathBuf]) {
    for ch in chapters.iter_mut() {
        ch.installed = steam::find_game_install_path(library_paths, &ch.name).is_some();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_layouts() {
        let chapters = builtin_chapters();
        assert_eq!(chapters.len(), 10);
        assert!(chapters[..9]
            .iter()
            .all(|c| c.layout == PayloadLayout::PatchFolder));
        assert_eq!(chapters[9].layout, PayloadLayout::DataFolder);
    }

    #[test]
    fn manifest_defaults_layout_to_patch_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapters.json");
        std::fs::write(
            &path,
            r#"{
  "version": 1,
  "chapters": [
    { "name": "Some Game", "display_name": "어떤 게임", "drive_file_id": "abc123" },
    { "name": "Other Game", "display_name": "다른 게임", "drive_file_id": "def456", "layout": "data_folder" }
  ]
}"#,
        )
        .unwrap();

        let chapters = load_manifest(&path).unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].layout, PayloadLayout::PatchFolder);
        assert_eq!(chapters[1].layout, PayloadLayout::DataFolder);
        assert!(!chapters[0].installed);
    }

    #[test]
    fn probe_marks_installed_chapters() {
        let root = tempfile::tempdir().unwrap();
        let game = root.path().join("steamapps").join("common").join("Some Game");
        std::fs::create_dir_all(&game).unwrap();

        let mut chapters = vec![
            chapter("Some Game", "어떤 게임", "abc"),
            chapter("Missing Game", "없는 게임", "def"),
        ];
        probe_installed(&mut chapters, &[root.path().to_path_buf()]);
        assert!(chapters[0].installed);
        assert!(!chapters[1].installed);
    }
}
