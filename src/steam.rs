use std::path::{Path, PathBuf};

use crate::vdf;

/// Resolve the Steam base installation directory.
///
/// Windows reads `HKCU\Software\Valve\Steam\SteamPath` like the official
/// client does; elsewhere the conventional per-user locations are probed so
/// the tool keeps working under Proton-style setups.
#[cfg(windows)]
pub fn steam_install_path() -> Option<PathBuf> {
    use winreg::enums::HKEY_CURRENT_USER;
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = hkcu.open_subkey("Software\\Valve\\Steam").ok()?;
    let path: String = key.get_value("SteamPath").ok()?;
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

#[cfg(not(windows))]
pub fn steam_install_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let candidates = [
        home.join(".local/share/Steam"),
        home.join(".steam/steam"),
        home.join("Library/Application Support/Steam"),
    ];
    candidates.into_iter().find(|p| p.is_dir())
}

/// Collect library roots from `config/libraryfolders.vdf`.
///
/// The numbered sections each carry a `path`; the Steam base path itself is
/// appended last as an implicit library. A missing or unreadable file yields
/// an empty list rather than an error.
pub fn library_folders(steam_path: &Path) -> Vec<PathBuf> {
    let library_file = steam_path.join("config").join("libraryfolders.vdf");
    if !library_file.exists() {
        log::warn!("libraryfolders.vdf not found at {}", library_file.display());
        return vec![];
    }

    let text = match std::fs::read_to_string(&library_file) {
        Ok(t) => t,
        Err(e) => {
            log::error!("failed to read {}: {e}", library_file.display());
            return vec![];
        }
    };

    let doc = match vdf::parse(&text) {
        Ok(d) => d,
        Err(e) => {
            log::error!("failed to parse {}: {e}", library_file.display());
            return vec![];
        }
    };

    let mut libraries: Vec<PathBuf> = vec![];
    if let Some(folders) = doc.get_block("libraryfolders") {
        for (_, section) in folders.numeric_blocks() {
            if let Some(path) = section.get_str("path") {
                libraries.push(PathBuf::from(path));
            }
        }
    }
    libraries.push(steam_path.to_path_buf());
    libraries
}

/// Find the install directory of a game by its Steam folder name.
///
/// Roots are checked in the given order; the first existing
/// `<root>/steamapps/common/<folder_name>` wins. `None` means "not
/// installed", not an error.
pub fn find_game_install_path(library_paths: &[PathBuf], folder_name: &str) -> Option<PathBuf> {
    for library in library_paths {
        let candidate = library.join("steamapps").join("common").join(folder_name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
