use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::FontLoadError;

/// Environment variable naming one extra directory to search for named fonts.
pub const FONT_DIR_ENV: &str = "FRAMEGIF_FONT_DIR";

const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];
const MAX_SEARCH_DEPTH: usize = 4;

/// Which outline font the text stamper should try first.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontRequest {
    /// Font file stem searched in the font directories, e.g. `"arial"` finds `Arial.ttf`.
    Named(String),
    /// Explicit font file path.
    Path(PathBuf),
    /// In-memory font bytes.
    #[serde(skip)]
    Bytes(Arc<Vec<u8>>),
}

impl Default for FontRequest {
    fn default() -> Self {
        Self::Named("arial".to_owned())
    }
}

impl FontRequest {
    /// Short description used in logs and [`FontLoadError`].
    pub fn describe(&self) -> String {
        match self {
            Self::Named(n) => n.clone(),
            Self::Path(p) => p.display().to_string(),
            Self::Bytes(b) => format!("<{} font bytes>", b.len()),
        }
    }
}

/// Raw bytes of a located outline font.
#[derive(Clone, Debug)]
pub struct LoadedFont {
    /// Where the font came from.
    pub origin: String,
    /// Font file contents.
    pub bytes: Arc<Vec<u8>>,
}

/// Locates font files for a [`FontRequest`].
#[derive(Clone, Debug, Default)]
pub struct FontResolver {
    search_dirs: Vec<PathBuf>,
}

impl FontResolver {
    /// Search `extra_dirs` first, then [`FONT_DIR_ENV`], then the platform font directories.
    pub fn new(extra_dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut search_dirs: Vec<PathBuf> = extra_dirs.into_iter().collect();
        if let Some(dir) = std::env::var_os(FONT_DIR_ENV) {
            search_dirs.push(PathBuf::from(dir));
        }
        search_dirs.extend(platform_font_dirs());
        Self { search_dirs }
    }

    /// Search only `dirs`, ignoring the environment and platform directories.
    pub fn with_dirs_only(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_dirs: dirs.into_iter().collect(),
        }
    }

    /// Directories searched for named fonts, in priority order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Read the bytes for `request`. Does not check that they parse as a font.
    pub fn load(&self, request: &FontRequest) -> Result<LoadedFont, FontLoadError> {
        let fail = |reason: String| FontLoadError {
            requested: request.describe(),
            reason,
        };

        match request {
            FontRequest::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(fail("font bytes are empty".to_owned()));
                }
                Ok(LoadedFont {
                    origin: request.describe(),
                    bytes: bytes.clone(),
                })
            }
            FontRequest::Path(path) => read_font(path).map_err(fail),
            FontRequest::Named(name) => {
                let path = self.find_named(name).ok_or_else(|| {
                    fail(format!(
                        "no .ttf/.otf/.ttc file named '{name}' in {} search dirs",
                        self.search_dirs.len()
                    ))
                })?;
                read_font(&path).map_err(fail)
            }
        }
    }

    /// Find a font file whose stem matches `name` (case-insensitive).
    pub fn find_named(&self, name: &str) -> Option<PathBuf> {
        let wanted = name.trim().to_ascii_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.search_dirs
            .iter()
            .find_map(|dir| find_in_dir(dir, &wanted, 0))
    }
}

fn read_font(path: &Path) -> Result<LoadedFont, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
    if bytes.is_empty() {
        return Err(format!("font file '{}' is empty", path.display()));
    }
    Ok(LoadedFont {
        origin: path.display().to_string(),
        bytes: Arc::new(bytes),
    })
}

fn is_font_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    FONT_EXTENSIONS.contains(&ext.as_str())
}

fn find_in_dir(dir: &Path, wanted: &str, depth: usize) -> Option<PathBuf> {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return None;
    };

    let mut entries: Vec<PathBuf> = rd.flatten().map(|e| e.path()).collect();
    entries.sort();

    let mut subdirs = Vec::new();
    for path in entries {
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }
        if !is_font_file(&path) {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        if stem.as_deref() == Some(wanted) {
            return Some(path);
        }
    }

    if depth >= MAX_SEARCH_DEPTH {
        return None;
    }
    subdirs
        .iter()
        .find_map(|sub| find_in_dir(sub, wanted, depth + 1))
}

fn platform_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let home = std::env::var_os("HOME").map(PathBuf::from);

    if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        if let Some(h) = &home {
            dirs.push(h.join("Library/Fonts"));
        }
    } else if cfg!(target_os = "windows") {
        let root = std::env::var_os("WINDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("C:\\Windows"));
        dirs.push(root.join("Fonts"));
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(h) = &home {
            dirs.push(h.join(".local/share/fonts"));
            dirs.push(h.join(".fonts"));
        }
    }
    dirs
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
