use crate::directory::SubDirectory;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconFile {
    pub path: PathBuf,
    pub file_type: FileType,
}

impl IconFile {
    pub fn from_path(path: &Path) -> Option<IconFile> {
        let file_type = FileType::from_path_ext(path)?;

        Some(IconFile {
            path: path.to_owned(),
            file_type,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum FileType {
    Png,
    Svg,
    Svgz,
    Xpm,
}

impl FileType {
    /// Extensions tried for icons, in order of preference.
    pub const EXTENSIONS: [(&'static str, FileType); 5] = [
        ("png", FileType::Png),
        ("svg", FileType::Svg),
        ("svgz", FileType::Svgz),
        ("svg.gz", FileType::Svgz),
        ("xpm", FileType::Xpm),
    ];

    pub fn from_path_ext(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let (_, file_type) = Self::split_file_name(file_name)?;

        Some(file_type)
    }

    /// Splits `document-open.svg.gz` into `("document-open", Svgz)`.
    ///
    /// Returns `None` if the file isn't an icon, or if nothing is left of the name once the
    /// extension is removed.
    pub fn split_file_name(file_name: &str) -> Option<(&str, Self)> {
        // `svg.gz` must be checked before anything that could match a shorter suffix
        if let Some(stem) = strip_suffix_ignore_case(file_name, ".svg.gz") {
            return (!stem.is_empty()).then_some((stem, FileType::Svgz));
        }

        let (stem, ext) = file_name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }

        let file_type = if ext.eq_ignore_ascii_case("png") {
            FileType::Png
        } else if ext.eq_ignore_ascii_case("svg") {
            FileType::Svg
        } else if ext.eq_ignore_ascii_case("svgz") {
            FileType::Svgz
        } else if ext.eq_ignore_ascii_case("xpm") {
            FileType::Xpm
        } else {
            return None;
        };

        Some((stem, file_type))
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;

    if !s.is_char_boundary(split) || !s[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }

    Some(&s[..split])
}

/// One candidate file for an icon, together with the theme directory it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct IconEntry {
    pub directory: Arc<SubDirectory>,
    pub file: IconFile,
}

/// All files found for one icon name within a single theme.
///
/// Entries are ordered by the theme's declared directory order, then by search directory, then
/// by file type. The same file may appear more than once if it is reachable through several
/// search directories; nothing is deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct IconRecord {
    pub name: String,
    pub entries: Vec<IconEntry>,
}

impl IconRecord {
    pub fn new(name: impl Into<String>) -> Self {
        IconRecord {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Pick the file to use for an icon of `size` pixels.
    ///
    /// The first entry whose directory matches `size` wins. If no directory matches, the entry
    /// with the smallest size distance is used instead, the earliest one on ties.
    pub fn find_entry(&self, size: u32) -> Option<&IconEntry> {
        self.find_exact(size).or_else(|| {
            self.entries
                .iter()
                .min_by_key(|entry| entry.directory.distance(size))
        })
    }

    /// Like [IconRecord::find_entry], without falling back to the closest size.
    pub fn find_exact(&self, size: u32) -> Option<&IconEntry> {
        self.entries
            .iter()
            .find(|entry| entry.directory.matches(size))
    }
}
