//! On-disk cache of a theme's [IconMap].
//!
//! Scanning a large theme means walking thousands of files, so once a theme has been scanned
//! its icons are written to a cache file named after the theme id. The cache is only trusted
//! while it is newer than every directory the scan looked at.
//!
//! # Format
//!
//! All integers are `u32`, little-endian. Strings are a length followed by that many bytes
//! of utf-8.
//!
//! ```text
//! magic "ICIX"  version
//! search_directory_count  (path)*
//! directory_count  (path)*
//! name_buffer
//! icon_count  (name_offset  name_length  entry_count  (path  directory_index)*)*
//! ```
//!
//! `name_buffer` holds the names of all icons back to back; icons refer to their name by
//! offset and length into it. `directory_index` points into the directory list at the start.
//! Both the search directories and the theme's directories must match exactly, in order, for
//! the cache to be used: several programs share one cache directory, each with its own search
//! path.

use crate::directory::SubDirectory;
use crate::icon::{IconEntry, IconFile, IconRecord};
use crate::index::IconMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

pub const MAGIC: [u8; 4] = *b"ICIX";
/// Bump whenever the layout changes; caches of other versions are discarded.
pub const VERSION: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to access the cache file")]
    Io(#[from] std::io::Error),
    #[error("not an icon cache file")]
    BadMagic,
    #[error("unsupported cache version {0}")]
    UnsupportedVersion(u32),
    #[error("the cache file ended unexpectedly")]
    Truncated,
    #[error("an offset or index in the cache is out of range")]
    IndexOutOfRange,
    #[error("the cache was written for different theme directories")]
    DirectoryMismatch,
    #[error("the cache was written for different search directories")]
    SearchDirectoryMismatch,
    #[error("the cache contains invalid utf-8")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("the cache lists a file that isn't an icon: {0:?}")]
    InvalidFileType(PathBuf),
    #[error("icon `{0}` appears twice in the cache")]
    DuplicateIcon(String),
    #[error("the cache has trailing bytes")]
    TrailingBytes,
    #[error("path {0:?} can't be stored in the cache")]
    UnencodablePath(PathBuf),
    #[error("an icon refers to a directory that doesn't belong to the theme")]
    UnknownDirectory,
    #[error("the icon index is too large to be cached")]
    TooLarge,
}

/// The cache file of one theme.
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The cache file for theme `theme_id` inside `cache_dir`.
    pub fn for_theme(cache_dir: &Path, theme_id: &str) -> Self {
        Self::new(cache_dir.join(format!("{theme_id}.cache")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the cache exists and is at least as new as each of the `consulted` directories.
    ///
    /// Directories that don't exist (anymore) are ignored: removing one changes the
    /// modification time of its parent, which is consulted as well.
    pub fn is_fresh<P: AsRef<Path>>(&self, consulted: &[P]) -> bool {
        let Some(cache_time) = modified(&self.path) else {
            return false;
        };

        consulted
            .iter()
            .all(|dir| modified(dir.as_ref()).is_none_or(|dir_time| dir_time <= cache_time))
    }

    pub fn load(
        &self,
        search_dirs: &[PathBuf],
        directories: &[Arc<SubDirectory>],
    ) -> Result<IconMap, CacheError> {
        let bytes = fs::read(&self.path)?;

        decode(&bytes, search_dirs, directories)
    }

    /// Replace the cache with `icons`.
    ///
    /// The file is written next to the cache and then moved over it, so readers never see a
    /// half-written cache.
    pub fn store(
        &self,
        search_dirs: &[PathBuf],
        directories: &[Arc<SubDirectory>],
        icons: &IconMap,
    ) -> Result<(), CacheError> {
        let bytes = encode(search_dirs, directories, icons)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let partial = self.path.with_extension("cache.tmp");
        fs::write(&partial, bytes)?;
        fs::rename(&partial, &self.path)?;

        Ok(())
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

pub fn encode(
    search_dirs: &[PathBuf],
    directories: &[Arc<SubDirectory>],
    icons: &IconMap,
) -> Result<Vec<u8>, CacheError> {
    // sorted so that the same index always produces the same bytes
    let mut records: Vec<&IconRecord> = icons.values().collect();
    records.sort_unstable_by(|a, b| a.name.cmp(&b.name));

    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    put_u32(&mut out, VERSION);

    put_len(&mut out, search_dirs.len())?;
    for search_dir in search_dirs {
        let path = search_dir
            .to_str()
            .ok_or_else(|| CacheError::UnencodablePath(search_dir.clone()))?;
        put_str(&mut out, path)?;
    }

    put_len(&mut out, directories.len())?;
    for directory in directories {
        put_str(&mut out, directory.path())?;
    }

    let mut name_buffer = String::new();
    let mut name_spans = Vec::with_capacity(records.len());
    for record in &records {
        name_spans.push((name_buffer.len(), record.name.len()));
        name_buffer.push_str(&record.name);
    }
    put_str(&mut out, &name_buffer)?;

    put_len(&mut out, records.len())?;
    for (record, (offset, len)) in records.iter().zip(name_spans) {
        put_len(&mut out, offset)?;
        put_len(&mut out, len)?;
        put_len(&mut out, record.entries.len())?;

        for entry in &record.entries {
            let path = entry.file.path.to_str().ok_or_else(|| {
                CacheError::UnencodablePath(entry.file.path.clone())
            })?;
            let directory_index = directories
                .iter()
                .position(|dir| Arc::ptr_eq(dir, &entry.directory) || *dir == entry.directory)
                .ok_or(CacheError::UnknownDirectory)?;

            put_str(&mut out, path)?;
            put_len(&mut out, directory_index)?;
        }
    }

    Ok(out)
}

pub fn decode(
    bytes: &[u8],
    search_dirs: &[PathBuf],
    directories: &[Arc<SubDirectory>],
) -> Result<IconMap, CacheError> {
    let mut reader = Reader { bytes };

    if reader.take(MAGIC.len())? != MAGIC {
        return Err(CacheError::BadMagic);
    }
    let version = reader.u32()?;
    if version != VERSION {
        return Err(CacheError::UnsupportedVersion(version));
    }

    let search_dir_count = reader.len()?;
    if search_dir_count != search_dirs.len() {
        return Err(CacheError::SearchDirectoryMismatch);
    }
    for search_dir in search_dirs {
        if Some(reader.str()?) != search_dir.to_str() {
            return Err(CacheError::SearchDirectoryMismatch);
        }
    }

    let directory_count = reader.len()?;
    if directory_count != directories.len() {
        return Err(CacheError::DirectoryMismatch);
    }
    for directory in directories {
        if reader.str()? != directory.path() {
            return Err(CacheError::DirectoryMismatch);
        }
    }

    let name_buffer = reader.str()?;

    let icon_count = reader.len()?;
    // a corrupt count must not turn into a huge allocation
    let mut icons = IconMap::with_capacity(icon_count.min(reader.remaining() / 12));

    for _ in 0..icon_count {
        let offset = reader.len()?;
        let len = reader.len()?;
        let name = offset
            .checked_add(len)
            .and_then(|end| name_buffer.get(offset..end))
            .ok_or(CacheError::IndexOutOfRange)?;

        let entry_count = reader.len()?;
        let mut record = IconRecord {
            name: name.to_owned(),
            entries: Vec::with_capacity(entry_count.min(reader.remaining() / 8)),
        };

        for _ in 0..entry_count {
            let path = Path::new(reader.str()?);
            let directory = directories
                .get(reader.len()?)
                .ok_or(CacheError::IndexOutOfRange)?;
            let file = IconFile::from_path(path)
                .ok_or_else(|| CacheError::InvalidFileType(path.to_owned()))?;

            record.entries.push(IconEntry {
                directory: Arc::clone(directory),
                file,
            });
        }

        if icons.insert(name.to_owned(), record).is_some() {
            return Err(CacheError::DuplicateIcon(name.to_owned()));
        }
    }

    if reader.remaining() != 0 {
        return Err(CacheError::TrailingBytes);
    }

    Ok(icons)
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_len(out: &mut Vec<u8>, len: usize) -> Result<(), CacheError> {
    let len = u32::try_from(len).map_err(|_| CacheError::TooLarge)?;
    put_u32(out, len);

    Ok(())
}

fn put_str(out: &mut Vec<u8>, s: &str) -> Result<(), CacheError> {
    put_len(out, s.len())?;
    out.extend_from_slice(s.as_bytes());

    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CacheError> {
        if self.bytes.len() < len {
            return Err(CacheError::Truncated);
        }

        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;

        Ok(head)
    }

    fn u32(&mut self) -> Result<u32, CacheError> {
        let bytes = self.take(4)?;

        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn len(&mut self) -> Result<usize, CacheError> {
        Ok(self.u32()? as usize)
    }

    fn str(&mut self) -> Result<&'a str, CacheError> {
        let len = self.len()?;

        Ok(str::from_utf8(self.take(len)?)?)
    }
}

#[cfg(test)]
mod test {
    use crate::cache::{CacheError, CacheFile, VERSION, decode, encode};
    use crate::directory::SubDirectory;
    use crate::icon::{IconEntry, IconFile, IconRecord};
    use crate::index::IconMap;
    use std::fs::File;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn search_dirs() -> Vec<PathBuf> {
        vec![PathBuf::from("/icons"), PathBuf::from("/other")]
    }

    fn sample() -> (Vec<Arc<SubDirectory>>, IconMap) {
        let directories = vec![
            Arc::new(SubDirectory::fixed("16x16/apps", 16)),
            Arc::new(SubDirectory::scalable("scalable/apps", 48, 1, 256)),
        ];

        let mut icons = IconMap::new();
        for (name, files) in [
            ("foo", vec![(0usize, "/icons/t/16x16/apps/foo.png"), (1, "/icons/t/scalable/apps/foo.svg")]),
            ("foo-bar", vec![(1, "/icons/t/scalable/apps/foo-bar.svgz")]),
            ("baz", vec![(0, "/other/t/16x16/apps/baz.xpm"), (0, "/icons/t/16x16/apps/baz.png")]),
        ] {
            let mut record = IconRecord::new(name);
            for (directory, path) in files {
                record.entries.push(IconEntry {
                    directory: Arc::clone(&directories[directory]),
                    file: IconFile::from_path(Path::new(path)).unwrap(),
                });
            }
            icons.insert(name.to_owned(), record);
        }

        (directories, icons)
    }

    #[test]
    fn test_decode_restores_encoded_index() {
        let (directories, icons) = sample();

        let bytes = encode(&search_dirs(), &directories, &icons).unwrap();
        let decoded = decode(&bytes, &search_dirs(), &directories).unwrap();

        assert_eq!(decoded, icons);
        // entries share the theme's directories instead of copies of them
        assert!(Arc::ptr_eq(
            &decoded["foo"].entries[1].directory,
            &directories[1]
        ));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let (directories, icons) = sample();

        assert_eq!(
            encode(&search_dirs(), &directories, &icons).unwrap(),
            encode(&search_dirs(), &directories, &icons.clone()).unwrap()
        );
    }

    #[test]
    fn test_every_truncation_is_rejected() {
        let (directories, icons) = sample();
        let bytes = encode(&search_dirs(), &directories, &icons).unwrap();

        for len in 0..bytes.len() {
            assert!(
                decode(&bytes[..len], &search_dirs(), &directories).is_err(),
                "accepted a cache truncated to {len} bytes"
            );
        }
    }

    #[test]
    fn test_rejects_other_versions_and_junk() {
        let (directories, icons) = sample();
        let mut bytes = encode(&search_dirs(), &directories, &icons).unwrap();

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            decode(&trailing, &search_dirs(), &directories),
            Err(CacheError::TrailingBytes)
        ));

        bytes[4..8].copy_from_slice(&(VERSION + 1).to_le_bytes());
        assert!(matches!(
            decode(&bytes, &search_dirs(), &directories),
            Err(CacheError::UnsupportedVersion(v)) if v == VERSION + 1
        ));

        assert!(matches!(
            decode(b"PNG\0 definitely not a cache", &search_dirs(), &directories),
            Err(CacheError::BadMagic)
        ));
    }

    #[test]
    fn test_rejects_cache_of_other_directories() {
        let (directories, icons) = sample();
        let bytes = encode(&search_dirs(), &directories, &icons).unwrap();

        let reordered = vec![Arc::clone(&directories[1]), Arc::clone(&directories[0])];
        assert!(matches!(
            decode(&bytes, &search_dirs(), &reordered),
            Err(CacheError::DirectoryMismatch)
        ));
        assert!(matches!(
            decode(&bytes, &search_dirs(), &directories[..1]),
            Err(CacheError::DirectoryMismatch)
        ));

        let mut more_search_dirs = search_dirs();
        more_search_dirs.push(PathBuf::from("/opt/app/icons"));
        assert!(matches!(
            decode(&bytes, &more_search_dirs, &directories),
            Err(CacheError::SearchDirectoryMismatch)
        ));
        let reversed: Vec<_> = search_dirs().into_iter().rev().collect();
        assert!(matches!(
            decode(&bytes, &reversed, &directories),
            Err(CacheError::SearchDirectoryMismatch)
        ));
    }

    #[test]
    fn test_rejects_out_of_range_directory_index() {
        let directories = vec![Arc::new(SubDirectory::fixed("16x16/apps", 16))];
        let mut icons = IconMap::new();
        let mut record = IconRecord::new("foo");
        record.entries.push(IconEntry {
            directory: Arc::clone(&directories[0]),
            file: IconFile::from_path(Path::new("/t/16x16/apps/foo.png")).unwrap(),
        });
        icons.insert("foo".into(), record);

        let mut bytes = encode(&search_dirs(), &directories, &icons).unwrap();
        // the directory index of the only entry is the last field in the file
        let last = bytes.len() - 4;
        bytes[last..].copy_from_slice(&7u32.to_le_bytes());

        assert!(matches!(
            decode(&bytes, &search_dirs(), &directories),
            Err(CacheError::IndexOutOfRange)
        ));
    }

    #[test]
    fn test_store_and_freshness() {
        let temp = tempfile::tempdir().unwrap();
        let watched = temp.path().join("icons");
        std::fs::create_dir(&watched).unwrap();

        let cache = CacheFile::for_theme(&temp.path().join("cache"), "birch");
        assert!(!cache.is_fresh(&[&watched]));

        let (directories, icons) = sample();
        cache.store(&search_dirs(), &directories, &icons).unwrap();

        assert!(cache.path().ends_with("cache/birch.cache"));
        assert!(cache.is_fresh(&[&watched]));
        assert_eq!(cache.load(&search_dirs(), &directories).unwrap(), icons);

        let later = SystemTime::now() + Duration::from_secs(60);
        File::open(&watched).unwrap().set_modified(later).unwrap();

        assert!(!cache.is_fresh(&[&watched]));
        // directories that don't exist don't make a cache stale
        assert!(cache.is_fresh(&[temp.path().join("missing")]));
    }
}
