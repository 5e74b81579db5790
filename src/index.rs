use crate::cache::CacheFile;
use crate::directory::SubDirectory;
use crate::icon::{FileType, IconEntry, IconFile, IconRecord};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Icons of one theme, by name.
pub type IconMap = HashMap<String, IconRecord>;

/// Where a populated [IconIndex] got its icons from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IndexSource {
    /// The theme's directories were walked.
    Scanned,
    /// A fresh cache file was loaded.
    Cache,
}

#[derive(Debug)]
struct Populated {
    icons: IconMap,
    source: IndexSource,
}

/// The icons available in a single theme (not including its parents).
///
/// An index starts out empty and is populated the first time it is queried, either from its
/// [CacheFile] or by reading `<search directory>/<theme id>/<directory>` for every directory
/// of the theme in every search directory.
/// Population happens exactly once; after that the index never changes.
#[derive(Debug)]
pub struct IconIndex {
    theme_id: String,
    directories: Vec<Arc<SubDirectory>>,
    search_dirs: Arc<[PathBuf]>,
    cache: Option<CacheFile>,
    populated: OnceLock<Populated>,
}

impl IconIndex {
    pub fn new(
        theme_id: impl Into<String>,
        directories: Vec<SubDirectory>,
        search_dirs: Arc<[PathBuf]>,
        cache: Option<CacheFile>,
    ) -> Self {
        Self {
            theme_id: theme_id.into(),
            directories: directories.into_iter().map(Arc::new).collect(),
            search_dirs,
            cache,
            populated: OnceLock::new(),
        }
    }

    pub fn theme_id(&self) -> &str {
        &self.theme_id
    }

    /// The theme's directories, in the order the theme declares them.
    pub fn directories(&self) -> &[Arc<SubDirectory>] {
        &self.directories
    }

    pub fn cache(&self) -> Option<&CacheFile> {
        self.cache.as_ref()
    }

    /// `None` until the index has been populated.
    pub fn source(&self) -> Option<IndexSource> {
        self.populated.get().map(|populated| populated.source)
    }

    /// All icons of this theme, populating the index if that didn't happen yet.
    pub fn icons(&self) -> &IconMap {
        &self.populated.get_or_init(|| self.populate()).icons
    }

    /// Populate the index now instead of on the first lookup.
    pub fn populate_now(&self) -> IndexSource {
        self.populated.get_or_init(|| self.populate()).source
    }

    /// Finds the icon record for `name`, falling back to less specific names.
    ///
    /// `"document-save-as"` is looked up as `"document-save-as"`, then `"document-save"`, then
    /// `"document"`: the first of those present in this theme is returned.
    pub fn lookup(&self, name: &str) -> Option<&IconRecord> {
        let icons = self.icons();

        name_candidates(name).find_map(|candidate| icons.get(candidate))
    }

    fn populate(&self) -> Populated {
        if let Some(cache) = &self.cache {
            if cache.is_fresh(&self.consulted_dirs()) {
                match cache.load(&self.search_dirs, &self.directories) {
                    Ok(icons) => {
                        return Populated {
                            icons,
                            source: IndexSource::Cache,
                        };
                    }
                    Err(_e) => {
                        #[cfg(feature = "log")]
                        log::warn!(
                            "discarding icon cache {:?} of theme {:?}: {_e}",
                            cache.path(),
                            self.theme_id
                        );
                    }
                }
            }
        }

        let icons = self.scan();

        if let Some(cache) = &self.cache {
            if let Err(_e) = cache.store(&self.search_dirs, &self.directories, &icons) {
                #[cfg(feature = "log")]
                log::warn!(
                    "failed to write icon cache {:?} of theme {:?}: {_e}",
                    cache.path(),
                    self.theme_id
                );
            }
        }

        Populated {
            icons,
            source: IndexSource::Scanned,
        }
    }

    /// The directories whose modification time decides whether the cache is still valid:
    /// every search directory, every theme root within them, and the theme's subdirectories.
    pub fn consulted_dirs(&self) -> Vec<PathBuf> {
        let mut consulted = Vec::new();

        for search_dir in self.search_dirs.iter() {
            consulted.push(search_dir.clone());

            let root = search_dir.join(&self.theme_id);
            if !root.is_dir() {
                continue;
            }

            for directory in &self.directories {
                let dir = root.join(directory.path());
                if dir.is_dir() {
                    consulted.push(dir);
                }
            }
            consulted.push(root);
        }

        consulted
    }

    fn scan(&self) -> IconMap {
        if self.directories.is_empty() {
            return IconMap::new();
        }

        // the first declaration of a path wins
        let mut declared = HashSet::new();
        let directories: Vec<(usize, &Arc<SubDirectory>)> = self
            .directories
            .iter()
            .enumerate()
            .filter(|&(_, dir)| declared.insert(dir.path()))
            .collect();

        // (directory, search directory, file type) of every entry, for ordering them below
        let mut found: HashMap<String, Vec<((usize, usize, FileType), IconFile)>> = HashMap::new();

        for (search_idx, search_dir) in self.search_dirs.iter().enumerate() {
            let root = search_dir.join(&self.theme_id);
            if !root.is_dir() {
                continue;
            }

            // every declared directory is read under its own path, even when it links to another
            for &(dir_idx, directory) in &directories {
                for path in files_in(&root.join(directory.path())) {
                    let Some((name, file_type)) = path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .and_then(FileType::split_file_name)
                    else {
                        #[cfg(feature = "log")]
                        log::debug!("skipping {path:?}: not an icon");
                        continue;
                    };

                    let name = name.to_owned();
                    let file = IconFile { path, file_type };

                    found
                        .entry(name)
                        .or_default()
                        .push(((dir_idx, search_idx, file_type), file));
                }
            }
        }

        found
            .into_iter()
            .map(|(name, mut files)| {
                // directories in declared order first, as required for matching sizes
                files.sort_by_key(|(order, _)| *order);

                let entries = files
                    .into_iter()
                    .map(|((dir_idx, _, _), file)| IconEntry {
                        directory: Arc::clone(&self.directories[dir_idx]),
                        file,
                    })
                    .collect();

                let record = IconRecord {
                    name: name.clone(),
                    entries,
                };

                (name, record)
            })
            .collect()
    }
}

/// The names tried when looking up `name`: the name itself, then the name with its last
/// `-`-separated part removed, and so on.
///
/// ```
/// let names: Vec<_> = icon_index::name_candidates("a-b-c").collect();
/// assert_eq!(names, ["a-b-c", "a-b", "a"]);
/// ```
pub fn name_candidates(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(name), |&candidate| {
        candidate.rsplit_once('-').map(|(shorter, _)| shorter)
    })
}

/// The files directly inside `dir`, following symlinks. Subdirectories are not entered.
fn files_in(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let entries = match dir.read_dir() {
        Ok(entries) => entries,
        Err(_e) => {
            #[cfg(feature = "log")]
            log::debug!("can't read {dir:?}: {_e}");
            return Vec::new();
        }
    };

    entries
        .flatten()
        .map(|entry| entry.path())
        // `Path::is_file` follows symlinks, `DirEntry::file_type` doesn't
        .filter(|path| path.is_file())
        .collect()
}
