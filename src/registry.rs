use crate::cache::CacheFile;
use crate::directory::SubDirectory;
use crate::icon::{IconFile, IconRecord};
use crate::index::IconIndex;
use crate::search::IconSearch;
use crate::search_dir::SearchDirectories;
use crate::theme::{Theme, ThemeDescriptor};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// The theme every other theme eventually inherits from.
///
/// From the icon theme specification: "If no theme is specified, implementations are required to add the
/// "hicolor" theme to the inheritance tree."
pub const FALLBACK_THEME: &str = "hicolor";

/// Refers to a [Theme] in the [ThemeRegistry] that created it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ThemeKey(usize);

/// All icon themes found in a set of search directories.
///
/// Themes are identified by their id (the name of their directory) or by their display name.
/// Several installs of a theme with the same display name are a single [Theme], reachable
/// through each of their ids.
///
/// The [FALLBACK_THEME] always exists, even if it isn't installed: it is then a theme without
/// any icons.
#[derive(Debug)]
pub struct ThemeRegistry {
    directories: SearchDirectories,
    themes: Vec<Theme>,
    by_id: BTreeMap<String, ThemeKey>,
    by_name: BTreeMap<String, ThemeKey>,
    fallback: ThemeKey,
    default_theme: Option<String>,
}

impl ThemeRegistry {
    /// Finds every theme in the search directories of `search`.
    ///
    /// Parents a theme declares but that aren't installed are dropped. A theme left without
    /// any parent, because it declares none or because none of them is installed, inherits
    /// from the fallback theme.
    pub fn new(search: IconSearch) -> Self {
        let IconSearch {
            directories,
            cache_dir,
            default_theme,
        } = search;

        let directories = directories.deduplicated();
        let search_dirs: Arc<[PathBuf]> = directories.dirs.iter().cloned().collect();

        let index_for = |id: &str, subdirs: Vec<SubDirectory>| {
            let cache = cache_dir
                .as_deref()
                .map(|cache_dir| CacheFile::for_theme(cache_dir, id));

            IconIndex::new(id, subdirs, Arc::clone(&search_dirs), cache)
        };

        let mut themes = Vec::new();
        let mut by_id = BTreeMap::new();
        let mut by_name = BTreeMap::new();

        for location in directories.find_themes() {
            // "The first index.theme found while searching the base directories in order is used"
            if by_id.contains_key(&location.id) {
                continue;
            }

            let mut descriptor = match ThemeDescriptor::parse_from_file(&location.index_path) {
                Ok(descriptor) => descriptor,
                Err(_e) => {
                    #[cfg(feature = "log")]
                    log::debug!("skipping theme candidate {:?} because {_e}", location.id);
                    continue;
                }
            };

            if descriptor.name.is_empty() {
                #[cfg(feature = "log")]
                log::debug!("skipping theme candidate {:?}: it has no name", location.id);
                continue;
            }

            if let Some(&key) = by_name.get(&descriptor.name) {
                // another install of a theme we already know
                by_id.insert(location.id, key);
                continue;
            }

            let key = ThemeKey(themes.len());
            let index = index_for(&location.id, std::mem::take(&mut descriptor.directories));

            by_name.insert(descriptor.name.clone(), key);
            by_id.insert(location.id.clone(), key);
            themes.push(Theme::new(key, location.id, descriptor, index));
        }

        let fallback = match by_id.get(FALLBACK_THEME) {
            Some(&key) => key,
            None => {
                #[cfg(feature = "log")]
                log::info!("theme {FALLBACK_THEME:?} is not installed, using an empty one");

                let key = ThemeKey(themes.len());
                let index = index_for(FALLBACK_THEME, Vec::new());

                themes.push(Theme::empty(key, FALLBACK_THEME.into(), index));
                by_id.insert(FALLBACK_THEME.into(), key);
                by_name.entry(FALLBACK_THEME.into()).or_insert(key);
                key
            }
        };

        // now that every theme exists, link themes to their parents
        for theme in &mut themes {
            if theme.key() == fallback {
                continue;
            }

            let parents: Vec<ThemeKey> = theme
                .parent_ids()
                .iter()
                .filter_map(|parent| {
                    let key = by_id.get(parent).copied();

                    if key.is_none() {
                        #[cfg(feature = "log")]
                        log::debug!(
                            "theme {:?} inherits from {parent:?}, which is not installed",
                            theme.id()
                        );
                    }

                    key
                })
                .collect();

            theme.parents = if parents.is_empty() {
                vec![fallback]
            } else {
                parents
            };
        }

        Self {
            directories,
            themes,
            by_id,
            by_name,
            fallback,
            default_theme,
        }
    }

    pub fn search_directories(&self) -> &SearchDirectories {
        &self.directories
    }

    pub fn theme(&self, key: ThemeKey) -> Option<&Theme> {
        self.themes.get(key.0)
    }

    pub fn themes(&self) -> impl Iterator<Item = &Theme> {
        self.themes.iter()
    }

    /// Get a theme by its id, or directory name, like `gnome-noble`.
    pub fn theme_by_id(&self, id: &str) -> Option<&Theme> {
        self.by_id.get(id).and_then(|&key| self.theme(key))
    }

    /// Get a theme by its human-readable name, like `GNOME Noble`.
    pub fn theme_by_name(&self, name: &str) -> Option<&Theme> {
        self.by_name.get(name).and_then(|&key| self.theme(key))
    }

    pub fn fallback_theme(&self) -> &Theme {
        &self.themes[self.fallback.0]
    }

    /// The theme configured through [IconSearch::with_default_theme] if it is installed,
    /// the fallback theme otherwise.
    pub fn default_theme(&self) -> &Theme {
        self.default_theme
            .as_deref()
            .and_then(|id| self.theme_by_id(id))
            .unwrap_or_else(|| self.fallback_theme())
    }

    /// All theme ids, sorted.
    pub fn theme_ids(&self, include_hidden: bool) -> Vec<&str> {
        self.by_id
            .iter()
            .filter(|&(_, &key)| include_hidden || !self.themes[key.0].hidden())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// All human-readable theme names, sorted.
    pub fn theme_names(&self, include_hidden: bool) -> Vec<&str> {
        self.by_name
            .iter()
            .filter(|&(_, &key)| include_hidden || !self.themes[key.0].hidden())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Index every theme now, instead of when it's first needed.
    pub fn populate_all(&self) {
        for theme in &self.themes {
            theme.index().populate_now();
        }
    }

    /// Find the icon record for `icon_name` in a theme or the themes it inherits from.
    ///
    /// Within each theme, less specific names are tried before moving on to the parents: with
    /// `"folder-open"`, `"folder"` of the theme itself is preferred over `"folder-open"` of a parent.
    /// Parents are searched depth-first, in the order they are declared, and no theme is
    /// searched twice, so inheritance cycles are harmless.
    pub fn lookup(&self, theme: ThemeKey, icon_name: &str) -> Option<&IconRecord> {
        let mut visited = HashSet::new();

        self.lookup_recursive(theme, icon_name, &mut visited)
    }

    fn lookup_recursive(
        &self,
        key: ThemeKey,
        icon_name: &str,
        visited: &mut HashSet<ThemeKey>,
    ) -> Option<&IconRecord> {
        if !visited.insert(key) {
            return None;
        }

        let theme = self.theme(key)?;

        theme.index().lookup(icon_name).or_else(|| {
            theme
                .parents()
                .iter()
                .find_map(|&parent| self.lookup_recursive(parent, icon_name, visited))
        })
    }

    /// Look up the file of an icon by theme id, name and size.
    ///
    /// If the icon has no file for this size, the file with the closest size is returned.
    /// Returns `None` if the theme isn't known, or if neither it nor its parents have the icon.
    pub fn resolve(&self, theme_id: &str, icon_name: &str, size: u32) -> Option<PathBuf> {
        let theme = self.theme_by_id(theme_id)?;
        let entry = self.lookup(theme.key(), icon_name)?.find_entry(size)?;

        Some(entry.file.path.clone())
    }

    /// Like [ThemeRegistry::resolve], but only returns files meant for `size`.
    pub fn resolve_exact(&self, theme_id: &str, icon_name: &str, size: u32) -> Option<PathBuf> {
        let theme = self.theme_by_id(theme_id)?;
        let entry = self.lookup(theme.key(), icon_name)?.find_exact(size)?;

        Some(entry.file.path.clone())
    }

    /// Look up an icon by name, size and theme.
    ///
    /// If the icon is not found in the theme, its parents are checked.
    /// If no theme by the given id exists, the fallback theme is checked.
    /// Icons outside of any theme are the last resort.
    pub fn find_icon(&self, icon_name: &str, size: u32, theme_id: &str) -> Option<IconFile> {
        let theme = self
            .theme_by_id(theme_id)
            .unwrap_or_else(|| self.fallback_theme());

        self.lookup(theme.key(), icon_name)
            .and_then(|record| record.find_entry(size))
            .map(|entry| entry.file.clone())
            .or_else(|| self.lookup_fallback_icon(icon_name))
    }

    /// Find an icon outside of any theme, directly inside one of the search directories.
    pub fn lookup_fallback_icon(&self, icon_name: &str) -> Option<IconFile> {
        self.directories.fallback_icon(icon_name)
    }
}
