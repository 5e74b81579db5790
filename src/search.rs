use crate::registry::ThemeRegistry;
use crate::search_dir::SearchDirectories;
use std::path::PathBuf;

/// Name of the directory, inside `$XDG_DATA_HOME`, where icon caches are kept by default.
pub const CACHE_DIR_NAME: &str = "icon-index";

/// Configures how icon themes are found, and builds a [ThemeRegistry] from that.
///
/// # Example
///
/// ```no_run
/// use icon_index::IconSearch;
///
/// let registry = IconSearch::default()
///     .append_directories(["/opt/app/share/icons"])
///     .with_default_theme("breeze")
///     .search();
///
/// let path = registry.resolve(registry.default_theme().id(), "document-open", 22);
/// ```
#[derive(Debug, Clone)]
pub struct IconSearch {
    pub directories: SearchDirectories,
    /// Where each theme's icon cache is written. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// The theme [ThemeRegistry::default_theme] returns if it is installed.
    pub default_theme: Option<String>,
}

impl IconSearch {
    /// Search only `directories`, caching in the default location.
    pub fn new(directories: impl Into<SearchDirectories>) -> Self {
        Self {
            directories: directories.into(),
            cache_dir: default_cache_dir(),
            default_theme: None,
        }
    }

    pub fn append_directories<I, P>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.directories = self.directories.append(directories);
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    /// Always scan themes, never reading or writing cache files.
    pub fn without_cache(mut self) -> Self {
        self.cache_dir = None;
        self
    }

    pub fn with_default_theme(mut self, theme_id: impl Into<String>) -> Self {
        self.default_theme = Some(theme_id.into());
        self
    }

    /// Find all installed themes.
    ///
    /// Themes are only described here; their icons are indexed the first time they are needed.
    pub fn search(self) -> ThemeRegistry {
        ThemeRegistry::new(self)
    }
}

impl Default for IconSearch {
    fn default() -> Self {
        Self::new(SearchDirectories::default())
    }
}

/// `$XDG_DATA_HOME/icon-index`, if there is a data home at all.
pub fn default_cache_dir() -> Option<PathBuf> {
    xdg::BaseDirectories::new()
        .data_home
        .map(|data_home| data_home.join(CACHE_DIR_NAME))
}
