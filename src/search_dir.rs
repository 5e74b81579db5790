use crate::icon::{FileType, IconFile};
use std::path::PathBuf;

/// Icons and icon themes are looked for in a set of directories.
///
/// By default, that is `$HOME/.icons`, `$XDG_DATA_HOME/icons`, `$XDG_DATA_DIRS/icons` and
/// `/usr/share/pixmaps`.
/// Applications may further add their own icon directories to this list, and users may extend or change the list.
/// The default list may be obtained using the `Default` implementation on `SearchDirectories` or its `default` method.
///
/// To add directories to the instance, use [SearchDirectories::append].
///
/// To construct a new `SearchDirectories` from a list, use the `From` implementation or construct it by hand.
///
/// # Example
///
/// ```
/// use icon_index::SearchDirectories;
///
/// let dirs = SearchDirectories::from(["/usr/share/icons", "/usr/share/icons"])
///     .append(["/opt/app/icons"])
///     .deduplicated();
///
/// assert_eq!(dirs.dirs.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDirectories {
    pub dirs: Vec<PathBuf>,
}

/// A directory holding an `index.theme`, found in one of the search directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeLocation {
    /// The theme's internal name, i.e. the name of its directory.
    pub id: String,
    pub index_path: PathBuf,
}

impl SearchDirectories {
    pub fn default() -> Self {
        <Self as Default>::default()
    }

    /// Add a list of directories to this `SearchDirectories`
    ///
    /// # Example
    ///
    /// ```
    /// use icon_index::SearchDirectories;
    ///
    /// let dirs = SearchDirectories::default().append(["/home/root/.icons"]);
    /// ```
    pub fn append<I, P>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.dirs.extend(directories.into_iter().map(Into::into));

        self
    }

    /// Remove repeated directories, keeping the first occurrence of each.
    pub fn deduplicated(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.dirs.len());
        self.dirs.retain(|dir| {
            if seen.contains(dir) {
                false
            } else {
                seen.push(dir.clone());
                true
            }
        });

        self
    }

    /// Find all theme directories, in search order.
    ///
    /// "Each theme is stored as subdirectories of the base directories", and a theme
    /// directory is only a theme's definition if it has an `index.theme`.
    /// A theme may appear once per search directory.
    pub fn find_themes(&self) -> Vec<ThemeLocation> {
        let mut themes = Vec::new();

        for base_dir in &self.dirs {
            let Ok(entries) = base_dir.read_dir() else {
                continue;
            };

            let mut dirs = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_dir()) // follows symlinks
                .collect::<Vec<_>>();
            dirs.sort();

            for dir in dirs {
                let index_path = dir.join("index.theme");
                if !index_path.is_file() {
                    continue;
                }

                let Some(id) = dir.file_name().and_then(|name| name.to_str()) else {
                    #[cfg(feature = "log")]
                    log::debug!("skipping theme candidate {dir:?}: its name isn't utf-8");
                    continue;
                };

                themes.push(ThemeLocation {
                    id: id.to_owned(),
                    index_path,
                });
            }
        }

        themes
    }

    /// Find an icon that doesn't belong to any theme, directly inside a search directory.
    ///
    /// Extensions are tried in the order of [FileType::EXTENSIONS], for each search directory in turn.
    pub fn fallback_icon(&self, icon_name: &str) -> Option<IconFile> {
        if icon_name.is_empty() || icon_name.contains('/') {
            return None;
        }

        self.dirs.iter().find_map(|base_dir| {
            FileType::EXTENSIONS.iter().find_map(|(ext, file_type)| {
                let path = base_dir.join(format!("{icon_name}.{ext}"));

                path.is_file().then(|| IconFile {
                    path,
                    file_type: *file_type,
                })
            })
        })
    }
}

/// Anything that turns into an iterator of things that can become paths, can be turned into a `SearchDirectories`.
impl<I, P> From<I> for SearchDirectories
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    fn from(value: I) -> Self {
        let dirs = value.into_iter().map(Into::into).collect();

        SearchDirectories { dirs }
    }
}

impl Default for SearchDirectories {
    fn default() -> Self {
        // "By default, apps should look in $HOME/.icons (for backwards compatibility),
        // in $XDG_DATA_DIRS/icons
        // and in /usr/share/pixmaps (in that order)."
        // $XDG_DATA_HOME/icons is where most tools install user themes nowadays.

        let xdg = xdg::BaseDirectories::new();

        let mut directories = vec![];

        if let Some(home) = std::env::home_dir() {
            directories.push(home.join(".icons"));
        }

        if let Some(data_home) = xdg.data_home {
            directories.push(data_home.join("icons"));
        }

        xdg.data_dirs
            .into_iter()
            .map(|data_dir| data_dir.join("icons"))
            .for_each(|dir| directories.push(dir));

        directories.push("/usr/share/pixmaps".into());

        SearchDirectories::from(directories).deduplicated()
    }
}
