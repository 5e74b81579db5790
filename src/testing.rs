//! Builds icon directory layouts in a temporary directory for tests.

use crate::search::IconSearch;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) struct IconTree {
    temp: TempDir,
    bases: Vec<String>,
}

impl IconTree {
    /// A tree with one (empty) search directory per name in `bases`, searched in that order.
    pub(crate) fn new(bases: &[&str]) -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");

        for base in bases {
            std::fs::create_dir_all(temp.path().join("icons").join(base))
                .expect("Failed to create search directory");
        }

        Self {
            temp,
            bases: bases.iter().map(|base| base.to_string()).collect(),
        }
    }

    pub(crate) fn base(&self, base: &str) -> PathBuf {
        self.temp.path().join("icons").join(base)
    }

    pub(crate) fn search_dirs(&self) -> Arc<[PathBuf]> {
        self.bases.iter().map(|base| self.base(base)).collect()
    }

    pub(crate) fn cache_dir(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    /// Searches this tree only, caching into [IconTree::cache_dir].
    pub(crate) fn search(&self) -> IconSearch {
        IconSearch::new(self.search_dirs().to_vec()).with_cache_dir(self.cache_dir())
    }

    pub(crate) fn path(&self, base: &str, theme: &str, file: &str) -> PathBuf {
        self.base(base).join(theme).join(file)
    }

    /// Creates an (empty) icon file, returning its path.
    pub(crate) fn icon(&self, base: &str, theme: &str, file: &str) -> PathBuf {
        let path = self.path(base, theme, file);
        let parent = path.parent().expect("icon path has a parent");

        std::fs::create_dir_all(parent).expect("Failed to create icon directory");
        std::fs::write(&path, b"").expect("Failed to write icon");

        path
    }

    /// Writes the `index.theme` of a theme.
    pub(crate) fn theme(&self, base: &str, theme: &str, index: &str) {
        let dir = self.base(base).join(theme);

        std::fs::create_dir_all(&dir).expect("Failed to create theme directory");
        std::fs::write(dir.join("index.theme"), index).expect("Failed to write index.theme");
    }
}
