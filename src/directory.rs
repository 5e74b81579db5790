/// Describes which icon sizes one subdirectory of a theme serves.
///
/// Built from a directory section of a theme's `index.theme`, or inferred from the directory
/// name when the theme doesn't describe it (see [SubDirectory::infer]).
/// A `SubDirectory` can't be changed once built, which keeps the size invariants of each
/// [DirectoryType] intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubDirectory {
    path: String,
    context: Option<String>,
    directory_type: DirectoryType,
    size: u32,
    min_size: u32,
    max_size: u32,
    threshold: u32,
}

/// Threshold used when a directory doesn't specify one.
pub const DEFAULT_THRESHOLD: u32 = 2;

impl SubDirectory {
    /// A directory whose icons are only used at exactly `size` pixels.
    pub fn fixed(path: impl Into<String>, size: u32) -> Self {
        Self {
            path: normalize_path(path.into()),
            context: None,
            directory_type: DirectoryType::Fixed,
            size,
            min_size: size,
            max_size: size,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// A directory of scalable icons, usable anywhere from `min_size` to `max_size`.
    pub fn scalable(path: impl Into<String>, size: u32, min_size: u32, max_size: u32) -> Self {
        let (min_size, max_size) = if min_size <= max_size {
            (min_size, max_size)
        } else {
            (max_size, min_size)
        };

        Self {
            path: normalize_path(path.into()),
            context: None,
            directory_type: DirectoryType::Scalable,
            size,
            min_size,
            max_size,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// A directory of `size` pixel icons that may be used for sizes up to `threshold` away.
    pub fn threshold(path: impl Into<String>, size: u32, threshold: u32) -> Self {
        Self {
            path: normalize_path(path.into()),
            context: None,
            directory_type: DirectoryType::Threshold,
            size,
            min_size: size,
            max_size: size,
            threshold,
        }
    }

    /// Guess the size rule of a directory from its name, the way most themes lay themselves out.
    ///
    /// A path segment like `48x48` (or `48x48@2`) gives a threshold directory of size 48,
    /// a segment named `scalable` gives a scalable directory covering 1 to 256 pixels.
    ///
    /// ```
    /// use icon_index::{DirectoryType, SubDirectory};
    ///
    /// let dir = SubDirectory::infer("48x48/apps").unwrap();
    /// assert_eq!(dir.directory_type(), DirectoryType::Threshold);
    /// assert_eq!(dir.size(), 48);
    ///
    /// assert!(SubDirectory::infer("apps").is_none());
    /// ```
    pub fn infer(path: &str) -> Option<Self> {
        for segment in path.split('/') {
            if segment.eq_ignore_ascii_case("scalable") {
                return Some(Self::scalable(path, 48, 1, 256));
            }

            let dimensions = segment.split_once('@').map_or(segment, |(dim, _scale)| dim);
            if let Some((width, height)) = dimensions.split_once('x') {
                if let (Ok(width), Ok(height)) = (width.parse::<u32>(), height.parse::<u32>()) {
                    if width == height {
                        return Some(Self::threshold(path, width, DEFAULT_THRESHOLD));
                    }
                }
            }
        }

        None
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// The path of this directory relative to the theme directory, e.g. `48x48/apps`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn directory_type(&self) -> DirectoryType {
        self.directory_type
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn min_size(&self) -> u32 {
        self.min_size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn threshold_value(&self) -> u32 {
        self.threshold
    }

    /// Whether icons in this directory may be used as-is for an icon of `icon_size` pixels.
    pub fn matches(&self, icon_size: u32) -> bool {
        match self.directory_type {
            DirectoryType::Fixed => self.size == icon_size,
            DirectoryType::Scalable => (self.min_size..=self.max_size).contains(&icon_size),
            DirectoryType::Threshold => {
                let (lower, upper) = self.threshold_bounds();

                (lower..=upper).contains(&icon_size)
            }
        }
    }

    /// How far `icon_size` is from the sizes this directory serves; zero if it [matches](Self::matches).
    pub fn distance(&self, icon_size: u32) -> u32 {
        let (lower, upper) = match self.directory_type {
            DirectoryType::Fixed => (self.size, self.size),
            DirectoryType::Scalable => (self.min_size, self.max_size),
            DirectoryType::Threshold => self.threshold_bounds(),
        };

        if icon_size < lower {
            lower - icon_size
        } else if icon_size > upper {
            icon_size - upper
        } else {
            0 // within range -> no distance!
        }
    }

    fn threshold_bounds(&self) -> (u32, u32) {
        (
            self.size.saturating_sub(self.threshold),
            self.size.saturating_add(self.threshold),
        )
    }
}

fn normalize_path(path: String) -> String {
    let trimmed = path.trim().trim_matches('/');

    if trimmed.len() == path.len() {
        path
    } else {
        trimmed.to_owned()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DirectoryType {
    Fixed,
    Scalable,
    Threshold,
}

impl TryFrom<&str> for DirectoryType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = match value {
            "Fixed" => DirectoryType::Fixed,
            "Scalable" => DirectoryType::Scalable,
            "Threshold" => DirectoryType::Threshold,
            _ => return Err(()),
        };

        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use crate::directory::{DirectoryType, SubDirectory};

    #[test]
    fn test_fixed_matches_only_its_size() {
        let dir = SubDirectory::fixed("32x32/apps", 32);

        for size in 1..=128 {
            assert_eq!(dir.matches(size), size == 32);
            assert_eq!(dir.distance(size), size.abs_diff(32));
        }

        assert_eq!(dir.min_size(), 32);
        assert_eq!(dir.max_size(), 32);
    }

    #[test]
    fn test_scalable_range() {
        let dir = SubDirectory::scalable("scalable/apps", 48, 16, 256);

        for size in 16..=256 {
            assert!(dir.matches(size));
            assert_eq!(dir.distance(size), 0);
        }

        assert!(!dir.matches(15));
        assert_eq!(dir.distance(10), 6);
        assert_eq!(dir.distance(300), 44);
    }

    #[test]
    fn test_scalable_bounds_are_ordered() {
        let dir = SubDirectory::scalable("scalable", 48, 256, 16);

        assert_eq!(dir.min_size(), 16);
        assert_eq!(dir.max_size(), 256);
    }

    #[test]
    fn test_threshold_distance_to_nearest_bound() {
        let dir = SubDirectory::threshold("32x32/apps", 32, 2);

        for size in 30..=34 {
            assert!(dir.matches(size));
            assert_eq!(dir.distance(size), 0);
        }

        assert!(!dir.matches(29));
        assert!(!dir.matches(35));
        // below: measured against size - threshold
        assert_eq!(dir.distance(24), 6);
        // above: measured against size + threshold
        assert_eq!(dir.distance(48), 14);
    }

    #[test]
    fn test_threshold_larger_than_size() {
        let dir = SubDirectory::threshold("2x2", 2, 5);

        assert!(dir.matches(0));
        assert!(dir.matches(7));
        assert_eq!(dir.distance(10), 3);
    }

    #[test]
    fn test_infer_from_directory_name() {
        let dir = SubDirectory::infer("apps/22x22").unwrap();
        assert_eq!(dir.directory_type(), DirectoryType::Threshold);
        assert_eq!(dir.size(), 22);
        assert_eq!(dir.path(), "apps/22x22");

        let dir = SubDirectory::infer("64x64@2/actions").unwrap();
        assert_eq!(dir.size(), 64);

        let dir = SubDirectory::infer("scalable/status").unwrap();
        assert_eq!(dir.directory_type(), DirectoryType::Scalable);
        assert!(dir.matches(1));
        assert!(dir.matches(256));

        assert!(SubDirectory::infer("32x48/apps").is_none());
        assert!(SubDirectory::infer("symbolic").is_none());
    }

    #[test]
    fn test_path_is_normalized() {
        let dir = SubDirectory::fixed("/16x16/apps/", 16);

        assert_eq!(dir.path(), "16x16/apps");
    }
}
