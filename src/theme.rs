use crate::directory::{DEFAULT_THRESHOLD, DirectoryType, SubDirectory};
use crate::index::IconIndex;
use crate::registry::ThemeKey;
use crate::theme::ThemeParseError::MissingRequiredAttribute;
use freedesktop_entry_parser::low_level::{EntryIter, SectionBytes};
use std::path::Path;

/// An icon theme known to a [ThemeRegistry](crate::ThemeRegistry).
///
/// Parents are stored as [ThemeKey]s into the registry that owns this theme, in the order
/// the theme declares them.
#[derive(Debug)]
pub struct Theme {
    key: ThemeKey,
    id: String,
    name: String,
    hidden: bool,
    example: Option<String>,
    parent_ids: Vec<String>,
    pub(crate) parents: Vec<ThemeKey>,
    index: IconIndex,
}

impl Theme {
    pub(crate) fn new(
        key: ThemeKey,
        id: String,
        descriptor: ThemeDescriptor,
        index: IconIndex,
    ) -> Self {
        Self {
            key,
            id,
            name: descriptor.name,
            hidden: descriptor.hidden,
            example: descriptor.example,
            parent_ids: descriptor.inherits,
            parents: Vec::new(),
            index,
        }
    }

    /// A theme without an `index.theme`: it has no directories, and is named after its id.
    pub(crate) fn empty(key: ThemeKey, id: String, index: IconIndex) -> Self {
        Self {
            key,
            name: id.clone(),
            id,
            hidden: false,
            example: None,
            parent_ids: Vec::new(),
            parents: Vec::new(),
            index,
        }
    }

    pub fn key(&self) -> ThemeKey {
        self.key
    }

    /// The theme's internal name: the name of its directory, e.g. `gnome-noble`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The human-readable name, e.g. `GNOME Noble`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Name of an icon that shows what this theme looks like, if the theme has one.
    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }

    /// The parents listed in the theme's `Inherits`, whether or not they are installed.
    pub fn parent_ids(&self) -> &[String] {
        &self.parent_ids
    }

    /// The parents this theme actually inherits from.
    pub fn parents(&self) -> &[ThemeKey] {
        &self.parents
    }

    pub fn index(&self) -> &IconIndex {
        &self.index
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ThemeParseError {
    #[error("missing Icon Theme index or section")]
    NotAnIconTheme,
    #[error("missing attribute `{0}`")]
    MissingRequiredAttribute(&'static str),
    #[error("the input wasn't in utf-8")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("a number was expected but failed to parse")]
    ParseNumError(#[from] std::num::ParseIntError),
    #[error("A directory type was invalid")]
    InvalidDirectoryType,
    #[error("invalid format for a freedesktop entry file")]
    ParseError(#[from] freedesktop_entry_parser::ParseError),
}

/// The contents of a theme's `index.theme`.
#[derive(Debug, Clone, Default)]
pub struct ThemeDescriptor {
    pub name: String,
    pub comment: String,
    pub inherits: Vec<String>,
    pub directories: Vec<SubDirectory>,
    pub hidden: bool,
    pub example: Option<String>,
}

impl ThemeDescriptor {
    pub fn parse_from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let descriptor = ThemeDescriptor::parse(&bytes).map_err(std::io::Error::other)?;

        Ok(descriptor)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ThemeParseError> {
        let mut entry: EntryIter = freedesktop_entry_parser::low_level::parse_entry(bytes);

        let icon_theme_section: SectionBytes =
            entry.next().ok_or(ThemeParseError::NotAnIconTheme)??;
        if icon_theme_section.title != b"Icon Theme" {
            return Err(ThemeParseError::NotAnIconTheme);
        }

        let name: &str = find_attr_req(&icon_theme_section, "Name")?;

        // `Comment` is required by the icon theme specification, but most icon theme developers
        // can't be arsed to include it! We choose a default of an empty string instead.
        let comment = find_attr(&icon_theme_section, "Comment")?.unwrap_or("");
        let inherits = find_attr(&icon_theme_section, "Inherits")?
            .iter()
            .flat_map(|s| s.split([',', ':']))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Into::into)
            .collect::<Vec<_>>();
        let hidden = find_attr(&icon_theme_section, "Hidden")?
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let example = find_attr(&icon_theme_section, "Example")?
            .map(str::trim)
            .filter(|s| !s.is_empty());

        // `ScaledDirectories` are plain directories as far as sizes go
        let mut listed: Vec<&str> = Vec::new();
        for key in ["Directories", "ScaledDirectories"] {
            for dir in find_attr(&icon_theme_section, key)?.iter().flat_map(|s| s.split(',')) {
                let dir = dir.trim().trim_matches('/');
                if !dir.is_empty() && !listed.contains(&dir) {
                    listed.push(dir);
                }
            }
        }

        // all other sections should describe a directory in the directory list
        let mut sections: Vec<SectionBytes> = entry.filter_map(Result::ok).collect();

        let directories = listed
            .iter()
            .filter_map(|&dir| {
                let section = sections
                    .iter()
                    .position(|section| section.title == dir.as_bytes())
                    .map(|idx| sections.swap_remove(idx));

                let parsed = match &section {
                    Some(section) => parse_directory(dir, section),
                    None => Err(MissingRequiredAttribute("Size")),
                };

                // a directory that isn't described properly can often still be used,
                // as long as its name gives away its size.
                match parsed {
                    Ok(directory) => Some(directory),
                    Err(_e) => {
                        let inferred = SubDirectory::infer(dir);

                        #[cfg(feature = "log")]
                        log::debug!(
                            "directory {dir:?} is not described properly ({_e}), {}",
                            if inferred.is_some() {
                                "inferring its size from its name"
                            } else {
                                "skipping it"
                            }
                        );

                        inferred
                    }
                }
            })
            .collect();

        Ok(Self {
            name: name.trim().into(),
            comment: comment.into(),
            inherits,
            directories,
            hidden,
            example: example.map(Into::into),
        })
    }
}

fn parse_directory(dir_name: &str, section: &SectionBytes) -> Result<SubDirectory, ThemeParseError> {
    let size: u32 = find_attr_req(section, "Size")?.trim().parse()?;
    let context = find_attr(section, "Context")?;
    // Valid types are Fixed, Scalable and Threshold.
    // If not specified, the default is Threshold.
    let directory_type = find_attr(section, "Type")?
        .map(|s| s.trim().try_into())
        .transpose()
        .map_err(|_| ThemeParseError::InvalidDirectoryType)?
        .unwrap_or(DirectoryType::Threshold);
    let max_size = find_num(section, "MaxSize")?.unwrap_or(size);
    let min_size = find_num(section, "MinSize")?.unwrap_or(size);
    let threshold = find_num(section, "Threshold")?.unwrap_or(DEFAULT_THRESHOLD);

    let directory = match directory_type {
        DirectoryType::Fixed => SubDirectory::fixed(dir_name, size),
        DirectoryType::Scalable => SubDirectory::scalable(dir_name, size, min_size, max_size),
        DirectoryType::Threshold => SubDirectory::threshold(dir_name, size, threshold),
    };

    Ok(directory.with_context(context.map(Into::into)))
}

fn find_attr<'a>(
    section: &'a SectionBytes,
    name: &str,
) -> Result<Option<&'a str>, std::str::Utf8Error> {
    section
        .attrs
        .iter()
        .find(|attr| attr.name == name.as_bytes() && attr.param.is_none())
        .map(|attr| str::from_utf8(attr.value))
        .transpose()
}

fn find_attr_req<'a>(
    section: &'a SectionBytes,
    name: &'static str,
) -> Result<&'a str, ThemeParseError> {
    find_attr(section, name)?.ok_or(MissingRequiredAttribute(name))
}

fn find_num(section: &SectionBytes, name: &str) -> Result<Option<u32>, ThemeParseError> {
    let num = find_attr(section, name)?
        .map(|s| s.trim().parse())
        .transpose()?;

    Ok(num)
}

#[cfg(test)]
mod test {
    use crate::directory::DirectoryType;
    use crate::theme::{ThemeDescriptor, ThemeParseError};
    use std::error::Error;

    #[test]
    fn test_parse_example_theme() -> Result<(), Box<dyn Error>> {
        static EXAMPLE: &'static str = include_str!("../resources/example.index.theme");

        let descriptor = ThemeDescriptor::parse(EXAMPLE.as_bytes())?;

        assert_eq!(descriptor.name, "Birch");
        assert_eq!(descriptor.comment, "Icon theme with a wooden look");
        assert_eq!(descriptor.inherits, vec!["wood", "default"]);

        let directories = descriptor.directories;

        assert_eq!(directories.len(), 7);

        let first_dir = &directories[0];
        assert_eq!(first_dir.path(), "scalable/apps");
        assert_eq!(first_dir.size(), 48);
        assert_eq!(first_dir.context(), Some("Applications"));
        assert_eq!(first_dir.directory_type(), DirectoryType::Scalable);
        assert_eq!(first_dir.max_size(), 256);
        assert_eq!(first_dir.min_size(), 1);

        let fixed = &directories[1];
        assert_eq!(fixed.path(), "48x48/apps");
        assert_eq!(fixed.directory_type(), DirectoryType::Fixed);
        assert_eq!(fixed.min_size(), 48);
        assert_eq!(fixed.max_size(), 48);

        let threshold = &directories[2];
        assert_eq!(threshold.path(), "32x32/apps");
        assert_eq!(threshold.directory_type(), DirectoryType::Threshold);
        assert_eq!(threshold.threshold_value(), 2);

        assert_eq!(descriptor.hidden, false);
        assert_eq!(descriptor.example.as_deref(), Some("folder"));

        Ok(())
    }

    #[test]
    fn test_undescribed_directories_are_inferred_or_skipped() -> Result<(), Box<dyn Error>> {
        let descriptor = ThemeDescriptor::parse(
            b"[Icon Theme]\n\
              Name=Sparse\n\
              Hidden=True\n\
              Directories=22x22/actions,symbolic/actions,24x24/status\n\
              \n\
              [24x24/status]\n\
              Size=not-a-number\n",
        )?;

        assert!(descriptor.hidden);
        assert!(descriptor.inherits.is_empty());

        let paths: Vec<_> = descriptor.directories.iter().map(|d| d.path()).collect();
        assert_eq!(paths, vec!["22x22/actions", "24x24/status"]);
        assert_eq!(descriptor.directories[1].size(), 24);

        Ok(())
    }

    #[test]
    fn test_missing_name_is_an_error() {
        let result = ThemeDescriptor::parse(b"[Icon Theme]\nDirectories=16x16\n");

        assert!(matches!(
            result,
            Err(ThemeParseError::MissingRequiredAttribute("Name"))
        ));
    }

    #[test]
    fn test_other_first_section_is_not_a_theme() {
        let result = ThemeDescriptor::parse(b"[Desktop Entry]\nName=Firefox\n");

        assert!(matches!(result, Err(ThemeParseError::NotAnIconTheme)));
    }
}
