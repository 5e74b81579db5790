//! Turns out finding icons correctly on linux is kind of hard, and doing it fast is harder.
//!
//! This crate, `icon-index`, resolves an icon name and a pixel size to an icon file following the
//! XDG icon theme specification, and keeps an index of each theme's icons on disk so that
//! looking up icons doesn't mean walking thousands of files every time an application starts.
//!
//! # Quick start
//!
//! ```no_run
//! let registry = icon_index::IconSearch::default().search();
//!
//! let path = registry.resolve("Adwaita", "document-open", 22);
//!
//! println!("document-open is at {path:?}")
//! ```
//!
//! # High level design
//!
//! 1.  *Finding themes*:
//!
//!     Icon themes live in a directory in the root of one or more "search directories".
//!     The name of that directory is the theme's _id_, and in it lies the theme's definition,
//!     `index.theme`. [IconSearch] decides which directories are searched, and builds a
//!     [ThemeRegistry] holding every theme it finds.
//!
//! 2.  *Linking themes*:
//!
//!     Themes inherit from other themes. The registry links each theme to the parents it declares;
//!     themes that don't declare any inherit from `hicolor`, which always exists.
//!     Inheritance cycles in broken installs are tolerated.
//!
//! 3.  *Indexing a theme*:
//!
//!     The first time a theme is searched, its directories are walked and every icon file is
//!     recorded in an [IconIndex], together with the size rules of the directory it is in.
//!     The index is then written to a cache file, which later runs load instead of walking the
//!     theme again, for as long as no directory of the theme changed.
//!
//! 4.  *Finding icons*:
//!
//!     An icon is looked up by name in a theme, then in its parents. Names that aren't found
//!     are shortened, so `"document-save-as"` may resolve to `"document-save"` or `"document"`.
//!     Once found, the file meant for the requested size is picked, or the one closest to it.

pub mod cache;
mod directory;
mod icon;
mod index;
mod registry;
mod search;
mod search_dir;
pub mod theme;

#[cfg(test)]
mod testing;

pub use directory::*;
pub use icon::*;
pub use index::*;
pub use registry::*;
pub use search::*;
pub use search_dir::*;
pub use theme::{Theme, ThemeDescriptor};
