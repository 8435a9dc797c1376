//! Candidate filter applied to every file the walker discovers.
//!
//! The filter is a pure predicate over a path and its size. It is racy by
//! nature: a file accepted here may vanish or change before it is hashed, and
//! later stages treat that as a per-file error.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;

/// Inclusion predicate built from the size bounds and extension allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    min_size: u64,
    max_size: Option<u64>,
    allowed_extensions: Option<BTreeSet<String>>,
}

impl FileFilter {
    /// Create a filter.
    ///
    /// Extensions are normalized with [`FileFilter::normalize_extension`], so
    /// `"JPG"`, `".jpg"` and `"jpg"` are equivalent.
    #[must_use]
    pub fn new(
        min_size: u64,
        max_size: Option<u64>,
        allowed_extensions: Option<BTreeSet<String>>,
    ) -> Self {
        Self {
            min_size,
            max_size,
            allowed_extensions: allowed_extensions.map(|exts| {
                exts.iter()
                    .map(|e| Self::normalize_extension(e))
                    .filter(|e| e.len() > 1)
                    .collect()
            }),
        }
    }

    /// Lower-case an extension and make sure it carries a leading dot.
    ///
    /// ```
    /// use dupehunter::scanner::FileFilter;
    ///
    /// assert_eq!(FileFilter::normalize_extension("JPG"), ".jpg");
    /// assert_eq!(FileFilter::normalize_extension(" .Png "), ".png");
    /// ```
    #[must_use]
    pub fn normalize_extension(ext: &str) -> String {
        let ext = ext.trim().to_lowercase();
        if ext.starts_with('.') {
            ext
        } else {
            format!(".{ext}")
        }
    }

    /// Decide whether `path` with the given `size` qualifies for scanning.
    ///
    /// Rejects files outside `[min_size, max_size]`, files whose lower-cased
    /// extension is not allowed, and paths that are not a readable regular
    /// file at the instant of the check.
    #[must_use]
    pub fn include(&self, path: &Path, size: u64) -> bool {
        self.passes_size_filter(size) && self.passes_extension_filter(path) && is_readable_file(path)
    }

    /// Check the size bounds only.
    #[must_use]
    pub fn passes_size_filter(&self, size: u64) -> bool {
        if size < self.min_size {
            return false;
        }
        if let Some(max) = self.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// Check the extension allow-list only.
    #[must_use]
    pub fn passes_extension_filter(&self, path: &Path) -> bool {
        let Some(allowed) = &self.allowed_extensions else {
            return true;
        };

        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| allowed.contains(&format!(".{}", e.to_lowercase())))
    }
}

fn is_readable_file(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => File::open(path).is_ok(),
        _ => false,
    }
}
