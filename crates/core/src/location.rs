//! Call-site capture: source file, line and the running test's name

use std::fmt;
use std::path::{Path, PathBuf};

/// Where an assertion was written, as captured by `file!()`, `line!()` and
/// `env!("CARGO_MANIFEST_DIR")`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub manifest_dir: &'static str,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, manifest_dir: &'static str) -> Self {
        Self {
            file,
            line,
            manifest_dir,
        }
    }

    /// Absolute path of the source file.
    ///
    /// `file!()` is relative to whichever directory rustc was invoked from:
    /// the package for standalone crates, the workspace root for members.
    /// The nearest ancestor of the manifest dir containing the file wins.
    pub fn source_path(&self) -> PathBuf {
        let file = Path::new(self.file);
        if file.is_absolute() {
            return file.to_path_buf();
        }
        let manifest_dir = Path::new(self.manifest_dir);
        manifest_dir
            .ancestors()
            .map(|dir| dir.join(file))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| manifest_dir.join(file))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[doc(hidden)]
pub fn type_name_of<T>(_: T) -> &'static str {
    std::any::type_name::<T>()
}

/// Reduce the type name of a marker fn nested in a test to the test's name:
/// `my_crate::tests::renders_header::{{closure}}::f` becomes `renders_header`.
#[doc(hidden)]
pub fn test_name_from_type_name(type_name: &str) -> String {
    let path = type_name.strip_suffix("::f").unwrap_or(type_name);
    path.rsplit("::")
        .find(|segment| !segment.starts_with("{{"))
        .unwrap_or(path)
        .to_string()
}

/// Capture the current [`SourceLocation`].
#[macro_export]
macro_rules! source_location {
    () => {
        $crate::SourceLocation::new(file!(), line!(), env!("CARGO_MANIFEST_DIR"))
    };
}

/// Name of the enclosing function.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        $crate::location::test_name_from_type_name($crate::location::type_name_of(f))
    }};
}
