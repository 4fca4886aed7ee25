//! Project context providers: root discovery, manifest, candidate files.
//!
//! A project root is the nearest ancestor of the target file that holds a
//! `package.json`; it is only valid when it also carries a `.flowconfig`
//! and lists `flow-bin` among its dependencies. The manifest is re-read
//! from disk on every call so stale state never leaks between operations.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Default glob pattern for candidate project files.
pub const DEFAULT_FILE_PATTERN: &str = "src/**/*.js";

/// The dependency every valid project root must list.
const REQUIRED_DEPENDENCY: &str = "flow-bin";

// ============================================================================
// Error Types
// ============================================================================

/// Configuration failures; all of them abort an operation before any
/// resolution starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Root discovery needs an absolute path to walk up from.
    #[error("expected an absolute path, got {}", path.display())]
    NotAbsolute { path: PathBuf },

    /// No manifest anywhere up the directory tree.
    #[error("no package.json found in any parent directory of {}", path.display())]
    NoManifest { path: PathBuf },

    /// The root has a manifest but no static-analysis config.
    #[error("project root {} has no .flowconfig", dir.display())]
    NoStaticConfig { dir: PathBuf },

    /// The root does not depend on the checker.
    #[error("flow-bin must be listed in the dependencies of {}", dir.display())]
    MissingRequiredDependency { dir: PathBuf },

    /// The manifest exists but is not valid JSON.
    #[error("malformed package.json at {}: {reason}", path.display())]
    ManifestParse { path: PathBuf, reason: String },

    /// The candidate-file glob pattern does not compile.
    #[error("invalid file pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    /// IO error while reading project state.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Root Directory
// ============================================================================

/// A validated project root.
///
/// Construction goes through [`find_root_dir`] or [`open_root_dir`], so
/// holders can rely on the manifest, the static config, and the checker
/// dependency all being present at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDir(PathBuf);

impl RootDir {
    /// Wrap a path without validating it.
    ///
    /// # Warning
    /// This skips every root-dir check. Use only when the directory is known
    /// to be valid (e.g., in tests).
    pub fn new_unchecked(path: impl Into<PathBuf>) -> Self {
        RootDir(path.into())
    }

    /// The root directory path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for RootDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for RootDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// The dependency tables of a `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    /// Runtime dependencies.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Development dependencies.
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Whether either dependency table lists `name`.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    /// Names of installed runtime dependencies, in sorted order.
    pub fn installed_dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }
}

/// Read and parse `package.json` from `dir`.
pub fn read_manifest(dir: &Path) -> Result<PackageManifest, ConfigError> {
    let path = dir.join("package.json");
    let text = fs::read_to_string(&path)?;
    serde_json::from_str(&text).map_err(|e| ConfigError::ManifestParse {
        path,
        reason: e.to_string(),
    })
}

// ============================================================================
// Root Discovery
// ============================================================================

/// Walk up from an absolute file path to the nearest directory containing a
/// `package.json`, then validate it as a project root.
pub fn find_root_dir(file: &Path) -> Result<RootDir, ConfigError> {
    if !file.is_absolute() {
        return Err(ConfigError::NotAbsolute {
            path: file.to_path_buf(),
        });
    }

    let mut dir = file.parent();
    while let Some(current) = dir {
        if current.join("package.json").is_file() {
            return validate_root_dir(current);
        }
        dir = current.parent();
    }

    Err(ConfigError::NoManifest {
        path: file.to_path_buf(),
    })
}

/// Validate an explicitly supplied root directory.
pub fn open_root_dir(dir: &Path) -> Result<RootDir, ConfigError> {
    if !dir.join("package.json").is_file() {
        return Err(ConfigError::NoManifest {
            path: dir.to_path_buf(),
        });
    }
    validate_root_dir(dir)
}

fn validate_root_dir(dir: &Path) -> Result<RootDir, ConfigError> {
    if !dir.join(".flowconfig").is_file() {
        return Err(ConfigError::NoStaticConfig {
            dir: dir.to_path_buf(),
        });
    }
    let manifest = read_manifest(dir)?;
    if !manifest.has_dependency(REQUIRED_DEPENDENCY) {
        return Err(ConfigError::MissingRequiredDependency {
            dir: dir.to_path_buf(),
        });
    }
    debug!(root = %dir.display(), "validated project root");
    Ok(RootDir(dir.to_path_buf()))
}

// ============================================================================
// Candidate Files
// ============================================================================

/// Enumerate files under the root matching `pattern`, as root-relative
/// forward-slash paths in sorted order.
pub fn find_candidate_files(root: &RootDir, pattern: &str) -> Result<Vec<String>, ConfigError> {
    let matcher = Glob::new(pattern)
        .map_err(|e| ConfigError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?
        .compile_matcher();

    let mut files = Vec::new();
    for entry in WalkDir::new(root.as_path())
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules" && e.file_name() != ".git")
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root.as_path()) else {
            continue;
        };
        let rel_str = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
        if matcher.is_match(&rel_str) {
            files.push(rel_str);
        }
    }

    files.sort();
    Ok(files)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID_MANIFEST: &str = r#"{
        "name": "fixture",
        "dependencies": { "find-package": "^1.0.0" },
        "devDependencies": { "flow-bin": "^0.96.0" }
    }"#;

    fn valid_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), VALID_MANIFEST).unwrap();
        fs::write(dir.path().join(".flowconfig"), "[ignore]\n").unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/main.js"), "// main\n").unwrap();
        fs::write(dir.path().join("src/nested/util.js"), "// util\n").unwrap();
        fs::write(dir.path().join("src/styles.css"), "body {}\n").unwrap();
        dir
    }

    mod root_discovery {
        use super::*;

        #[test]
        fn walks_up_to_nearest_manifest() {
            let dir = valid_project();
            let file = dir.path().join("src/nested/util.js");
            let root = find_root_dir(&file).unwrap();
            assert_eq!(root.as_path(), dir.path());
        }

        #[test]
        fn rejects_relative_paths() {
            let err = find_root_dir(Path::new("src/main.js")).unwrap_err();
            assert!(matches!(err, ConfigError::NotAbsolute { .. }));
        }

        #[test]
        fn missing_flowconfig_is_rejected() {
            let dir = valid_project();
            fs::remove_file(dir.path().join(".flowconfig")).unwrap();
            let err = find_root_dir(&dir.path().join("src/main.js")).unwrap_err();
            assert!(matches!(err, ConfigError::NoStaticConfig { .. }));
        }

        #[test]
        fn missing_checker_dependency_is_rejected() {
            let dir = valid_project();
            fs::write(
                dir.path().join("package.json"),
                r#"{ "dependencies": { "left-pad": "1" } }"#,
            )
            .unwrap();
            let err = find_root_dir(&dir.path().join("src/main.js")).unwrap_err();
            assert!(matches!(err, ConfigError::MissingRequiredDependency { .. }));
        }

        #[test]
        fn checker_in_runtime_dependencies_is_accepted() {
            let dir = valid_project();
            fs::write(
                dir.path().join("package.json"),
                r#"{ "dependencies": { "flow-bin": "^0.96.0" } }"#,
            )
            .unwrap();
            assert!(find_root_dir(&dir.path().join("src/main.js")).is_ok());
        }

        #[test]
        fn malformed_manifest_is_reported() {
            let dir = valid_project();
            fs::write(dir.path().join("package.json"), "{ not json").unwrap();
            let err = find_root_dir(&dir.path().join("src/main.js")).unwrap_err();
            assert!(matches!(err, ConfigError::ManifestParse { .. }));
        }
    }

    mod manifest {
        use super::*;

        #[test]
        fn lists_runtime_dependencies_sorted() {
            let manifest: PackageManifest = serde_json::from_str(
                r#"{ "dependencies": { "zeta": "1", "alpha": "2" }, "devDependencies": { "flow-bin": "1" } }"#,
            )
            .unwrap();
            assert_eq!(manifest.installed_dependency_names(), vec!["alpha", "zeta"]);
        }

        #[test]
        fn dependency_lookup_covers_both_tables() {
            let manifest: PackageManifest = serde_json::from_str(
                r#"{ "dependencies": { "a": "1" }, "devDependencies": { "b": "1" } }"#,
            )
            .unwrap();
            assert!(manifest.has_dependency("a"));
            assert!(manifest.has_dependency("b"));
            assert!(!manifest.has_dependency("c"));
        }
    }

    mod candidate_files {
        use super::*;

        #[test]
        fn matches_pattern_in_sorted_order() {
            let dir = valid_project();
            let root = RootDir::new_unchecked(dir.path());
            let files = find_candidate_files(&root, DEFAULT_FILE_PATTERN).unwrap();
            assert_eq!(files, vec!["src/main.js", "src/nested/util.js"]);
        }

        #[test]
        fn skips_node_modules() {
            let dir = valid_project();
            fs::create_dir_all(dir.path().join("node_modules/pkg/src")).unwrap();
            fs::write(dir.path().join("node_modules/pkg/src/index.js"), "").unwrap();
            let root = RootDir::new_unchecked(dir.path());
            let files = find_candidate_files(&root, "**/*.js").unwrap();
            assert!(files.iter().all(|f| !f.starts_with("node_modules")));
        }

        #[test]
        fn bad_pattern_is_reported() {
            let dir = valid_project();
            let root = RootDir::new_unchecked(dir.path());
            let err = find_candidate_files(&root, "src/{*.js").unwrap_err();
            assert!(matches!(err, ConfigError::Pattern { .. }));
        }
    }
}
