//! Host editing surface: resolve identifiers and insert their imports.
//!
//! The one operation exposed to hosts: given file text, the file's path,
//! and a validated project root, find the unresolved identifiers, resolve
//! each through the pipeline, and fold the resulting imports into the text.
//! Identifiers nothing could resolve are reported back, never thrown.

use std::collections::HashSet;
use std::path::Path;

use imptool_core::import::ImportSpec;
use imptool_core::merge::apply_imports;
use imptool_flow::check::{FlowClient, OracleError};
use imptool_flow::report::find_unresolved_identifiers;
use tracing::{debug, warn};

use crate::error::ImpError;
use crate::project::{find_candidate_files, read_manifest, RootDir};
use crate::resolve::{Pipeline, ResolutionContext};

// ============================================================================
// Outcome Types
// ============================================================================

/// Result of resolving a batch of identifiers.
#[derive(Debug)]
pub struct ResolutionOutcome {
    /// Resolved imports, in identifier order.
    pub specs: Vec<ImportSpec>,
    /// Identifiers no strategy could resolve.
    pub unresolved: Vec<String>,
    /// First oracle failure of the run, if any. Resolutions already made by
    /// the cheap strategies are preserved alongside it.
    pub oracle_error: Option<OracleError>,
}

/// Result of one resolve-and-insert operation.
#[derive(Debug)]
pub struct ImportOutcome {
    /// The updated file text (identical to the input when nothing resolved).
    pub text: String,
    /// Imports that were inserted.
    pub resolved: Vec<ImportSpec>,
    /// Identifiers that remain unresolved.
    pub unresolved: Vec<String>,
    /// Oracle failure encountered mid-run, if any.
    pub oracle_error: Option<OracleError>,
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve identifiers one at a time, in caller order.
///
/// An oracle failure is fatal only for the identifiers that still needed the
/// probe: they are reported unresolved, the error is recorded, and the run
/// continues so cheap resolutions are not lost.
pub fn resolve_identifiers(
    identifiers: &[String],
    cx: &ResolutionContext<'_>,
    pipeline: &mut Pipeline,
) -> ResolutionOutcome {
    let mut specs = Vec::new();
    let mut unresolved = Vec::new();
    let mut oracle_error = None;

    for identifier in identifiers {
        match pipeline.resolve(identifier, cx) {
            Ok(Some(spec)) => specs.push(spec),
            Ok(None) => unresolved.push(identifier.clone()),
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "oracle failed, keeping cheap resolutions");
                unresolved.push(identifier.clone());
                if oracle_error.is_none() {
                    oracle_error = Some(e);
                }
            }
        }
    }

    ResolutionOutcome {
        specs,
        unresolved,
        oracle_error,
    }
}

/// Resolve every unresolved identifier in `text` and insert the resulting
/// imports.
///
/// Returns the updated text together with what resolved and what did not;
/// when nothing resolves the text comes back unchanged.
pub fn resolve_and_insert(
    text: &str,
    file: &Path,
    root: &RootDir,
    pattern: &str,
) -> Result<ImportOutcome, ImpError> {
    let rel_file = relative_to_root(file, root)?;
    let manifest = read_manifest(root.as_path())?;
    let installed = manifest.installed_dependency_names();
    let local_files = find_candidate_files(root, pattern)?;

    let client = FlowClient::new(root.as_path())?;
    let report = client.check_contents(&rel_file, text)?;
    let identifiers = dedup_preserving_order(find_unresolved_identifiers(&report));
    debug!(file = %rel_file, count = identifiers.len(), "unresolved identifiers found");

    let mut pipeline = Pipeline::standard(client);
    let cx = ResolutionContext {
        root,
        file: &rel_file,
        local_files: &local_files,
        installed_packages: &installed,
    };
    let resolution = resolve_identifiers(&identifiers, &cx, &mut pipeline);

    let updated = apply_imports(text, &resolution.specs)?;
    Ok(ImportOutcome {
        text: updated,
        resolved: resolution.specs,
        unresolved: resolution.unresolved,
        oracle_error: resolution.oracle_error,
    })
}

fn relative_to_root(file: &Path, root: &RootDir) -> Result<String, ImpError> {
    let rel = file.strip_prefix(root.as_path()).map_err(|_| {
        ImpError::invalid_args(format!(
            "file {} is not under the project root {}",
            file.display(),
            root
        ))
    })?;
    Ok(rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"))
}

/// The checker reports one diagnostic per use site; resolution happens once
/// per name.
fn dedup_preserving_order(identifiers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    identifiers
        .into_iter()
        .filter(|identifier| seen.insert(identifier.clone()))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Resolver;
    use imptool_core::import::ImportKind;
    use std::path::PathBuf;

    struct FixedResolver {
        answer: Option<ImportSpec>,
    }

    impl Resolver for FixedResolver {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn resolve(
            &mut self,
            _identifier: &str,
            _cx: &ResolutionContext<'_>,
        ) -> Result<Option<ImportSpec>, OracleError> {
            Ok(self.answer.clone())
        }
    }

    /// Fails the first call, then stays silent; mirrors a poisoned probe.
    struct FailingResolver {
        failed: bool,
    }

    impl Resolver for FailingResolver {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn resolve(
            &mut self,
            _identifier: &str,
            _cx: &ResolutionContext<'_>,
        ) -> Result<Option<ImportSpec>, OracleError> {
            if self.failed {
                return Ok(None);
            }
            self.failed = true;
            Err(OracleError::SpawnFailed {
                reason: "gone".to_string(),
            })
        }
    }

    fn idents(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn splits_resolved_and_unresolved() {
        let root = RootDir::new_unchecked(PathBuf::from("/project"));
        let cx = ResolutionContext {
            root: &root,
            file: "src/main.js",
            local_files: &[],
            installed_packages: &[],
        };
        let mut pipeline = Pipeline::new(vec![
            Box::new(crate::resolve::NativeModuleResolver),
            Box::new(FixedResolver { answer: None }),
        ]);

        let outcome = resolve_identifiers(&idents(&["path", "mystery"]), &cx, &mut pipeline);
        assert_eq!(outcome.specs.len(), 1);
        assert_eq!(outcome.specs[0].kind, ImportKind::Namespace);
        assert_eq!(outcome.unresolved, vec!["mystery"]);
        assert!(outcome.oracle_error.is_none());
    }

    #[test]
    fn oracle_failure_preserves_cheap_resolutions() {
        let root = RootDir::new_unchecked(PathBuf::from("/project"));
        let cx = ResolutionContext {
            root: &root,
            file: "src/main.js",
            local_files: &[],
            installed_packages: &[],
        };
        let mut pipeline = Pipeline::new(vec![
            Box::new(crate::resolve::NativeModuleResolver),
            Box::new(FailingResolver { failed: false }),
        ]);

        // `mystery` hits the failing external strategy; `path` resolves
        // cheaply before it; `other` arrives after the failure.
        let outcome =
            resolve_identifiers(&idents(&["mystery", "path", "other"]), &cx, &mut pipeline);
        assert_eq!(outcome.specs.len(), 1);
        assert_eq!(outcome.specs[0].source, "path");
        assert_eq!(outcome.unresolved, vec!["mystery", "other"]);
        assert!(matches!(
            outcome.oracle_error,
            Some(OracleError::SpawnFailed { .. })
        ));
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let deduped = dedup_preserving_order(idents(&["b", "a", "b", "c", "a"]));
        assert_eq!(deduped, vec!["b", "a", "c"]);
    }
}
