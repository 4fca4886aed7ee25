//! Merge engine: folding import specs into file text.
//!
//! A spec for a source that is already imported extends the existing
//! declaration; a new source gets a fresh statement inserted next to the
//! import block. Merged statements are always rebuilt from the structured
//! model, never text-edited in place.
//!
//! The batch entry point [`apply_imports`] is atomic from the caller's point
//! of view: it either returns the fully updated text or a single error
//! naming the offending spec, and no partially applied text ever escapes.

use thiserror::Error;
use tracing::debug;

use crate::import::{ImportDeclaration, ImportKind, ImportSpec, ImportSpecifier, ParseError};
use crate::segment::{insertion_line, segment};

// ============================================================================
// Error Types
// ============================================================================

/// Errors produced while merging one spec into a declaration.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The source already binds a default name.
    #[error("'{source}' already binds a default import")]
    ConflictingDefaultImport { source: String },

    /// A namespace specifier may not coexist with any other specifier.
    #[error("cannot combine a namespace import of '{source}' with other specifiers")]
    ConflictingNamespaceImport { source: String },

    /// The existing statement for the source could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Failure of a batch apply, naming the offending spec and reason.
#[derive(Debug, Error)]
#[error("failed to apply {spec} (spec {index}): {reason}")]
pub struct ApplyError {
    /// Position of the failing spec in the batch.
    pub index: usize,
    /// The spec that could not be merged.
    pub spec: ImportSpec,
    /// Why the merge failed.
    #[source]
    pub reason: MergeError,
}

// ============================================================================
// Merging
// ============================================================================

/// Merge `spec` into an existing declaration for its source, or create a
/// fresh declaration when none exists.
///
/// Duplicate identical specifiers are appended, not deduplicated: re-adding
/// the same named import twice produces two specifiers. That is
/// caller-visible, documented behavior.
pub fn merge_one(
    existing: Option<ImportDeclaration>,
    spec: &ImportSpec,
) -> Result<ImportDeclaration, MergeError> {
    let mut decl = match existing {
        None => return Ok(ImportDeclaration::from_spec(spec)),
        Some(decl) => decl,
    };

    match spec.kind {
        ImportKind::Default if decl.has_default() => {
            return Err(MergeError::ConflictingDefaultImport {
                source: spec.source.clone(),
            });
        }
        ImportKind::Namespace if !decl.specifiers.is_empty() => {
            return Err(MergeError::ConflictingNamespaceImport {
                source: spec.source.clone(),
            });
        }
        _ if decl.has_namespace() => {
            return Err(MergeError::ConflictingNamespaceImport {
                source: spec.source.clone(),
            });
        }
        _ => {}
    }

    decl.specifiers.push(ImportSpecifier::from_spec(spec));
    Ok(decl)
}

/// Fold a single spec into file text.
///
/// If the source is already imported inside the import region, the existing
/// statement is merged and rebuilt. Otherwise a new statement is inserted
/// next to the import block (see [`insertion_line`]).
pub fn add_import(text: &str, spec: &ImportSpec) -> Result<String, MergeError> {
    let block = segment(text);
    let mut lines: Vec<String> = text.split('\n').map(|l| l.to_string()).collect();

    match block.find_declaration(&spec.source)? {
        Some(decl) => {
            let span = decl.span.expect("declaration parsed from text carries its span");
            debug!(source = %spec.source, "extending existing import declaration");
            let merged = merge_one(Some(decl), spec)?;
            lines.splice(span.start..span.end, std::iter::once(merged.render()));
        }
        None => {
            let at = insertion_line(text);
            debug!(source = %spec.source, line = at, "inserting new import declaration");
            lines.insert(at, ImportDeclaration::from_spec(spec).render());
        }
    }

    Ok(lines.join("\n"))
}

/// Apply specs strictly in order, each step folding into the text produced
/// by the previous one.
///
/// If merging spec `i` fails the whole call fails; text already modified by
/// specs `0..i` is discarded and the caller never observes a partial
/// result.
pub fn apply_imports(text: &str, specs: &[ImportSpec]) -> Result<String, ApplyError> {
    let mut current = text.to_string();
    for (index, spec) in specs.iter().enumerate() {
        current = add_import(&current, spec).map_err(|reason| ApplyError {
            index,
            spec: spec.clone(),
            reason,
        })?;
    }
    Ok(current)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod merge_one_tests {
        use super::*;

        #[test]
        fn creates_declaration_when_absent() {
            let spec = ImportSpec::named("foo", "mod");
            let decl = merge_one(None, &spec).unwrap();
            assert_eq!(decl.render(), "import { foo } from 'mod';");
        }

        #[test]
        fn default_into_default_conflicts() {
            let decl = merge_one(None, &ImportSpec::default_import("a", "mod")).unwrap();
            let err = merge_one(Some(decl), &ImportSpec::default_import("b", "mod")).unwrap_err();
            assert!(matches!(err, MergeError::ConflictingDefaultImport { .. }));
        }

        #[test]
        fn namespace_into_anything_conflicts() {
            let decl = merge_one(None, &ImportSpec::named("a", "mod")).unwrap();
            let err = merge_one(Some(decl), &ImportSpec::namespace("ns", "mod")).unwrap_err();
            assert!(matches!(err, MergeError::ConflictingNamespaceImport { .. }));
        }

        #[test]
        fn anything_into_namespace_conflicts() {
            let decl = merge_one(None, &ImportSpec::namespace("ns", "mod")).unwrap();
            let err = merge_one(Some(decl), &ImportSpec::named("a", "mod")).unwrap_err();
            assert!(matches!(err, MergeError::ConflictingNamespaceImport { .. }));
        }

        #[test]
        fn named_joins_default() {
            let decl = merge_one(None, &ImportSpec::default_import("def", "mod")).unwrap();
            let decl = merge_one(Some(decl), &ImportSpec::named("a", "mod")).unwrap();
            assert_eq!(decl.render(), "import def, { a } from 'mod';");
        }

        #[test]
        fn type_only_merges_like_named() {
            let decl = merge_one(None, &ImportSpec::default_import("def", "mod")).unwrap();
            let decl = merge_one(Some(decl), &ImportSpec::type_only("T", "mod")).unwrap();
            assert_eq!(decl.render(), "import def, { type T } from 'mod';");
        }

        #[test]
        fn duplicate_named_specifiers_are_kept() {
            let spec = ImportSpec::named("a", "mod");
            let decl = merge_one(None, &spec).unwrap();
            let decl = merge_one(Some(decl), &spec).unwrap();
            assert_eq!(decl.specifiers.len(), 2);
            assert_eq!(decl.render(), "import { a, a } from 'mod';");
        }
    }

    mod add_import_tests {
        use super::*;

        #[test]
        fn extends_existing_declaration() {
            let text = "import { a } from 'mod';\nconst x = 1;\n";
            let out = add_import(text, &ImportSpec::named("b", "mod")).unwrap();
            assert_eq!(out, "import { a, b } from 'mod';\nconst x = 1;\n");
        }

        #[test]
        fn rebuilds_multiline_statement_as_one_line() {
            let text = "import {\n  a,\n} from 'mod';\nconst x = 1;\n";
            let out = add_import(text, &ImportSpec::named("b", "mod")).unwrap();
            assert_eq!(out, "import { a, b } from 'mod';\nconst x = 1;\n");
        }

        #[test]
        fn inserts_new_source_after_imports() {
            let text = "import a from 'x';\nconst y = 1;\n";
            let out = add_import(text, &ImportSpec::default_import("b", "z")).unwrap();
            assert_eq!(out, "import a from 'x';\nimport b from 'z';\nconst y = 1;\n");
        }

        #[test]
        fn inserts_at_top_when_no_imports_or_comments() {
            let text = "const y = 1;\n";
            let out = add_import(text, &ImportSpec::namespace("path", "path")).unwrap();
            assert_eq!(out, "import * as path from 'path';\nconst y = 1;\n");
        }

        #[test]
        fn inserts_after_leading_comment_run() {
            let text = "// @flow\n// header\nconst y = 1;\n";
            let out = add_import(text, &ImportSpec::default_import("b", "z")).unwrap();
            assert_eq!(out, "// @flow\n// header\nimport b from 'z';\nconst y = 1;\n");
        }

        #[test]
        fn imports_after_body_start_are_not_merged() {
            // The import region closed at `const`, so the second statement is
            // body text and a fresh declaration is inserted up top.
            let text = "const y = 1;\nimport { a } from 'mod';\n";
            let out = add_import(text, &ImportSpec::named("b", "mod")).unwrap();
            assert_eq!(
                out,
                "import { b } from 'mod';\nconst y = 1;\nimport { a } from 'mod';\n"
            );
        }
    }

    mod apply_tests {
        use super::*;

        #[test]
        fn applies_specs_in_order() {
            let specs = vec![
                ImportSpec::default_import("a", "x"),
                ImportSpec::named("b", "y"),
                ImportSpec::named("c", "y"),
            ];
            let out = apply_imports("const z = 1;\n", &specs).unwrap();
            assert_eq!(
                out,
                "import a from 'x';\nimport { b, c } from 'y';\nconst z = 1;\n"
            );
        }

        #[test]
        fn empty_spec_list_leaves_text_unchanged() {
            let text = "const z = 1;\n";
            assert_eq!(apply_imports(text, &[]).unwrap(), text);
        }

        #[test]
        fn same_spec_twice_yields_two_specifiers() {
            let spec = ImportSpec::named("a", "mod");
            let out = apply_imports("", &[spec.clone(), spec]).unwrap();
            assert!(out.starts_with("import { a, a } from 'mod';"));
        }

        #[test]
        fn failure_names_offending_spec_and_discards_partial_text() {
            let text = "import def from 'mod';\n";
            let specs = vec![
                ImportSpec::named("ok", "other"),
                ImportSpec::default_import("clash", "mod"),
            ];
            let err = apply_imports(text, &specs).unwrap_err();
            assert_eq!(err.index, 1);
            assert_eq!(err.spec.identifier, "clash");
            assert!(matches!(err.reason, MergeError::ConflictingDefaultImport { .. }));
            // The input text is untouched; the partial merge of spec 0 is
            // not observable anywhere.
            assert_eq!(text, "import def from 'mod';\n");
        }

        #[test]
        fn namespace_import_inserted_at_line_zero() {
            let out = apply_imports(
                "const joined = path.join('a', 'b');\n",
                &[ImportSpec::namespace("path", "path")],
            )
            .unwrap();
            assert_eq!(
                out,
                "import * as path from 'path';\nconst joined = path.join('a', 'b');\n"
            );
        }
    }
}
