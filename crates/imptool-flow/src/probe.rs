//! Named-export probing: the checker as a black-box export oracle.
//!
//! To test whether any of N candidate modules exports a named binding, one
//! synthetic document is built with one probe line per candidate and checked
//! in a single call. Each line imports the target identifier under a private
//! alias together with a guaranteed-nonexistent second symbol. A candidate
//! that exports the identifier produces exactly one complaint on its line,
//! about the fake symbol; that provoked error is the success signal. This
//! costs one process round trip per identifier instead of per candidate.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::check::{FlowClient, OracleResult};
use crate::report::FlowReport;

/// The guaranteed-nonexistent named export every probe line imports.
pub const PROBE_SYMBOL: &str = "__imptool_no_such_export__";

// ============================================================================
// Outcome Model
// ============================================================================

/// Per-candidate probe verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The candidate exports the identifier: the only complaint on its line
    /// is the provoked one about the probe symbol.
    Exported,
    /// The candidate resolved but has no such named export.
    NotExported,
    /// Anything else: unresolvable module, syntax error, or no provoked
    /// diagnostic at all (the line was never actually validated).
    OtherError,
}

// ============================================================================
// Document Construction and Interpretation
// ============================================================================

/// Build the synthetic probe document, one line per candidate.
pub fn build_probe_document(identifier: &str, candidates: &[String]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            format!(
                "import {{ {identifier} as x{index}, {PROBE_SYMBOL} as z{index} }} from '{candidate}';"
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classify each candidate line of the probe report.
///
/// Probe line `i` is physical line `i + 1`; diagnostics outside that range
/// are ignored.
pub fn classify_candidates(
    report: &FlowReport,
    identifier: &str,
    candidate_count: usize,
) -> Vec<ProbeOutcome> {
    let provoked_prefix = format!(
        "Cannot import `{PROBE_SYMBOL}` because there is no `{PROBE_SYMBOL}` export in"
    );
    let missing_prefix =
        format!("Cannot import `{identifier}` because there is no `{identifier}` export in");

    let mut provoked = vec![false; candidate_count];
    let mut missing = vec![false; candidate_count];
    let mut other = vec![false; candidate_count];

    for error in &report.errors {
        let Some(fragment) = error.message.first() else {
            continue;
        };
        let line = fragment.line as usize;
        if line == 0 || line > candidate_count {
            continue;
        }
        let slot = line - 1;
        if fragment.descr.starts_with(&provoked_prefix) {
            provoked[slot] = true;
        } else if fragment.descr.starts_with(&missing_prefix) {
            missing[slot] = true;
        } else {
            other[slot] = true;
        }
    }

    (0..candidate_count)
        .map(|i| {
            if missing[i] {
                ProbeOutcome::NotExported
            } else if other[i] {
                ProbeOutcome::OtherError
            } else if provoked[i] {
                ProbeOutcome::Exported
            } else {
                ProbeOutcome::OtherError
            }
        })
        .collect()
}

/// Pick the first candidate, in caller-supplied priority order, whose probe
/// line came back [`ProbeOutcome::Exported`].
pub fn select_candidate(
    report: &FlowReport,
    identifier: &str,
    candidates: &[String],
) -> Option<String> {
    classify_candidates(report, identifier, candidates.len())
        .iter()
        .zip(candidates)
        .find(|(outcome, _)| **outcome == ProbeOutcome::Exported)
        .map(|(_, candidate)| candidate.clone())
}

// ============================================================================
// Probe Cache
// ============================================================================

/// Cache of probe results, keyed by identifier + candidate set.
///
/// Coalesces duplicate external invocations when a caller batches several
/// files that probe the same identifier against the same candidates. Both
/// hits and misses are stored; a miss is a valid, cacheable answer.
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: HashMap<String, Option<String>>,
}

impl ProbeCache {
    /// Stable key: a digest over the identifier and the sorted candidate
    /// list.
    pub fn key(identifier: &str, candidates: &[String]) -> String {
        let mut sorted: Vec<&str> = candidates.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        for candidate in sorted {
            hasher.update(b"\0");
            hasher.update(candidate.as_bytes());
        }
        hex::encode(&hasher.finalize()[..12])
    }

    /// Look up a cached probe result.
    pub fn get(&self, key: &str) -> Option<&Option<String>> {
        self.entries.get(key)
    }

    /// Store a probe result.
    pub fn insert(&mut self, key: String, resolved: Option<String>) {
        self.entries.insert(key, resolved);
    }

    /// Number of cached probes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Client Entry Point
// ============================================================================

impl FlowClient {
    /// Determine which of `candidates` (in priority order) exports
    /// `identifier` as a named binding.
    ///
    /// One `check-contents` call covers the whole candidate list. `Ok(None)`
    /// means no candidate was confirmed; that is a normal outcome, not an
    /// error.
    pub fn probe_named_export(
        &mut self,
        file: &str,
        identifier: &str,
        candidates: &[String],
    ) -> OracleResult<Option<String>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let key = ProbeCache::key(identifier, candidates);
        if let Some(hit) = self.probe_cache.get(&key) {
            debug!(identifier, "probe cache hit");
            return Ok(hit.clone());
        }

        let document = build_probe_document(identifier, candidates);
        let report = self.check_contents(file, &document)?;
        let resolved = select_candidate(&report, identifier, candidates);
        debug!(identifier, resolved = ?resolved, "probe completed");
        self.probe_cache.insert(key, resolved.clone());
        Ok(resolved)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DiagnosticLevel, ErrorReport};

    fn provoked(line: u32) -> ErrorReport {
        ErrorReport::new(
            "infer",
            DiagnosticLevel::Error,
            format!("Cannot import `{PROBE_SYMBOL}` because there is no `{PROBE_SYMBOL}` export in `pkg`."),
            line,
        )
    }

    fn missing(identifier: &str, line: u32) -> ErrorReport {
        ErrorReport::new(
            "infer",
            DiagnosticLevel::Error,
            format!("Cannot import `{identifier}` because there is no `{identifier}` export in `pkg`."),
            line,
        )
    }

    fn candidates(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    mod document {
        use super::*;

        #[test]
        fn one_line_per_candidate_with_private_aliases() {
            let doc = build_probe_document("foo", &candidates(&["pkgA", "./local"]));
            let lines: Vec<&str> = doc.lines().collect();
            assert_eq!(lines.len(), 2);
            assert_eq!(
                lines[0],
                format!("import {{ foo as x0, {PROBE_SYMBOL} as z0 }} from 'pkgA';")
            );
            assert_eq!(
                lines[1],
                format!("import {{ foo as x1, {PROBE_SYMBOL} as z1 }} from './local';")
            );
        }
    }

    mod interpretation {
        use super::*;

        #[test]
        fn provoked_only_line_wins() {
            // Line 1: only the fake symbol is missing -> pkgA exports foo.
            // Line 2: foo itself is missing from pkgB.
            let report = FlowReport {
                errors: vec![provoked(1), provoked(2), missing("foo", 2)],
            };
            let cands = candidates(&["pkgA", "pkgB"]);
            assert_eq!(select_candidate(&report, "foo", &cands).as_deref(), Some("pkgA"));
        }

        #[test]
        fn missing_identifier_is_not_exported() {
            let report = FlowReport {
                errors: vec![provoked(1), missing("foo", 1)],
            };
            let outcomes = classify_candidates(&report, "foo", 1);
            assert_eq!(outcomes, vec![ProbeOutcome::NotExported]);
        }

        #[test]
        fn unrelated_diagnostic_is_other_error() {
            let report = FlowReport {
                errors: vec![
                    provoked(1),
                    ErrorReport::new(
                        "infer",
                        DiagnosticLevel::Error,
                        "Cannot resolve module `pkg`.",
                        1,
                    ),
                ],
            };
            let outcomes = classify_candidates(&report, "foo", 1);
            assert_eq!(outcomes, vec![ProbeOutcome::OtherError]);
        }

        #[test]
        fn silent_line_is_other_error() {
            let report = FlowReport { errors: vec![] };
            let outcomes = classify_candidates(&report, "foo", 1);
            assert_eq!(outcomes, vec![ProbeOutcome::OtherError]);
        }

        #[test]
        fn earliest_exported_candidate_is_selected() {
            let report = FlowReport {
                errors: vec![provoked(1), provoked(2), provoked(3), missing("foo", 1)],
            };
            let cands = candidates(&["a", "b", "c"]);
            assert_eq!(select_candidate(&report, "foo", &cands).as_deref(), Some("b"));
        }

        #[test]
        fn no_exported_candidate_yields_none() {
            let report = FlowReport {
                errors: vec![missing("foo", 1), missing("foo", 2)],
            };
            let cands = candidates(&["a", "b"]);
            assert_eq!(select_candidate(&report, "foo", &cands), None);
        }

        #[test]
        fn diagnostics_outside_probe_lines_are_ignored() {
            let report = FlowReport {
                errors: vec![provoked(1), missing("foo", 99)],
            };
            let cands = candidates(&["a"]);
            assert_eq!(select_candidate(&report, "foo", &cands).as_deref(), Some("a"));
        }
    }

    mod cache {
        use super::*;

        #[test]
        fn key_is_order_insensitive() {
            let a = ProbeCache::key("foo", &candidates(&["x", "y"]));
            let b = ProbeCache::key("foo", &candidates(&["y", "x"]));
            assert_eq!(a, b);
        }

        #[test]
        fn key_depends_on_identifier_and_candidates() {
            let base = ProbeCache::key("foo", &candidates(&["x", "y"]));
            assert_ne!(base, ProbeCache::key("bar", &candidates(&["x", "y"])));
            assert_ne!(base, ProbeCache::key("foo", &candidates(&["x"])));
        }

        #[test]
        fn stores_hits_and_misses() {
            let mut cache = ProbeCache::default();
            cache.insert("k1".to_string(), Some("pkg".to_string()));
            cache.insert("k2".to_string(), None);
            assert_eq!(cache.get("k1"), Some(&Some("pkg".to_string())));
            assert_eq!(cache.get("k2"), Some(&None));
            assert_eq!(cache.get("k3"), None);
            assert_eq!(cache.len(), 2);
        }
    }
}
