//! Identifier resolution pipeline.
//!
//! An ordered, short-circuiting chain of resolver strategies turns one free
//! identifier into at most one [`ImportSpec`]. Cheap local heuristics run
//! first; the strategy that needs an external checker call runs last. Every
//! strategy sits behind the same [`Resolver`] capability interface, so the
//! chain is just a list walked in priority order.

use imptool_core::import::ImportSpec;
use imptool_flow::check::{FlowClient, OracleError};
use tracing::debug;

use crate::project::RootDir;

// ============================================================================
// Context and Capability Interface
// ============================================================================

/// Per-call inputs for one resolution run. Immutable for its duration.
#[derive(Debug)]
pub struct ResolutionContext<'a> {
    /// The validated project root.
    pub root: &'a RootDir,
    /// Root-relative path of the file being edited (forward slashes).
    pub file: &'a str,
    /// Root-relative candidate project files.
    pub local_files: &'a [String],
    /// Installed dependency package names.
    pub installed_packages: &'a [String],
}

/// One resolution strategy.
pub trait Resolver {
    /// Stable strategy name for logs.
    fn name(&self) -> &'static str;

    /// Resolve `identifier` to an import, or `None` when this strategy has
    /// no answer. Only strategies that talk to the checker can fail.
    fn resolve(
        &mut self,
        identifier: &str,
        cx: &ResolutionContext<'_>,
    ) -> Result<Option<ImportSpec>, OracleError>;
}

// ============================================================================
// Name Matching
// ============================================================================

/// Node.js built-in module names.
const NATIVE_MODULES: &[&str] = &[
    "async_hooks",
    "assert",
    "buffer",
    "child_process",
    "console",
    "constants",
    "crypto",
    "cluster",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "zlib",
];

/// Convert a package or file name to camel case (`find-package` becomes
/// `findPackage`).
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '$' {
            if upper_next && !out.is_empty() {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }
    out
}

/// Total-string, case-insensitive comparison of an identifier against the
/// camel-cased form of a package or file name. Never substring or fuzzy.
fn matches_identifier(identifier: &str, name: &str) -> bool {
    identifier.to_lowercase() == camel_case(name).to_lowercase()
}

/// Build the module path for importing `target` from `base_file`, both
/// root-relative. Always prefixed with `./` or `../`, `.js` extension
/// stripped.
fn relative_import_path(base_file: &str, target: &str) -> String {
    let base_dir: Vec<&str> = match base_file.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target_parts: Vec<&str> = target.split('/').collect();

    let mut common = 0;
    while common < base_dir.len()
        && common + 1 < target_parts.len()
        && base_dir[common] == target_parts[common]
    {
        common += 1;
    }

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..base_dir.len() {
        parts.push("..");
    }
    parts.extend(&target_parts[common..]);

    let mut result = parts.join("/");
    if !result.starts_with("../") {
        result = format!("./{result}");
    }
    if let Some(stripped) = result.strip_suffix(".js") {
        result = stripped.to_string();
    }
    result
}

// ============================================================================
// Strategies
// ============================================================================

/// Strategy 1: the identifier names a platform built-in module; import the
/// whole module as a namespace.
pub struct NativeModuleResolver;

impl Resolver for NativeModuleResolver {
    fn name(&self) -> &'static str {
        "native-module"
    }

    fn resolve(
        &mut self,
        identifier: &str,
        _cx: &ResolutionContext<'_>,
    ) -> Result<Option<ImportSpec>, OracleError> {
        Ok(NATIVE_MODULES
            .iter()
            .find(|module| matches_identifier(identifier, module))
            .map(|module| ImportSpec::namespace(identifier, *module)))
    }
}

/// Strategy 2: the identifier names an installed dependency; import its
/// default export.
pub struct InstalledPackageResolver;

impl Resolver for InstalledPackageResolver {
    fn name(&self) -> &'static str {
        "installed-package"
    }

    fn resolve(
        &mut self,
        identifier: &str,
        cx: &ResolutionContext<'_>,
    ) -> Result<Option<ImportSpec>, OracleError> {
        Ok(cx
            .installed_packages
            .iter()
            .find(|package| matches_identifier(identifier, package))
            .map(|package| ImportSpec::default_import(identifier, package.clone())))
    }
}

/// Strategy 3: the identifier names a candidate project file; import its
/// default export by relative path.
pub struct ProjectFileResolver;

impl Resolver for ProjectFileResolver {
    fn name(&self) -> &'static str {
        "project-file"
    }

    fn resolve(
        &mut self,
        identifier: &str,
        cx: &ResolutionContext<'_>,
    ) -> Result<Option<ImportSpec>, OracleError> {
        let matched = cx
            .local_files
            .iter()
            .filter(|file| file.ends_with(".js"))
            .find(|file| {
                let name = file.rsplit('/').next().unwrap_or(file);
                let stem = name.strip_suffix(".js").unwrap_or(name);
                matches_identifier(identifier, stem)
            });

        Ok(matched.map(|file| {
            ImportSpec::default_import(identifier, relative_import_path(cx.file, file))
        }))
    }
}

/// Strategy 4: probe local files and installed packages for a named export
/// matching the identifier (one checker call per identifier).
///
/// After the first oracle failure the resolver is poisoned and answers
/// `None` for the rest of the run, so resolutions already produced by the
/// cheap strategies survive a dead checker.
pub struct NamedExportResolver {
    client: FlowClient,
    poisoned: bool,
}

impl NamedExportResolver {
    /// Wrap a checker client.
    pub fn new(client: FlowClient) -> Self {
        NamedExportResolver {
            client,
            poisoned: false,
        }
    }
}

impl Resolver for NamedExportResolver {
    fn name(&self) -> &'static str {
        "named-export-probe"
    }

    fn resolve(
        &mut self,
        identifier: &str,
        cx: &ResolutionContext<'_>,
    ) -> Result<Option<ImportSpec>, OracleError> {
        if self.poisoned {
            debug!(identifier, "skipping probe, oracle previously failed");
            return Ok(None);
        }

        let mut importables: Vec<String> = cx
            .local_files
            .iter()
            .map(|file| relative_import_path(cx.file, file))
            .collect();
        importables.extend(cx.installed_packages.iter().cloned());

        match self.client.probe_named_export(cx.file, identifier, &importables) {
            Ok(Some(source)) => Ok(Some(ImportSpec::named(identifier, source))),
            Ok(None) => Ok(None),
            Err(e) => {
                self.poisoned = true;
                Err(e)
            }
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The ordered strategy chain: first non-absent answer wins.
pub struct Pipeline {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl Pipeline {
    /// Build a pipeline from an explicit strategy list.
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Pipeline { resolvers }
    }

    /// The standard chain: native module, installed dependency, project
    /// file, then the named-export probe.
    pub fn standard(client: FlowClient) -> Self {
        Pipeline::new(vec![
            Box::new(NativeModuleResolver),
            Box::new(InstalledPackageResolver),
            Box::new(ProjectFileResolver),
            Box::new(NamedExportResolver::new(client)),
        ])
    }

    /// Resolve one identifier, trying strategies in priority order.
    pub fn resolve(
        &mut self,
        identifier: &str,
        cx: &ResolutionContext<'_>,
    ) -> Result<Option<ImportSpec>, OracleError> {
        for resolver in &mut self.resolvers {
            if let Some(spec) = resolver.resolve(identifier, cx)? {
                debug!(identifier, resolver = resolver.name(), source = %spec.source, "resolved");
                return Ok(Some(spec));
            }
        }
        debug!(identifier, "unresolved by all strategies");
        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================
