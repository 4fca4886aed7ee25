//! Import block segmentation: preamble / import region / body.
//!
//! A file is split into three contiguous regions: `preamble` (lines before
//! any import), the import region (import statements plus comment lines
//! between them), and `body` (everything after). The region, once started,
//! is contiguous: the first non-import, non-comment line closes it, and any
//! further `import` lines are body verbatim. Callers must not rely on
//! finding or merging imports separated by other statements; this is a
//! deliberate limitation, not a bug.
//!
//! Segmentation is recomputed fresh from raw text on every merge call and
//! never persisted.

use std::sync::OnceLock;

use regex::Regex;

use crate::import::{parse_import, ImportDeclaration, LineSpan, ParseError};

// ============================================================================
// Line Classification
// ============================================================================

fn import_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"from\s*['"][^'"]*['"]\s*;?\s*$"#).expect("import terminator regex")
    })
}

fn side_effect_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*import\s*['"][^'"]*['"]\s*;?\s*$"#).expect("side-effect import regex")
    })
}

fn source_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"from\s*['"]([^'"]*)['"]\s*;?\s*$"#).expect("import source regex")
    })
}

fn side_effect_source_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*import\s*['"]([^'"]*)['"]"#).expect("side-effect source regex")
    })
}

/// Whether a line starts an import statement: the `import` keyword after
/// optional whitespace, not merely a word with that prefix (`importantVar`).
pub fn is_import_start(line: &str) -> bool {
    match line.trim_start().strip_prefix("import") {
        Some(rest) => match rest.chars().next() {
            None => true,
            Some(c) => !(c.is_alphanumeric() || c == '_' || c == '$'),
        },
        None => false,
    }
}

/// Whether a line is a comment line (`//`, `/*`, or a `*` continuation).
pub fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// Whether a physical line terminates an import statement: either a
/// `from "<module>"(;)?` tail or a single-line side-effect import.
fn is_import_terminated(line: &str) -> bool {
    import_end_re().is_match(line) || side_effect_re().is_match(line)
}

/// Extract the source module of a raw import statement, quote-normalized.
///
/// Cheap prefilter used before full parsing, so exotic statements for other
/// sources never have to parse at all.
pub fn statement_source(statement: &str) -> Option<String> {
    if let Some(caps) = source_re().captures(statement) {
        return Some(caps[1].to_string());
    }
    side_effect_source_re()
        .captures(statement)
        .map(|caps| caps[1].to_string())
}

// ============================================================================
// Segmentation
// ============================================================================

/// One raw import statement and the physical lines it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// The raw statement text, continuation lines joined with `\n`.
    pub text: String,
    /// The physical lines the statement spans.
    pub span: LineSpan,
}

/// The three contiguous regions of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileImportBlock {
    /// Verbatim lines before the first import statement.
    pub preamble: Vec<String>,
    /// Import statements of the region, in order.
    pub statements: Vec<ImportStatement>,
    /// Verbatim lines from the region close onward.
    pub body: Vec<String>,
    /// Index of the first body line; equivalently, one past the last
    /// import-or-comment line of the region.
    pub region_end: usize,
}

impl FileImportBlock {
    /// The raw statement strings of the import region, in order.
    pub fn import_lines(&self) -> Vec<&str> {
        self.statements.iter().map(|s| s.text.as_str()).collect()
    }

    /// Find the declaration importing from `source`, matching on exact
    /// source equality (quote style normalized, no path resolution).
    ///
    /// Only the matching statement is parsed; a parse failure there
    /// propagates because merging into a statement we cannot model would
    /// corrupt it.
    pub fn find_declaration(&self, source: &str) -> Result<Option<ImportDeclaration>, ParseError> {
        for stmt in &self.statements {
            if statement_source(&stmt.text).as_deref() == Some(source) {
                let mut decl = parse_import(&stmt.text)?;
                decl.span = Some(stmt.span);
                return Ok(Some(decl));
            }
        }
        Ok(None)
    }
}

/// Split file text into preamble, import region, and body.
///
/// Multi-line statements are consumed until a terminator line; a statement
/// still unterminated at end of file runs to the last line.
pub fn segment(text: &str) -> FileImportBlock {
    let lines: Vec<&str> = text.split('\n').collect();

    let mut preamble = Vec::new();
    let mut i = 0;
    while i < lines.len() && !is_import_start(lines[i]) {
        preamble.push(lines[i].to_string());
        i += 1;
    }

    let mut statements = Vec::new();
    while i < lines.len() {
        let line = lines[i];
        if is_import_start(line) {
            let start = i;
            let mut stmt = vec![line];
            while !is_import_terminated(lines[i]) {
                i += 1;
                if i >= lines.len() {
                    break;
                }
                stmt.push(lines[i]);
            }
            let end = (i + 1).min(lines.len());
            statements.push(ImportStatement {
                text: stmt.join("\n"),
                span: LineSpan::new(start, end),
            });
            i = end;
        } else if is_comment_line(line) {
            i += 1;
        } else {
            break;
        }
    }

    let region_end = i;
    let body = lines[i..].iter().map(|l| l.to_string()).collect();

    FileImportBlock {
        preamble,
        statements,
        body,
        region_end,
    }
}

/// The line index at which a brand-new import statement is inserted.
///
/// Immediately after the last import-or-comment line of the import region;
/// when the file has no imports at all, a leading comment run still counts
/// as import-adjacent and insertion happens after it, otherwise at the very
/// top (index 0).
pub fn insertion_line(text: &str) -> usize {
    let block = segment(text);
    if !block.statements.is_empty() {
        return block.region_end;
    }
    text.split('\n').take_while(|line| is_comment_line(line)).count()
}

// ============================================================================
// Tests
// ============================================================================
