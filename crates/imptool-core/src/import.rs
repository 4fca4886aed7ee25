//! Import statement model: specifiers, declarations, parsing, rendering.
//!
//! An [`ImportSpec`] is a resolution proposal: one name bound from one
//! module, produced by a resolver strategy and consumed exactly once by the
//! merge engine. An [`ImportDeclaration`] is the structured form of one
//! textual import statement, possibly holding several specifiers from the
//! same source.
//!
//! Statements are always re-rendered from the structured model rather than
//! edited in place, so a merged statement is syntactically valid by
//! construction.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors produced while parsing a single import statement.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text does not begin with the `import` keyword.
    #[error("not an import statement: {statement:?}")]
    NotAnImport { statement: String },

    /// The text starts like an import statement but does not follow the
    /// statement grammar.
    #[error("malformed import statement ({reason}): {statement:?}")]
    Malformed { reason: String, statement: String },
}

// ============================================================================
// Import Kinds and Specs
// ============================================================================

/// The binding form of an import specifier.
///
/// `TypeOnly` behaves exactly like `Named` for merge purposes; it only
/// renders differently (an inline `type` prefix inside the brace list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    /// `import name from 'src'`
    Default,
    /// `import { name } from 'src'`
    Named,
    /// `import * as name from 'src'`
    Namespace,
    /// `import { type name } from 'src'`
    TypeOnly,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Default => write!(f, "default"),
            ImportKind::Named => write!(f, "named"),
            ImportKind::Namespace => write!(f, "namespace"),
            ImportKind::TypeOnly => write!(f, "type-only"),
        }
    }
}

/// One import to add: a binding proposal for a single identifier.
///
/// Created by a resolver strategy, consumed by the merge engine. Immutable
/// once built; `identifier` and `source` are non-empty by construction at
/// the resolver boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Binding form.
    pub kind: ImportKind,
    /// The local name the import binds.
    pub identifier: String,
    /// The module the name is imported from (exact string, no resolution).
    pub source: String,
}

impl ImportSpec {
    /// Create an import spec.
    pub fn new(kind: ImportKind, identifier: impl Into<String>, source: impl Into<String>) -> Self {
        ImportSpec {
            kind,
            identifier: identifier.into(),
            source: source.into(),
        }
    }

    /// Create a default import spec (`import id from 'src'`).
    pub fn default_import(identifier: impl Into<String>, source: impl Into<String>) -> Self {
        ImportSpec::new(ImportKind::Default, identifier, source)
    }

    /// Create a named import spec (`import { id } from 'src'`).
    pub fn named(identifier: impl Into<String>, source: impl Into<String>) -> Self {
        ImportSpec::new(ImportKind::Named, identifier, source)
    }

    /// Create a namespace import spec (`import * as id from 'src'`).
    pub fn namespace(identifier: impl Into<String>, source: impl Into<String>) -> Self {
        ImportSpec::new(ImportKind::Namespace, identifier, source)
    }

    /// Create a type-only import spec (`import { type id } from 'src'`).
    pub fn type_only(identifier: impl Into<String>, source: impl Into<String>) -> Self {
        ImportSpec::new(ImportKind::TypeOnly, identifier, source)
    }
}

impl fmt::Display for ImportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} import of `{}` from '{}'", self.kind, self.identifier, self.source)
    }
}

// ============================================================================
// Line Spans
// ============================================================================

/// Half-open range of 0-indexed physical lines in the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    /// First line of the statement (inclusive).
    pub start: usize,
    /// One past the last line of the statement (exclusive).
    pub end: usize,
}

impl LineSpan {
    /// Create a new line span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "LineSpan start ({}) must be <= end ({})", start, end);
        LineSpan { start, end }
    }
}

// ============================================================================
// Specifiers and Declarations
// ============================================================================

/// One specifier inside an import declaration.
///
/// `imported` differs from `local` only for aliased named imports parsed out
/// of existing text (`{ a as b }` has `imported: Some("a")`, `local: "b"`).
/// Specifiers built from an [`ImportSpec`] always bind the identifier under
/// its own name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpecifier {
    /// Binding form.
    pub kind: ImportKind,
    /// The exported name, when it differs from the local binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<String>,
    /// The local binding name.
    pub local: String,
}

impl ImportSpecifier {
    /// Build the specifier corresponding to a resolution proposal.
    pub fn from_spec(spec: &ImportSpec) -> Self {
        ImportSpecifier {
            kind: spec.kind,
            imported: None,
            local: spec.identifier.clone(),
        }
    }

    /// Render this specifier as a member of a brace list.
    fn render_braced(&self) -> String {
        let mut out = String::new();
        if self.kind == ImportKind::TypeOnly {
            out.push_str("type ");
        }
        match &self.imported {
            Some(imported) if *imported != self.local => {
                out.push_str(imported);
                out.push_str(" as ");
                out.push_str(&self.local);
            }
            _ => out.push_str(&self.local),
        }
        out
    }
}

/// The structured form of one textual import statement.
///
/// Invariants, enforced by the merge engine (and checked by the parser where
/// the grammar allows it): at most one `Default` specifier, at most one
/// `Namespace` specifier, and a `Namespace` specifier added by a merge may
/// not coexist with any other specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDeclaration {
    /// The module all specifiers import from.
    pub source: String,
    /// Specifiers in insertion order.
    pub specifiers: Vec<ImportSpecifier>,
    /// Lines the statement occupied in the original text, when parsed from a
    /// file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<LineSpan>,
}

impl ImportDeclaration {
    /// Create an empty declaration for a source (a side-effect import).
    pub fn new(source: impl Into<String>) -> Self {
        ImportDeclaration {
            source: source.into(),
            specifiers: Vec::new(),
            span: None,
        }
    }

    /// Create a declaration holding exactly one specifier built from `spec`.
    pub fn from_spec(spec: &ImportSpec) -> Self {
        ImportDeclaration {
            source: spec.source.clone(),
            specifiers: vec![ImportSpecifier::from_spec(spec)],
            span: None,
        }
    }

    /// Whether the declaration already binds a default name.
    pub fn has_default(&self) -> bool {
        self.specifiers.iter().any(|s| s.kind == ImportKind::Default)
    }

    /// Whether the declaration holds a namespace specifier.
    pub fn has_namespace(&self) -> bool {
        self.specifiers.iter().any(|s| s.kind == ImportKind::Namespace)
    }

    /// Render the declaration back into a single import statement.
    ///
    /// Output is normalized: single-quoted source, trailing semicolon, the
    /// default clause first, then the brace list in insertion order.
    pub fn render(&self) -> String {
        if self.specifiers.is_empty() {
            return format!("import '{}';", self.source);
        }

        let mut clauses: Vec<String> = Vec::new();
        if let Some(def) = self.specifiers.iter().find(|s| s.kind == ImportKind::Default) {
            clauses.push(def.local.clone());
        }
        if let Some(ns) = self.specifiers.iter().find(|s| s.kind == ImportKind::Namespace) {
            clauses.push(format!("* as {}", ns.local));
        }
        let braced: Vec<String> = self
            .specifiers
            .iter()
            .filter(|s| matches!(s.kind, ImportKind::Named | ImportKind::TypeOnly))
            .map(ImportSpecifier::render_braced)
            .collect();
        if !braced.is_empty() {
            clauses.push(format!("{{ {} }}", braced.join(", ")));
        }

        format!("import {} from '{}';", clauses.join(", "), self.source)
    }
}

// ============================================================================
// Statement Parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Str(String),
    LBrace,
    RBrace,
    Comma,
    Star,
    Semi,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '{' => {
                chars.next();
                tokens.push(Token::LBrace);
            }
            '}' => {
                chars.next();
                tokens.push(Token::RBrace);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semi);
            }
            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => s.push(c),
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if is_word_char(c) {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(format!("unexpected character {:?}", other)),
        }
    }

    Ok(tokens)
}

/// Parse a single import statement (possibly spanning multiple physical
/// lines) into the structured model.
///
/// Accepted forms: default, namespace, named (with aliases), inline `type`
/// specifiers, statement-level `import type { ... }`, side-effect imports,
/// and default-plus-named combinations. Anything else is rejected with a
/// descriptive error.
pub fn parse_import(statement: &str) -> Result<ImportDeclaration, ParseError> {
    let malformed = |reason: &str| ParseError::Malformed {
        reason: reason.to_string(),
        statement: statement.to_string(),
    };

    let tokens = tokenize(statement).map_err(|reason| ParseError::Malformed {
        reason,
        statement: statement.to_string(),
    })?;

    let mut pos = 0usize;
    match tokens.first() {
        Some(Token::Word(w)) if w == "import" => pos += 1,
        _ => {
            return Err(ParseError::NotAnImport {
                statement: statement.to_string(),
            })
        }
    }

    // Side-effect import: `import 'src';`
    if let Some(Token::Str(source)) = tokens.get(pos) {
        if source.is_empty() {
            return Err(malformed("empty module string"));
        }
        let mut end = pos + 1;
        if matches!(tokens.get(end), Some(Token::Semi)) {
            end += 1;
        }
        if end != tokens.len() {
            return Err(malformed("trailing tokens after module string"));
        }
        return Ok(ImportDeclaration::new(source.clone()));
    }

    // Statement-level `type` marker applies to the whole brace list.
    // `import type Foo from 'src'` (a default type import) has no inline
    // equivalent in the model and is rejected; `import { type } from 'src'`
    // (a binding literally named `type`) stays valid.
    let mut statement_type = false;
    if let Some(Token::Word(w)) = tokens.get(pos) {
        if w == "type" {
            match tokens.get(pos + 1) {
                Some(Token::LBrace) => {
                    statement_type = true;
                    pos += 1;
                }
                Some(Token::Word(next)) if next != "from" => {
                    return Err(malformed("statement-level default type imports are not supported"));
                }
                _ => {}
            }
        }
    }

    let mut decl = ImportDeclaration::new(String::new());

    // Import clause: default binding, `* as name`, and/or `{ ... }`.
    loop {
        match tokens.get(pos) {
            Some(Token::Word(w)) if w == "from" => {
                pos += 1;
                break;
            }
            Some(Token::Word(w)) => {
                if decl.has_default() {
                    return Err(malformed("duplicate default specifier"));
                }
                decl.specifiers.push(ImportSpecifier {
                    kind: ImportKind::Default,
                    imported: None,
                    local: w.clone(),
                });
                pos += 1;
            }
            Some(Token::Star) => {
                pos += 1;
                match (tokens.get(pos), tokens.get(pos + 1)) {
                    (Some(Token::Word(as_kw)), Some(Token::Word(name))) if as_kw == "as" => {
                        if decl.has_namespace() {
                            return Err(malformed("duplicate namespace specifier"));
                        }
                        decl.specifiers.push(ImportSpecifier {
                            kind: ImportKind::Namespace,
                            imported: None,
                            local: name.clone(),
                        });
                        pos += 2;
                    }
                    _ => return Err(malformed("expected `as <name>` after `*`")),
                }
            }
            Some(Token::LBrace) => {
                pos += 1;
                loop {
                    match tokens.get(pos) {
                        Some(Token::RBrace) => {
                            pos += 1;
                            break;
                        }
                        Some(Token::Word(w)) => {
                            let mut kind = if statement_type {
                                ImportKind::TypeOnly
                            } else {
                                ImportKind::Named
                            };
                            let mut name = w.clone();
                            pos += 1;
                            // Inline `type` marker: `{ type Foo }`. A lone
                            // `type` (followed by `,`, `}`, or `as`) is a
                            // binding named `type`.
                            if w == "type" {
                                if let Some(Token::Word(next)) = tokens.get(pos) {
                                    if next != "as" {
                                        kind = ImportKind::TypeOnly;
                                        name = next.clone();
                                        pos += 1;
                                    }
                                }
                            }
                            let (imported, local) = match (tokens.get(pos), tokens.get(pos + 1)) {
                                (Some(Token::Word(as_kw)), Some(Token::Word(alias)))
                                    if as_kw == "as" =>
                                {
                                    pos += 2;
                                    (Some(name), alias.clone())
                                }
                                _ => (None, name),
                            };
                            decl.specifiers.push(ImportSpecifier { kind, imported, local });
                            if matches!(tokens.get(pos), Some(Token::Comma)) {
                                pos += 1;
                            }
                        }
                        _ => return Err(malformed("unexpected token in import specifier list")),
                    }
                }
            }
            Some(Token::Comma) => {
                pos += 1;
            }
            _ => return Err(malformed("expected `from '<module>'`")),
        }
    }

    match tokens.get(pos) {
        Some(Token::Str(source)) if !source.is_empty() => {
            decl.source = source.clone();
            pos += 1;
        }
        Some(Token::Str(_)) => return Err(malformed("empty module string")),
        _ => return Err(malformed("expected module string after `from`")),
    }

    if matches!(tokens.get(pos), Some(Token::Semi)) {
        pos += 1;
    }
    if pos != tokens.len() {
        return Err(malformed("trailing tokens after module string"));
    }

    Ok(decl)
}

// ============================================================================
// Tests
// ============================================================================
