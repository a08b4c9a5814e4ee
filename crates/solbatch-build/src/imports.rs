//! Import extraction from Solidity sources
//!
//! A small tolerant scanner, not a parser. It understands just enough of the
//! lexical structure (comments, string literals, statement boundaries) to find
//! real `import` directives:
//!
//! ```solidity
//! import "./A.sol";
//! import './B.sol' as B;
//! import * as C from "@lib/C.sol";
//! import {D, E as F} from "../D.sol";
//! ```
//!
//! Imports inside comments or string literals are not reported, and `import`
//! only counts as a keyword at statement position.

use std::fmt;
use std::path::Path;

/// Result of scanning one source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportScan {
    /// Import paths in source order
    Imports(Vec<String>),
    /// The text could not be scanned
    Diagnostic(ScanDiagnostic),
}

impl ImportScan {
    /// Imports, or nothing if the scan failed
    pub fn into_imports(self) -> Vec<String> {
        match self {
            Self::Imports(imports) => imports,
            Self::Diagnostic(_) => Vec::new(),
        }
    }
}

/// Why a source text could not be scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDiagnostic {
    /// 1-based line where the problem starts
    pub line: usize,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for ScanDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Extract import paths from Solidity source text
pub fn extract(contents: &str) -> ImportScan {
    match Scanner::new(contents).run() {
        Ok(imports) => ImportScan::Imports(imports),
        Err(diagnostic) => ImportScan::Diagnostic(diagnostic),
    }
}

/// Read `path` and extract its imports
///
/// Fail-open: an unreadable or unscannable file is logged and reported as
/// having no imports.
pub fn scan_file(path: &Path) -> Vec<String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "cannot read source file, assuming no imports");
            return Vec::new();
        }
    };

    match extract(&contents) {
        ImportScan::Imports(imports) => imports,
        ImportScan::Diagnostic(diagnostic) => {
            tracing::warn!(
                file = %path.display(),
                %diagnostic,
                "failed to scan imports, assuming none"
            );
            Vec::new()
        }
    }
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn run(mut self) -> Result<Vec<String>, ScanDiagnostic> {
        let mut imports = Vec::new();
        let mut statement_start = true;

        while let Some(byte) = self.peek() {
            match byte {
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'/' if self.skip_comment()? => {}
                b'"' | b'\'' => {
                    self.string_literal()?;
                    statement_start = false;
                }
                b';' | b'{' | b'}' => {
                    self.pos += 1;
                    statement_start = true;
                }
                b if is_ident_byte(b) => {
                    let word = self.word();
                    if word == "import" && statement_start {
                        imports.push(self.import_directive()?);
                        statement_start = true;
                    } else {
                        statement_start = false;
                    }
                }
                _ => {
                    self.pos += 1;
                    statement_start = false;
                }
            }
        }

        Ok(imports)
    }

    /// Body of an import directive, after the keyword, through the `;`
    fn import_directive(&mut self) -> Result<String, ScanDiagnostic> {
        let start = self.pos;
        let mut path = None;

        loop {
            match self.peek() {
                None => return Err(self.diagnostic_at(start, "import directive is missing ';'")),
                Some(b';') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') if self.skip_comment()? => {}
                Some(b'"' | b'\'') => {
                    let literal = self.string_literal()?;
                    path.get_or_insert(literal);
                }
                Some(_) => self.pos += 1,
            }
        }

        match path {
            Some(path) if !path.is_empty() => Ok(path.to_string()),
            _ => Err(self.diagnostic_at(start, "import directive has no path")),
        }
    }

    /// Skip a comment at the cursor; false if the `/` does not start one
    fn skip_comment(&mut self) -> Result<bool, ScanDiagnostic> {
        match self.bytes.get(self.pos + 1) {
            Some(b'/') => {
                match self.src[self.pos..].find('\n') {
                    Some(offset) => self.pos += offset + 1,
                    None => self.pos = self.bytes.len(),
                }
                Ok(true)
            }
            Some(b'*') => {
                let start = self.pos;
                match self.src[self.pos + 2..].find("*/") {
                    Some(offset) => {
                        self.pos += 2 + offset + 2;
                        Ok(true)
                    }
                    None => Err(self.diagnostic_at(start, "unterminated block comment")),
                }
            }
            _ => Ok(false),
        }
    }

    /// Consume a quoted literal and return its contents
    fn string_literal(&mut self) -> Result<&'a str, ScanDiagnostic> {
        let start = self.pos;
        let quote = self.bytes[start];
        self.pos += 1;

        while let Some(byte) = self.peek() {
            match byte {
                b'\\' => self.pos += 2,
                b'\n' => break,
                b if b == quote => {
                    let contents = &self.src[start + 1..self.pos];
                    self.pos += 1;
                    return Ok(contents);
                }
                _ => self.pos += 1,
            }
        }

        Err(self.diagnostic_at(start, "unterminated string literal"))
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn diagnostic_at(&self, offset: usize, message: &str) -> ScanDiagnostic {
        let offset = offset.min(self.bytes.len());
        ScanDiagnostic {
            line: self.src[..offset].matches('\n').count() + 1,
            message: message.to_string(),
        }
    }
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || !byte.is_ascii()
}
