//! Lexical scan for `pragma` directives.
//!
//! Only the tokens needed to find directives reliably are recognized: line
//! and block comments, string literals, and identifiers. Everything else is
//! skipped byte by byte. All delimiters are ASCII, so slicing at their
//! positions always lands on a char boundary.

use crate::error::ParserError;

/// A `pragma <name> <value>;` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PragmaDirective {
    /// First word after `pragma`, e.g. `solidity` or `experimental`.
    pub name: String,
    /// Remainder up to `;`, with runs of whitespace collapsed.
    pub value: String,
    /// 1-based line of the `pragma` keyword.
    pub line: usize,
}

/// Collect every pragma directive in `source`, in order.
///
/// Directives inside comments or string literals are ignored.
///
/// # Errors
///
/// Returns [`ParserError`] for an unterminated block comment, string literal,
/// or pragma.
pub fn parse_pragmas(source: &str) -> Result<Vec<PragmaDirective>, ParserError> {
    let mut scanner = Scanner::new(source);
    let mut directives = Vec::new();

    while let Some(byte) = scanner.peek(0) {
        match byte {
            b'/' if scanner.peek(1) == Some(b'/') => scanner.skip_line_comment(),
            b'/' if scanner.peek(1) == Some(b'*') => scanner.skip_block_comment()?,
            b'"' | b'\'' => scanner.skip_string(byte)?,
            b if is_ident_start(b) => {
                let line = scanner.line;
                if scanner.take_ident() == "pragma" {
                    directives.push(scanner.pragma_body(line)?);
                }
            }
            _ => scanner.bump(),
        }
    }

    Ok(directives)
}

const fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$'
}

const fn is_ident_continue(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit()
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    const fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if self.peek(0) == Some(b'\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn skip_line_comment(&mut self) {
        while let Some(byte) = self.peek(0) {
            if byte == b'\n' {
                return;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ParserError> {
        let line = self.line;
        self.bump();
        self.bump();
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(b'*'), Some(b'/')) => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                (Some(_), _) => self.bump(),
                (None, _) => return Err(ParserError::UnterminatedComment { line }),
            }
        }
    }

    fn skip_string(&mut self, quote: u8) -> Result<(), ParserError> {
        let line = self.line;
        self.bump();
        loop {
            match self.peek(0) {
                Some(b'\\') => {
                    self.bump();
                    self.bump();
                }
                Some(b) if b == quote => {
                    self.bump();
                    return Ok(());
                }
                Some(b'\n') | None => return Err(ParserError::UnterminatedString { line }),
                Some(_) => self.bump(),
            }
        }
    }

    fn take_ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_continue) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn pragma_body(&mut self, line: usize) -> Result<PragmaDirective, ParserError> {
        let start = self.pos;
        let Some(len) = self.src[start..].find(';') else {
            return Err(ParserError::UnterminatedPragma { line });
        };
        while self.pos < start + len + 1 {
            self.bump();
        }

        let body = self.src[start..start + len].trim();
        let (name, value) = body
            .split_once(char::is_whitespace)
            .unwrap_or((body, ""));
        Ok(PragmaDirective {
            name: name.to_owned(),
            value: value.split_whitespace().collect::<Vec<_>>().join(" "),
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn values(source: &str) -> Vec<(String, String)> {
        parse_pragmas(source)
            .unwrap()
            .into_iter()
            .map(|d| (d.name, d.value))
            .collect()
    }

    #[test]
    fn finds_solidity_and_experimental() {
        let source = "pragma solidity ^0.5.0;\npragma experimental ABIEncoderV2;\n\ncontract A {}";
        assert_eq!(
            values(source),
            [
                ("solidity".to_owned(), "^0.5.0".to_owned()),
                ("experimental".to_owned(), "ABIEncoderV2".to_owned()),
            ]
        );
    }

    #[test]
    fn records_line_numbers() {
        let source = "// SPDX-License-Identifier: MIT\n\npragma solidity >=0.4.22 <0.6.0;";
        let directives = parse_pragmas(source).unwrap();
        assert_eq!(directives[0].line, 3);
        assert_eq!(directives[0].value, ">=0.4.22 <0.6.0");
    }

    #[rstest]
    #[case::line_comment("// pragma solidity 0.4.0;\npragma solidity 0.5.2;")]
    #[case::block_comment("/* pragma solidity 0.4.0;\n */ pragma solidity 0.5.2;")]
    #[case::string_literal("string s = \"pragma solidity 0.4.0;\";\npragma solidity 0.5.2;")]
    #[case::escaped_quote("string s = 'it\\'s pragma solidity 0.4.0;';\npragma solidity 0.5.2;")]
    #[case::identifier_suffix("uint nopragma = 1;\npragma solidity 0.5.2;")]
    fn ignores_non_directive_occurrences(#[case] source: &str) {
        assert_eq!(
            values(source),
            [("solidity".to_owned(), "0.5.2".to_owned())]
        );
    }

    #[test]
    fn collapses_whitespace_across_lines() {
        let source = "pragma   solidity\n    >=0.4.24\n    <0.7.0 ;";
        assert_eq!(
            values(source),
            [("solidity".to_owned(), ">=0.4.24 <0.7.0".to_owned())]
        );
    }

    #[test]
    fn file_without_pragmas_is_empty() {
        assert!(parse_pragmas("contract Empty {}").unwrap().is_empty());
    }

    #[test]
    fn unterminated_block_comment_is_error() {
        let err = parse_pragmas("pragma solidity 0.5.0;\n/* never closed").unwrap_err();
        assert!(matches!(err, ParserError::UnterminatedComment { line: 2 }));
    }

    #[test]
    fn unterminated_pragma_is_error() {
        let err = parse_pragmas("pragma solidity ^0.4.24").unwrap_err();
        assert!(matches!(err, ParserError::UnterminatedPragma { line: 1 }));
    }

    #[test]
    fn string_broken_by_newline_is_error() {
        let err = parse_pragmas("string s = \"abc\ndef\";").unwrap_err();
        assert!(matches!(err, ParserError::UnterminatedString { line: 1 }));
    }
}
