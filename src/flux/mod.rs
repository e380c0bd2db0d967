pub mod ast;
pub mod build;
pub mod error;
#[allow(clippy::wildcard_imports)]
pub mod format;
pub mod lexer;
#[allow(clippy::wildcard_imports, clippy::too_many_lines)]
pub mod parser;

pub use error::SyntaxError;
pub use format::{format_expression, format_file, format_package};

use ast::Package;

/// Parse Flux source into a single-file package.
///
/// This is the parser collaborator of the check compiler:
/// source → lex → parse → (package, errors). Lexer and parser errors are
/// merged in source order; an empty list means the source is syntactically
/// valid. The package is returned even when errors were found, holding every
/// statement that parsed cleanly.
///
/// `//` comments are discarded by the lexer, so they do not appear in the
/// package or in anything formatted from it.
pub fn parse_source(source: &str) -> (Package, Vec<SyntaxError>) {
    let (tokens, mut errors) = lexer::lex(source);
    let (file, parse_errors) = parser::parse(tokens);
    errors.extend(parse_errors);
    errors.sort_by_key(|e| e.span.start);
    for err in &mut errors {
        err.locate(source);
    }

    let package = Package {
        package: file.package.clone(),
        files: vec![file],
    };
    (package, errors)
}
