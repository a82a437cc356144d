pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod visit;
pub mod traverse;
pub mod resolve;
pub mod rewrite;
pub mod pretty;

use diagnostics::CompileError;
use parser::ast::Program;
use rewrite::{RewriteOptions, RewriteStats};

/// Lex and parse a source string. No resolution or rewriting.
pub fn parse_source(source: &str) -> Result<Program, CompileError> {
    let tokens = lexer::lex(source)?;
    tracing::debug!(tokens = tokens.len(), "lexed");
    let mut parser = parser::Parser::new(&tokens, source);
    let program = parser.parse_program()?;
    tracing::debug!(stmts = program.stmts.len(), "parsed");
    Ok(program)
}

/// Resolve names, apply the rewrite rules and check that the result is flat.
pub fn transform_program(program: &mut Program, options: &RewriteOptions) -> Result<RewriteStats, CompileError> {
    resolve::resolve_names(program)?;
    let stats = rewrite::rewrite_program(program, options)?;
    rewrite::verify_flat(program)?;
    Ok(stats)
}

/// Convert a source file's text to the flat dialect (lex → parse → resolve →
/// collect + rewrite → verify → print).
pub fn convert(source: &str) -> Result<String, CompileError> {
    convert_with_options(source, &RewriteOptions::default())
}

pub fn convert_with_options(source: &str, options: &RewriteOptions) -> Result<String, CompileError> {
    let mut program = parse_source(source)?;
    transform_program(&mut program, options)?;
    Ok(pretty::pretty_print(&program))
}

/// The parsed tree as pretty-printed JSON.
pub fn dump_ast(source: &str) -> Result<String, CompileError> {
    let program = parse_source(source)?;
    serde_json::to_string_pretty(&program)
        .map_err(|e| CompileError::rewrite(format!("could not serialize tree: {e}"), span::Span::dummy()))
}
