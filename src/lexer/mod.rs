pub mod token;
pub use token::{is_keyword, Token};

use logos::Logos;
use crate::span::{Span, Spanned};
use crate::diagnostics::CompileError;

const OPEN_TAG: &str = "<?php";

/// Tokenize a source file. Text outside `<?php ... ?>` sections becomes
/// `InlineHtml` tokens; comments are dropped.
pub fn lex(source: &str) -> Result<Vec<Spanned<Token>>, CompileError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let Some(rel) = find_open_tag(&source[pos..]) else {
            tokens.push(Spanned::new(
                Token::InlineHtml(source[pos..].to_string()),
                Span::new(pos, source.len()),
            ));
            break;
        };
        let tag_start = pos + rel;
        if tag_start > pos {
            tokens.push(Spanned::new(
                Token::InlineHtml(source[pos..tag_start].to_string()),
                Span::new(pos, tag_start),
            ));
        }
        pos = lex_code(source, tag_start + OPEN_TAG.len(), &mut tokens)?;
    }

    Ok(tokens)
}

/// Lex one code section starting at `start`. Returns the offset just past
/// the section's close tag, or the end of input.
fn lex_code(source: &str, start: usize, tokens: &mut Vec<Spanned<Token>>) -> Result<usize, CompileError> {
    let mut lexer = Token::lexer(&source[start..]);

    while let Some(result) = lexer.next() {
        let local = lexer.span();
        let span = Span::new(start + local.start, start + local.end);
        match result {
            Ok(Token::Comment) => continue,
            Ok(Token::CloseTag) => {
                tokens.push(Spanned::new(Token::CloseTag, span));
                // A single newline directly after `?>` belongs to the tag.
                let rest = &source[span.end..];
                let swallowed = if rest.starts_with("\r\n") {
                    2
                } else if rest.starts_with('\n') {
                    1
                } else {
                    0
                };
                return Ok(span.end + swallowed);
            }
            Ok(Token::Ident) if source[span.start..span.end].eq_ignore_ascii_case("__halt_compiler") => {
                if let Some(data_start) = halt_compiler_data(source, span.end) {
                    tokens.push(Spanned::new(
                        Token::HaltCompiler(source[data_start..].to_string()),
                        Span::new(span.start, source.len()),
                    ));
                    return Ok(source.len());
                }
                tokens.push(Spanned::new(Token::Ident, span));
            }
            Ok(tok) => tokens.push(Spanned::new(tok, span)),
            Err(()) => {
                let text = &source[span.start..span.end];
                let msg = if text.starts_with(['\'', '"', '`']) {
                    "unterminated string literal".to_string()
                } else if text.starts_with("/*") {
                    "unterminated comment".to_string()
                } else if text.starts_with("<<<") {
                    "unterminated heredoc".to_string()
                } else {
                    format!("unexpected character '{text}'")
                };
                return Err(CompileError::syntax(msg, span));
            }
        }
    }

    Ok(source.len())
}

/// After `__halt_compiler`, match `();` or `()?>` and return the offset where
/// the raw trailing data starts.
fn halt_compiler_data(source: &str, from: usize) -> Option<usize> {
    let mut rest = &source[from..];
    for punct in ["(", ")"] {
        rest = rest.trim_start().strip_prefix(punct)?;
    }
    rest = rest.trim_start();
    if let Some(after) = rest.strip_prefix(';') {
        return Some(source.len() - after.len());
    }
    let after = rest.strip_prefix("?>")?;
    let after = after.strip_prefix("\r\n").or_else(|| after.strip_prefix('\n')).unwrap_or(after);
    Some(source.len() - after.len())
}

/// Find `<?php` (case-insensitive) followed by whitespace or end of input.
fn find_open_tag(text: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = text[from..].find("<?") {
        let at = from + i;
        let rest = &text[at + 2..];
        let is_php = rest.get(..3).is_some_and(|kw| kw.eq_ignore_ascii_case("php"));
        let delimited = rest.get(3..).and_then(|r| r.chars().next()).is_none_or(char::is_whitespace);
        if is_php && delimited {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        lex(src).unwrap().into_iter().map(|t| t.node).collect()
    }

    #[test]
    fn lex_simple_function() {
        let src = "<?php function main() { }";
        let tokens = lex(src).unwrap();
        assert_eq!(tokens.len(), 6);
        assert!(matches!(tokens[0].node, Token::Function));
        assert!(matches!(tokens[1].node, Token::Ident));
        assert!(matches!(tokens[2].node, Token::LParen));
        assert!(matches!(tokens[3].node, Token::RParen));
        assert!(matches!(tokens[4].node, Token::LBrace));
        assert!(matches!(tokens[5].node, Token::RBrace));
        assert_eq!(&src[tokens[1].span.start..tokens[1].span.end], "main");
    }

    #[test]
    fn lex_keywords_are_case_insensitive() {
        let toks = kinds("<?php FUNCTION Namespace uSe");
        assert_eq!(toks, vec![Token::Function, Token::Namespace, Token::Use]);
    }

    #[test]
    fn lex_variables_and_names() {
        let toks = kinds("<?php $foo = \\App\\bar();");
        assert_eq!(toks[0], Token::Variable("foo".to_string()));
        assert_eq!(toks[1], Token::Eq);
        assert_eq!(toks[2], Token::Backslash);
        assert_eq!(toks[3], Token::Ident);
        assert_eq!(toks[4], Token::Backslash);
        assert_eq!(toks[5], Token::Ident);
    }

    #[test]
    fn lex_null_coalescing_operators() {
        let toks = kinds("<?php $a ?? $b; $c ??= 1; $d ?: $e;");
        assert!(toks.contains(&Token::QuestionQuestion));
        assert!(toks.contains(&Token::QuestionQuestionEq));
        assert!(toks.contains(&Token::Question));
        assert!(toks.contains(&Token::Colon));
    }

    #[test]
    fn lex_comparison_operators() {
        let toks = kinds("<?php === !== == != <> <=> <= >= < >");
        assert_eq!(
            toks,
            vec![
                Token::EqEqEq, Token::BangEqEq, Token::EqEq, Token::BangEq, Token::LtGt,
                Token::Spaceship, Token::LtEq, Token::GtEq, Token::Lt, Token::Gt,
            ]
        );
    }

    #[test]
    fn lex_literals_keep_raw_spelling() {
        let toks = kinds("<?php 0x1F 1_000 3.14 1e3 .5");
        assert_eq!(toks[0], Token::IntLit("0x1F".to_string()));
        assert_eq!(toks[1], Token::IntLit("1_000".to_string()));
        assert_eq!(toks[2], Token::FloatLit("3.14".to_string()));
        assert_eq!(toks[3], Token::FloatLit("1e3".to_string()));
        assert_eq!(toks[4], Token::FloatLit(".5".to_string()));
    }

    #[test]
    fn lex_single_quoted_string_is_decoded() {
        let toks = kinds(r"<?php 'it\'s a \\ path\n'");
        assert_eq!(toks[0], Token::StringLit(r"it's a \ path\n".to_string()));
    }

    #[test]
    fn lex_double_quoted_string_is_raw() {
        let toks = kinds(r#"<?php "hello $name\n""#);
        assert_eq!(toks[0], Token::TemplateLit(r"hello $name\n".to_string()));
    }

    #[test]
    fn lex_comments_skipped() {
        let toks = kinds("<?php $x = 1; // trailing\n# hash\n/* block\n comment */ $y = 2;");
        assert!(toks.iter().all(|t| !matches!(t, Token::Comment)));
        assert_eq!(toks.len(), 8);
    }

    #[test]
    fn lex_inline_html_before_open_tag() {
        let toks = kinds("#!/usr/bin/env php\n<?php echo 1;");
        assert_eq!(toks[0], Token::InlineHtml("#!/usr/bin/env php\n".to_string()));
        assert_eq!(toks[1], Token::Echo);
    }

    #[test]
    fn lex_close_tag_and_trailing_html() {
        let toks = kinds("<?php echo 1; ?>\n<b>hi</b>\n<?php echo 2;");
        assert_eq!(toks[3], Token::CloseTag);
        assert_eq!(toks[4], Token::InlineHtml("<b>hi</b>\n".to_string()));
        assert_eq!(toks[5], Token::Echo);
    }

    #[test]
    fn lex_file_without_open_tag_is_html() {
        let toks = kinds("just text");
        assert_eq!(toks, vec![Token::InlineHtml("just text".to_string())]);
    }

    #[test]
    fn lex_open_tag_needs_delimiter() {
        let toks = kinds("<?phpx");
        assert_eq!(toks, vec![Token::InlineHtml("<?phpx".to_string())]);
    }

    #[test]
    fn lex_spans_are_absolute() {
        let src = "<p>x</p><?php $abc;";
        let tokens = lex(src).unwrap();
        let var = &tokens[1];
        assert_eq!(&src[var.span.start..var.span.end], "$abc");
    }

    #[test]
    fn lex_unexpected_character_error() {
        let err = lex("<?php $a = \u{1};").unwrap_err();
        assert!(err.to_string().contains("unexpected character"));
    }

    #[test]
    fn lex_unterminated_comment_error() {
        let err = lex("<?php $a = 1; /* open").unwrap_err();
        assert_eq!(err.message(), "unterminated comment");
    }

    #[test]
    fn lex_line_comment_stops_at_close_tag() {
        let toks = kinds("<?php echo 1; // note ?> after");
        assert_eq!(toks[3], Token::CloseTag);
        assert_eq!(toks[4], Token::InlineHtml(" after".to_string()));
        let toks = kinds("<?php # note ?>\nafter");
        assert_eq!(toks, vec![Token::CloseTag, Token::InlineHtml("after".to_string())]);
    }

    #[test]
    fn lex_block_comment_hides_close_tag() {
        let toks = kinds("<?php /* ?> */ echo 1;");
        assert_eq!(toks[0], Token::Echo);
    }

    #[test]
    fn lex_heredoc_and_nowdoc() {
        let toks = kinds("<?php $a = <<<EOT\nhi $x\n  EOT;\n$b = <<<'RAW'\nRAW;");
        let Token::DocString(doc) = &toks[2] else { panic!("expected heredoc, got {:?}", toks[2]) };
        assert_eq!(doc.label, "EOT");
        assert!(!doc.nowdoc);
        assert_eq!(doc.body, "hi $x\n");
        assert_eq!(doc.indent, "  ");
        assert_eq!(toks[3], Token::Semicolon);
        let Token::DocString(doc) = &toks[6] else { panic!("expected nowdoc, got {:?}", toks[6]) };
        assert!(doc.nowdoc);
        assert_eq!(doc.body, "");
    }

    #[test]
    fn lex_heredoc_label_needs_word_boundary() {
        let toks = kinds("<?php <<<EOT\nEOTX\nEOT;");
        let Token::DocString(doc) = &toks[0] else { panic!() };
        assert_eq!(doc.body, "EOTX\n");
    }

    #[test]
    fn lex_unterminated_heredoc_error() {
        let err = lex("<?php $a = <<<EOT\nnever closed\n").unwrap_err();
        assert_eq!(err.message(), "unterminated heredoc");
    }

    #[test]
    fn lex_shell_exec_and_variable_variables() {
        let toks = kinds("<?php `ls -l`; $$v; ${'x'};");
        assert_eq!(toks[0], Token::ShellExec("ls -l".to_string()));
        assert_eq!(toks[2], Token::Dollar);
        assert_eq!(toks[3], Token::Variable("v".to_string()));
        assert_eq!(toks[5], Token::Dollar);
        assert_eq!(toks[6], Token::LBrace);
    }

    #[test]
    fn lex_non_ascii_names() {
        let toks = kinds("<?php $é = café();");
        assert_eq!(toks[0], Token::Variable("é".to_string()));
        assert_eq!(toks[2], Token::Ident);
    }

    #[test]
    fn lex_halt_compiler_keeps_trailing_data() {
        let toks = kinds("<?php echo 1; __halt_compiler(); \x00raw ?> data");
        assert_eq!(toks[3], Token::HaltCompiler(" \x00raw ?> data".to_string()));
        assert_eq!(toks.len(), 4);
        let toks = kinds("<?php __HALT_COMPILER() ?>\nrest");
        assert_eq!(toks, vec![Token::HaltCompiler("rest".to_string())]);
    }

    #[test]
    fn lex_unterminated_string_error() {
        let err = lex("<?php $a = 'oops;").unwrap_err();
        assert!(err.to_string().contains("unterminated string literal"));
    }

    #[test]
    fn is_keyword_matches_whole_word() {
        assert!(is_keyword("function"));
        assert!(is_keyword("CLASS"));
        assert!(!is_keyword("functional"));
        assert!(!is_keyword("strlen"));
    }
}
