//! Grammar text support.
//!
//! One rule per line, in the form `LHS -> alt1 | alt2 | ...`, where each
//! alternative is a whitespace-separated sequence of symbols. An empty
//! alternative, or one written as the single symbol `ε`, is an epsilon
//! production. Blank lines are ignored.

pub mod ast;
pub mod lexer;

use self::lexer::{Lexer, Token};
use crate::grammar::{GrammarError, EPSILON};

pub fn parse(source: &str) -> Result<Vec<ast::Rule>, GrammarError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut rules = vec![];
    let mut line: Vec<Token<'_>> = vec![];
    let mut lineno = 1;
    for spanned in Lexer::new(source) {
        let (start, tok, _end) =
            spanned.map_err(|err| GrammarError::malformed(format!("lexical error: {:?}", err)))?;
        tracing::trace!("token {:?} at {}:{}", tok, start.line + 1, start.col + 1);
        match tok {
            Token::Newline => {
                rules.extend(parse_line(&line, lineno)?);
                line.clear();
                lineno = start.line as usize + 2;
            }
            tok => line.push(tok),
        }
    }
    rules.extend(parse_line(&line, lineno)?);

    Ok(rules)
}

fn parse_line(tokens: &[Token<'_>], lineno: usize) -> Result<Option<ast::Rule>, GrammarError> {
    if tokens.is_empty() {
        return Ok(None);
    }

    let arrow = tokens
        .iter()
        .position(|t| matches!(t, Token::Arrow))
        .ok_or_else(|| {
            GrammarError::malformed(format!(
                "invalid rule format at line {}: use `->' to separate the left- and right-hand side",
                lineno
            ))
        })?;

    let left = match &tokens[..arrow] {
        [Token::Symbol(left)] => left.to_string(),
        [] => {
            return Err(GrammarError::malformed(format!(
                "missing left-hand side at line {}",
                lineno
            )))
        }
        _ => {
            return Err(GrammarError::malformed(format!(
                "the left-hand side at line {} must be a single symbol",
                lineno
            )))
        }
    };

    let mut alternatives = vec![];
    for alternative in tokens[arrow + 1..].split(|t| matches!(t, Token::VertBar)) {
        let mut symbols = vec![];
        for tok in alternative {
            match tok {
                Token::Symbol(s) => symbols.push(s.to_string()),
                _ => {
                    return Err(GrammarError::malformed(format!(
                        "unexpected `->' in the right-hand side at line {}",
                        lineno
                    )))
                }
            }
        }

        if symbols.iter().any(|s| s == EPSILON) {
            if symbols.len() > 1 {
                return Err(GrammarError::malformed(format!(
                    "`{}' must stand alone in its alternative at line {}",
                    EPSILON, lineno
                )));
            }
            symbols.clear();
        }
        alternatives.push(symbols);
    }

    Ok(Some(ast::Rule { left, alternatives }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(left: &str, alternatives: &[&[&str]]) -> ast::Rule {
        ast::Rule {
            left: left.into(),
            alternatives: alternatives
                .iter()
                .map(|alt| alt.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn smoketest() {
        let input = "\
E -> E + T | T
T -> T * F | F

F -> ( E ) | id
";
        let rules = parse(input).unwrap();
        assert_eq!(
            rules,
            [
                rule("E", &[&["E", "+", "T"], &["T"]]),
                rule("T", &[&["T", "*", "F"], &["F"]]),
                rule("F", &[&["(", "E", ")"], &["id"]]),
            ]
        );
    }

    #[test]
    fn epsilon_alternatives() {
        let rules = parse("S -> A B\nA -> a | ε\nB -> b |").unwrap();
        assert_eq!(
            rules,
            [
                rule("S", &[&["A", "B"]]),
                rule("A", &[&["a"], &[]]),
                rule("B", &[&["b"], &[]]),
            ]
        );
    }

    #[test]
    fn missing_separator() {
        let err = parse("S -> a\nA a b\n").unwrap_err();
        match err {
            GrammarError::Malformed { msg } => assert!(msg.contains("line 2"), "{}", msg),
            err => panic!("unexpected error: {:?}", err),
        }
    }

    #[test]
    fn malformed_lines() {
        for input in ["-> a", "A B -> a", "A -> a -> b", "A -> a ε", "A->a"] {
            assert!(
                matches!(parse(input), Err(GrammarError::Malformed { .. })),
                "{:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn empty_source() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n   \n").unwrap().is_empty());
    }
}
