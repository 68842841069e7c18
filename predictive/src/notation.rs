//! Textual grammars, one rule per line: `SEXPR → LPAR IDENTIFIER ARGS RPAR`.
//! A name is a non terminal if some line defines it, a terminal otherwise.
use crate::grammar::{Grammar, GrammarError, Rule, Symbol};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{self, Display};

pub const ARROW: &str = "→";
pub const ASCII_ARROW: &str = "->";
pub const EPSILON: &str = "ε";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    MissingArrow,
    TooManyArrows,
    EmptyLeftSide,
    SpaceInLeftSide,
    ///! `ε` next to other symbols
    MisplacedEpsilon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    Syntax { line: usize, error: SyntaxError },
    ///! No rule at all, and no start symbol to report
    Empty,
    Grammar(GrammarError<String>),
}

impl From<GrammarError<String>> for NotationError {
    fn from(err: GrammarError<String>) -> NotationError {
        NotationError::Grammar(err)
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            SyntaxError::MissingArrow => "missing \"→\"",
            SyntaxError::TooManyArrows => "too many \"→\"",
            SyntaxError::EmptyLeftSide => "empty left side",
            SyntaxError::SpaceInLeftSide => "left side contains whitespace",
            SyntaxError::MisplacedEpsilon => "\"ε\" must be alone on the right side",
        };
        f.write_str(message)
    }
}

impl Display for NotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotationError::Syntax { line, error } => write!(f, "line {}: {}", line, error),
            NotationError::Empty => write!(f, "grammar has no rule"),
            NotationError::Grammar(e) => Display::fmt(e, f),
        }
    }
}

impl Error for NotationError {}

fn parse_line(line: &str) -> Result<(String, Vec<String>), SyntaxError> {
    let line = line.replace(ASCII_ARROW, ARROW);
    let parts: Vec<&str> = line.split(ARROW).collect();
    let (lhs, rhs) = match parts.as_slice() {
        [_] => return Err(SyntaxError::MissingArrow),
        [lhs, rhs] => (lhs.trim(), *rhs),
        _ => return Err(SyntaxError::TooManyArrows),
    };
    if lhs.is_empty() {
        return Err(SyntaxError::EmptyLeftSide);
    }
    if lhs.split_whitespace().count() != 1 {
        return Err(SyntaxError::SpaceInLeftSide);
    }
    let rhs: Vec<&str> = rhs.split_whitespace().collect();
    let rhs = match rhs.as_slice() {
        [EPSILON] => Vec::new(),
        symbols if symbols.contains(&EPSILON) => return Err(SyntaxError::MisplacedEpsilon),
        symbols => symbols.iter().map(|s| (*s).to_owned()).collect(),
    };
    Ok((lhs.to_owned(), rhs))
}

///! Parses the rules of a textual grammar, numbered in line order. Blank lines are skipped.
pub fn parse_rules(text: &str) -> Result<Vec<Rule<String, String>>, NotationError> {
    let mut raw_rules = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let rule = parse_line(line).map_err(|error| NotationError::Syntax { line: i + 1, error })?;
        raw_rules.push(rule);
    }

    let non_terminals: HashSet<String> = raw_rules.iter().map(|(lhs, _)| lhs.clone()).collect();
    Ok(raw_rules
        .into_iter()
        .enumerate()
        .map(|(index, (lhs, rhs))| Rule {
            index,
            lhs,
            rhs: rhs
                .into_iter()
                .map(|name| {
                    if non_terminals.contains(&name) {
                        Symbol::NonTerminal(name)
                    } else {
                        Symbol::Terminal(name)
                    }
                })
                .collect(),
        })
        .collect())
}

impl Grammar<String, String> {
    ///! Builds a grammar from its textual notation. Without an explicit start symbol the left
    ///! side of the first rule is used.
    pub fn from_notation(
        text: &str,
        start: Option<&str>,
    ) -> Result<Grammar<String, String>, NotationError> {
        let rules = parse_rules(text)?;
        let start = match (start, rules.first()) {
            (Some(start), _) => start.to_owned(),
            (None, Some(rule)) => rule.lhs.clone(),
            (None, None) => return Err(NotationError::Empty),
        };
        Ok(Grammar::new(rules, start)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_rules, NotationError, SyntaxError};
    use crate::grammar::{Grammar, GrammarError, Symbol};

    const SEXPR: &str = "
S → SEXPR $
SEXPR → LPAR IDENTIFIER ARGS RPAR
ARGS → ARG ARGS
ARGS → ε
ARG → NUMBER
ARG → SEXPR
";

    fn t(name: &str) -> Symbol<String, String> {
        Symbol::Terminal(name.to_owned())
    }

    fn nt(name: &str) -> Symbol<String, String> {
        Symbol::NonTerminal(name.to_owned())
    }

    #[test]
    fn classifies_symbols() {
        let rules = parse_rules(SEXPR).unwrap();
        assert_eq!(rules.len(), 6);
        assert_eq!(rules[0].lhs, "S");
        assert_eq!(rules[0].rhs, vec![nt("SEXPR"), t("$")]);
        assert_eq!(
            rules[1].rhs,
            vec![t("LPAR"), t("IDENTIFIER"), nt("ARGS"), t("RPAR")]
        );
        assert!(rules[3].rhs.is_empty());
        assert_eq!(rules[5].index, 5);
    }

    #[test]
    fn ascii_arrow_and_empty_right_side() {
        let rules = parse_rules("A -> x A\n  A ->   \n").unwrap();
        assert_eq!(rules[0].rhs, vec![t("x"), nt("A")]);
        assert!(rules[1].rhs.is_empty());
    }

    #[test]
    fn syntax_errors() {
        let cases = vec![
            ("S → a\nS a", 2, SyntaxError::MissingArrow),
            ("S → a → b", 1, SyntaxError::TooManyArrows),
            ("\n\n → a", 3, SyntaxError::EmptyLeftSide),
            ("S a → x", 1, SyntaxError::SpaceInLeftSide),
            ("S → ε a", 1, SyntaxError::MisplacedEpsilon),
        ];
        for (text, line, error) in cases {
            assert_eq!(
                parse_rules(text).unwrap_err(),
                NotationError::Syntax { line, error }
            );
        }
        assert_eq!(
            parse_rules("S → ε a").unwrap_err().to_string(),
            "line 1: \"ε\" must be alone on the right side"
        );
    }

    #[test]
    fn grammar_from_notation() {
        let grammar = Grammar::from_notation(SEXPR, None).unwrap();
        assert_eq!(grammar.start(), "S");
        assert_eq!(
            grammar.terminals(),
            &["$", "LPAR", "IDENTIFIER", "RPAR", "NUMBER"]
        );

        let grammar = Grammar::from_notation(SEXPR, Some("ARG")).unwrap();
        assert_eq!(grammar.start(), "ARG");

        assert_eq!(
            Grammar::from_notation(SEXPR, Some("NUMBER")).unwrap_err(),
            NotationError::Grammar(GrammarError::UndefinedStart("NUMBER".to_owned()))
        );
        assert_eq!(
            Grammar::from_notation("  \n", None).unwrap_err(),
            NotationError::Empty
        );
    }
}
