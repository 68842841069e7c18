use predictive::grammar::{create_rules, Rule};
use predictive::rule_rhs;
use predictive::{ParseTable, ParseTableError};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum NonTerminal {
    S,
    SExpr,
    Args,
    Arg,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    LPar,
    RPar,
    Identifier,
    Number,
    Eos,
}

// S     -> SEXPR $
// SEXPR -> ( identifier ARGS )
// ARGS  -> ARG ARGS | ε
// ARG   -> number | SEXPR
pub fn sexpr_rules() -> Vec<Rule<TokenKind, NonTerminal>> {
    create_rules(vec![
        (NonTerminal::S, rule_rhs![(NonTerminal::SExpr), TokenKind::Eos]),
        (
            NonTerminal::SExpr,
            rule_rhs![
                TokenKind::LPar,
                TokenKind::Identifier,
                (NonTerminal::Args),
                TokenKind::RPar
            ],
        ),
        (
            NonTerminal::Args,
            rule_rhs![(NonTerminal::Arg), (NonTerminal::Args)],
        ),
        (NonTerminal::Args, rule_rhs![]),
        (NonTerminal::Arg, rule_rhs![TokenKind::Number]),
        (NonTerminal::Arg, rule_rhs![(NonTerminal::SExpr)]),
    ])
}

pub type SExprTable = ParseTable<TokenKind, NonTerminal>;

pub fn sexpr_table() -> Result<SExprTable, ParseTableError<TokenKind, NonTerminal>> {
    ParseTable::from_rules(sexpr_rules(), NonTerminal::S)
}
