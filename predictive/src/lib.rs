//! An LL(1) table generator and predictive parser.
//!
//! A [`Grammar`] is validated once, [`ParseTable::new`] computes its nullable, FIRST and FOLLOW
//! sets and builds a conflict checked table, and a [`Parser`] borrowing that table turns token
//! streams into [`SyntaxTree`]s with one token of lookahead.

pub mod grammar;
pub mod notation;
pub mod parse_table;
pub mod parser;
pub mod sets;

pub use grammar::{Grammar, GrammarError, Rule, Symbol, Token, TokenInfo};
pub use parse_table::{ConflictError, ParseTable, ParseTableError};
pub use parser::{ParseError, Parser, SyntaxTree};
pub use sets::GrammarSets;
