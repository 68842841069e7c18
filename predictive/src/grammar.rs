#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

///! Symbols in a grammar
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Symbol<T, NT> {
    Terminal(T),
    NonTerminal(NT),
}

impl<T, NT> Symbol<T, NT> {
    pub fn is_terminal(&self) -> bool {
        match self {
            Symbol::Terminal(_) => true,
            Symbol::NonTerminal(_) => false,
        }
    }

    pub fn terminal(&self) -> Option<&T> {
        match self {
            Symbol::Terminal(t) => Some(t),
            Symbol::NonTerminal(_) => None,
        }
    }

    pub fn non_terminal(&self) -> Option<&NT> {
        match self {
            Symbol::Terminal(_) => None,
            Symbol::NonTerminal(nt) => Some(nt),
        }
    }
}

///! A numbered rule (or production) of a grammar, of the form `lhs -> rhs`
///! An empty `rhs` is an epsilon production.
#[derive(Hash, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rule<T, NT> {
    pub index: usize,
    pub lhs: NT,
    pub rhs: Vec<Symbol<T, NT>>,
}

impl<T, NT> Rule<T, NT> {
    pub fn is_epsilon(&self) -> bool {
        self.rhs.is_empty()
    }
}

impl<T: Debug, NT: Debug> Display for Rule<T, NT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?} ->", self.index, self.lhs)?;
        if self.rhs.is_empty() {
            return write!(f, " ε");
        }
        for symbol in &self.rhs {
            match symbol {
                Symbol::Terminal(t) => write!(f, " {:?}", t)?,
                Symbol::NonTerminal(nt) => write!(f, " {:?}", nt)?,
            }
        }
        Ok(())
    }
}

///! A token handed to the parser by a scanner
#[derive(Hash, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token<T> {
    pub kind: T,
    ///! The raw text that was matched, empty for the end of stream
    pub text: String,
    pub info: TokenInfo,
}

#[derive(Hash, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TokenInfo {
    ///! Byte offset of the token in the scanned input
    pub position: usize,
}

impl<T> Token<T> {
    pub fn new(kind: T, text: impl Into<String>, position: usize) -> Token<T> {
        Token {
            kind,
            text: text.into(),
            info: TokenInfo { position },
        }
    }
}

impl<T: Debug> Display for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{:?} at {}", self.kind, self.info.position)
        } else {
            write!(
                f,
                "\"{}\" ({:?}) at {}",
                self.text, self.kind, self.info.position
            )
        }
    }
}

pub fn create_rules<T, NT>(rules: Vec<(NT, Vec<Symbol<T, NT>>)>) -> Vec<Rule<T, NT>> {
    rules
        .into_iter()
        .enumerate()
        .map(|(index, (lhs, rhs))| Rule { index, lhs, rhs })
        .collect()
}

///! Builds the right hand side of a rule. A parenthesised item is a non terminal, anything
///! else is a terminal: `rule_rhs![Tok::LParen, (Nt::Expr), Tok::RParen]`
#[macro_export]
macro_rules! rule_rhs {
    (@acc [$($out:expr),*]) => {
        vec![$($out),*]
    };
    (@acc [$($out:expr),*] ($nt:expr) $(, $($rest:tt)*)?) => {
        $crate::rule_rhs!(@acc [$($out,)* $crate::grammar::Symbol::NonTerminal($nt)] $($($rest)*)?)
    };
    (@acc [$($out:expr),*] $t:expr $(, $($rest:tt)*)?) => {
        $crate::rule_rhs!(@acc [$($out,)* $crate::grammar::Symbol::Terminal($t)] $($($rest)*)?)
    };
    ($($rest:tt)*) => {
        $crate::rule_rhs!(@acc [] $($rest)*)
    };
}

///! A validated, immutable grammar: its rules and the start symbol
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grammar<T, NT>
where
    T: PartialEq + Eq + Hash,
    NT: PartialEq + Eq + Hash,
{
    rules: Vec<Rule<T, NT>>,
    start: NT,
    terminals: Vec<T>,
    non_terminals: Vec<NT>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum GrammarError<NT> {
    ///! The start symbol has no rule
    UndefinedStart(NT),
    ///! A non terminal is used in a rule but never derived
    NoDeriveRule(NT),
}

impl<NT: Debug> Display for GrammarError<NT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UndefinedStart(nt) => {
                write!(f, "start symbol {:?} has no rule", nt)
            }
            GrammarError::NoDeriveRule(nt) => {
                write!(f, "{:?} is used in a rule but has no rule deriving it", nt)
            }
        }
    }
}

impl<NT: Debug> Error for GrammarError<NT> {}

fn separate_symbols<T, NT>(rules: &[Rule<T, NT>]) -> (Vec<T>, Vec<NT>)
where
    T: PartialEq + Eq + Clone + Hash,
    NT: PartialEq + Eq + Clone + Hash,
{
    let mut seen_terminals = HashSet::new();
    let mut seen_non_terminals = HashSet::new();
    let mut terminals = Vec::new();
    let mut non_terminals = Vec::new();
    for rule in rules {
        if seen_non_terminals.insert(rule.lhs.clone()) {
            non_terminals.push(rule.lhs.clone());
        }
    }
    for rule in rules {
        for symbol in &rule.rhs {
            if let Symbol::Terminal(t) = symbol {
                if seen_terminals.insert(t.clone()) {
                    terminals.push(t.clone());
                }
            }
        }
    }
    (terminals, non_terminals)
}

fn sanity_check<T, NT>(rules: &[Rule<T, NT>], start: &NT) -> Option<GrammarError<NT>>
where
    NT: PartialEq + Eq + Hash + Clone,
{
    let mut non_terminals = HashSet::new();
    non_terminals.extend(rules.iter().map(|r| &r.lhs));
    if !non_terminals.contains(start) {
        return Some(GrammarError::UndefinedStart(start.clone()));
    }
    rules
        .iter()
        .flat_map(|r| r.rhs.iter())
        .filter_map(Symbol::non_terminal)
        .find(|nt| !non_terminals.contains(nt))
        .map(|nt| GrammarError::NoDeriveRule(nt.clone()))
}

impl<T, NT> Grammar<T, NT>
where
    T: Clone + PartialEq + Eq + Hash,
    NT: Clone + PartialEq + Eq + Hash,
{
    ///! Validates the rules. Rule indices are renumbered to their position in `rules`.
    pub fn new(rules: Vec<Rule<T, NT>>, start: NT) -> Result<Grammar<T, NT>, GrammarError<NT>> {
        if let Some(e) = sanity_check(&rules, &start) {
            return Err(e);
        }
        let rules: Vec<_> = rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| Rule { index, ..rule })
            .collect();
        let (terminals, non_terminals) = separate_symbols(&rules);
        Ok(Grammar {
            rules,
            start,
            terminals,
            non_terminals,
        })
    }

    pub fn rules(&self) -> &[Rule<T, NT>] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> Option<&Rule<T, NT>> {
        self.rules.get(index)
    }

    pub fn rules_for<'a>(&'a self, non_terminal: &'a NT) -> impl Iterator<Item = &'a Rule<T, NT>> {
        self.rules.iter().filter(move |r| r.lhs == *non_terminal)
    }

    pub fn start(&self) -> &NT {
        &self.start
    }

    ///! Terminals in order of first use
    pub fn terminals(&self) -> &[T] {
        &self.terminals
    }

    ///! Non terminals in order of their first rule
    pub fn non_terminals(&self) -> &[NT] {
        &self.non_terminals
    }
}
