use crate::grammar::{Rule, Symbol, Token};
use crate::parse_table::ParseTable;
use log::trace;
use std::error::Error;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::iter::Peekable;
use std::mem;

///! A predictive parser borrowing a shared ParseTable.
///! It holds no state between calls, so one parser (or many) can serve any number of parses.
#[derive(Debug)]
pub struct Parser<'t, T, NT>
where
    T: PartialEq + Eq + Hash,
    NT: PartialEq + Eq + Hash,
{
    parse_table: &'t ParseTable<T, NT>,
}

///! A parse tree node. Terminals hold the matched token and have no children, non terminals
///! hold one child per symbol of the rule that was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree<T, NT> {
    pub symbol: Symbol<Token<T>, NT>,
    pub rule_applied: Option<usize>,
    pub children: Vec<SyntaxTree<T, NT>>,
}

impl<T, NT> SyntaxTree<T, NT> {
    fn leaf(token: Token<T>) -> SyntaxTree<T, NT> {
        SyntaxTree {
            symbol: Symbol::Terminal(token),
            rule_applied: None,
            children: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.symbol.is_terminal()
    }

    pub fn token(&self) -> Option<&Token<T>> {
        self.symbol.terminal()
    }

    pub fn non_terminal(&self) -> Option<&NT> {
        self.symbol.non_terminal()
    }

    ///! The matched tokens, left to right
    pub fn tokens(&self) -> Vec<&Token<T>> {
        let mut tokens = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match &node.symbol {
                Symbol::Terminal(token) => tokens.push(token),
                Symbol::NonTerminal(_) => pending.extend(node.children.iter().rev()),
            }
        }
        tokens
    }
}

impl<T, NT> Drop for SyntaxTree<T, NT> {
    fn drop(&mut self) {
        let mut pending = mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError<T, NT> {
    ///! The lookahead is not the terminal the rule being expanded requires
    UnexpectedToken {
        expected: T,
        got: Token<T>,
        context: Option<NT>,
    },
    ///! No rule of the non terminal starts with the lookahead
    NoRule {
        non_terminal: NT,
        got: Token<T>,
        expected: Vec<T>,
    },
    ///! The token stream ran out before its end of stream token was matched
    UnexpectedEnd {
        expecting: Symbol<T, NT>,
        context: Option<NT>,
    },
}

impl<T: Debug, NT: Debug> Display for ParseError<T, NT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                expected,
                got,
                context,
            } => {
                write!(f, "unexpected token {}, expected {:?}", got, expected)?;
                if let Some(nt) = context {
                    write!(f, " while parsing {:?}", nt)?;
                }
                Ok(())
            }
            ParseError::NoRule {
                non_terminal,
                got,
                expected,
            } => write!(
                f,
                "unexpected token {} while parsing {:?}, expected one of {:?}",
                got, non_terminal, expected
            ),
            ParseError::UnexpectedEnd { expecting, context } => {
                write!(f, "token stream ended while expecting ")?;
                match expecting {
                    Symbol::Terminal(t) => write!(f, "{:?}", t)?,
                    Symbol::NonTerminal(nt) => write!(f, "{:?}", nt)?,
                }
                if let Some(nt) = context {
                    write!(f, " while parsing {:?}", nt)?;
                }
                Ok(())
            }
        }
    }
}

impl<T: Debug, NT: Debug> Error for ParseError<T, NT> {}

///! A non terminal being expanded: the rule chosen for it and the children built so far
struct Frame<'t, T, NT> {
    rule: &'t Rule<T, NT>,
    children: Vec<SyntaxTree<T, NT>>,
}

impl<'t, T, NT> Frame<'t, T, NT>
where
    NT: Clone,
{
    fn new(rule: &'t Rule<T, NT>) -> Frame<'t, T, NT> {
        Frame {
            rule,
            children: Vec::with_capacity(rule.rhs.len()),
        }
    }

    fn finish(self) -> SyntaxTree<T, NT> {
        SyntaxTree {
            symbol: Symbol::NonTerminal(self.rule.lhs.clone()),
            rule_applied: Some(self.rule.index),
            children: self.children,
        }
    }
}

impl<'t, T, NT> Parser<'t, T, NT>
where
    NT: Clone + PartialEq + Eq + Hash + Debug,
    T: PartialEq + Eq + Hash + Clone + Debug,
{
    pub fn new(parse_table: &'t ParseTable<T, NT>) -> Parser<'t, T, NT> {
        Parser { parse_table }
    }

    pub fn parse_table(&self) -> &'t ParseTable<T, NT> {
        self.parse_table
    }

    ///! Parses the tokens from the start symbol of the grammar. The stream is not required to be
    ///! exhausted afterwards: the start rule should end with an end of stream terminal.
    pub fn parse<I>(&self, input: I) -> Result<SyntaxTree<T, NT>, ParseError<T, NT>>
    where
        I: IntoIterator<Item = Token<T>>,
    {
        let start = Symbol::NonTerminal(self.parse_table.grammar().start().clone());
        self.parse_symbol(&start, input)
    }

    ///! Parses the tokens as a derivation of `symbol`
    pub fn parse_symbol<I>(
        &self,
        symbol: &Symbol<T, NT>,
        input: I,
    ) -> Result<SyntaxTree<T, NT>, ParseError<T, NT>>
    where
        I: IntoIterator<Item = Token<T>>,
    {
        let mut input = input.into_iter().peekable();
        let rule = match symbol {
            Symbol::Terminal(t) => {
                return self.match_terminal(t, None, &mut input).map(SyntaxTree::leaf)
            }
            Symbol::NonTerminal(nt) => self.predict(nt, None, &mut input)?,
        };

        let mut current = Frame::new(rule);
        let mut parents = Vec::new();
        loop {
            let rule = current.rule;
            match rule.rhs.get(current.children.len()) {
                None => {
                    let node = current.finish();
                    match parents.pop() {
                        Some(parent) => {
                            current = parent;
                            current.children.push(node);
                        }
                        None => return Ok(node),
                    }
                }
                Some(Symbol::Terminal(t)) => {
                    let token = self.match_terminal(t, Some(&rule.lhs), &mut input)?;
                    current.children.push(SyntaxTree::leaf(token));
                }
                Some(Symbol::NonTerminal(nt)) => {
                    let next = Frame::new(self.predict(nt, Some(&rule.lhs), &mut input)?);
                    parents.push(mem::replace(&mut current, next));
                }
            }
        }
    }

    fn match_terminal<I>(
        &self,
        expected: &T,
        context: Option<&NT>,
        input: &mut Peekable<I>,
    ) -> Result<Token<T>, ParseError<T, NT>>
    where
        I: Iterator<Item = Token<T>>,
    {
        match input.next() {
            Some(token) if token.kind == *expected => {
                trace!("matched {}", token);
                Ok(token)
            }
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: expected.clone(),
                got: token,
                context: context.cloned(),
            }),
            None => Err(ParseError::UnexpectedEnd {
                expecting: Symbol::Terminal(expected.clone()),
                context: context.cloned(),
            }),
        }
    }

    ///! Chooses the rule for `non_terminal` from the lookahead, without consuming it
    fn predict<I>(
        &self,
        non_terminal: &NT,
        context: Option<&NT>,
        input: &mut Peekable<I>,
    ) -> Result<&'t Rule<T, NT>, ParseError<T, NT>>
    where
        I: Iterator<Item = Token<T>>,
    {
        let lookahead = match input.peek() {
            Some(token) => token,
            None => {
                return Err(ParseError::UnexpectedEnd {
                    expecting: Symbol::NonTerminal(non_terminal.clone()),
                    context: context.cloned(),
                })
            }
        };
        let parse_table: &'t ParseTable<T, NT> = self.parse_table;
        match parse_table.get(non_terminal, &lookahead.kind) {
            Some(rule) => {
                trace!("expanding {} on {}", rule, lookahead);
                Ok(rule)
            }
            None => Err(ParseError::NoRule {
                non_terminal: non_terminal.clone(),
                got: lookahead.clone(),
                expected: parse_table.expected(non_terminal),
            }),
        }
    }
}
