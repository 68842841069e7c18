use super::grammar::{NonTerminal, TokenKind};
use predictive::{Symbol, SyntaxTree, Token};
use std::error::Error;
use std::{fmt, mem};

type Tree = SyntaxTree<TokenKind, NonTerminal>;

#[derive(Debug, Clone, PartialEq)]
pub struct SExpr {
    pub identifier: String,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Number(f64),
    SExpr(SExpr),
}

impl Drop for SExpr {
    fn drop(&mut self) {
        let mut pending = mem::take(&mut self.args);
        while let Some(arg) = pending.pop() {
            if let Arg::SExpr(mut sexpr) = arg {
                pending.append(&mut sexpr.args);
            }
        }
    }
}

enum Piece<'a> {
    Open(&'a SExpr),
    Arg(&'a Arg),
    Close,
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![Piece::Open(self)];
        while let Some(piece) = pending.pop() {
            match piece {
                Piece::Open(sexpr) => {
                    write!(f, "({}", sexpr.identifier)?;
                    pending.push(Piece::Close);
                    pending.extend(sexpr.args.iter().rev().map(Piece::Arg));
                }
                Piece::Arg(Arg::Number(n)) => write!(f, " {}", n)?,
                Piece::Arg(Arg::SExpr(sexpr)) => {
                    write!(f, " ")?;
                    pending.push(Piece::Open(sexpr));
                }
                Piece::Close => write!(f, ")")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReduceError {
    ///! The children of a node are not those of any rule of its non terminal
    UnexpectedShape {
        non_terminal: NonTerminal,
        rule: Option<usize>,
    },
    InvalidNumber(Token<TokenKind>),
}

impl fmt::Display for ReduceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReduceError::UnexpectedShape { non_terminal, rule } => match rule {
                Some(rule) => write!(f, "malformed {:?} node for rule {}", non_terminal, rule),
                None => write!(f, "malformed {:?} node", non_terminal),
            },
            ReduceError::InvalidNumber(token) => write!(f, "invalid number {}", token),
        }
    }
}

impl Error for ReduceError {}

///! What a node reduces to
#[derive(Debug)]
enum Value {
    SExpr(SExpr),
    Args(Vec<Arg>),
    Arg(Arg),
    Identifier(String),
    Number(f64),
    Punctuation,
}

impl Value {
    fn into_sexpr(self, shape: &ReduceError) -> Result<SExpr, ReduceError> {
        match self {
            Value::SExpr(e) => Ok(e),
            _ => Err(shape.clone()),
        }
    }

    fn into_args(self, shape: &ReduceError) -> Result<Vec<Arg>, ReduceError> {
        match self {
            Value::Args(args) => Ok(args),
            _ => Err(shape.clone()),
        }
    }

    fn into_arg(self, shape: &ReduceError) -> Result<Arg, ReduceError> {
        match self {
            Value::Arg(arg) => Ok(arg),
            _ => Err(shape.clone()),
        }
    }

    fn into_identifier(self, shape: &ReduceError) -> Result<String, ReduceError> {
        match self {
            Value::Identifier(name) => Ok(name),
            _ => Err(shape.clone()),
        }
    }
}

fn visit_token(token: &Token<TokenKind>) -> Result<Value, ReduceError> {
    match token.kind {
        TokenKind::LPar | TokenKind::RPar | TokenKind::Eos => Ok(Value::Punctuation),
        TokenKind::Identifier => Ok(Value::Identifier(token.text.clone())),
        TokenKind::Number => match token.text.parse() {
            Ok(n) => Ok(Value::Number(n)),
            Err(_) => Err(ReduceError::InvalidNumber(token.clone())),
        },
    }
}

///! Combines the values of the children of a node. `Args` values hold their arguments last
///! first, so a long argument list is built in linear time.
fn visit_non_terminal(
    non_terminal: NonTerminal,
    rule: Option<usize>,
    children: Vec<Value>,
) -> Result<Value, ReduceError> {
    let shape = ReduceError::UnexpectedShape { non_terminal, rule };
    let arity = children.len();
    let mut values = children.into_iter();
    let mut next = || match values.next() {
        Some(value) => Ok(value),
        None => Err(shape.clone()),
    };

    let value = match (non_terminal, arity) {
        // SEXPR $
        (NonTerminal::S, 2) => Value::SExpr(next()?.into_sexpr(&shape)?),
        // ( identifier ARGS )
        (NonTerminal::SExpr, 4) => {
            next()?;
            let identifier = next()?.into_identifier(&shape)?;
            let mut args = next()?.into_args(&shape)?;
            next()?;
            args.reverse();
            Value::SExpr(SExpr { identifier, args })
        }
        // ARG ARGS
        (NonTerminal::Args, 2) => {
            let first = next()?.into_arg(&shape)?;
            let mut rest = next()?.into_args(&shape)?;
            rest.push(first);
            Value::Args(rest)
        }
        // ε
        (NonTerminal::Args, 0) => Value::Args(Vec::new()),
        // number | SEXPR
        (NonTerminal::Arg, 1) => match next()? {
            Value::Number(n) => Value::Arg(Arg::Number(n)),
            Value::SExpr(e) => Value::Arg(Arg::SExpr(e)),
            _ => return Err(shape),
        },
        (NonTerminal::S, _)
        | (NonTerminal::SExpr, _)
        | (NonTerminal::Args, _)
        | (NonTerminal::Arg, _) => return Err(shape),
    };
    Ok(value)
}

///! Post order walk: a node is combined once the values of all its children are on `values`
fn visit(tree: &Tree) -> Result<Value, ReduceError> {
    let mut pending = vec![(tree, false)];
    let mut values: Vec<Value> = Vec::new();
    while let Some((node, expanded)) = pending.pop() {
        match &node.symbol {
            Symbol::Terminal(token) => values.push(visit_token(token)?),
            Symbol::NonTerminal(_) if !expanded => {
                pending.push((node, true));
                pending.extend(node.children.iter().rev().map(|child| (child, false)));
            }
            Symbol::NonTerminal(nt) => {
                let children = values.split_off(values.len() - node.children.len());
                values.push(visit_non_terminal(*nt, node.rule_applied, children)?);
            }
        }
    }
    match values.pop() {
        Some(value) => Ok(value),
        None => Err(ReduceError::UnexpectedShape {
            non_terminal: NonTerminal::S,
            rule: tree.rule_applied,
        }),
    }
}

///! Reduces the parse tree of an `S` to the S-expression it holds
pub fn reduce(tree: &Tree) -> Result<SExpr, ReduceError> {
    let shape = ReduceError::UnexpectedShape {
        non_terminal: NonTerminal::S,
        rule: tree.rule_applied,
    };
    visit(tree)?.into_sexpr(&shape)
}

#[cfg(test)]
mod tests {
    use super::{reduce, Arg, ReduceError, SExpr};
    use crate::grammar::{sexpr_table, NonTerminal, TokenKind};
    use crate::lexer::tokenize;
    use predictive::{Parser, Symbol, SyntaxTree, Token};

    fn parse(input: &str) -> SyntaxTree<TokenKind, NonTerminal> {
        let table = sexpr_table().unwrap();
        Parser::new(&table).parse(tokenize(input).unwrap()).unwrap()
    }

    #[test]
    fn nested() {
        let sexpr = reduce(&parse("(add 1 (mul 2 3.5) -4)")).unwrap();
        assert_eq!(
            sexpr,
            SExpr {
                identifier: "add".to_owned(),
                args: vec![
                    Arg::Number(1.0),
                    Arg::SExpr(SExpr {
                        identifier: "mul".to_owned(),
                        args: vec![Arg::Number(2.0), Arg::Number(3.5)],
                    }),
                    Arg::Number(-4.0),
                ],
            }
        );
        assert_eq!(sexpr.to_string(), "(add 1 (mul 2 3.5) -4)");
    }

    #[test]
    fn no_arguments() {
        let sexpr = reduce(&parse("(camera)")).unwrap();
        assert_eq!(sexpr.identifier, "camera");
        assert!(sexpr.args.is_empty());
    }

    #[test]
    fn long_argument_list() {
        let count = 100_000;
        let input = format!("(sum{})", " 1".repeat(count));
        let sexpr = reduce(&parse(&input)).unwrap();
        assert_eq!(sexpr.args.len(), count);
        assert!(sexpr.args.iter().all(|arg| *arg == Arg::Number(1.0)));
    }

    #[test]
    fn malformed_tree() {
        let leaf = SyntaxTree {
            symbol: Symbol::Terminal(Token::new(TokenKind::Number, "1", 0)),
            rule_applied: None,
            children: Vec::new(),
        };
        let tree = SyntaxTree {
            symbol: Symbol::NonTerminal(NonTerminal::S),
            rule_applied: Some(0),
            children: vec![leaf],
        };
        assert_eq!(
            reduce(&tree).unwrap_err(),
            ReduceError::UnexpectedShape {
                non_terminal: NonTerminal::S,
                rule: Some(0),
            }
        );
    }

    #[test]
    fn terminal_root() {
        let leaf = SyntaxTree {
            symbol: Symbol::Terminal(Token::new(TokenKind::Identifier, "x", 0)),
            rule_applied: None,
            children: Vec::new(),
        };
        assert!(reduce(&leaf).is_err());
    }
}
