use clap::{App, Arg};
use log::{debug, error};
use predictive::{Grammar, ParseError, ParseTable, Parser, Symbol, SyntaxTree};
use rustyline::error::ReadlineError;
use std::collections::HashSet;
use std::error::Error;
use std::{fmt, fs, process};

mod completer;
mod grammar;
mod lexer;
mod reduce;

use grammar::{sexpr_table, NonTerminal, SExprTable, TokenKind};
use lexer::{LexError, Lexer};
use reduce::{reduce, ReduceError, SExpr};

type Tree = SyntaxTree<TokenKind, NonTerminal>;

#[derive(Debug)]
pub enum SexprError {
    Lex(LexError),
    Parse(ParseError<TokenKind, NonTerminal>),
    Reduce(ReduceError),
}

impl From<LexError> for SexprError {
    fn from(err: LexError) -> SexprError {
        SexprError::Lex(err)
    }
}

impl From<ParseError<TokenKind, NonTerminal>> for SexprError {
    fn from(err: ParseError<TokenKind, NonTerminal>) -> SexprError {
        SexprError::Parse(err)
    }
}

impl From<ReduceError> for SexprError {
    fn from(err: ReduceError) -> SexprError {
        SexprError::Reduce(err)
    }
}

impl fmt::Display for SexprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SexprError::Lex(e) => write!(f, "lexical error: {}", e),
            SexprError::Parse(e) => write!(f, "syntax error: {}", e),
            SexprError::Reduce(e) => write!(f, "reduction error: {}", e),
        }
    }
}

impl Error for SexprError {}

///! Scans and parses `input` in one pass. A lexical error ends the token stream and is reported
///! unless the parser failed on an earlier token.
fn parse_tree(table: &SExprTable, input: &str) -> Result<Tree, SexprError> {
    let mut lex_error = None;
    let tokens = Lexer::new(input).scan(&mut lex_error, |lex_error, token| match token {
        Ok(token) => Some(token),
        Err(e) => {
            **lex_error = Some(e);
            None
        }
    });
    let tree = Parser::new(table).parse(tokens);
    if let Some(e) = lex_error {
        if let Err(ParseError::UnexpectedEnd { .. }) = tree {
            return Err(e.into());
        }
    }
    Ok(tree?)
}

fn parse_sexpr(table: &SExprTable, input: &str) -> Result<SExpr, SexprError> {
    Ok(reduce(&parse_tree(table, input)?)?)
}

fn format_tree(tree: &Tree) -> String {
    let mut out = String::new();
    let mut pending = vec![(tree, 0)];
    while let Some((node, depth)) = pending.pop() {
        out.push_str(&"  ".repeat(depth));
        match &node.symbol {
            Symbol::Terminal(token) => out.push_str(&format!("{}\n", token)),
            Symbol::NonTerminal(nt) => {
                out.push_str(&format!("{:?}\n", nt));
                pending.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
            }
        }
    }
    out
}

fn identifiers(sexpr: &SExpr) -> Vec<String> {
    let mut names = Vec::new();
    let mut pending = vec![sexpr];
    while let Some(sexpr) = pending.pop() {
        names.push(sexpr.identifier.clone());
        for arg in &sexpr.args {
            if let reduce::Arg::SExpr(e) = arg {
                pending.push(e);
            }
        }
    }
    names
}

fn run(table: &SExprTable, input: &str, show_tree: bool) -> Result<SExpr, SexprError> {
    if !show_tree {
        return parse_sexpr(table, input);
    }
    let tree = parse_tree(table, input)?;
    print!("{}", format_tree(&tree));
    Ok(reduce(&tree)?)
}

fn repl(table: &SExprTable, show_tree: bool) {
    let mut rl = completer::get_editor();
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str());
                match run(table, &line, show_tree) {
                    Ok(sexpr) => {
                        if let Some(helper) = rl.helper_mut() {
                            helper.remember(identifiers(&sexpr));
                        }
                        println!("{}", sexpr);
                    }
                    Err(e) => println!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                error!("{}", e);
                break;
            }
        }
    }
}

fn joined(set: Option<&HashSet<String>>) -> String {
    let mut items: Vec<&str> = set.into_iter().flatten().map(String::as_str).collect();
    items.sort();
    items.join(" ")
}

///! Compiles a textual grammar and prints its sets and table
fn check_grammar(path: &str, start: Option<&str>) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let grammar = Grammar::from_notation(&text, start)?;
    debug!(
        "{}: {} rules, start symbol {}",
        path,
        grammar.rules().len(),
        grammar.start()
    );
    let table = ParseTable::new(grammar)?;
    let sets = table.sets();
    for nt in table.grammar().non_terminals() {
        println!(
            "{}{}\n  FIRST  = {{{}}}\n  FOLLOW = {{{}}}",
            nt,
            if sets.is_nullable(nt) { " (nullable)" } else { "" },
            joined(sets.first(&Symbol::NonTerminal(nt.clone()))),
            joined(sets.follow(nt)),
        );
    }
    table.print_table();
    Ok(())
}

fn main() {
    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Parses S-expressions with a predictive LL(1) parser.")
        .arg(
            Arg::with_name("grammar")
                .long("grammar")
                .value_name("FILE")
                .help("Compile a grammar written as `LHS → s1 s2 …` lines and print its table")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("start")
                .long("start")
                .value_name("NT")
                .help("Start symbol of the grammar, the first rule's left side by default")
                .takes_value(true)
                .requires("grammar"),
        )
        .arg(
            Arg::with_name("print_table")
                .long("print-table")
                .help("Print the S-expression parse table"),
        )
        .arg(
            Arg::with_name("tree")
                .long("tree")
                .help("Print the parse tree of every input"),
        )
        .arg(
            Arg::with_name("EXPR")
                .help("Expression to parse, starts an interactive session when omitted")
                .index(1),
        )
        .get_matches();

    pretty_env_logger::init();

    if let Some(path) = matches.value_of("grammar") {
        if let Err(e) = check_grammar(path, matches.value_of("start")) {
            error!("{}", e);
            process::exit(1);
        }
        return;
    }

    let table = match sexpr_table() {
        Ok(table) => table,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    if matches.is_present("print_table") {
        table.print_table();
    }

    let show_tree = matches.is_present("tree");
    match matches.value_of("EXPR") {
        Some(input) => match run(&table, input, show_tree) {
            Ok(sexpr) => println!("{}", sexpr),
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        },
        None => repl(&table, show_tree),
    }
}
