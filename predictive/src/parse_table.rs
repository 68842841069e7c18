use crate::grammar::{Grammar, GrammarError, Rule, Symbol};
use crate::sets::GrammarSets;
use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

type Table<T, NT> = HashMap<NT, HashMap<T, usize>>;

///! A predictive parse table: for each non terminal and lookahead terminal, the rule to expand.
///! The table is a pure function of its grammar, build it once and share it between parses.
///! With the `serde` feature it can be saved for repeated uses.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParseTable<T, NT>
where
    T: PartialEq + Eq + Hash,
    NT: PartialEq + Eq + Hash,
{
    grammar: Grammar<T, NT>,
    sets: GrammarSets<T, NT>,
    table: Table<T, NT>,
}

///! Two rules claim the same cell: the grammar is not LL(1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictError<T, NT> {
    pub non_terminal: NT,
    pub terminal: T,
    ///! Rule already in the cell
    pub existing: Rule<T, NT>,
    ///! Rule that tried to claim it
    pub candidate: Rule<T, NT>,
}

impl<T: Debug, NT: Debug> Display for ConflictError<T, NT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grammar is not LL(1): on {:?} with lookahead {:?}, rule `{}` conflicts with rule `{}`",
            self.non_terminal, self.terminal, self.existing, self.candidate
        )
    }
}

impl<T: Debug, NT: Debug> Error for ConflictError<T, NT> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTableError<T, NT> {
    InvalidGrammar(GrammarError<NT>),
    Conflict(ConflictError<T, NT>),
}

impl<T, NT> From<GrammarError<NT>> for ParseTableError<T, NT> {
    fn from(err: GrammarError<NT>) -> ParseTableError<T, NT> {
        ParseTableError::InvalidGrammar(err)
    }
}

impl<T, NT> From<ConflictError<T, NT>> for ParseTableError<T, NT> {
    fn from(err: ConflictError<T, NT>) -> ParseTableError<T, NT> {
        ParseTableError::Conflict(err)
    }
}

impl<T: Debug, NT: Debug> Display for ParseTableError<T, NT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseTableError::InvalidGrammar(e) => write!(f, "invalid grammar: {}", e),
            ParseTableError::Conflict(e) => Display::fmt(e, f),
        }
    }
}

impl<T: Debug + 'static, NT: Debug + 'static> Error for ParseTableError<T, NT> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseTableError::InvalidGrammar(e) => Some(e),
            ParseTableError::Conflict(e) => Some(e),
        }
    }
}

fn claim_cell<T, NT>(
    table: &mut Table<T, NT>,
    grammar: &Grammar<T, NT>,
    rule: &Rule<T, NT>,
    terminal: &T,
) -> Result<(), ConflictError<T, NT>>
where
    T: Hash + Clone + PartialEq + Eq,
    NT: Hash + Clone + PartialEq + Eq,
{
    let row = table.entry(rule.lhs.clone()).or_insert_with(HashMap::new);
    match row.entry(terminal.clone()) {
        // The same rule may come from both FIRST and FOLLOW
        Entry::Occupied(cell) if *cell.get() == rule.index => Ok(()),
        Entry::Occupied(cell) => Err(ConflictError {
            non_terminal: rule.lhs.clone(),
            terminal: terminal.clone(),
            existing: grammar.rules()[*cell.get()].clone(),
            candidate: rule.clone(),
        }),
        Entry::Vacant(cell) => {
            cell.insert(rule.index);
            Ok(())
        }
    }
}

fn generate_table<T, NT>(
    grammar: &Grammar<T, NT>,
    sets: &GrammarSets<T, NT>,
) -> Result<Table<T, NT>, ConflictError<T, NT>>
where
    T: Hash + Clone + PartialEq + Eq + Debug,
    NT: Hash + Clone + PartialEq + Eq + Debug,
{
    let mut table = HashMap::new();
    for non_terminal in grammar.non_terminals() {
        table.insert(non_terminal.clone(), HashMap::new());
    }
    for rule in grammar.rules() {
        let first = sets.first_of(&rule.rhs);
        let follow = if sets.is_nullable_sequence(&rule.rhs) {
            sets.follow(&rule.lhs)
        } else {
            None
        };
        // Walk the terminals in grammar order so conflicts are reported deterministically
        for terminal in grammar.terminals() {
            let in_follow = follow.map_or(false, |f| f.contains(terminal));
            if first.contains(terminal) || in_follow {
                trace!("table[{:?}][{:?}] = {}", rule.lhs, terminal, rule);
                claim_cell(&mut table, grammar, rule, terminal)?;
            }
        }
    }
    Ok(table)
}

impl<T, NT> ParseTable<T, NT>
where
    T: Clone + PartialEq + Eq + Hash + Debug,
    NT: Clone + PartialEq + Eq + Hash + Debug,
{
    pub fn new(grammar: Grammar<T, NT>) -> Result<ParseTable<T, NT>, ParseTableError<T, NT>> {
        let sets = GrammarSets::compute(&grammar);
        let table = generate_table(&grammar, &sets)?;
        let parse_table = ParseTable {
            grammar,
            sets,
            table,
        };
        debug!(
            "built LL(1) table: {} rules, {} filled cells",
            parse_table.grammar.rules().len(),
            parse_table.len()
        );
        Ok(parse_table)
    }

    ///! Validates the grammar then builds its table
    pub fn from_rules(
        rules: Vec<Rule<T, NT>>,
        start: NT,
    ) -> Result<ParseTable<T, NT>, ParseTableError<T, NT>> {
        let grammar = Grammar::new(rules, start)?;
        ParseTable::new(grammar)
    }

    pub fn grammar(&self) -> &Grammar<T, NT> {
        &self.grammar
    }

    pub fn sets(&self) -> &GrammarSets<T, NT> {
        &self.sets
    }

    ///! The rule to expand `non_terminal` with when `terminal` is the lookahead
    pub fn get(&self, non_terminal: &NT, terminal: &T) -> Option<&Rule<T, NT>> {
        self.table
            .get(non_terminal)
            .and_then(|row| row.get(terminal))
            .and_then(|index| self.grammar.rule(*index))
    }

    ///! Lookaheads with an entry in the row of `non_terminal`, in grammar order
    pub fn expected(&self, non_terminal: &NT) -> Vec<T> {
        match self.table.get(non_terminal) {
            Some(row) => self
                .grammar
                .terminals()
                .iter()
                .filter(|t| row.contains_key(t))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    ///! Number of filled cells
    pub fn len(&self) -> usize {
        self.table.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn format_rhs<T: Debug, NT: Debug>(rhs: &[Symbol<T, NT>]) -> String {
    if rhs.is_empty() {
        return "ε".to_owned();
    }
    rhs.iter()
        .map(|s| match s {
            Symbol::Terminal(t) => format!("{:?}", t),
            Symbol::NonTerminal(nt) => format!("{:?}", nt),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "print_table")]
impl<T, NT> ParseTable<T, NT>
where
    T: Hash + Debug + PartialEq + Eq + Clone,
    NT: Hash + Debug + PartialEq + Eq + Clone,
{
    pub fn to_pretty_table(&self) -> prettytable::Table {
        use prettytable::{Attr, Cell, Row, Table};

        let mut table = Table::new();
        let mut header = vec![Cell::new("LL(1)")
            .with_style(Attr::Bold)
            .with_style(Attr::Italic(true))];
        header.extend(
            self.grammar
                .terminals()
                .iter()
                .map(|t| Cell::new(&format!("{:?}", t)).with_style(Attr::Bold)),
        );
        table.add_row(Row::new(header));

        for non_terminal in self.grammar.non_terminals() {
            let mut row = vec![Cell::new(&format!("{:?}", non_terminal)).with_style(Attr::Bold)];
            for terminal in self.grammar.terminals() {
                row.push(match self.get(non_terminal, terminal) {
                    Some(rule) => Cell::new(&format!("{}: {}", rule.index, format_rhs(&rule.rhs))),
                    None => Cell::new(""),
                });
            }
            table.add_row(Row::new(row));
        }
        table
    }

    pub fn print_table(&self) {
        self.to_pretty_table().printstd();
    }
}

impl<T, NT> Display for ParseTable<T, NT>
where
    T: Hash + Debug + PartialEq + Eq + Clone,
    NT: Hash + Debug + PartialEq + Eq + Clone,
{
    ///! One line per filled cell: `NT, T => rule`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for non_terminal in self.grammar.non_terminals() {
            for terminal in self.grammar.terminals() {
                if let Some(rule) = self.get(non_terminal, terminal) {
                    writeln!(
                        f,
                        "{:?}, {:?} => {}",
                        non_terminal,
                        terminal,
                        format_rhs(&rule.rhs)
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConflictError, ParseTable, ParseTableError};
    use crate::grammar::{create_rules, GrammarError, Rule, Symbol};
    use lazy_static::lazy_static;

    #[derive(PartialEq, Eq, Hash, Clone, Debug)]
    enum NT {
        S,
        E,
        EPrime,
        T,
        TPrime,
        F,
    }
    #[derive(PartialEq, Eq, Hash, Clone, Debug)]
    enum T {
        LParen,
        RParen,
        Id,
        Plus,
        Times,
        End,
    }

    lazy_static! {
        static ref TEST_GRAMMAR: Vec<Rule<T, NT>> = create_rules(vec![
            (NT::S, crate::rule_rhs![(NT::E), T::End]),
            (NT::E, crate::rule_rhs![(NT::T), (NT::EPrime)]),
            (NT::EPrime, crate::rule_rhs![T::Plus, (NT::T), (NT::EPrime)]),
            (NT::EPrime, crate::rule_rhs![]),
            (NT::T, crate::rule_rhs![(NT::F), (NT::TPrime)]),
            (NT::TPrime, crate::rule_rhs![T::Times, (NT::F), (NT::TPrime)]),
            (NT::TPrime, crate::rule_rhs![]),
            (NT::F, crate::rule_rhs![T::LParen, (NT::E), T::RParen]),
            (NT::F, crate::rule_rhs![T::Id]),
        ]);
    }

    fn rule_index(table: &ParseTable<T, NT>, nt: NT, t: T) -> Option<usize> {
        table.get(&nt, &t).map(|r| r.index)
    }

    #[test]
    fn generate_parse_table() {
        let parse_table = ParseTable::from_rules(TEST_GRAMMAR.clone(), NT::S).unwrap();

        assert_eq!(rule_index(&parse_table, NT::S, T::Id), Some(0));
        assert_eq!(rule_index(&parse_table, NT::S, T::LParen), Some(0));
        assert_eq!(rule_index(&parse_table, NT::S, T::End), None);
        assert_eq!(rule_index(&parse_table, NT::E, T::LParen), Some(1));
        assert_eq!(rule_index(&parse_table, NT::EPrime, T::Plus), Some(2));
        assert_eq!(rule_index(&parse_table, NT::EPrime, T::RParen), Some(3));
        assert_eq!(rule_index(&parse_table, NT::EPrime, T::End), Some(3));
        assert_eq!(rule_index(&parse_table, NT::EPrime, T::Times), None);
        assert_eq!(rule_index(&parse_table, NT::T, T::Id), Some(4));
        assert_eq!(rule_index(&parse_table, NT::TPrime, T::Times), Some(5));
        assert_eq!(rule_index(&parse_table, NT::TPrime, T::Plus), Some(6));
        assert_eq!(rule_index(&parse_table, NT::TPrime, T::RParen), Some(6));
        assert_eq!(rule_index(&parse_table, NT::TPrime, T::End), Some(6));
        assert_eq!(rule_index(&parse_table, NT::F, T::LParen), Some(7));
        assert_eq!(rule_index(&parse_table, NT::F, T::Id), Some(8));
        assert_eq!(parse_table.len(), 15);
    }

    #[cfg(feature = "print_table")]
    #[test]
    fn pretty_table() {
        let parse_table = ParseTable::from_rules(TEST_GRAMMAR.clone(), NT::S).unwrap();
        let table = parse_table.to_pretty_table();
        assert_eq!(table.len(), 7);

        let header = table.get_row(0).unwrap();
        assert_eq!(header.len(), 7);
        let end = (1..header.len())
            .find(|i| header.get_cell(*i).unwrap().get_content() == "End")
            .unwrap();
        let e_prime = (1..table.len())
            .map(|i| table.get_row(i).unwrap())
            .find(|row| row.get_cell(0).unwrap().get_content() == "EPrime")
            .unwrap();
        assert_eq!(e_prime.get_cell(end).unwrap().get_content(), "3: ε");

        parse_table.print_table();
    }

    #[test]
    fn expected_lookaheads() {
        let parse_table = ParseTable::from_rules(TEST_GRAMMAR.clone(), NT::S).unwrap();
        assert_eq!(
            parse_table.expected(&NT::TPrime),
            vec![T::End, T::Plus, T::Times, T::RParen]
        );
        assert_eq!(parse_table.expected(&NT::F), vec![T::LParen, T::Id]);
    }

    #[test]
    fn invalid_grammar() {
        let grammar = create_rules(vec![(
            NT::E,
            vec![Symbol::NonTerminal(NT::F), Symbol::Terminal(T::Id)],
        )]);
        assert_eq!(
            ParseTable::from_rules(grammar, NT::E).unwrap_err(),
            ParseTableError::InvalidGrammar(GrammarError::NoDeriveRule(NT::F))
        );
    }

    #[test]
    fn duplicated_first_conflicts() {
        let rules = create_rules(vec![
            (NT::S, crate::rule_rhs![(NT::E), T::End]),
            (NT::E, crate::rule_rhs![T::Id, T::Plus]),
            (NT::E, crate::rule_rhs![T::Id, T::Times]),
        ]);
        let err = ParseTable::from_rules(rules.clone(), NT::S).unwrap_err();
        assert_eq!(
            err,
            ParseTableError::Conflict(ConflictError {
                non_terminal: NT::E,
                terminal: T::Id,
                existing: rules[1].clone(),
                candidate: rules[2].clone(),
            })
        );
        assert_eq!(
            err.to_string(),
            "grammar is not LL(1): on E with lookahead Id, \
             rule `1: E -> Id Plus` conflicts with rule `2: E -> Id Times`"
        );
    }

    #[test]
    fn left_recursion_conflicts() {
        let rules = create_rules(vec![
            (NT::S, crate::rule_rhs![(NT::E), T::End]),
            (NT::E, crate::rule_rhs![(NT::E), T::Plus, (NT::T)]),
            (NT::E, crate::rule_rhs![(NT::T)]),
            (NT::T, crate::rule_rhs![T::Id]),
        ]);
        match ParseTable::from_rules(rules, NT::S) {
            Err(ParseTableError::Conflict(conflict)) => {
                assert_eq!(conflict.non_terminal, NT::E);
                assert_eq!(conflict.terminal, T::Id);
            }
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    fn follow_conflicts_with_first() {
        // EPrime can be empty while an Id follows it, and can also start with an Id
        let rules = create_rules(vec![
            (NT::S, crate::rule_rhs![(NT::EPrime), T::Id, T::End]),
            (NT::EPrime, crate::rule_rhs![T::Id]),
            (NT::EPrime, crate::rule_rhs![]),
        ]);
        match ParseTable::from_rules(rules.clone(), NT::S) {
            Err(ParseTableError::Conflict(conflict)) => {
                assert_eq!(conflict.existing, rules[1]);
                assert_eq!(conflict.candidate, rules[2]);
            }
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    fn display_lists_filled_cells() {
        let rules = create_rules(vec![
            (NT::S, crate::rule_rhs![(NT::EPrime), T::End]),
            (NT::EPrime, crate::rule_rhs![T::Plus]),
            (NT::EPrime, crate::rule_rhs![]),
        ]);
        let parse_table = ParseTable::from_rules(rules, NT::S).unwrap();
        assert_eq!(
            parse_table.to_string(),
            "S, End => EPrime End\n\
             S, Plus => EPrime End\n\
             EPrime, End => ε\n\
             EPrime, Plus => Plus\n"
        );
    }
}
