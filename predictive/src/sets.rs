use crate::grammar::{Grammar, Rule, Symbol};
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

pub type FirstSets<T, NT> = HashMap<Symbol<T, NT>, HashSet<T>>;
pub type FollowSets<T, NT> = HashMap<NT, HashSet<T>>;

///! Number of passes each fixed point needed, the last pass being the one that changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Passes {
    pub nullable: usize,
    pub first: usize,
    pub follow: usize,
}

///! The nullable, FIRST and FOLLOW sets of a grammar
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GrammarSets<T, NT>
where
    T: PartialEq + Eq + Hash,
    NT: PartialEq + Eq + Hash,
{
    nullable: HashSet<NT>,
    first: FirstSets<T, NT>,
    follow: FollowSets<T, NT>,
    passes: Passes,
}

impl<T, NT> GrammarSets<T, NT>
where
    T: Clone + PartialEq + Eq + Hash,
    NT: Clone + PartialEq + Eq + Hash,
{
    ///! Runs the nullable, FIRST and FOLLOW fixed points, in that order
    pub fn compute(grammar: &Grammar<T, NT>) -> GrammarSets<T, NT> {
        let mut passes = Passes::default();

        let mut nullable = HashSet::new();
        loop {
            passes.nullable += 1;
            if !nullable_pass(grammar.rules(), &mut nullable) {
                break;
            }
        }
        debug!(
            "nullable converged after {} passes: {} of {} non terminals",
            passes.nullable,
            nullable.len(),
            grammar.non_terminals().len()
        );

        let mut first = initial_first_sets(grammar);
        loop {
            passes.first += 1;
            if !first_pass(grammar.rules(), &nullable, &mut first) {
                break;
            }
        }
        debug!("FIRST converged after {} passes", passes.first);

        let mut follow = initial_follow_sets(grammar);
        loop {
            passes.follow += 1;
            if !follow_pass(grammar.rules(), &nullable, &first, &mut follow) {
                break;
            }
        }
        debug!("FOLLOW converged after {} passes", passes.follow);

        GrammarSets {
            nullable,
            first,
            follow,
            passes,
        }
    }

    pub fn is_nullable(&self, non_terminal: &NT) -> bool {
        self.nullable.contains(non_terminal)
    }

    pub fn is_nullable_symbol(&self, symbol: &Symbol<T, NT>) -> bool {
        is_nullable(&self.nullable, symbol)
    }

    ///! Whether every symbol of `list` is nullable, true for the empty list
    pub fn is_nullable_sequence(&self, list: &[Symbol<T, NT>]) -> bool {
        list.iter().all(|s| is_nullable(&self.nullable, s))
    }

    pub fn nullable(&self) -> &HashSet<NT> {
        &self.nullable
    }

    ///! `None` if the symbol does not occur in the grammar
    pub fn first(&self, symbol: &Symbol<T, NT>) -> Option<&HashSet<T>> {
        self.first.get(symbol)
    }

    pub fn first_of(&self, list: &[Symbol<T, NT>]) -> HashSet<T> {
        first_of_list(list, &self.nullable, &self.first)
    }

    ///! `None` if the non terminal does not occur in the grammar
    pub fn follow(&self, non_terminal: &NT) -> Option<&HashSet<T>> {
        self.follow.get(non_terminal)
    }

    pub fn first_sets(&self) -> &FirstSets<T, NT> {
        &self.first
    }

    pub fn follow_sets(&self) -> &FollowSets<T, NT> {
        &self.follow
    }

    pub fn passes(&self) -> Passes {
        self.passes
    }
}

fn is_nullable<T, NT>(nullable: &HashSet<NT>, symbol: &Symbol<T, NT>) -> bool
where
    NT: PartialEq + Eq + Hash,
{
    match symbol {
        Symbol::Terminal(_) => false,
        Symbol::NonTerminal(nt) => nullable.contains(nt),
    }
}

///! One scan over the rules, returns whether a non terminal became nullable
fn nullable_pass<T, NT>(rules: &[Rule<T, NT>], nullable: &mut HashSet<NT>) -> bool
where
    NT: PartialEq + Eq + Hash + Clone,
{
    let mut changed = false;
    for rule in rules {
        if nullable.contains(&rule.lhs) {
            continue;
        }
        if rule.rhs.iter().all(|s| is_nullable(nullable, s)) {
            nullable.insert(rule.lhs.clone());
            changed = true;
        }
    }
    changed
}

fn initial_first_sets<T, NT>(grammar: &Grammar<T, NT>) -> FirstSets<T, NT>
where
    T: Hash + Clone + PartialEq + Eq,
    NT: Hash + Clone + PartialEq + Eq,
{
    let mut sets = HashMap::new();
    for terminal in grammar.terminals() {
        let mut set = HashSet::new();
        set.insert(terminal.clone());
        sets.insert(Symbol::Terminal(terminal.clone()), set);
    }
    for non_terminal in grammar.non_terminals() {
        sets.insert(Symbol::NonTerminal(non_terminal.clone()), HashSet::new());
    }
    sets
}

///! FIRST of a sequence: the FIRST of its longest nullable prefix and of the symbol after it
pub(crate) fn first_of_list<T, NT>(
    list: &[Symbol<T, NT>],
    nullable: &HashSet<NT>,
    sets: &FirstSets<T, NT>,
) -> HashSet<T>
where
    T: Hash + Clone + PartialEq + Eq,
    NT: Hash + Clone + PartialEq + Eq,
{
    let mut result = HashSet::new();
    for symbol in list {
        if let Some(first) = sets.get(symbol) {
            result.extend(first.iter().cloned());
        }
        if !is_nullable(nullable, symbol) {
            break;
        }
    }
    result
}

///! One scan over the rules, returns whether a FIRST set grew
fn first_pass<T, NT>(
    rules: &[Rule<T, NT>],
    nullable: &HashSet<NT>,
    sets: &mut FirstSets<T, NT>,
) -> bool
where
    T: Hash + Clone + PartialEq + Eq,
    NT: Hash + Clone + PartialEq + Eq,
{
    let mut changed = false;
    for rule in rules {
        let first_of_rhs = first_of_list(&rule.rhs, nullable, sets);
        let set_to_add = sets
            .entry(Symbol::NonTerminal(rule.lhs.clone()))
            .or_insert_with(HashSet::new);
        for item in first_of_rhs {
            changed |= set_to_add.insert(item);
        }
    }
    changed
}

fn initial_follow_sets<T, NT>(grammar: &Grammar<T, NT>) -> FollowSets<T, NT>
where
    T: Hash + Clone + PartialEq + Eq,
    NT: Hash + Clone + PartialEq + Eq,
{
    // No end marker for the start symbol, grammars carry their own
    grammar
        .non_terminals()
        .iter()
        .map(|nt| (nt.clone(), HashSet::new()))
        .collect()
}

///! One right to left scan of every rule, returns whether a FOLLOW set grew
fn follow_pass<T, NT>(
    rules: &[Rule<T, NT>],
    nullable: &HashSet<NT>,
    first: &FirstSets<T, NT>,
    sets: &mut FollowSets<T, NT>,
) -> bool
where
    T: Hash + Clone + PartialEq + Eq,
    NT: Hash + Clone + PartialEq + Eq,
{
    let mut changed = false;
    for rule in rules {
        let mut trailer = sets.get(&rule.lhs).cloned().unwrap_or_else(HashSet::new);
        for symbol in rule.rhs.iter().rev() {
            if let Symbol::NonTerminal(nt) = symbol {
                let set_to_add = sets.entry(nt.clone()).or_insert_with(HashSet::new);
                for item in &trailer {
                    changed |= set_to_add.insert(item.clone());
                }
            }
            let first_of_symbol = first.get(symbol).cloned().unwrap_or_else(HashSet::new);
            if is_nullable(nullable, symbol) {
                trailer.extend(first_of_symbol);
            } else {
                trailer = first_of_symbol;
            }
        }
    }
    changed
}
