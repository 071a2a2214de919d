//! FIRST and FOLLOW set computation.
//!
//! Both sets are grown to a fixed point by monotone iteration over the
//! production rules; the domains are finite subsets of the terminal set, so
//! termination is guaranteed.

use crate::grammar::{Grammar, NonterminalID, SymbolID, TerminalID};
use bit_set::BitSet;
use indexmap::IndexMap;

/// A set of terminals, backed by a bit set keyed on terminal indices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.index())
    }

    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.index())
    }

    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner.iter().map(TerminalID::from_index)
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.index()).collect(),
        }
    }
}

/// `FIRST(A)`: the terminals that can begin a derivation of `A`.
#[derive(Debug)]
pub struct FirstSets {
    map: IndexMap<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub fn new<V, U>(grammar: &Grammar<V, U>) -> Self {
        let mut map: IndexMap<NonterminalID, TerminalSet> = grammar
            .nonterminals()
            .map(|(id, _)| (id, TerminalSet::default()))
            .collect();

        // For a rule `A -> X1 ...` (never empty): a leading terminal seeds
        // FIRST(A) directly, a leading non-terminal B contributes FIRST(B).
        let mut changed = true;
        while changed {
            changed = false;
            for (_, rule) in grammar.rules() {
                let left = rule.left();
                match rule.right()[0] {
                    SymbolID::T(t) => {
                        changed |= map[&left].insert(t);
                    }
                    SymbolID::N(b) if b != left => {
                        let source = map[&b].clone();
                        let target = &mut map[&left];
                        let before = target.len();
                        target.union_with(&source);
                        changed |= target.len() != before;
                    }
                    SymbolID::N(_) => {}
                }
            }
        }

        Self { map }
    }

    pub fn get(&self, id: NonterminalID) -> &TerminalSet {
        &self.map[&id]
    }
}

/// `FOLLOW(A)`: the terminals that may appear immediately after `A` in a
/// sentential form derived from the start symbol.
#[derive(Debug)]
pub struct FollowSets {
    map: IndexMap<NonterminalID, TerminalSet>,
}

impl FollowSets {
    pub fn new<V, U>(grammar: &Grammar<V, U>, first: &FirstSets) -> Self {
        let mut map: IndexMap<NonterminalID, TerminalSet> = grammar
            .nonterminals()
            .map(|(id, _)| (id, TerminalSet::default()))
            .collect();

        // FOLLOW(start) is seeded with the end-of-stream terminal.
        map[&grammar.start_symbol()].insert(TerminalID::EOS);

        let mut changed = true;
        while changed {
            changed = false;
            for (_, rule) in grammar.rules() {
                let right = rule.right();
                for (i, symbol) in right.iter().enumerate() {
                    let SymbolID::N(x) = *symbol else { continue };
                    match right.get(i + 1) {
                        // `A -> ... X t ...`
                        Some(SymbolID::T(t)) => {
                            changed |= map[&x].insert(*t);
                        }
                        // `A -> ... X C ...`
                        Some(SymbolID::N(c)) => {
                            let source = first.get(*c);
                            let target = &mut map[&x];
                            let before = target.len();
                            target.union_with(source);
                            changed |= target.len() != before;
                        }
                        // `A -> ... X`
                        None => {
                            let source = map[&rule.left()].clone();
                            let target = &mut map[&x];
                            let before = target.len();
                            target.union_with(&source);
                            changed |= target.len() != before;
                        }
                    }
                }
            }
        }

        Self { map }
    }

    pub fn get(&self, id: NonterminalID) -> &TerminalSet {
        &self.map[&id]
    }
}
