//! LR(0) automaton construction: items, closures and the canonical state
//! collection.

use crate::grammar::{Grammar, NonterminalID, RuleID, SymbolID};
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID(u32);

impl StateID {
    pub(crate) const START: Self = Self(0);

    fn new(raw: usize) -> Self {
        Self(raw as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{:02}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// An LR(0) item: a production rule plus a dot position in
/// `0..=rule.right().len()`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub rule: RuleID,
    pub dot: usize,
}

impl Item {
    fn advanced(self) -> Self {
        Self {
            rule: self.rule,
            dot: self.dot + 1,
        }
    }

    /// The dot has reached the end of the sequence.
    pub fn is_complete<V, U>(&self, grammar: &Grammar<V, U>) -> bool {
        self.dot >= grammar.rule(self.rule).right().len()
    }

    /// The symbol immediately after the dot, if any.
    pub fn next_symbol<V, U>(&self, grammar: &Grammar<V, U>) -> Option<SymbolID> {
        grammar.rule(self.rule).right().get(self.dot).copied()
    }

    /// Renders the item as `left -> a . b c`.
    pub fn display<'g, V, U>(self, grammar: &'g Grammar<V, U>) -> ItemDisplay<'g, V, U> {
        ItemDisplay {
            grammar,
            item: self,
        }
    }
}

/// Displays an item with its dot position. Returned by [`Item::display`].
pub struct ItemDisplay<'g, V, U> {
    grammar: &'g Grammar<V, U>,
    item: Item,
}

impl<V, U> fmt::Display for ItemDisplay<'_, V, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = self.grammar.rule(self.item.rule);
        write!(f, "{} ->", self.grammar.nonterminal_name(rule.left()))?;
        for (i, symbol) in rule.right().iter().enumerate() {
            if i == self.item.dot {
                f.write_str(" .")?;
            }
            write!(f, " {}", self.grammar.symbol_name(*symbol))?;
        }
        if self.item.dot == rule.right().len() {
            f.write_str(" .")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?} @ {})", self.rule, self.dot)
    }
}

/// One automaton state: its kernel items, their closure and the outgoing
/// transitions.
#[derive(Debug)]
pub struct State {
    kernel: Vec<Item>,
    closure: Vec<Item>,
    edges: IndexMap<SymbolID, StateID>,
}

impl State {
    pub fn kernel(&self) -> &[Item] {
        &self.kernel
    }

    pub fn closure(&self) -> &[Item] {
        &self.closure
    }

    pub fn edges(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.edges.iter().map(|(symbol, target)| (*symbol, *target))
    }
}

/// The canonical collection of LR(0) states.
///
/// State identity is structural equality of the ordered kernel item list;
/// kernels are interned so each distinct kernel is assigned exactly one
/// [`StateID`]. State 0 holds the synthetic accept item.
#[derive(Debug)]
pub struct Automaton {
    states: Vec<State>,
}

impl Automaton {
    pub fn generate<V, U>(grammar: &Grammar<V, U>) -> Self {
        let mut kernels: IndexMap<Vec<Item>, StateID> = IndexMap::new();
        let mut pending = VecDeque::new();

        let start_kernel = vec![Item {
            rule: RuleID::ACCEPT,
            dot: 0,
        }];
        kernels.insert(start_kernel.clone(), StateID::START);
        pending.push_back(start_kernel);

        let mut states = Vec::new();
        while let Some(kernel) = pending.pop_front() {
            let closure = closure_of(grammar, &kernel);

            let mut edges = IndexMap::new();
            for (symbol, successor) in transitions_of(grammar, &closure) {
                let target = match kernels.entry(successor) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let id = StateID::new(entry.index());
                        pending.push_back(entry.key().clone());
                        entry.insert(id);
                        id
                    }
                };
                edges.insert(symbol, target);
            }

            log::trace!(
                "state {:?}: {} kernel item(s), {} edge(s)",
                StateID::new(states.len()),
                kernel.len(),
                edges.len()
            );
            states.push(State {
                kernel,
                closure,
                edges,
            });
        }

        Self { states }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(index, state)| (StateID::new(index), state))
    }

    /// Renders one state's closure, one item per line.
    pub fn display_state<'a, V, U>(
        &'a self,
        grammar: &'a Grammar<V, U>,
        id: StateID,
    ) -> StateDisplay<'a, V, U> {
        StateDisplay {
            automaton: self,
            grammar,
            id,
        }
    }

    /// Renders every state with its items and transitions.
    pub fn display<'a, V, U>(&'a self, grammar: &'a Grammar<V, U>) -> AutomatonDisplay<'a, V, U> {
        AutomatonDisplay {
            automaton: self,
            grammar,
        }
    }
}

/// Displays one state's closure. Returned by [`Automaton::display_state`].
pub struct StateDisplay<'a, V, U> {
    automaton: &'a Automaton,
    grammar: &'a Grammar<V, U>,
    id: StateID,
}

impl<V, U> fmt::Display for StateDisplay<'_, V, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in self.automaton.state(self.id).closure() {
            writeln!(f, "  - {}", item.display(self.grammar))?;
        }
        Ok(())
    }
}

/// Displays the whole automaton. Returned by [`Automaton::display`].
pub struct AutomatonDisplay<'a, V, U> {
    automaton: &'a Automaton,
    grammar: &'a Grammar<V, U>,
}

impl<V, U> fmt::Display for AutomatonDisplay<'_, V, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, state) in self.automaton.states() {
            writeln!(f, "state {}:", id)?;
            write!(f, "{}", self.automaton.display_state(self.grammar, id))?;
            for (symbol, target) in state.edges() {
                writeln!(f, "  {} => {}", self.grammar.symbol_name(symbol), target)?;
            }
        }
        Ok(())
    }
}

/// Expands a kernel to its closure.
///
/// Every non-terminal is expanded at most once per call; item insertion
/// order is preserved, and re-closing a closure yields it unchanged.
pub(crate) fn closure_of<V, U>(grammar: &Grammar<V, U>, kernel: &[Item]) -> Vec<Item> {
    let mut items = kernel.to_vec();
    let mut expanded: IndexSet<NonterminalID> = IndexSet::new();

    let mut i = 0;
    while i < items.len() {
        if let Some(SymbolID::N(next)) = items[i].next_symbol(grammar) {
            if expanded.insert(next) {
                for &rule in grammar.nonterminal(next).rules() {
                    let item = Item { rule, dot: 0 };
                    if !items.contains(&item) {
                        items.push(item);
                    }
                }
            }
        }
        i += 1;
    }

    items
}

/// Groups the advanceable closure items by their next symbol, preserving
/// the order in which the items were produced. The grouped item lists are
/// the kernels of the successor states.
pub(crate) fn transitions_of<V, U>(
    grammar: &Grammar<V, U>,
    closure: &[Item],
) -> IndexMap<SymbolID, Vec<Item>> {
    let mut successors: IndexMap<SymbolID, Vec<Item>> = IndexMap::new();
    for item in closure {
        if let Some(symbol) = item.next_symbol(grammar) {
            successors.entry(symbol).or_default().push(item.advanced());
        }
    }
    successors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Assoc;
    use SymbolID::*;

    fn arithmetic() -> Grammar<f64> {
        Grammar::define(|g| {
            let num = g.terminal("NUM", r"\d+", Assoc::None, None)?;
            let plus = g.terminal("+", r"\+", Assoc::Left, None)?;
            let star = g.terminal("*", r"\*", Assoc::Left, None)?;
            let lparen = g.terminal("(", r"\(", Assoc::None, None)?;
            let rparen = g.terminal(")", r"\)", Assoc::None, None)?;

            let expr = g.nonterminal("expr")?;
            let term = g.nonterminal("term")?;
            let factor = g.nonterminal("factor")?;

            g.rule(expr, [N(expr), T(plus), N(term)], None)?;
            g.rule(expr, [N(term)], None)?;
            g.rule(term, [N(term), T(star), N(factor)], None)?;
            g.rule(term, [N(factor)], None)?;
            g.rule(factor, [T(num)], None)?;
            g.rule(factor, [T(lparen), N(expr), T(rparen)], None)?;
            g.start_symbol(expr)
        })
        .unwrap()
    }

    #[test]
    fn start_state_holds_the_accept_item() {
        let grammar = arithmetic();
        let automaton = Automaton::generate(&grammar);
        let start = automaton.state(StateID::START);
        assert_eq!(
            start.kernel(),
            &[Item {
                rule: RuleID::ACCEPT,
                dot: 0
            }]
        );
        // The closure predicts every rule of the start symbol.
        assert!(start.closure().len() > 1);
    }

    #[test]
    fn closure_is_idempotent() {
        let grammar = arithmetic();
        let automaton = Automaton::generate(&grammar);
        for (_, state) in automaton.states() {
            let once = state.closure();
            let twice = closure_of(&grammar, once);
            assert_eq!(once, &twice[..]);
        }
    }

    #[test]
    fn transitions_are_sound() {
        let grammar = arithmetic();
        let automaton = Automaton::generate(&grammar);
        for (_, state) in automaton.states() {
            for (symbol, target) in state.edges() {
                let expected: Vec<Item> = state
                    .closure()
                    .iter()
                    .filter(|item| item.next_symbol(&grammar) == Some(symbol))
                    .map(|item| item.advanced())
                    .collect();
                assert_eq!(automaton.state(target).kernel(), &expected[..]);
            }
        }
    }

    #[test]
    fn kernels_are_canonical() {
        let grammar = arithmetic();
        let automaton = Automaton::generate(&grammar);
        for (a, state_a) in automaton.states() {
            for (b, state_b) in automaton.states() {
                if a != b {
                    assert_ne!(state_a.kernel(), state_b.kernel());
                }
            }
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let grammar = arithmetic();
        let first = Automaton::generate(&grammar);
        let second = Automaton::generate(&grammar);
        assert_eq!(first.len(), second.len());
        for ((_, a), (_, b)) in first.states().zip(second.states()) {
            assert_eq!(a.kernel(), b.kernel());
            assert_eq!(a.closure(), b.closure());
            let edges_a: Vec<_> = a.edges().collect();
            let edges_b: Vec<_> = b.edges().collect();
            assert_eq!(edges_a, edges_b);
        }
    }

    #[test]
    fn complete_items_only_appear_in_kernels() {
        // Closure only adds dot-0 items, and no rule is empty, so a
        // complete item is always a kernel item.
        let grammar = arithmetic();
        let automaton = Automaton::generate(&grammar);
        for (_, state) in automaton.states() {
            for item in state.closure() {
                if item.is_complete(&grammar) {
                    assert!(state.kernel().contains(item));
                }
            }
        }
    }
}
