//! ACTION/GOTO table synthesis with precedence/associativity conflict
//! resolution.

use crate::dfa::{Automaton, StateID};
use crate::error::GrammarError;
use crate::first_follow::FollowSets;
use crate::grammar::{Assoc, Grammar, NonterminalID, RuleID, SymbolID, TerminalID};
use indexmap::IndexMap;

/// What the driver does in a state for a terminal lookahead. Absence of an
/// entry is the error action.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(StateID),
    Reduce(RuleID),
    Accept,
}

/// The ACTION and GOTO tables, one row per automaton state.
#[derive(Debug, PartialEq)]
pub struct ParseTable {
    actions: Vec<IndexMap<TerminalID, Action>>,
    gotos: Vec<IndexMap<NonterminalID, StateID>>,
}

impl ParseTable {
    pub fn generate<V, U>(
        grammar: &Grammar<V, U>,
        automaton: &Automaton,
        follow: &FollowSets,
    ) -> Result<Self, GrammarError> {
        let mut actions = Vec::with_capacity(automaton.len());
        let mut gotos = Vec::with_capacity(automaton.len());

        for (id, state) in automaton.states() {
            let mut action_row: IndexMap<TerminalID, Action> = IndexMap::new();
            let mut goto_row: IndexMap<NonterminalID, StateID> = IndexMap::new();

            // Shift and goto entries come straight from the transitions.
            for (symbol, target) in state.edges() {
                match symbol {
                    SymbolID::T(t) => {
                        action_row.insert(t, Action::Shift(target));
                    }
                    SymbolID::N(n) => {
                        goto_row.insert(n, target);
                    }
                }
            }

            // Reduce entries for every complete kernel item, on each
            // terminal in FOLLOW of the owning non-terminal. The complete
            // accept item instead accepts on end of input.
            for &item in state.kernel() {
                if !item.is_complete(grammar) {
                    continue;
                }
                if item.rule == RuleID::ACCEPT {
                    debug_assert!(!action_row.contains_key(&TerminalID::EOS));
                    action_row.insert(TerminalID::EOS, Action::Accept);
                    continue;
                }

                let rule = grammar.rule(item.rule);
                for lookahead in follow.get(rule.left()).iter() {
                    match action_row.get(&lookahead) {
                        None => {
                            action_row.insert(lookahead, Action::Reduce(item.rule));
                        }
                        Some(&existing) => {
                            if let Some(resolved) = resolve_conflict(
                                grammar, automaton, id, existing, item.rule, lookahead,
                            )? {
                                action_row.insert(lookahead, resolved);
                            }
                        }
                    }
                }
            }

            actions.push(action_row);
            gotos.push(goto_row);
        }

        Ok(Self { actions, gotos })
    }

    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<Action> {
        self.actions[state.index()].get(&lookahead).copied()
    }

    pub fn goto(&self, state: StateID, nonterminal: NonterminalID) -> Option<StateID> {
        self.gotos[state.index()].get(&nonterminal).copied()
    }

    /// Terminals with a non-error entry in the given state, in table order.
    pub fn lookaheads(&self, state: StateID) -> impl Iterator<Item = TerminalID> + '_ {
        self.actions[state.index()].keys().copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Resolves a conflict at `ACTION[state][lookahead]` between an existing
/// entry and a new reduction by `rule`.
///
/// Shift/reduce conflicts compare the rule's precedence ordinal against the
/// lookahead's: the smaller ordinal (declared earlier) wins. On a tie the
/// lookahead's associativity decides: `Left` reduces, `Right` shifts and
/// `None` is irreconcilable. Reduce/reduce conflicts are always
/// irreconcilable, as is a reduction contesting the accept entry (which
/// arises when the start symbol re-derives itself through a rule cycle).
///
/// Returns the replacement entry, or `None` to keep the existing one.
fn resolve_conflict<V, U>(
    grammar: &Grammar<V, U>,
    automaton: &Automaton,
    state: StateID,
    existing: Action,
    rule: RuleID,
    lookahead: TerminalID,
) -> Result<Option<Action>, GrammarError> {
    match existing {
        Action::Shift(target) => {
            let rule_prec = grammar.rule(rule).precedence().unwrap_or(usize::MAX);
            let token_prec = grammar.terminal(lookahead).precedence();
            if rule_prec < token_prec {
                return Ok(Some(Action::Reduce(rule)));
            }
            if rule_prec > token_prec {
                return Ok(None);
            }
            match grammar.terminal(lookahead).assoc() {
                Assoc::Left => Ok(Some(Action::Reduce(rule))),
                Assoc::Right => Ok(None),
                Assoc::None => Err(GrammarError::ShiftReduce {
                    rule: grammar.display_rule(rule).to_string(),
                    lookahead: grammar.terminal_name(lookahead).to_owned(),
                    states: format!(
                        "state {state}:\n{}state {target}:\n{}",
                        automaton.display_state(grammar, state),
                        automaton.display_state(grammar, target),
                    ),
                }),
            }
        }
        Action::Reduce(previous) => Err(GrammarError::ReduceReduce {
            first: grammar.display_rule(previous).to_string(),
            second: grammar.display_rule(rule).to_string(),
            lookahead: grammar.terminal_name(lookahead).to_owned(),
            states: format!(
                "state {state}:\n{}",
                automaton.display_state(grammar, state)
            ),
        }),
        Action::Accept => Err(GrammarError::ReduceAccept {
            rule: grammar.display_rule(rule).to_string(),
            lookahead: grammar.terminal_name(lookahead).to_owned(),
        }),
    }
}
