//! Parser construction and the table-driven shift/reduce driver.

use crate::dfa::{Automaton, StateID};
use crate::error::{GrammarError, Location, ParseError};
use crate::first_follow::{FirstSets, FollowSets, TerminalSet};
use crate::grammar::{Grammar, NonterminalID, TerminalID};
use crate::table::{Action, ParseTable};
use crate::tokenizer::Tokenizer;
use indexmap::IndexMap;
use log::{debug, trace};
use regex::Regex;
use std::fmt;

/// A built SLR(1) parser.
///
/// Immutable after [`Parser::build`]; a shared reference can drive any
/// number of concurrent parses since every parse owns its own stacks,
/// cursor and value arena.
#[derive(Debug)]
pub struct Parser<V, U = ()> {
    grammar: Grammar<V, U>,
    automaton: Automaton,
    table: ParseTable,
    first: FirstSets,
    follow: FollowSets,
    matchers: IndexMap<TerminalID, Regex>,
    scan_order: Vec<Vec<TerminalID>>,
}

impl<V, U> Parser<V, U> {
    /// Compiles the grammar into parse tables.
    ///
    /// Runs the whole build pipeline: terminal pattern compilation,
    /// FIRST/FOLLOW analysis, LR(0) automaton generation and ACTION/GOTO
    /// synthesis. Irreconcilable conflicts surface here as
    /// [`GrammarError`]s carrying the offending rules and state closures.
    pub fn build(grammar: Grammar<V, U>) -> Result<Self, GrammarError> {
        let mut matchers = IndexMap::new();
        for (id, terminal) in grammar.terminals() {
            let Some(pattern) = terminal.pattern() else {
                continue;
            };
            let anchored = format!(r"\A(?:{pattern})");
            let regex = Regex::new(&anchored).map_err(|source| GrammarError::InvalidPattern {
                name: terminal.name().to_owned(),
                source,
            })?;
            matchers.insert(id, regex);
        }

        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);
        let automaton = Automaton::generate(&grammar);
        let table = ParseTable::generate(&grammar, &automaton, &follow)?;

        // Candidate terminals per state for the tokenizer, in declaration
        // order. EOS carries no pattern and is recognized by the cursor
        // position instead.
        let scan_order: Vec<Vec<TerminalID>> = automaton
            .states()
            .map(|(id, _)| {
                let mut candidates: Vec<TerminalID> = table
                    .lookaheads(id)
                    .filter(|t| matchers.contains_key(t))
                    .collect();
                candidates.sort_unstable();
                candidates
            })
            .collect();

        debug!(
            "built SLR parser: {} states, {} rules, {} terminals",
            automaton.len(),
            grammar.rules().count(),
            grammar.terminals().count(),
        );

        Ok(Self {
            grammar,
            automaton,
            table,
            first,
            follow,
            matchers,
            scan_order,
        })
    }

    pub fn grammar(&self) -> &Grammar<V, U> {
        &self.grammar
    }

    /// `FIRST` of a non-terminal of this grammar.
    pub fn first(&self, nonterminal: NonterminalID) -> &TerminalSet {
        self.first.get(nonterminal)
    }

    /// `FOLLOW` of a non-terminal of this grammar.
    pub fn follow(&self, nonterminal: NonterminalID) -> &TerminalSet {
        self.follow.get(nonterminal)
    }

    pub fn first_contains(&self, nonterminal: NonterminalID, terminal: TerminalID) -> bool {
        self.first(nonterminal).contains(terminal)
    }

    pub fn follow_contains(&self, nonterminal: NonterminalID, terminal: TerminalID) -> bool {
        self.follow(nonterminal).contains(terminal)
    }

    /// Renders every automaton state with its items and transitions.
    pub fn display_states(&self) -> impl fmt::Display + '_ {
        self.automaton.display(&self.grammar)
    }

    pub(crate) fn tokenizer<'p, 's>(&'p self, input: &'s str) -> Tokenizer<'p, 's> {
        Tokenizer::new(
            input,
            self.grammar.whitespace_pred(),
            &self.matchers,
            &self.scan_order,
        )
    }

    /// Parses `input` to a single semantic value.
    ///
    /// The returned [`Parsed`] owns the value arena; the root value and
    /// every intermediate token remain addressable until it is dropped.
    pub fn parse<'s>(&self, input: &'s str) -> Result<Parsed<'s, V>, ParseError>
    where
        V: Default + Clone,
    {
        let mut tokenizer = self.tokenizer(input);
        let mut state_stack: Vec<StateID> = vec![StateID::START];
        let mut value_stack: Vec<usize> = Vec::new();
        let mut arena: Vec<ValueToken<'s, V>> = Vec::new();
        let mut stats = ParseStats::default();

        loop {
            let current = *state_stack.last().unwrap();
            let token = tokenizer.peek(current)?;

            match self.table.action(current, token.terminal) {
                Some(Action::Accept) => {
                    trace!("accept");
                    debug_assert_eq!(value_stack.len(), 1);
                    let root = value_stack.pop().unwrap();
                    return Ok(Parsed {
                        values: arena,
                        root,
                        stats,
                    });
                }

                Some(Action::Shift(next)) => {
                    trace!(
                        "shift {} `{}` -> state {}",
                        self.grammar.terminal_name(token.terminal),
                        token.raw,
                        next,
                    );
                    let value = self.grammar.terminal(token.terminal).reason(&token);
                    arena.push(ValueToken {
                        raw: token.raw,
                        location: token.location,
                        value,
                    });
                    value_stack.push(arena.len() - 1);
                    state_stack.push(next);
                    tokenizer.consume(&token);
                    stats.shifts += 1;
                }

                Some(Action::Reduce(rule_id)) => {
                    let rule = self.grammar.rule(rule_id);
                    let count = rule.right().len();
                    trace!("reduce by {}", self.grammar.display_rule(rule_id));

                    let split = value_stack.len() - count;
                    let value = {
                        let mut args = RuleArgs {
                            arena: &mut arena,
                            children: &value_stack[split..],
                        };
                        rule.reduce(&mut args)
                    };

                    let location = Location::new(
                        arena[value_stack[split]].location.begin,
                        arena[*value_stack.last().unwrap()].location.end,
                    );
                    arena.push(ValueToken {
                        raw: &input[location.begin..location.end],
                        location,
                        value,
                    });

                    value_stack.truncate(split);
                    state_stack.truncate(state_stack.len() - count);
                    value_stack.push(arena.len() - 1);

                    let top = *state_stack.last().unwrap();
                    let next = self
                        .table
                        .goto(top, rule.left())
                        .expect("missing GOTO entry after reduction");
                    state_stack.push(next);
                    stats.reductions += 1;
                }

                None => {
                    return Err(ParseError::unexpected_token(input, token.location));
                }
            }
        }
    }
}

/// A parse-time value token: the raw input slice it covers, its location
/// and the semantic value produced for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueToken<'s, V> {
    pub raw: &'s str,
    pub location: Location,
    pub value: V,
}

/// Counters describing a finished parse.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ParseStats {
    pub shifts: usize,
    pub reductions: usize,
}

/// The result of a successful parse: the value arena plus the index of the
/// root value token.
#[derive(Debug, Clone)]
pub struct Parsed<'s, V> {
    values: Vec<ValueToken<'s, V>>,
    root: usize,
    stats: ParseStats,
}

impl<'s, V> Parsed<'s, V> {
    /// The root semantic value.
    pub fn value(&self) -> &V {
        &self.values[self.root].value
    }

    /// Extracts the root semantic value, dropping the arena.
    pub fn into_value(mut self) -> V {
        self.values.swap_remove(self.root).value
    }

    /// The root value token, whose location spans the whole parsed input.
    pub fn root(&self) -> &ValueToken<'s, V> {
        &self.values[self.root]
    }

    /// Every value token materialized during the parse, in creation order.
    pub fn tokens(&self) -> &[ValueToken<'s, V>] {
        &self.values
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }
}

/// The accessor handed to semantic actions: indexed access to the matched
/// rule's children.
pub struct RuleArgs<'a, 's, V> {
    arena: &'a mut Vec<ValueToken<'s, V>>,
    children: &'a [usize],
}

impl<'a, 's, V> RuleArgs<'a, 's, V> {
    /// Number of children, equal to the matched rule's sequence length.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The i-th child's value token.
    pub fn token(&self, index: usize) -> &ValueToken<'s, V> {
        &self.arena[self.children[index]]
    }

    /// A copy of the i-th child's value.
    pub fn get(&self, index: usize) -> V
    where
        V: Clone,
    {
        self.token(index).value.clone()
    }

    pub fn value(&self, index: usize) -> &V {
        &self.token(index).value
    }

    pub fn value_mut(&mut self, index: usize) -> &mut V {
        let slot = self.children[index];
        &mut self.arena[slot].value
    }

    /// Moves the i-th child's value out, leaving `V::default()` behind.
    pub fn take(&mut self, index: usize) -> V
    where
        V: Default,
    {
        std::mem::take(self.value_mut(index))
    }

    /// The raw input slice covered by the i-th child.
    pub fn raw(&self, index: usize) -> &'s str {
        self.token(index).raw
    }

    /// The input location covered by the i-th child.
    pub fn location(&self, index: usize) -> Location {
        self.token(index).location
    }
}
