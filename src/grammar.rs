//! Grammar types: the symbol registry, the rule store and the
//! [`Grammar::define`] builder.

use crate::error::GrammarError;
use crate::parser::RuleArgs;
use crate::tokenizer::Token;
use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// Turns a raw token into a semantic value at shift time.
///
/// The default (no reasoner) produces `V::default()`.
pub type Reasoner<V> = fn(&Token<'_>) -> V;

/// Computes a non-terminal's value from the values of a matched rule's
/// children at reduce time.
///
/// The default (no action) copies the value of child 0.
pub type ReduceAction<V> = fn(&mut RuleArgs<'_, '_, V>) -> V;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID(u32);

impl TerminalID {
    /// Reserved terminal recognized by the driver at end of input.
    pub(crate) const EOS: Self = Self(0);
    const OFFSET: u32 = 1;

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOS => write!(f, "T#end"),
            Self(raw) => write!(f, "T#{:03}", raw),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID(u32);

impl NonterminalID {
    /// Reserved left-hand side of the synthetic accept rule.
    pub(crate) const ACCEPT: Self = Self(u32::MAX);
}

impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::ACCEPT => write!(f, "N#accept"),
            Self(raw) => write!(f, "N#{:03}", raw),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID(u32);

impl RuleID {
    /// Reserved ID of the synthetic top-level rule `$accept -> <start>`.
    pub(crate) const ACCEPT: Self = Self(u32::MAX);
}

impl fmt::Debug for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::ACCEPT => write!(f, "R#accept"),
            Self(raw) => write!(f, "R#{:03}", raw),
        }
    }
}

/// One element of a production rule's right-hand side.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

/// How a terminal behaves when a shift/reduce conflict has equal
/// precedence on both sides.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Assoc {
    #[default]
    None,
    Left,
    Right,
}

/// A lexical atom: regex pattern, declaration-order precedence ordinal,
/// associativity, optional reasoner and optional user payload.
#[derive(Debug)]
pub struct Terminal<V, U> {
    name: String,
    pattern: Option<String>,
    ordinal: usize,
    assoc: Assoc,
    reasoner: Option<Reasoner<V>>,
    payload: Option<U>,
}

impl<V, U> Terminal<V, U> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The regex pattern, or `None` for the end-of-stream terminal.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Precedence ordinal. Ordinals ascend with declaration order, and a
    /// *smaller* ordinal binds *tighter* in shift/reduce resolution.
    pub fn precedence(&self) -> usize {
        self.ordinal
    }

    pub fn assoc(&self) -> Assoc {
        self.assoc
    }

    pub fn payload(&self) -> Option<&U> {
        self.payload.as_ref()
    }

    /// Runs the reasoner on a scanned token, defaulting to `V::default()`.
    pub fn reason(&self, token: &Token<'_>) -> V
    where
        V: Default,
    {
        match self.reasoner {
            Some(reasoner) => reasoner(token),
            None => V::default(),
        }
    }
}

/// A grammar variable together with its alternative production rules.
#[derive(Debug)]
pub struct Nonterminal {
    name: String,
    rules: Vec<RuleID>,
}

impl Nonterminal {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[RuleID] {
        &self.rules
    }
}

/// A production rule: owning non-terminal, non-empty symbol sequence,
/// optional semantic action and derived precedence.
#[derive(Debug)]
pub struct Rule<V> {
    left: NonterminalID,
    right: Vec<SymbolID>,
    action: Option<ReduceAction<V>>,
    precedence: Option<usize>,
}

impl<V> Rule<V> {
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    pub fn right(&self) -> &[SymbolID] {
        &self.right
    }

    /// Ordinal of the rightmost terminal in the sequence, if any.
    pub fn precedence(&self) -> Option<usize> {
        self.precedence
    }

    /// Runs the semantic action, defaulting to a copy of child 0's value.
    pub fn reduce(&self, args: &mut RuleArgs<'_, '_, V>) -> V
    where
        V: Clone,
    {
        match self.action {
            Some(action) => action(args),
            None => args.get(0),
        }
    }
}

/// An immutable grammar: the root non-terminal plus every terminal,
/// non-terminal and production rule reachable from it.
///
/// `V` is the semantic value type every action produces; `U` is an optional
/// per-terminal payload type.
#[derive(Debug)]
pub struct Grammar<V, U = ()> {
    terminals: IndexMap<TerminalID, Terminal<V, U>>,
    nonterminals: IndexMap<NonterminalID, Nonterminal>,
    rules: IndexMap<RuleID, Rule<V>>,
    accept_rule: Rule<V>,
    start: NonterminalID,
    whitespace: fn(char) -> bool,
}

impl<V, U> Grammar<V, U> {
    /// Define a grammar using the specified function.
    ///
    /// Finalization registers the end-of-stream terminal and the synthetic
    /// accept rule, walks the non-terminals reachable from the start symbol
    /// (pruning everything unreachable) and derives rule precedences.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef<V, U>) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef::new();
        f(&mut def)?;
        def.end()
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &Terminal<V, U>)> + '_ {
        self.terminals.iter().map(|(id, terminal)| (*id, terminal))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &Nonterminal)> + '_ {
        self.nonterminals.iter().map(|(id, nt)| (*id, nt))
    }

    /// User production rules, excluding the synthetic accept rule.
    pub fn rules(&self) -> impl Iterator<Item = (RuleID, &Rule<V>)> + '_ {
        self.rules.iter().map(|(id, rule)| (*id, rule))
    }

    pub fn terminal(&self, id: TerminalID) -> &Terminal<V, U> {
        &self.terminals[&id]
    }

    pub fn nonterminal(&self, id: NonterminalID) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    pub fn rule(&self, id: RuleID) -> &Rule<V> {
        match id {
            RuleID::ACCEPT => &self.accept_rule,
            id => &self.rules[&id],
        }
    }

    pub fn start_symbol(&self) -> NonterminalID {
        self.start
    }

    /// User payload attached to a terminal, if any.
    pub fn payload(&self, id: TerminalID) -> Option<&U> {
        self.terminals[&id].payload()
    }

    pub(crate) fn whitespace_pred(&self) -> fn(char) -> bool {
        self.whitespace
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        self.terminals[&id].name()
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        match id {
            NonterminalID::ACCEPT => "$accept",
            id => self.nonterminals[&id].name(),
        }
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }

    /// Renders a rule as `left -> sym sym ...`.
    pub fn display_rule(&self, id: RuleID) -> RuleDisplay<'_, V, U> {
        RuleDisplay { grammar: self, id }
    }
}

/// Displays one production rule with symbol names resolved against its
/// grammar. Returned by [`Grammar::display_rule`].
pub struct RuleDisplay<'g, V, U> {
    grammar: &'g Grammar<V, U>,
    id: RuleID,
}

impl<V, U> fmt::Display for RuleDisplay<'_, V, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = self.grammar.rule(self.id);
        write!(f, "{} ->", self.grammar.nonterminal_name(rule.left()))?;
        for symbol in rule.right() {
            write!(f, " {}", self.grammar.symbol_name(*symbol))?;
        }
        Ok(())
    }
}

impl<V, U> fmt::Display for Grammar<V, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terminals:")?;
        for (_, terminal) in self.terminals() {
            write!(f, " {}", terminal.name())?;
        }
        write!(f, "\nnonterminals:")?;
        for (_, nt) in self.nonterminals() {
            write!(f, " {}", nt.name())?;
        }
        writeln!(f, "\nstart: {}", self.nonterminal_name(self.start))?;
        writeln!(f, "rules:")?;
        for (id, _) in self.rules() {
            writeln!(f, "- {}", self.display_rule(id))?;
        }
        Ok(())
    }
}

/// The mutable context handed to the [`Grammar::define`] closure.
#[derive(Debug)]
pub struct GrammarDef<V, U = ()> {
    terminals: IndexMap<TerminalID, Terminal<V, U>>,
    nonterminals: IndexMap<NonterminalID, Nonterminal>,
    rules: IndexMap<RuleID, Rule<V>>,
    names: IndexSet<String>,
    start: Option<NonterminalID>,
    next_terminal: u32,
    next_nonterminal: u32,
    next_rule: u32,
    whitespace: fn(char) -> bool,
}

impl<V, U> GrammarDef<V, U> {
    fn new() -> Self {
        let mut terminals = IndexMap::new();
        terminals.insert(
            TerminalID::EOS,
            Terminal {
                name: "$end".to_owned(),
                pattern: None,
                // End of input never outranks a rule in shift/reduce
                // resolution.
                ordinal: usize::MAX,
                assoc: Assoc::None,
                reasoner: None,
                payload: None,
            },
        );
        let mut names = IndexSet::new();
        names.insert("$end".to_owned());
        names.insert("$accept".to_owned());
        Self {
            terminals,
            nonterminals: IndexMap::new(),
            rules: IndexMap::new(),
            names,
            start: None,
            next_terminal: TerminalID::OFFSET,
            next_nonterminal: 0,
            next_rule: 0,
            whitespace: char::is_whitespace,
        }
    }

    fn claim_name(&mut self, name: &str) -> Result<(), GrammarError> {
        if !self.names.insert(name.to_owned()) {
            return Err(GrammarError::DuplicateName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Declare a terminal symbol.
    ///
    /// Terminals declared earlier receive smaller precedence ordinals and
    /// bind tighter; they are also tried earlier by the tokenizer when
    /// several patterns could match.
    pub fn terminal(
        &mut self,
        name: impl Into<String>,
        pattern: impl Into<String>,
        assoc: Assoc,
        reasoner: Option<Reasoner<V>>,
    ) -> Result<TerminalID, GrammarError> {
        let name = name.into();
        self.claim_name(&name)?;
        let id = TerminalID(self.next_terminal);
        self.next_terminal += 1;
        let ordinal = (id.0 - TerminalID::OFFSET) as usize;
        self.terminals.insert(
            id,
            Terminal {
                name,
                pattern: Some(pattern.into()),
                ordinal,
                assoc,
                reasoner,
                payload: None,
            },
        );
        Ok(id)
    }

    /// Attach a user payload to a previously declared terminal.
    pub fn payload(&mut self, terminal: TerminalID, payload: U) -> Result<(), GrammarError> {
        let terminal = self
            .terminals
            .get_mut(&terminal)
            .filter(|t| t.pattern.is_some())
            .ok_or(GrammarError::ForeignSymbol)?;
        terminal.payload = Some(payload);
        Ok(())
    }

    /// Declare a non-terminal symbol.
    pub fn nonterminal(&mut self, name: impl Into<String>) -> Result<NonterminalID, GrammarError> {
        let name = name.into();
        self.claim_name(&name)?;
        let id = NonterminalID(self.next_nonterminal);
        self.next_nonterminal += 1;
        self.nonterminals.insert(
            id,
            Nonterminal {
                name,
                rules: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Add a production rule for `left`.
    ///
    /// The sequence must be non-empty (epsilon productions are not
    /// supported) and may only reference symbols declared on this builder.
    pub fn rule<I>(
        &mut self,
        left: NonterminalID,
        right: I,
        action: Option<ReduceAction<V>>,
    ) -> Result<RuleID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if !self.nonterminals.contains_key(&left) {
            return Err(GrammarError::ForeignSymbol);
        }
        let right: Vec<SymbolID> = right.into_iter().collect();
        if right.is_empty() {
            return Err(GrammarError::EmptyRule {
                nonterminal: self.nonterminals[&left].name.clone(),
            });
        }
        for symbol in &right {
            let known = match symbol {
                SymbolID::T(t) => *t != TerminalID::EOS && self.terminals.contains_key(t),
                SymbolID::N(n) => self.nonterminals.contains_key(n),
            };
            if !known {
                return Err(GrammarError::ForeignSymbol);
            }
        }

        let id = RuleID(self.next_rule);
        self.next_rule += 1;
        self.nonterminals[&left].rules.push(id);
        self.rules.insert(
            id,
            Rule {
                left,
                right,
                action,
                precedence: None,
            },
        );
        Ok(id)
    }

    /// Declare the start symbol. Defaults to the first declared
    /// non-terminal.
    pub fn start_symbol(&mut self, start: NonterminalID) -> Result<(), GrammarError> {
        if !self.nonterminals.contains_key(&start) {
            return Err(GrammarError::ForeignSymbol);
        }
        self.start = Some(start);
        Ok(())
    }

    /// Override the predicate used to skip whitespace between tokens.
    /// Defaults to `char::is_whitespace`.
    pub fn whitespace(&mut self, predicate: fn(char) -> bool) {
        self.whitespace = predicate;
    }

    fn end(mut self) -> Result<Grammar<V, U>, GrammarError> {
        let start = match self.start {
            Some(start) => start,
            None => match self.nonterminals.first() {
                Some((id, _)) => *id,
                None => return Err(GrammarError::NoStartSymbol),
            },
        };

        // Depth-first walk of the non-terminals reachable from the start
        // symbol. Back edges are harmless: the visited set stops re-entry.
        let mut visited: IndexSet<NonterminalID> = IndexSet::new();
        let mut used_terminals: IndexSet<TerminalID> = IndexSet::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(current) = stack.pop() {
            let nt = &self.nonterminals[&current];
            if nt.rules.is_empty() {
                return Err(GrammarError::MissingRules {
                    name: nt.name.clone(),
                });
            }
            for rule_id in &nt.rules {
                for symbol in &self.rules[rule_id].right {
                    match symbol {
                        SymbolID::T(t) => {
                            used_terminals.insert(*t);
                        }
                        SymbolID::N(n) => {
                            if visited.insert(*n) {
                                stack.push(*n);
                            }
                        }
                    }
                }
            }
        }

        self.terminals
            .retain(|id, _| *id == TerminalID::EOS || used_terminals.contains(id));
        self.nonterminals.retain(|id, _| visited.contains(id));
        self.rules.retain(|_, rule| visited.contains(&rule.left));

        // Rule precedence defaults to that of the last terminal in the
        // sequence.
        let Self {
            rules, terminals, ..
        } = &mut self;
        for rule in rules.values_mut() {
            rule.precedence = rule.right.iter().rev().find_map(|symbol| match symbol {
                SymbolID::T(t) => Some(terminals[t].ordinal),
                SymbolID::N(_) => None,
            });
        }

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            accept_rule: Rule {
                left: NonterminalID::ACCEPT,
                right: vec![SymbolID::N(start)],
                action: None,
                precedence: None,
            },
            start,
            whitespace: self.whitespace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    fn arithmetic() -> Grammar<f64> {
        Grammar::define(|g| {
            let num = g.terminal("NUM", r"\d+", Assoc::None, None)?;
            let plus = g.terminal("+", r"\+", Assoc::Left, None)?;
            let expr = g.nonterminal("expr")?;
            g.rule(expr, [N(expr), T(plus), N(expr)], None)?;
            g.rule(expr, [T(num)], None)?;
            g.start_symbol(expr)
        })
        .unwrap()
    }

    #[test]
    fn precedence_ordinals_follow_declaration_order() {
        let grammar = Grammar::<f64>::define(|g| {
            let pow = g.terminal("^", r"\^", Assoc::Right, None)?;
            let mul = g.terminal("*", r"\*", Assoc::Left, None)?;
            let add = g.terminal("+", r"\+", Assoc::Left, None)?;
            let expr = g.nonterminal("expr")?;
            g.rule(expr, [N(expr), T(pow), N(expr)], None)?;
            g.rule(expr, [N(expr), T(mul), N(expr)], None)?;
            g.rule(expr, [N(expr), T(add), N(expr)], None)?;
            g.start_symbol(expr)
        })
        .unwrap();

        let ordinals: Vec<usize> = grammar
            .terminals()
            .filter(|(_, t)| t.pattern().is_some())
            .map(|(_, t)| t.precedence())
            .collect();
        assert_eq!(ordinals, vec![0, 1, 2]);

        let precs: Vec<Option<usize>> = grammar.rules().map(|(_, r)| r.precedence()).collect();
        assert_eq!(precs, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn empty_right_hand_side_is_rejected() {
        let result = Grammar::<f64>::define(|g| {
            let expr = g.nonterminal("expr")?;
            g.rule(expr, [], None)?;
            Ok(())
        });
        assert!(matches!(result, Err(GrammarError::EmptyRule { .. })));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = Grammar::<f64>::define(|g| {
            g.terminal("x", r"x", Assoc::None, None)?;
            g.nonterminal("x")?;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(GrammarError::DuplicateName { name }) if name == "x"
        ));
    }

    #[test]
    fn reachable_nonterminal_without_rules_is_rejected() {
        let result = Grammar::<f64>::define(|g| {
            let num = g.terminal("NUM", r"\d+", Assoc::None, None)?;
            let expr = g.nonterminal("expr")?;
            let orphan = g.nonterminal("orphan")?;
            g.rule(expr, [T(num), N(orphan)], None)?;
            g.start_symbol(expr)
        });
        assert!(matches!(
            result,
            Err(GrammarError::MissingRules { name }) if name == "orphan"
        ));
    }

    #[test]
    fn unreachable_symbols_are_pruned() {
        let grammar = Grammar::<f64>::define(|g| {
            let num = g.terminal("NUM", r"\d+", Assoc::None, None)?;
            let unused = g.terminal("UNUSED", r"u", Assoc::None, None)?;
            let expr = g.nonterminal("expr")?;
            let island = g.nonterminal("island")?;
            g.rule(expr, [T(num)], None)?;
            g.rule(island, [T(unused)], None)?;
            g.start_symbol(expr)
        })
        .unwrap();

        let names: Vec<&str> = grammar.terminals().map(|(_, t)| t.name()).collect();
        assert_eq!(names, vec!["$end", "NUM"]);
        assert_eq!(grammar.nonterminals().count(), 1);
        assert_eq!(grammar.rules().count(), 1);
    }

    #[test]
    fn start_symbol_defaults_to_first_nonterminal() {
        let grammar = Grammar::<f64>::define(|g| {
            let num = g.terminal("NUM", r"\d+", Assoc::None, None)?;
            let expr = g.nonterminal("expr")?;
            g.rule(expr, [T(num)], None)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(grammar.nonterminal_name(grammar.start_symbol()), "expr");
    }

    #[test]
    fn payload_round_trips() {
        let grammar = Grammar::<f64, &str>::define(|g| {
            let num = g.terminal("NUM", r"\d+", Assoc::None, None)?;
            g.payload(num, "a number")?;
            let expr = g.nonterminal("expr")?;
            g.rule(expr, [T(num)], None)?;
            g.start_symbol(expr)
        })
        .unwrap();

        let (num, _) = grammar
            .terminals()
            .find(|(_, t)| t.name() == "NUM")
            .unwrap();
        assert_eq!(grammar.payload(num), Some(&"a number"));
    }

    #[test]
    fn rule_display_names_every_symbol() {
        let grammar = arithmetic();
        let rendered: Vec<String> = grammar
            .rules()
            .map(|(id, _)| grammar.display_rule(id).to_string())
            .collect();
        assert_eq!(rendered, vec!["expr -> expr + expr", "expr -> NUM"]);
    }
}
