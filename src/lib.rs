//! Runtime construction of SLR(1) parsers.
//!
//! A grammar is assembled programmatically: terminals are regex-matched
//! lexical atoms whose declaration order doubles as precedence (earlier
//! binds tighter), non-terminals carry alternative production rules, and
//! rules carry semantic actions producing a single value type `V`.
//! [`Parser::build`] runs the analysis pipeline — FIRST/FOLLOW sets, the
//! LR(0) automaton, ACTION/GOTO synthesis with precedence/associativity
//! conflict resolution — and [`Parser::parse`] drives a contextual
//! tokenizer and a shift/reduce stack machine over the tables.
//!
//! ```
//! use muskox::{Assoc, Grammar, Parser, SymbolID::{N, T}};
//!
//! let grammar = Grammar::<f64>::define(|g| {
//!     let number = g.terminal("NUMBER", r"\d+(\.\d+)?", Assoc::None,
//!         Some(|tok| tok.raw.parse().unwrap_or_default()))?;
//!     let plus = g.terminal("+", r"\+", Assoc::Left, None)?;
//!     let expr = g.nonterminal("expr")?;
//!     g.rule(expr, [N(expr), T(plus), N(expr)],
//!         Some(|args| args.get(0) + args.get(2)))?;
//!     g.rule(expr, [T(number)], None)?;
//!     g.start_symbol(expr)
//! })?;
//!
//! let parser = Parser::build(grammar)?;
//! let parsed = parser.parse("1 + 2 + 3")?;
//! assert_eq!(*parsed.value(), 6.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! A built parser is immutable and can be shared across threads; each call
//! to [`Parser::parse`] owns its own driver state.

pub mod dfa;
pub mod error;
pub mod first_follow;
pub mod grammar;
pub mod parser;
pub mod table;
pub mod tokenizer;

pub use crate::error::{GrammarError, Location, ParseError, ParseErrorKind};
pub use crate::grammar::{
    Assoc, Grammar, GrammarDef, NonterminalID, ReduceAction, Reasoner, RuleID, SymbolID,
    TerminalID,
};
pub use crate::parser::{ParseStats, Parsed, Parser, RuleArgs, ValueToken};
pub use crate::tokenizer::Token;
