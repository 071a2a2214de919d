//! Contextual tokenizer.
//!
//! The tokenizer never scans blindly: it only attempts the terminals that
//! have a non-error ACTION entry in the current automaton state, in
//! declaration order, and the first match wins. The same span of input can
//! therefore lex differently depending on the parse state.

use crate::dfa::StateID;
use crate::error::{Location, ParseError};
use crate::grammar::TerminalID;
use indexmap::IndexMap;
use regex::Regex;

/// A scanned token: the matched terminal, its raw slice and its location
/// in the input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Token<'s> {
    pub terminal: TerminalID,
    pub raw: &'s str,
    pub location: Location,
}

/// State-aware lexer over one input string.
///
/// Whitespace is skipped before each scan. At end of input the synthetic
/// end-of-stream terminal is produced with a zero-width location.
pub struct Tokenizer<'p, 's> {
    input: &'s str,
    cursor: usize,
    whitespace: fn(char) -> bool,
    matchers: &'p IndexMap<TerminalID, Regex>,
    scan_order: &'p [Vec<TerminalID>],
}

impl<'p, 's> Tokenizer<'p, 's> {
    pub(crate) fn new(
        input: &'s str,
        whitespace: fn(char) -> bool,
        matchers: &'p IndexMap<TerminalID, Regex>,
        scan_order: &'p [Vec<TerminalID>],
    ) -> Self {
        Self {
            input,
            cursor: 0,
            whitespace,
            matchers,
            scan_order,
        }
    }

    /// Scans the next token without consuming it.
    ///
    /// The cursor does advance past leading whitespace, so repeated peeks
    /// are cheap and error locations point at the offending character.
    pub fn peek(&mut self, state: StateID) -> Result<Token<'s>, ParseError> {
        while let Some(ch) = self.input[self.cursor..].chars().next() {
            if !(self.whitespace)(ch) {
                break;
            }
            self.cursor += ch.len_utf8();
        }

        if self.cursor == self.input.len() {
            return Ok(Token {
                terminal: TerminalID::EOS,
                raw: "",
                location: Location::new(self.cursor, self.cursor),
            });
        }

        let rest = &self.input[self.cursor..];
        for &terminal in &self.scan_order[state.index()] {
            let regex = &self.matchers[&terminal];
            if let Some(found) = regex.find(rest) {
                // A zero-width match cannot form a token.
                if found.end() == 0 {
                    continue;
                }
                let location = Location::new(self.cursor, self.cursor + found.end());
                return Ok(Token {
                    terminal,
                    raw: &rest[..found.end()],
                    location,
                });
            }
        }

        Err(ParseError::unexpected_input(
            self.input,
            Location::new(self.cursor, self.cursor),
        ))
    }

    /// Consumes a previously peeked token.
    pub fn consume(&mut self, token: &Token<'s>) {
        debug_assert!(token.location.begin == self.cursor);
        self.cursor = token.location.end;
    }

    /// Current byte offset into the input.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use crate::dfa::StateID;
    use crate::error::ParseErrorKind;
    use crate::grammar::{Assoc, Grammar, SymbolID::*, TerminalID};
    use crate::parser::Parser;

    // `BOOL` is declared before `IDENT`, so on overlapping matches the
    // earlier declaration wins wherever both are legal.
    fn keyword_grammar() -> Parser<String> {
        let grammar = Grammar::define(|g| {
            let boolean = g.terminal(
                "BOOL",
                r"true|false",
                Assoc::None,
                Some(|tok| format!("bool:{}", tok.raw)),
            )?;
            let ident = g.terminal(
                "IDENT",
                r"[a-z]+",
                Assoc::None,
                Some(|tok| format!("ident:{}", tok.raw)),
            )?;
            let pair = g.nonterminal("pair")?;
            g.rule(
                pair,
                [T(boolean), T(ident)],
                Some(|args| format!("{} {}", args.get(0), args.get(1))),
            )?;
            g.start_symbol(pair)
        })
        .unwrap();
        Parser::build(grammar).unwrap()
    }

    #[test]
    fn earliest_declared_terminal_wins_overlaps() {
        let parser = keyword_grammar();
        let mut tokenizer = parser.tokenizer("true rest");
        let token = tokenizer.peek(StateID::START).unwrap();
        assert_eq!(parser.grammar().terminal_name(token.terminal), "BOOL");
        assert_eq!(token.raw, "true");
    }

    #[test]
    fn lexing_depends_on_the_parse_state() {
        // In the state after the keyword, only IDENT is legal, so the
        // second `true` lexes as an identifier.
        let parser = keyword_grammar();
        let parsed = parser.parse("true true").unwrap();
        assert_eq!(parsed.value(), "bool:true ident:true");
    }

    #[test]
    fn whitespace_is_skipped_before_each_token() {
        let parser = keyword_grammar();
        let mut tokenizer = parser.tokenizer("  \t\n true");
        let token = tokenizer.peek(StateID::START).unwrap();
        assert_eq!(token.raw, "true");
        assert_eq!(token.location.begin, 5);
        assert_eq!(token.location.end, 9);
    }

    #[test]
    fn end_of_input_produces_a_zero_width_eos() {
        let parser = keyword_grammar();
        let mut tokenizer = parser.tokenizer("   ");
        let token = tokenizer.peek(StateID::START).unwrap();
        assert_eq!(token.terminal, TerminalID::EOS);
        assert!(token.raw.is_empty());
        assert_eq!(token.location.begin, 3);
        assert!(token.location.is_empty());
    }

    #[test]
    fn unmatched_input_reports_the_cursor() {
        let parser = keyword_grammar();
        let mut tokenizer = parser.tokenizer("true ???");
        let first = tokenizer.peek(StateID::START).unwrap();
        tokenizer.consume(&first);
        let err = tokenizer.peek(StateID::START).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedInput);
        assert_eq!(err.location.begin, 5);
    }

    #[test]
    fn custom_whitespace_predicate_is_honored() {
        let grammar = Grammar::<String>::define(|g| {
            let word = g.terminal(
                "WORD",
                r"[a-z]+",
                Assoc::None,
                Some(|tok| tok.raw.to_owned()),
            )?;
            let item = g.nonterminal("item")?;
            g.rule(item, [T(word)], None)?;
            g.whitespace(|ch| ch == ',' || ch.is_ascii_whitespace());
            g.start_symbol(item)
        })
        .unwrap();
        let parser = Parser::build(grammar).unwrap();
        let parsed = parser.parse(",, word ,").unwrap();
        assert_eq!(parsed.value(), "word");
    }
}
