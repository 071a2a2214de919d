//! Source locations and the error types reported by grammar construction
//! and parsing.

use std::fmt;

/// Amount of context rendered before and after an error snippet.
const SNIPPET_PADDING: usize = 10;

/// A half-open byte range `[begin, end)` into the parsed input.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub begin: usize,
    pub end: usize,
}

impl Location {
    pub const fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// The surrounding slice of `buffer`, padded by up to
    /// [`SNIPPET_PADDING`] characters on both sides and clamped to UTF-8
    /// boundaries.
    pub fn snippet<'s>(&self, buffer: &'s str) -> &'s str {
        let start = floor_boundary(buffer, self.begin.saturating_sub(SNIPPET_PADDING));
        let end = ceil_boundary(buffer, (self.end + SNIPPET_PADDING).min(buffer.len()));
        &buffer[start..end]
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.begin, self.end)
    }
}

fn floor_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// A fatal defect in the grammar itself, reported by [`Grammar::define`] or
/// [`Parser::build`].
///
/// Conflict variants carry pre-rendered rule text and state closures so the
/// offending items can be read straight out of the error message.
///
/// [`Grammar::define`]: crate::grammar::Grammar::define
/// [`Parser::build`]: crate::parser::Parser::build
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("the grammar defines no non-terminals")]
    NoStartSymbol,

    #[error("duplicate symbol name `{name}`")]
    DuplicateName { name: String },

    #[error("a symbol not belonging to this grammar was passed to the builder")]
    ForeignSymbol,

    #[error("production rule for `{nonterminal}` has an empty right-hand side")]
    EmptyRule { nonterminal: String },

    #[error("non-terminal `{name}` is reachable but has no production rules")]
    MissingRules { name: String },

    #[error("terminal `{name}` carries an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "unresolvable shift/reduce conflict on lookahead `{lookahead}`\n\
         reduce candidate: {rule}\n{states}"
    )]
    ShiftReduce {
        /// Text of the rule competing for reduction.
        rule: String,
        /// Name of the conflicting lookahead terminal.
        lookahead: String,
        /// Closures of the conflicting state and the shift target.
        states: String,
    },

    #[error(
        "unresolvable reduce/reduce conflict between `{first}` and `{second}` \
         on lookahead `{lookahead}`\n{states}"
    )]
    ReduceReduce {
        first: String,
        second: String,
        lookahead: String,
        states: String,
    },

    /// The start symbol re-derives itself (e.g. `A -> B`, `B -> A`), so a
    /// rule becomes reducible in the accepting state at end of input.
    #[error("rule `{rule}` reduces in the accepting state on `{lookahead}`")]
    ReduceAccept { rule: String, lookahead: String },
}

/// What went wrong during a parse.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// No terminal legal in the current state matched at the cursor.
    UnexpectedInput,
    /// A token was recognized but no action is defined for it.
    UnexpectedToken,
}

/// A fatal error in the current parse, pointing at the offending input.
///
/// The rendered message contains a snippet of the input with a caret
/// underline spanning the error location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{rendered}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: Location,
    rendered: String,
}

impl ParseError {
    pub(crate) fn unexpected_input(input: &str, location: Location) -> Self {
        Self::new(ParseErrorKind::UnexpectedInput, "unexpected input", input, location)
    }

    pub(crate) fn unexpected_token(input: &str, location: Location) -> Self {
        Self::new(ParseErrorKind::UnexpectedToken, "unexpected token", input, location)
    }

    fn new(kind: ParseErrorKind, message: &str, input: &str, location: Location) -> Self {
        let snippet = location.snippet(input);
        let start = floor_boundary(input, location.begin.saturating_sub(SNIPPET_PADDING));
        let pad = input[start..location.begin].chars().count();
        let span = input[location.begin..location.end].chars().count();
        let rendered = format!(
            "{message} at offset {offset}\n\t{snippet}\n\t{blank:pad$}^{tildes}",
            offset = location.begin,
            blank = "",
            tildes = "~".repeat(span.saturating_sub(1)),
        );
        Self {
            kind,
            location,
            rendered,
        }
    }
}
