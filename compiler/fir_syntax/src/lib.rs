//! FIR - Textual Syntax
//!
//! Parser and printer for the textual form of the IR:
//!
//! ```text
//! fun f {
//!   (x: *) --> * {
//!     r0: *
//!   |
//!     entry:
//!       r0 = use x;
//!       return r0;
//!   }
//! }
//! ```
//!
//! The printer emits a normal form, so parse, print, reparse, print is a
//! fixed point. `#` starts a line comment. Names that are not plain
//! identifiers, or that collide with a keyword, are written in backticks.

mod cursor;
mod error;
mod parser;
mod printer;
mod span;

pub use error::{ErrorContext, ParseError};
pub use parser::{
    parse_abstraction, parse_effects, parse_expression, parse_module, parse_statement,
    parse_type,
};
pub use printer::{print_abstraction, print_module};
pub use span::Span;
