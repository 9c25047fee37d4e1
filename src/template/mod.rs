//! The `@(name)` macro language.
//!
//! ```text
//! @(name)          run widget `name` once
//! @(name){body}    run it, expand `body`, and again while the widget asks
//! ~                alone on a line: head / body / tail separator
//! ```
//!
//! [`parser`] scans and expands, [`dispatch`] maps names to [`Widget`]s, and
//! [`widgets`] holds the handlers together with the [`ExpansionContext`] they
//! read and mutate.

pub mod dispatch;
pub mod parser;
pub mod widgets;

pub use dispatch::{REGISTRY, Widget, lookup};
pub use parser::{Diagnostic, Expansion, MAX_DEPTH, ParserState, SectionLayout};
pub use widgets::ExpansionContext;
