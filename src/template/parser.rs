//! Recursive-descent expansion of `@(name)` / `@(name){body}` templates.
//!
//! A [`ParserState`] owns the template text and a scan position. Each call to
//! [`ParserState::expand`] copies literal text to the output, runs widgets,
//! and stops at the end of the text, at the `}` closing the current body, or
//! at a section separator (a `~` alone on a line, top level only).
//!
//! ## Repetition
//!
//! `@(name){body}` calls the widget, then expands the body. While the widget
//! keeps answering `true`, the body is expanded again. When it answers
//! `false`, the body is walked once more with output suppressed, purely to
//! move the scan position past its closing brace:
//!
//! ```text
//! @(files){<li>@(filename)</li>}
//!   files → true   body visible   <li>a</li>
//!   files → true   body visible   <li>b</li>
//!   files → false  body hidden
//! ```
//!
//! ## Sections
//!
//! A template with exactly two separator lines is read as head, body and
//! tail. Every outermost expansion records where it started, so
//! [`ParserState::rewind`] replays the section that was just expanded. Any
//! other number of separators leaves the whole text as one body and the `~`
//! lines as literal text.

use super::widgets::ExpansionContext;
use super::dispatch;
use std::fmt;
use std::io::{self, Write};
use tracing::warn;

/// Nesting depth past which each further level is reported.
pub const MAX_DEPTH: usize = 16;

/// How an expansion stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// End of text, or the `}` closing the body being expanded.
    Finished,
    /// Stopped right after a section separator.
    SectionBoundary,
    /// An `@(` without a closing `)`; the rest of the text was copied verbatim.
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionLayout {
    BodyOnly,
    HeadBodyTail,
}

/// A template anomaly. Expansion always carries on after one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnknownSymbol { name: String, offset: usize },
    RecursionLimit { depth: usize },
    UnterminatedInvocation { offset: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownSymbol { name, offset } => {
                write!(f, "symbol not recognised, '{name}' at byte {offset}")
            }
            Diagnostic::RecursionLimit { depth } => {
                write!(f, "{depth} recursion levels reached (limit {MAX_DEPTH})")
            }
            Diagnostic::UnterminatedInvocation { offset } => {
                write!(f, "'@(' at byte {offset} has no closing ')'; rest copied as text")
            }
        }
    }
}

#[derive(Debug)]
pub struct ParserState {
    source: String,
    position: usize,
    rewind_point: usize,
    depth: usize,
    layout: SectionLayout,
    diagnostics: Vec<Diagnostic>,
}

impl ParserState {
    /// Parser over `source`; the layout follows from its separator lines.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let layout = if find_separators(&source).len() == 2 {
            SectionLayout::HeadBodyTail
        } else {
            SectionLayout::BodyOnly
        };
        Self::with_layout(source, layout)
    }

    pub fn with_layout(source: impl Into<String>, layout: SectionLayout) -> Self {
        Self {
            source: source.into(),
            position: 0,
            rewind_point: 0,
            depth: 0,
            layout,
            diagnostics: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn layout(&self) -> SectionLayout {
        self.layout
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Go back to where the last outermost expansion started.
    pub fn rewind(&mut self) {
        self.position = self.rewind_point;
    }

    /// Expand from the current position. `suppressed` discards all output
    /// and skips every widget call.
    pub fn expand(
        &mut self,
        ctx: &mut ExpansionContext<'_>,
        out: &mut dyn Write,
        suppressed: bool,
    ) -> io::Result<Expansion> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.report(Diagnostic::RecursionLimit { depth: self.depth });
        }
        if self.depth == 1 {
            self.rewind_point = self.position;
        }
        let mut mark = self.position;

        loop {
            let Some(at) = find_special(&self.source, self.position) else {
                let end = self.source.len();
                self.emit(out, mark, end, suppressed)?;
                self.position = end;
                return Ok(self.unwind(Expansion::Finished));
            };
            match self.source.as_bytes()[at] {
                // A stray `}` at the top level is text.
                b'}' if self.depth > 1 => {
                    self.emit(out, mark, at, suppressed)?;
                    self.position = at + 1;
                    return Ok(self.unwind(Expansion::Finished));
                }
                b'~' if self.depth == 1
                    && self.layout == SectionLayout::HeadBodyTail
                    && is_standalone_tilde(&self.source, at) =>
                {
                    self.emit(out, mark, at, suppressed)?;
                    self.position = at + 2;
                    self.depth = 0;
                    return Ok(Expansion::SectionBoundary);
                }
                b'@' if self.source.as_bytes().get(at + 1) == Some(&b'(') => {
                    self.emit(out, mark, at, suppressed)?;
                    if self.invoke(at, ctx, out, suppressed)? == Expansion::Truncated {
                        return Ok(self.unwind(Expansion::Truncated));
                    }
                    mark = self.position;
                }
                _ => self.position = at + 1,
            }
        }
    }

    /// Run the invocation starting at the `@` at `at`, including its body.
    fn invoke(
        &mut self,
        at: usize,
        ctx: &mut ExpansionContext<'_>,
        out: &mut dyn Write,
        suppressed: bool,
    ) -> io::Result<Expansion> {
        let start = at + 2;
        let Some(close) = self.source[start..].find(')').map(|i| start + i) else {
            self.report(Diagnostic::UnterminatedInvocation { offset: at });
            let end = self.source.len();
            self.emit(out, at, end, suppressed)?;
            self.position = end;
            return Ok(Expansion::Truncated);
        };

        let widget = dispatch::lookup(&self.source[start..close]);
        if widget.is_none() {
            let name = self.source[start..close].to_string();
            self.report(Diagnostic::UnknownSymbol { name, offset: at });
        }

        let has_body = self.source.as_bytes().get(close + 1) == Some(&b'{');
        let resume = if has_body { close + 2 } else { close + 1 };
        let mut repeating = false;
        loop {
            ctx.set_repeating(repeating);
            let repeat = match widget {
                Some(widget) if !suppressed => widget.invoke(ctx, out)?,
                _ => false,
            };
            repeating = true;
            self.position = resume;
            if !has_body {
                break;
            }
            if self.expand(ctx, out, suppressed || !repeat)? == Expansion::Truncated {
                return Ok(Expansion::Truncated);
            }
            if !repeat {
                break;
            }
        }
        Ok(Expansion::Finished)
    }

    fn emit(&self, out: &mut dyn Write, from: usize, to: usize, suppressed: bool) -> io::Result<()> {
        if suppressed || from >= to {
            return Ok(());
        }
        out.write_all(self.source[from..to].as_bytes())
    }

    fn unwind(&mut self, result: Expansion) -> Expansion {
        self.depth = self.depth.saturating_sub(1);
        result
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        warn!("template: {diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}

/// Next `@`, `}` or `~` at or after `from`.
fn find_special(source: &str, from: usize) -> Option<usize> {
    source
        .get(from..)?
        .find(['@', '}', '~'])
        .map(|i| from + i)
}

/// `~` at the start of a line and followed by a newline.
fn is_standalone_tilde(source: &str, at: usize) -> bool {
    let bytes = source.as_bytes();
    (at == 0 || bytes[at - 1] == b'\n') && bytes.get(at + 1) == Some(&b'\n')
}

/// Offsets of the separator lines that the parser would act on: those
/// outside every body block.
pub fn find_separators(source: &str) -> Vec<usize> {
    let bytes = source.as_bytes();
    let mut found = Vec::new();
    let mut open_bodies = 0usize;
    let mut pos = 0;
    while let Some(at) = find_special(source, pos) {
        match bytes[at] {
            b'@' if bytes.get(at + 1) == Some(&b'(') => {
                let Some(close) = source[at + 2..].find(')').map(|i| at + 2 + i) else {
                    break;
                };
                if bytes.get(close + 1) == Some(&b'{') {
                    open_bodies += 1;
                    pos = close + 2;
                } else {
                    pos = close + 1;
                }
            }
            b'}' => {
                open_bodies = open_bodies.saturating_sub(1);
                pos = at + 1;
            }
            b'~' if open_bodies == 0 && is_standalone_tilde(source, at) => {
                found.push(at);
                pos = at + 2;
            }
            _ => pos = at + 1,
        }
    }
    found
}
