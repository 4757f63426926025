//! Conditional directives and the nesting state machine that decides which
//! template lines reach the output.
//!
//! ```text
//! !!ifnotempty: Outline!!
//! float outlineWidth;
//! !!elifempty: Fallback!!
//! float fallbackWidth;
//! !!else!!
//! // no outline
//! !!endif!!
//! ```

use crate::error::{Result, StructureErrorKind, TemplateError};
use crate::patterns::{DIRECTIVE_MARKER, ELSE_DIRECTIVE, ENDIF_DIRECTIVE, IF_DIRECTIVE};
use tracing::trace;

/// Condition tested by an `if`-like directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    /// `ifempty` / `elifempty`: tag absent or empty
    Empty,
    /// `ifnotempty` / `elifnotempty`: tag present and non-empty
    NotEmpty,
}

/// A parsed directive line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    EndIf,
    Else,
    If {
        /// `elif` form: adds a branch to the current scope instead of opening one
        alternate: bool,
        test: Test,
        tag: &'a str,
    },
}

impl<'a> Directive<'a> {
    /// Parses a directive line.
    ///
    /// Returns `None` for anything that isn't a well-formed directive, including
    /// lines that start with `!!` but don't match; those are ordinary content.
    #[must_use]
    pub fn parse(line: &'a str) -> Option<Self> {
        if !line.starts_with(DIRECTIVE_MARKER) {
            return None;
        }
        if ENDIF_DIRECTIVE.is_match(line) {
            return Some(Self::EndIf);
        }
        if ELSE_DIRECTIVE.is_match(line) {
            return Some(Self::Else);
        }
        let caps = IF_DIRECTIVE.captures(line)?;
        let tag = caps.get(3)?.as_str();
        Some(Self::If {
            alternate: caps.get(1).is_some(),
            test: if caps.get(2).is_some() {
                Test::NotEmpty
            } else {
                Test::Empty
            },
            tag,
        })
    }
}

/// Emission status of the innermost relevant branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitState {
    ShouldEmit,
    ShouldNotEmit,
    /// An earlier branch of this scope was taken; later ones stay silent
    AlreadyEmit,
}

impl EmitState {
    /// Whether some branch of the current scope has matched
    #[must_use]
    pub fn branch_taken(self) -> bool {
        matches!(self, Self::ShouldEmit | Self::AlreadyEmit)
    }
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    /// State of the enclosing scope, restored on `endif`
    saved: EmitState,
    opened_at: usize,
}

/// Tracks nested conditional scopes across one template expansion.
///
/// Directives nested deeper than the skip depth sit inside a suppressed branch:
/// they are counted so `endif`s still balance, but never evaluated.
#[derive(Debug, Clone)]
pub struct DirectiveProcessor {
    state: EmitState,
    scopes: Vec<Scope>,
    /// `None` while nothing is being skipped
    skip_depth: Option<usize>,
}

impl Default for DirectiveProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: EmitState::ShouldEmit,
            scopes: Vec::new(),
            skip_depth: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> EmitState {
        self.state
    }

    /// Current nesting level
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Whether ordinary content lines are emitted at this point
    #[must_use]
    pub fn should_emit(&self) -> bool {
        self.state == EmitState::ShouldEmit
    }

    fn evaluates_at(&self, depth: usize) -> bool {
        self.skip_depth.is_none_or(|skip| depth <= skip)
    }

    fn settle(&mut self, state: EmitState, depth: usize) {
        self.state = state;
        self.skip_depth = if state == EmitState::ShouldEmit {
            None
        } else {
            Some(depth)
        };
    }

    /// Applies one directive found at 1-based `line`.
    ///
    /// `has_value` answers whether a tag is defined and non-empty; it is only
    /// called for directives that are actually evaluated.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Structure` for `else`, `elif` or `endif` with no
    /// open scope.
    pub fn apply<F>(&mut self, directive: Directive<'_>, line: usize, has_value: F) -> Result<()>
    where
        F: FnOnce(&str) -> bool,
    {
        match directive {
            Directive::EndIf => self.end_if(line),
            Directive::Else => self.else_branch(line),
            Directive::If {
                alternate,
                test,
                tag,
            } => self.if_branch(alternate, test, tag, line, has_value),
        }
    }

    fn end_if(&mut self, line: usize) -> Result<()> {
        let depth = self.depth();
        let scope = self.scopes.pop().ok_or(TemplateError::Structure {
            line,
            kind: StructureErrorKind::EndIfWithoutIf,
        })?;
        if self.evaluates_at(depth) {
            self.settle(scope.saved, depth - 1);
        }
        trace!(line, depth, state = ?self.state, "endif");
        Ok(())
    }

    fn else_branch(&mut self, line: usize) -> Result<()> {
        let depth = self.depth();
        if depth == 0 {
            return Err(TemplateError::Structure {
                line,
                kind: StructureErrorKind::ElseWithoutIf,
            });
        }
        if self.evaluates_at(depth) {
            match self.state {
                EmitState::ShouldNotEmit => self.settle(EmitState::ShouldEmit, depth),
                EmitState::ShouldEmit => self.settle(EmitState::AlreadyEmit, depth),
                EmitState::AlreadyEmit => {}
            }
        }
        trace!(line, depth, state = ?self.state, "else");
        Ok(())
    }

    fn if_branch<F>(
        &mut self,
        alternate: bool,
        test: Test,
        tag: &str,
        line: usize,
        has_value: F,
    ) -> Result<()>
    where
        F: FnOnce(&str) -> bool,
    {
        if alternate {
            if self.scopes.is_empty() {
                return Err(TemplateError::Structure {
                    line,
                    kind: StructureErrorKind::ElifWithoutIf,
                });
            }
            if self.state.branch_taken() {
                let depth = self.depth();
                if self.evaluates_at(depth) {
                    self.settle(EmitState::AlreadyEmit, depth);
                }
                trace!(line, depth, tag, "elif after taken branch");
                return Ok(());
            }
        } else {
            self.scopes.push(Scope {
                saved: self.state,
                opened_at: line,
            });
        }

        let depth = self.depth();
        if !self.evaluates_at(depth) {
            trace!(line, depth, tag, "skipped nested condition");
            return Ok(());
        }

        let matched = match test {
            Test::Empty => !has_value(tag),
            Test::NotEmpty => has_value(tag),
        };
        let state = if matched {
            EmitState::ShouldEmit
        } else {
            EmitState::ShouldNotEmit
        };
        self.settle(state, depth);
        trace!(line, depth, tag, ?test, matched, "condition");
        Ok(())
    }

    /// Checks that every scope was closed once the template is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Structure` pointing at the innermost unclosed `if`.
    pub fn finish(&self) -> Result<()> {
        match self.scopes.last() {
            None => Ok(()),
            Some(scope) => Err(TemplateError::Structure {
                line: scope.opened_at,
                kind: StructureErrorKind::UnclosedIf {
                    open: self.scopes.len(),
                },
            }),
        }
    }
}
