//! Non-fatal problems reported while matching, loading, or running scripts.
//!
//! Nothing in a script should be able to bring the runtime down. Bad command
//! text, unknown tags, failed expressions and the like are recorded as a
//! [`Diagnostic`] and execution carries on with the next action.

use log::debug;
use serde::Serialize;
use std::fmt;

/// Broad category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A command or trigger argument did not fit its grammar.
    Grammar,
    /// No registered command recognized the line.
    UnknownCommand,
    /// A tag, scene, or variable could not be resolved.
    Reference,
    /// An expression failed to evaluate.
    Evaluation,
    /// Structural problems in the script file itself.
    Script,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::Grammar => "grammar",
            DiagnosticKind::UnknownCommand => "unknown command",
            DiagnosticKind::Reference => "reference",
            DiagnosticKind::Evaluation => "evaluation",
            DiagnosticKind::Script => "script",
        };
        write!(f, "{label}")
    }
}

/// A single recoverable problem, optionally tied to the scene it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub scene: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            scene: None,
            message: message.into(),
        }
    }

    pub fn grammar(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Grammar, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Reference, message)
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Evaluation, message)
    }

    pub fn script(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Script, message)
    }

    /// Attach the originating scene name.
    #[must_use]
    pub fn in_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = Some(scene.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scene {
            Some(scene) => write!(f, "[{scene}] {} error: {}", self.kind, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

/// Ordered collection of diagnostics awaiting a reader.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        debug!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Remove and return everything collected so far.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }
}
