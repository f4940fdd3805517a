#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const MARQUEE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod command;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod eval;
pub mod input;
pub mod pattern;
pub mod runtime;
pub mod scene;
pub mod script;
pub mod snapshot;
pub mod stage;
pub mod style;
pub mod timing;
pub mod trigger;
pub mod vars;

// Re-exports for convenience
pub use command::{CommandRegistry, Invocation, Outcome};
pub use config::{RuntimeConfig, load_config};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::{EvalError, LoadError, PatternError};
pub use eval::{Evaluator, EvaluatorKind};
pub use input::{FrameClock, InputState, WallClock};
pub use pattern::{MatchResult, PatternSpec};
pub use runtime::Runtime;
pub use scene::{Scene, TOP_LEVEL};
pub use script::{LoadedScript, load_script, parse_script};
pub use snapshot::Snapshot;
pub use stage::{HeadlessStage, Journal, Stage, StageEffect};
