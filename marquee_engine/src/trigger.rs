//! Trigger kinds, the grammars that recognize them, and their firing rules.
//!
//! A trigger line in a scene (`after 2 seconds`, `on key space`, `each *:30:00`)
//! gates the action lines that follow it. Every frame each live trigger is
//! updated once against the clocks and input, and any action bound to a
//! trigger that fired gets dispatched.

use lazy_static::lazy_static;
use log::error;
use serde::Serialize;
use variantly::Variantly;

use crate::input::{FrameClock, InputState};
use crate::pattern::PatternSpec;
use crate::timing::{TimeOfDay, TimePattern};

/// Minimum gap before an `each` trigger is checked again after firing.
pub const EACH_TIME_THROTTLE_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Variantly)]
pub enum TriggerKind {
    Start,
    After,
    OnKey,
    OnClick,
    AtTime,
    EachTime,
    Every,
    When,
    While,
}

impl TriggerKind {
    pub fn name(self) -> &'static str {
        match self {
            TriggerKind::Start => "Start",
            TriggerKind::After => "After",
            TriggerKind::OnKey => "OnKey",
            TriggerKind::OnClick => "OnClick",
            TriggerKind::AtTime => "AtTime",
            TriggerKind::EachTime => "EachTime",
            TriggerKind::Every => "Every",
            TriggerKind::When => "When",
            TriggerKind::While => "While",
        }
    }
}

/// Trigger grammars in the order lines are tried against them.
const TRIGGER_PATTERNS: [(TriggerKind, &str); 9] = [
    (TriggerKind::Start, "=/begin : */rest"),
    (TriggerKind::After, "=/after : */rest"),
    (TriggerKind::OnKey, "=/on |/key|keypress ~/press : */rest"),
    (TriggerKind::OnClick, "=/on ~/mouse =/click : */rest"),
    (TriggerKind::AtTime, "=/at : */rest"),
    (TriggerKind::EachTime, "=/each : */rest"),
    (TriggerKind::Every, "=/every : */rest"),
    (TriggerKind::When, "=/when : */rest"),
    (TriggerKind::While, "=/while : */rest"),
];

lazy_static! {
    static ref TRIGGER_GRAMMARS: Vec<(TriggerKind, PatternSpec)> = TRIGGER_PATTERNS
        .iter()
        .filter_map(|(kind, text)| match PatternSpec::parse(text) {
            Ok(spec) => Some((*kind, spec.case_insensitive())),
            Err(err) => {
                error!("trigger grammar for {} is invalid: {err}", kind.name());
                None
            },
        })
        .collect();
}

/// A recognized trigger line before its argument is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDecl {
    pub kind: TriggerKind,
    /// Everything after the trigger words, verbatim.
    pub argument: Option<String>,
}

/// Recognize a trigger declaration, trying grammars in their fixed order.
pub fn classify<S: AsRef<str>>(words: &[S]) -> Option<TriggerDecl> {
    TRIGGER_GRAMMARS.iter().find_map(|(kind, spec)| {
        let result = spec.matches(words);
        result.valid.then(|| TriggerDecl {
            kind: *kind,
            argument: result.text("rest").map(str::to_string),
        })
    })
}

/// What a live trigger waits for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TriggerCondition {
    After { delay_ms: u64 },
    Every { period_ms: u64 },
    AtTime(TimeOfDay),
    EachTime(TimePattern),
    OnKey { key: Option<String> },
    OnClick,
    When { expression: String },
    While { expression: String },
}

impl TriggerCondition {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerCondition::After { .. } => TriggerKind::After,
            TriggerCondition::Every { .. } => TriggerKind::Every,
            TriggerCondition::AtTime(_) => TriggerKind::AtTime,
            TriggerCondition::EachTime(_) => TriggerKind::EachTime,
            TriggerCondition::OnKey { .. } => TriggerKind::OnKey,
            TriggerCondition::OnClick => TriggerKind::OnClick,
            TriggerCondition::When { .. } => TriggerKind::When,
            TriggerCondition::While { .. } => TriggerKind::While,
        }
    }
}

/// A trigger owned by a running scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub condition: TriggerCondition,
    pub scene: String,
    /// Set during a frame's update, cleared when the frame ends.
    pub fired: bool,
    /// One-shot triggers stay expired until their scene restarts.
    pub expired: bool,
    pub next_eligible_ms: u64,
    /// Base time for elapsed-time conditions.
    pub stopwatch_ms: u64,
}

impl Trigger {
    pub fn new(condition: TriggerCondition, scene: &str, now_ms: u64) -> Self {
        Self {
            condition,
            scene: scene.to_string(),
            fired: false,
            expired: false,
            next_eligible_ms: 0,
            stopwatch_ms: now_ms,
        }
    }

    pub fn kind(&self) -> TriggerKind {
        self.condition.kind()
    }

    /// Run this trigger's firing rule for one frame.
    ///
    /// `probe` evaluates `when`/`while` expressions and reports their truth.
    pub fn update(
        &mut self,
        clock: &FrameClock,
        input: &mut InputState,
        probe: &mut dyn FnMut(TriggerKind, &str) -> bool,
    ) {
        let now = clock.elapsed_ms;
        if self.expired || now < self.next_eligible_ms {
            return;
        }
        let elapsed = now.saturating_sub(self.stopwatch_ms);
        match &self.condition {
            TriggerCondition::After { delay_ms } => {
                if elapsed > *delay_ms {
                    self.fired = true;
                    self.expired = true;
                }
            },
            TriggerCondition::Every { period_ms } => {
                if elapsed > *period_ms {
                    self.fired = true;
                    self.stopwatch_ms = now;
                    self.next_eligible_ms = now + period_ms;
                }
            },
            TriggerCondition::AtTime(target) => {
                if target.reached(&clock.wall) {
                    self.fired = true;
                    self.expired = true;
                }
            },
            TriggerCondition::EachTime(pattern) => {
                if pattern.matches(&clock.wall) {
                    self.fired = true;
                    self.next_eligible_ms = now + EACH_TIME_THROTTLE_MS;
                }
            },
            TriggerCondition::OnKey { key } => {
                self.fired = input.take_key_if(key.as_deref()).is_some();
            },
            TriggerCondition::OnClick => {
                self.fired = input.take_click().is_some();
            },
            TriggerCondition::When { expression } | TriggerCondition::While { expression } => {
                self.fired = probe(self.condition.kind(), expression);
            },
        }
    }
}
