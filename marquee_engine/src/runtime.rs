//! The runtime: owns every scene, the variable store and the stage seam, and
//! runs one synchronous frame at a time.
//!
//! A frame records the clocks, publishes input variables, then visits each
//! enabled scene in load order:
//!
//! 1. update every trigger of the scene,
//! 2. dispatch every incomplete action gated by a trigger that fired,
//! 3. clear the fired flags.
//!
//! An action that stops or restarts its own scene ends that scene's visit for
//! the frame. A stopped scene is skipped entirely.

use log::{debug, error, info, warn};

use crate::command::{CommandRegistry, Invocation, Outcome};
use crate::config::RuntimeConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::eval::{Evaluator, format_number};
use crate::input::{FrameClock, InputState};
use crate::pattern::tokenize;
use crate::scene::{Action, Scene, TOP_LEVEL, group_lines};
use crate::script::LoadedScript;
use crate::snapshot::Snapshot;
use crate::stage::Stage;
use crate::timing::{DurationParser, TimeOfDay, TimePattern};
use crate::trigger::{Trigger, TriggerCondition, TriggerDecl, TriggerKind};
use crate::vars::{self, VariableEnvironment, is_truthy};

/// Nested `start` calls deeper than this are refused.
const MAX_START_DEPTH: usize = 16;

/// What became of one action visit.
struct ActionOutcome {
    expanded: Option<String>,
    complete: bool,
}

pub struct Runtime {
    scenes: Vec<Scene>,
    vars: VariableEnvironment,
    registry: CommandRegistry,
    stage: Box<dyn Stage>,
    evaluator: Box<dyn Evaluator>,
    config: RuntimeConfig,
    durations: DurationParser,
    diagnostics: Diagnostics,
    clock: FrameClock,
    frames: u64,
    start_depth: usize,
    exit_requested: bool,
}

impl Runtime {
    /// A runtime with the built-in commands and the configured evaluator.
    pub fn new(config: RuntimeConfig, stage: Box<dyn Stage>) -> Self {
        let vars = VariableEnvironment::new(config.display_size(), config.framerate, config.seed);
        Self {
            scenes: Vec::new(),
            vars,
            registry: CommandRegistry::builtin(),
            stage,
            evaluator: config.evaluator.build(),
            config,
            durations: DurationParser::new(),
            diagnostics: Diagnostics::new(),
            clock: FrameClock::default(),
            frames: 0,
            start_depth: 0,
            exit_requested: false,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Take over the scenes and load diagnostics of a script.
    pub fn install(&mut self, script: LoadedScript) {
        self.diagnostics.extend(script.diagnostics);
        for scene in script.scenes {
            self.add_scene(scene);
        }
    }

    /// Add a scene, replacing any existing scene of the same name.
    pub fn add_scene(&mut self, scene: Scene) {
        match self.scene_index(&scene.name) {
            Some(index) => {
                warn!("replacing scene '{}'", scene.name);
                self.scenes[index] = scene;
            },
            None => self.scenes.push(scene),
        }
    }

    fn scene_index(&self, name: &str) -> Option<usize> {
        self.scenes.iter().position(|scene| scene.name.eq_ignore_ascii_case(name))
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scene_index(name).map(|index| &self.scenes[index])
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scene_index(name).map(|index| &mut self.scenes[index])
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn stage(&self) -> &dyn Stage {
        self.stage.as_ref()
    }

    pub fn stage_mut(&mut self) -> &mut dyn Stage {
        self.stage.as_mut()
    }

    pub fn vars(&self) -> &VariableEnvironment {
        &self.vars
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn clock(&self) -> FrameClock {
        self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn request_exit(&mut self) {
        info!("exit requested");
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// Parse an optional duration phrase into seconds, zero when absent.
    pub fn parse_duration(&mut self, text: Option<&str>) -> f64 {
        text.map_or(0.0, |text| self.durations.parse(text))
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<String>, scene: &str) {
        self.vars.set_var(name, value, scene);
    }

    pub fn var(&self, name: &str, scene: &str) -> Option<&str> {
        self.vars.get_var(name, scene)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Start the top-level scene at `clock`.
    pub fn start(&mut self, clock: FrameClock) -> bool {
        self.clock = clock;
        self.vars.set_clock(clock.wall);
        self.start_scene(TOP_LEVEL)
    }

    /// (Re)start a scene: rebuild its triggers and actions, then run its `begin` actions.
    pub fn start_scene(&mut self, name: &str) -> bool {
        let Some(index) = self.scene_index(name) else {
            self.report(Diagnostic::reference(format!("no scene named '{name}'")));
            return false;
        };
        if self.start_depth >= MAX_START_DEPTH {
            self.report(Diagnostic::script(format!("scene '{name}' not started: scenes start each other too deeply")));
            return false;
        }

        let scene_name = self.scenes[index].name.clone();
        let groups = group_lines(&self.scenes[index].content);
        {
            let scene = &mut self.scenes[index];
            scene.reset();
            scene.enabled = true;
            scene.from_folder.clear();
        }
        let generation = self.scenes[index].generation;

        let mut immediate: Vec<String> = Vec::new();
        for group in groups {
            if group.actions.is_empty() {
                continue;
            }
            if group.declarations.is_empty() {
                self.report(
                    Diagnostic::script(format!("actions without a trigger ignored: '{}'", group.actions.join("; ")))
                        .in_scene(&scene_name),
                );
                continue;
            }
            if group.is_start_only() {
                immediate.extend(group.actions);
                continue;
            }
            let mut bound = Vec::new();
            for decl in group.declarations.iter().filter(|decl| !decl.kind.is_start()) {
                if let Some(trigger) = self.build_trigger(decl, &scene_name) {
                    let scene = &mut self.scenes[index];
                    scene.triggers.push(trigger);
                    bound.push(scene.triggers.len() - 1);
                }
            }
            if !bound.is_empty() {
                let scene = &mut self.scenes[index];
                for text in group.actions {
                    scene.actions.push(Action::new(text, bound.clone()));
                }
            }
        }
        info!(
            "scene '{scene_name}' started: {} trigger(s), {} action(s), {} immediate",
            self.scenes[index].triggers.len(),
            self.scenes[index].actions.len(),
            immediate.len()
        );

        self.start_depth += 1;
        for text in immediate {
            if self.scenes[index].generation != generation {
                break;
            }
            self.vars.set_var("TRIGGER", TriggerKind::Start.name(), TOP_LEVEL);
            self.perform(&text, &scene_name);
        }
        self.start_depth -= 1;
        true
    }

    /// Stop a scene: drop its actions, triggers, sprites and variables.
    pub fn stop_scene(&mut self, name: &str) -> bool {
        let Some(index) = self.scene_index(name) else {
            self.report(Diagnostic::reference(format!("no scene named '{name}'")));
            return false;
        };
        if self.scenes[index].is_top_level() {
            self.report(Diagnostic::script("the top-level scene cannot be stopped, use 'exit'"));
            return false;
        }
        let scene = &mut self.scenes[index];
        scene.reset();
        scene.enabled = false;
        let scene_name = scene.name.clone();
        let sprites = self.stage.remove_scene_sprites(&scene_name);
        let variables = self.vars.purge(&scene_name);
        info!("scene '{scene_name}' stopped: {sprites} sprite(s) and {variables} variable(s) removed");
        true
    }

    /// Expand and evaluate a trigger argument once, at trigger construction.
    fn resolve_argument(&mut self, text: &str, scene: &str) -> Option<String> {
        let expansion = self.vars.expand(text, scene, self.stage.as_ref());
        self.diagnostics.extend(expansion.diagnostics);
        if !expansion.safe {
            return None;
        }
        match vars::evaluate(&expansion.text, self.evaluator.as_ref()) {
            Ok(text) => Some(text),
            Err(err) => {
                self.report(Diagnostic::evaluation(err.to_string()).in_scene(scene));
                None
            },
        }
    }

    fn build_trigger(&mut self, decl: &TriggerDecl, scene: &str) -> Option<Trigger> {
        let raw = decl.argument.clone().unwrap_or_default();
        let condition = match decl.kind {
            TriggerKind::Start => return None,
            TriggerKind::When => TriggerCondition::When { expression: raw },
            TriggerKind::While => TriggerCondition::While { expression: raw },
            TriggerKind::OnClick => TriggerCondition::OnClick,
            kind => {
                let argument = self.resolve_argument(&raw, scene)?;
                match kind {
                    TriggerKind::After => TriggerCondition::After {
                        delay_ms: seconds_to_ms(self.durations.parse(&argument)),
                    },
                    TriggerKind::Every => TriggerCondition::Every {
                        period_ms: seconds_to_ms(self.durations.parse(&argument)),
                    },
                    TriggerKind::OnKey => TriggerCondition::OnKey {
                        key: argument.split_whitespace().next().map(str::to_string),
                    },
                    TriggerKind::AtTime => match TimeOfDay::parse(&argument) {
                        Some(time) => TriggerCondition::AtTime(time),
                        None => {
                            self.report(Diagnostic::grammar(format!("invalid time of day '{argument}'")).in_scene(scene));
                            return None;
                        },
                    },
                    _ => match TimePattern::parse(&argument) {
                        Some(pattern) => TriggerCondition::EachTime(pattern),
                        None => {
                            self.report(
                                Diagnostic::grammar(format!("invalid time pattern '{argument}'")).in_scene(scene),
                            );
                            return None;
                        },
                    },
                }
            },
        };
        Some(Trigger::new(condition, scene, self.clock.elapsed_ms))
    }

    fn publish_input(&mut self, input: &mut InputState) {
        self.vars.set_pointer(input.pointer);
        if let Some(key) = input.pending_key() {
            let name = key.name.clone();
            self.vars.set_var("KEY", name.clone(), TOP_LEVEL);
            self.vars.set_var("LASTKEY", name, TOP_LEVEL);
        } else if input.take_release() {
            self.vars.set_var("KEY", "none", TOP_LEVEL);
        }
        if let Some(click) = input.pending_click() {
            self.vars.set_var("CLICKX", format_number(click.x), TOP_LEVEL);
            self.vars.set_var("CLICKY", format_number(click.y), TOP_LEVEL);
        }
    }

    /// Run one frame.
    pub fn frame(&mut self, clock: FrameClock, input: &mut InputState) {
        self.clock = clock;
        self.vars.set_clock(clock.wall);
        self.publish_input(input);
        self.frames += 1;

        for index in 0..self.scenes.len() {
            if !self.scenes[index].enabled {
                continue;
            }
            self.update_triggers(index, input);
            let generation = self.scenes[index].generation;
            let scene_name = self.scenes[index].name.clone();

            let mut position = 0;
            while position < self.scenes[index].actions.len() {
                let scene = &self.scenes[index];
                let action = &scene.actions[position];
                position += 1;
                if action.complete {
                    continue;
                }
                let Some(kind) = scene.first_fired(action) else {
                    continue;
                };
                let text = action.text.clone();
                self.vars.set_var("TRIGGER", kind.name(), TOP_LEVEL);
                let outcome = self.perform(&text, &scene_name);

                let scene = &mut self.scenes[index];
                if scene.generation != generation {
                    debug!("scene '{scene_name}' restarted or stopped mid-frame");
                    break;
                }
                let action = &mut scene.actions[position - 1];
                if outcome.expanded.is_some() {
                    action.expanded = outcome.expanded;
                }
                action.complete |= outcome.complete;
            }
            self.scenes[index].clear_fired();
        }
    }

    fn update_triggers(&mut self, index: usize, input: &mut InputState) {
        let Runtime {
            scenes,
            vars,
            stage,
            evaluator,
            diagnostics,
            clock,
            ..
        } = self;
        let scene = &mut scenes[index];
        let scene_name = scene.name.clone();
        let mut probe = |kind: TriggerKind, expression: &str| -> bool {
            let expansion = vars.expand(expression, &scene_name, stage.as_ref());
            diagnostics.extend(expansion.diagnostics);
            if !expansion.safe {
                return false;
            }
            let evaluated = if kind.is_while() {
                evaluator.evaluate(&expansion.text)
            } else {
                vars::evaluate(&expansion.text, evaluator.as_ref())
            };
            match evaluated {
                Ok(value) => is_truthy(value.trim()),
                Err(err) => {
                    diagnostics.push(Diagnostic::evaluation(err.to_string()).in_scene(&scene_name));
                    false
                },
            }
        };
        for trigger in &mut scene.triggers {
            trigger.update(clock, input, &mut probe);
        }
    }

    /// Expand, evaluate, guard and dispatch one action text.
    fn perform(&mut self, text: &str, scene: &str) -> ActionOutcome {
        let expansion = self.vars.expand(text, scene, self.stage.as_ref());
        self.diagnostics.extend(expansion.diagnostics);
        let evaluated = if expansion.safe {
            match vars::evaluate(&expansion.text, self.evaluator.as_ref()) {
                Ok(evaluated) => evaluated,
                Err(err) => {
                    self.report(Diagnostic::evaluation(err.to_string()).in_scene(scene));
                    return ActionOutcome {
                        expanded: None,
                        complete: false,
                    };
                },
            }
        } else {
            expansion.text
        };
        let guarded = vars::conditional(&evaluated).map(|line| line.trim().to_string());
        let Some(line) = guarded else {
            return ActionOutcome {
                expanded: Some(evaluated),
                complete: false,
            };
        };
        let complete = self.dispatch(&line, scene);
        ActionOutcome {
            expanded: Some(line),
            complete,
        }
    }

    /// Run one command line on behalf of `scene`. Returns true when the action is complete.
    pub fn dispatch(&mut self, line: &str, scene: &str) -> bool {
        let words = tokenize(line);
        if words.is_empty() {
            return false;
        }
        let Some((id, handler, matched)) = self
            .registry
            .find(&words)
            .map(|(spec, matched)| (spec.id, spec.handler, matched))
        else {
            self.report(Diagnostic::new(DiagnosticKind::UnknownCommand, format!("'{line}'")).in_scene(scene));
            return false;
        };
        for diagnostic in &matched.diagnostics {
            self.report(diagnostic.clone().in_scene(scene));
        }
        debug!("dispatch [{scene}] {id}: {line}");
        let invocation = Invocation {
            scene: scene.to_string(),
            line: line.to_string(),
            matched,
        };
        match handler(self, &invocation) {
            Ok(Outcome::Complete) => true,
            Ok(Outcome::Repeat) => false,
            Err(err) => {
                error!("command '{id}' failed: {err:#}");
                self.report(Diagnostic::script(format!("{id}: {err:#}")).in_scene(scene));
                false
            },
        }
    }

    /// Resolve a tag against the stage for `scene`, reporting a miss.
    pub fn resolve_tag(
        &mut self,
        scene: &str,
        tag: &str,
        what: &str,
        exists: impl Fn(&dyn Stage, &str) -> bool,
    ) -> Option<String> {
        let stage = self.stage.as_ref();
        let resolved = self
            .scene(scene)
            .and_then(|owner| owner.resolve_tag(tag, |candidate| exists(stage, candidate)));
        if resolved.is_none() {
            self.report(Diagnostic::reference(format!("{what} '{tag}' not found")).in_scene(scene));
        }
        resolved
    }

    pub fn resolve_sprite(&mut self, scene: &str, tag: &str) -> Option<String> {
        self.resolve_tag(scene, tag, "sprite", |stage, candidate| stage.has_sprite(candidate))
    }

    pub fn resolve_image(&mut self, scene: &str, tag: &str) -> Option<String> {
        self.resolve_tag(scene, tag, "image", |stage, candidate| stage.has_image(candidate))
    }

    pub fn resolve_sound(&mut self, scene: &str, tag: &str) -> Option<String> {
        self.resolve_tag(scene, tag, "sound", |stage, candidate| stage.has_sound(candidate))
    }

    /// The tag a new resource or sprite of `scene` is stored under.
    pub fn qualify_tag(&self, scene: &str, tag: &str) -> String {
        self.scene(scene)
            .map_or_else(|| tag.to_string(), |owner| owner.qualify_tag(tag))
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;
    use crate::stage::{HeadlessStage, Journal};
    use std::path::Path;

    fn runtime(script: &str) -> (Runtime, Journal) {
        let stage = HeadlessStage::new();
        let journal = stage.journal();
        let mut runtime = Runtime::new(
            RuntimeConfig {
                seed: Some(1),
                ..RuntimeConfig::default()
            },
            Box::new(stage),
        );
        runtime.install(parse_script(script, Path::new(".")).unwrap());
        (runtime, journal)
    }

    #[test]
    fn begin_actions_run_during_start() {
        let (mut rt, journal) = runtime("begin\necho hello $TRIGGER\n");
        assert!(rt.start(FrameClock::from_millis(0)));
        assert_eq!(journal.echoes(), vec!["hello Start"]);
        assert!(rt.scene(TOP_LEVEL).unwrap().actions.is_empty());
    }

    #[test]
    fn orphan_actions_are_reported() {
        let (mut rt, _) = runtime("echo lost\nbegin\necho found\n");
        rt.start(FrameClock::from_millis(0));
        assert!(rt.take_diagnostics().iter().any(|d| d.message.contains("echo lost")));
    }

    #[test]
    fn restarting_rebuilds_triggers() {
        let (mut rt, _) = runtime("begin\nstart loop\nscene loop\nevery 1 second\necho tick\nend scene\n");
        rt.start(FrameClock::from_millis(0));
        assert!(rt.start_scene("loop"));
        assert_eq!(rt.scene("loop").unwrap().triggers.len(), 1);
        assert_eq!(rt.scene("loop").unwrap().actions.len(), 1);
    }

    #[test]
    fn top_level_cannot_be_stopped() {
        let (mut rt, _) = runtime("begin\necho hi\n");
        rt.start(FrameClock::from_millis(0));
        assert!(!rt.stop_scene(TOP_LEVEL));
        assert!(rt.scene(TOP_LEVEL).unwrap().enabled);
    }

    #[test]
    fn unknown_commands_are_not_completed() {
        let (mut rt, _) = runtime("begin\necho hi\n");
        assert!(!rt.dispatch("juggle knives", TOP_LEVEL));
        let diagnostics = rt.take_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownCommand);
        assert!(!rt.dispatch("   ", TOP_LEVEL));
        assert!(rt.take_diagnostics().is_empty());
    }

    #[test]
    fn self_starting_scene_is_bounded() {
        let (mut rt, _) = runtime("begin\nstart again\nscene again\nbegin\nstart again\nend scene\n");
        rt.start(FrameClock::from_millis(0));
        assert!(rt.take_diagnostics().iter().any(|d| d.message.contains("too deeply")));
    }

    #[test]
    fn failed_guard_skips_without_completing() {
        let (mut rt, journal) = runtime("every 0 seconds\nif $go echo went\n");
        rt.set_var("go", "no", TOP_LEVEL);
        rt.start(FrameClock::from_millis(0));
        let mut input = InputState::new();
        rt.frame(FrameClock::from_millis(10), &mut input);
        assert!(journal.echoes().is_empty());
        rt.set_var("go", "yes", TOP_LEVEL);
        rt.frame(FrameClock::from_millis(20), &mut input);
        assert_eq!(journal.echoes(), vec!["went"]);
    }
}
