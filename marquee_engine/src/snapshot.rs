//! Point-in-time view of the runtime for `dump` and for tooling.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::runtime::Runtime;
use crate::scene::{Scene, TOP_LEVEL};
use crate::trigger::Trigger;

/// Section names `Snapshot::lines` understands, in dump order.
pub const SECTIONS: &[&str] = &["scenes", "triggers", "actions", "vars", "sprites"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerSnapshot {
    pub kind: &'static str,
    pub scene: String,
    pub fired: bool,
    pub expired: bool,
    pub next_eligible_ms: u64,
}

impl From<&Trigger> for TriggerSnapshot {
    fn from(trigger: &Trigger) -> Self {
        Self {
            kind: trigger.kind().name(),
            scene: trigger.scene.clone(),
            fired: trigger.fired,
            expired: trigger.expired,
            next_eligible_ms: trigger.next_eligible_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSnapshot {
    pub text: String,
    pub expanded: Option<String>,
    pub complete: bool,
    /// Kinds of the triggers gating the action.
    pub triggers: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSnapshot {
    pub name: String,
    pub enabled: bool,
    pub folder: PathBuf,
    pub content_lines: usize,
    pub triggers: Vec<TriggerSnapshot>,
    pub actions: Vec<ActionSnapshot>,
}

impl From<&Scene> for SceneSnapshot {
    fn from(scene: &Scene) -> Self {
        let actions = scene
            .actions
            .iter()
            .map(|action| ActionSnapshot {
                text: action.text.clone(),
                expanded: action.expanded.clone(),
                complete: action.complete,
                triggers: action
                    .triggers
                    .iter()
                    .filter_map(|index| scene.triggers.get(*index))
                    .map(|trigger| trigger.kind().name())
                    .collect(),
            })
            .collect();
        Self {
            name: scene.name.clone(),
            enabled: scene.enabled,
            folder: scene.resource_folder(),
            content_lines: scene.content.len(),
            triggers: scene.triggers.iter().map(TriggerSnapshot::from).collect(),
            actions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub frame: u64,
    pub elapsed_ms: u64,
    pub scenes: Vec<SceneSnapshot>,
    pub variables: BTreeMap<String, String>,
    pub sprites: Vec<String>,
}

impl Snapshot {
    pub fn capture(runtime: &Runtime) -> Self {
        Self {
            frame: runtime.frames(),
            elapsed_ms: runtime.clock().elapsed_ms,
            scenes: runtime.scenes().iter().map(SceneSnapshot::from).collect(),
            variables: runtime.vars().dump(TOP_LEVEL).into_iter().collect(),
            sprites: runtime.stage().sprite_tags(),
        }
    }

    /// Printable lines for one section, or `None` for an unknown section.
    pub fn lines(&self, section: &str) -> Option<Vec<String>> {
        let lines = match section.to_ascii_lowercase().as_str() {
            "scenes" => self
                .scenes
                .iter()
                .map(|scene| {
                    let state = if scene.enabled { "running" } else { "stopped" };
                    format!(
                        "scene {} ({state}): {} line(s), {} trigger(s), {} action(s)",
                        scene.name,
                        scene.content_lines,
                        scene.triggers.len(),
                        scene.actions.len()
                    )
                })
                .collect(),
            "triggers" => self
                .scenes
                .iter()
                .flat_map(|scene| scene.triggers.iter())
                .map(|trigger| {
                    format!(
                        "[{}] {} expired={} next={}ms",
                        trigger.scene, trigger.kind, trigger.expired, trigger.next_eligible_ms
                    )
                })
                .collect(),
            "actions" => self
                .scenes
                .iter()
                .flat_map(|scene| scene.actions.iter().map(move |action| (&scene.name, action)))
                .map(|(scene, action)| {
                    let done = if action.complete { " (complete)" } else { "" };
                    format!("[{scene}] {} <- {}{done}", action.text, action.triggers.join(", "))
                })
                .collect(),
            "vars" | "variables" => self
                .variables
                .iter()
                .map(|(name, value)| format!("{name} = {value}"))
                .collect(),
            "sprites" => self.sprites.clone(),
            _ => return None,
        };
        Some(lines)
    }
}

#[cfg(test)]
mod tests {
    use crate::command::testing::runtime;
    use crate::input::{FrameClock, InputState};

    #[test]
    fn snapshot_reflects_running_scenes() {
        let (mut rt, _) = runtime("begin\nstart ticker\nscene ticker\nevery 1 second\necho tick\nend scene\n");
        rt.start(FrameClock::from_millis(0));
        rt.frame(FrameClock::from_millis(1500), &mut InputState::new());
        let snapshot = rt.snapshot();
        assert_eq!(snapshot.frame, 1);
        let ticker = &snapshot.scenes[0];
        assert_eq!(ticker.name, "ticker");
        assert!(ticker.enabled);
        assert_eq!(ticker.actions[0].triggers, vec!["Every"]);
        assert_eq!(ticker.actions[0].expanded.as_deref(), Some("echo tick"));
        assert!(!ticker.triggers[0].fired);
    }

    #[test]
    fn lines_cover_every_section() {
        let (mut rt, _) = runtime("begin\nstart ticker\nscene ticker\nevery 1 second\necho tick\nend scene\n");
        rt.start(FrameClock::from_millis(0));
        let snapshot = rt.snapshot();
        for section in super::SECTIONS {
            assert!(snapshot.lines(section).is_some(), "{section}");
        }
        let actions = snapshot.lines("actions").unwrap();
        assert_eq!(actions, vec!["[ticker] echo tick <- Every"]);
        assert!(snapshot.lines("widgets").is_none());
    }
}
