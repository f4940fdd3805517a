//! Scenes, their actions, and the grouping of content lines into
//! trigger-gated action groups.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::pattern::tokenize;
use crate::trigger::{Trigger, TriggerDecl, TriggerKind, classify};

/// Name of the implicit scene holding lines outside any `scene` block.
pub const TOP_LEVEL: &str = "main";

/// A command line gated by one or more triggers of its scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub text: String,
    /// Text as last expanded and guarded, for inspection.
    pub expanded: Option<String>,
    /// Indices into the owning scene's trigger list.
    pub triggers: Vec<usize>,
    pub complete: bool,
}

impl Action {
    pub fn new(text: impl Into<String>, triggers: Vec<usize>) -> Self {
        Self {
            text: text.into(),
            expanded: None,
            triggers,
            complete: false,
        }
    }
}

/// Consecutive trigger lines followed by the action lines they gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionGroup {
    pub declarations: Vec<TriggerDecl>,
    pub actions: Vec<String>,
}

impl ActionGroup {
    /// True when every trigger of the group is `begin`.
    pub fn is_start_only(&self) -> bool {
        !self.declarations.is_empty() && self.declarations.iter().all(|decl| decl.kind.is_start())
    }
}

/// Split scene content into action groups.
///
/// A trigger line joins the current group unless that group already has
/// actions, in which case it opens a new one. Every other line is an action.
pub fn group_lines<S: AsRef<str>>(content: &[S]) -> Vec<ActionGroup> {
    let mut groups: Vec<ActionGroup> = Vec::new();
    let mut current = ActionGroup::default();
    for line in content {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        match classify(&tokenize(line)) {
            Some(decl) => {
                if !current.actions.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                current.declarations.push(decl);
            },
            None => current.actions.push(line.to_string()),
        }
    }
    if !current.declarations.is_empty() || !current.actions.is_empty() {
        groups.push(current);
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub name: String,
    /// Folder of the script file the scene came from.
    pub folder: PathBuf,
    /// Resource sub-folder chosen with `from`, relative to `folder`.
    pub from_folder: String,
    pub content: Vec<String>,
    pub enabled: bool,
    pub actions: Vec<Action>,
    pub triggers: Vec<Trigger>,
    /// Bumped on every start and stop.
    pub generation: u64,
}

impl Scene {
    pub fn new(name: impl Into<String>, folder: impl Into<PathBuf>, content: Vec<String>) -> Self {
        Self {
            name: name.into(),
            folder: folder.into(),
            from_folder: String::new(),
            content,
            enabled: false,
            actions: Vec::new(),
            triggers: Vec::new(),
            generation: 0,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.name == TOP_LEVEL
    }

    /// Where `load` looks for files.
    pub fn resource_folder(&self) -> PathBuf {
        if self.from_folder.is_empty() {
            self.folder.clone()
        } else {
            self.folder.join(Path::new(&self.from_folder))
        }
    }

    /// The tag a new sprite or resource gets when created by this scene.
    pub fn qualify_tag(&self, tag: &str) -> String {
        if let Some(top) = tag.strip_prefix(':') {
            top.to_string()
        } else if tag.contains(':') || self.is_top_level() {
            tag.to_string()
        } else {
            format!("{}:{tag}", self.name)
        }
    }

    /// Find an existing tag: fully-qualified, then scene-local, then top level.
    pub fn resolve_tag(&self, tag: &str, exists: impl Fn(&str) -> bool) -> Option<String> {
        if tag.is_empty() {
            return None;
        }
        if let Some(top) = tag.strip_prefix(':') {
            return exists(top).then(|| top.to_string());
        }
        if tag.contains(':') {
            return exists(tag).then(|| tag.to_string());
        }
        let local = format!("{}:{tag}", self.name);
        if exists(&local) {
            Some(local)
        } else if exists(tag) {
            Some(tag.to_string())
        } else {
            None
        }
    }

    /// The kind of the first fired trigger gating `action`, if any fired.
    pub fn first_fired(&self, action: &Action) -> Option<TriggerKind> {
        action
            .triggers
            .iter()
            .filter_map(|index| self.triggers.get(*index))
            .find(|trigger| trigger.fired)
            .map(Trigger::kind)
    }

    pub fn clear_fired(&mut self) {
        for trigger in &mut self.triggers {
            trigger.fired = false;
        }
    }

    /// Drop the live actions and triggers and start a new generation.
    pub fn reset(&mut self) {
        self.actions.clear();
        self.triggers.clear();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerCondition;

    #[test]
    fn triggers_after_actions_open_new_groups() {
        let lines = [
            "begin",
            "echo one",
            "after 1 second",
            "on click",
            "echo two",
            "echo three",
            "every 2 seconds",
        ];
        let groups = group_lines(&lines);
        assert_eq!(groups.len(), 3);
        assert!(groups[0].is_start_only());
        assert!(!groups[1].is_start_only());
        assert_eq!(groups[1].declarations.len(), 2);
        assert_eq!(groups[1].actions, vec!["echo two", "echo three"]);
        assert!(groups[2].actions.is_empty());
    }

    #[test]
    fn leading_actions_form_an_untriggered_group() {
        let groups = group_lines(&["echo orphan", "begin", "echo ok"]);
        assert!(groups[0].declarations.is_empty());
        assert_eq!(groups[1].actions, vec!["echo ok"]);
    }

    #[test]
    fn tags_qualify_and_resolve() {
        let scene = Scene::new("intro", ".", Vec::new());
        assert_eq!(scene.qualify_tag("cat"), "intro:cat");
        assert_eq!(scene.qualify_tag("other:cat"), "other:cat");
        assert_eq!(scene.qualify_tag(":logo"), "logo");
        let known = ["intro:cat", "logo"];
        let exists = |tag: &str| known.contains(&tag);
        assert_eq!(scene.resolve_tag("cat", exists).as_deref(), Some("intro:cat"));
        assert_eq!(scene.resolve_tag("logo", exists).as_deref(), Some("logo"));
        assert_eq!(scene.resolve_tag("dog", exists), None);

        let top = Scene::new(TOP_LEVEL, ".", Vec::new());
        assert_eq!(top.qualify_tag("cat"), "cat");
    }

    #[test]
    fn first_fired_reports_kind() {
        let mut scene = Scene::new("intro", ".", Vec::new());
        scene.triggers.push(Trigger::new(TriggerCondition::OnClick, "intro", 0));
        scene.triggers.push(Trigger::new(TriggerCondition::Every { period_ms: 10 }, "intro", 0));
        let action = Action::new("echo hi", vec![0, 1]);
        assert_eq!(scene.first_fired(&action), None);
        scene.triggers[1].fired = true;
        assert_eq!(scene.first_fired(&action), Some(TriggerKind::Every));
        scene.clear_fired();
        assert_eq!(scene.first_fired(&action), None);
    }
}
