//! `command::control` module
//!
//! Handlers for commands that steer the show itself: printing, variables,
//! starting and stopping scenes, introspection and exit.

use anyhow::Result;
use log::info;

use crate::command::{Invocation, Outcome};
use crate::diagnostic::Diagnostic;
use crate::runtime::Runtime;
use crate::snapshot::SECTIONS;
use crate::stage::StageEffect;

/// Prints the rest of the line.
pub fn echo_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let text = inv.text("rest").unwrap_or_default().to_string();
    rt.stage_mut().apply(StageEffect::Echo(text));
    Ok(Outcome::Repeat)
}

/// Sets a variable in the invoking scene. `make x = 1`, `let x be 1`, `put x 1`.
pub fn make_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let name = inv.required("name", "a variable name")?;
    let value = inv.text("rest").unwrap_or_default();
    rt.set_var(name, value, &inv.scene);
    Ok(Outcome::Repeat)
}

pub fn start_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let scenes = inv.list("list");
    if scenes.is_empty() {
        rt.report(Diagnostic::script("start needs at least one scene name").in_scene(&inv.scene));
    }
    for name in scenes {
        rt.start_scene(&name);
    }
    Ok(Outcome::Repeat)
}

/// Stops the named scenes, or the invoking scene when none are named.
pub fn stop_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let mut scenes = inv.list("list");
    if scenes.is_empty() {
        scenes.push(inv.scene.clone());
    }
    for name in scenes {
        rt.stop_scene(&name);
    }
    Ok(Outcome::Repeat)
}

/// Prints parts of the live state: `vars`, `scenes`, `actions`, `triggers`, `sprites`.
pub fn dump_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let mut sections = inv.list("list");
    if sections.is_empty() {
        sections = SECTIONS.iter().map(|section| (*section).to_string()).collect();
    }
    let snapshot = rt.snapshot();
    for section in sections {
        let lines = match section.to_ascii_lowercase().as_str() {
            "vars" | "variables" => Some(
                rt.vars()
                    .dump(&inv.scene)
                    .into_iter()
                    .map(|(name, value)| format!("{name} = {value}"))
                    .collect(),
            ),
            _ => snapshot.lines(&section),
        };
        let Some(lines) = lines else {
            rt.report(Diagnostic::script(format!("nothing to dump called '{section}'")).in_scene(&inv.scene));
            continue;
        };
        for line in lines {
            info!("dump: {line}");
            rt.stage_mut().apply(StageEffect::Echo(line));
        }
    }
    Ok(Outcome::Repeat)
}

pub fn exit_handler(rt: &mut Runtime, _inv: &Invocation) -> Result<Outcome> {
    rt.request_exit();
    Ok(Outcome::Complete)
}

#[cfg(test)]
mod tests {
    use crate::command::testing::runtime;
    use crate::input::FrameClock;
    use crate::scene::TOP_LEVEL;

    #[test]
    fn echo_prints_rest_of_line() {
        let (mut rt, journal) = runtime("begin\necho hi\n");
        assert!(!rt.dispatch("echo  several   words here", TOP_LEVEL));
        assert_eq!(journal.echoes(), vec!["several words here"]);
        rt.dispatch("log", TOP_LEVEL);
        assert_eq!(journal.echoes().last().map(String::as_str), Some(""));
    }

    #[test]
    fn make_accepts_every_connective() {
        let (mut rt, _) = runtime("begin\necho hi\n");
        rt.dispatch("make a = 1", TOP_LEVEL);
        rt.dispatch("let b be two words", TOP_LEVEL);
        rt.dispatch("make c as 3", TOP_LEVEL);
        rt.dispatch("let d 4", TOP_LEVEL);
        assert_eq!(rt.var("a", TOP_LEVEL), Some("1"));
        assert_eq!(rt.var("b", TOP_LEVEL), Some("two words"));
        assert_eq!(rt.var("c", TOP_LEVEL), Some("3"));
        assert_eq!(rt.var("d", TOP_LEVEL), Some("4"));
    }

    #[test]
    fn variables_made_in_a_scene_are_scoped() {
        let (mut rt, _) = runtime("begin\nstart intro\nscene intro\nbegin\nmake score = 5\nend scene\n");
        rt.start(FrameClock::from_millis(0));
        assert_eq!(rt.var("score", "intro"), Some("5"));
        assert_eq!(rt.var("score", TOP_LEVEL), None);
        assert_eq!(rt.vars().get_var("intro:score", TOP_LEVEL), Some("5"));
    }

    #[test]
    fn stop_without_names_stops_the_caller() {
        let (mut rt, _) = runtime("begin\nstart intro\nscene intro\nbegin\necho in\nend scene\n");
        rt.start(FrameClock::from_millis(0));
        assert!(rt.scene("intro").unwrap().enabled);
        rt.dispatch("stop", "intro");
        assert!(!rt.scene("intro").unwrap().enabled);
    }

    #[test]
    fn start_and_stop_of_unknown_scenes_are_reported() {
        let (mut rt, _) = runtime("begin\necho hi\n");
        rt.dispatch("start nowhere", TOP_LEVEL);
        rt.dispatch("stop nowhere", TOP_LEVEL);
        rt.dispatch("start", TOP_LEVEL);
        assert_eq!(rt.take_diagnostics().len(), 3);
    }

    #[test]
    fn dump_lists_variables() {
        let (mut rt, journal) = runtime("begin\necho hi\n");
        rt.set_var("colour", "blue", TOP_LEVEL);
        rt.dispatch("dump vars", TOP_LEVEL);
        assert!(journal.echoes().iter().any(|line| line == "colour = blue"));
        rt.dispatch("dump gizmos", TOP_LEVEL);
        assert_eq!(rt.take_diagnostics().len(), 1);
    }

    #[test]
    fn dump_in_a_scene_lists_only_its_variables() {
        let (mut rt, journal) = runtime("begin\necho hi\n");
        rt.set_var("colour", "blue", TOP_LEVEL);
        rt.set_var("score", "5", "intro");
        rt.dispatch("dump vars", "intro");
        assert_eq!(journal.echoes().last().map(String::as_str), Some("intro:score = 5"));
        assert!(!journal.echoes().iter().any(|line| line.starts_with("colour")));
    }

    #[test]
    fn exit_completes_and_flags_the_runtime() {
        let (mut rt, _) = runtime("begin\necho hi\n");
        assert!(rt.dispatch("quit", TOP_LEVEL));
        assert!(rt.exit_requested());
    }
}
