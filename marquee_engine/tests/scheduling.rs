use marquee_engine as me;

use me::{FrameClock, HeadlessStage, InputState, Journal, Runtime, RuntimeConfig, TOP_LEVEL, parse_script};
use std::path::Path;

fn runtime(script: &str) -> (Runtime, Journal) {
    let stage = HeadlessStage::new();
    let journal = stage.journal();
    let config = RuntimeConfig {
        seed: Some(3),
        ..RuntimeConfig::default()
    };
    let mut runtime = Runtime::new(config, Box::new(stage));
    runtime.install(parse_script(script, Path::new(".")).expect("parse script"));
    runtime.start(FrameClock::from_millis(0));
    (runtime, journal)
}

/// Run frames every `step_ms` from `from_ms` up to and including `until_ms`.
fn run(runtime: &mut Runtime, input: &mut InputState, from_ms: u64, step_ms: u64, until_ms: u64) {
    let mut now = from_ms;
    while now <= until_ms {
        runtime.frame(FrameClock::from_millis(now), input);
        now += step_ms;
    }
}

#[test]
fn after_fires_once_past_its_delay() {
    let (mut rt, journal) = runtime("after 2 seconds\necho done\n");
    let mut input = InputState::new();
    rt.frame(FrameClock::from_millis(1000), &mut input);
    rt.frame(FrameClock::from_millis(2000), &mut input);
    assert!(journal.echoes().is_empty());
    rt.frame(FrameClock::from_millis(2100), &mut input);
    run(&mut rt, &mut input, 2500, 500, 6000);
    assert_eq!(journal.echoes(), vec!["done"]);
}

#[test]
fn every_fires_about_once_per_period() {
    let (mut rt, journal) = runtime("every 1 second\necho tick\n");
    let mut input = InputState::new();
    run(&mut rt, &mut input, 100, 100, 5000);
    let ticks = journal.echoes().len();
    assert!((4..=6).contains(&ticks), "fired {ticks} times");
}

#[test]
fn stopping_the_running_scene_skips_its_later_actions() {
    let (mut rt, journal) = runtime(
        "begin\nstart show\n\
         scene show\nafter 0 seconds\necho one\nstop\necho two\nend scene\n",
    );
    rt.frame(FrameClock::from_millis(10), &mut InputState::new());
    assert_eq!(journal.echoes(), vec!["one"]);
    assert!(!rt.scene("show").expect("scene").enabled);
}

#[test]
fn a_scene_stopped_earlier_in_the_frame_does_not_run() {
    let (mut rt, journal) = runtime(
        "begin\nstart first second\n\
         scene first\nafter 0 seconds\nstop second\nend scene\n\
         scene second\nafter 0 seconds\necho second ran\nend scene\n",
    );
    let mut input = InputState::new();
    run(&mut rt, &mut input, 10, 10, 100);
    assert!(journal.echoes().is_empty());
}

#[test]
fn a_key_press_is_consumed_by_one_trigger() {
    let (mut rt, journal) = runtime(
        "begin\nstart left right\n\
         scene left\non key space\necho left got $KEY\nend scene\n\
         scene right\non key space\necho right got it\nend scene\n",
    );
    let mut input = InputState::new();
    input.press_key("space");
    rt.frame(FrameClock::from_millis(10), &mut input);
    rt.frame(FrameClock::from_millis(20), &mut input);
    assert_eq!(journal.echoes(), vec!["left got space"]);
    assert_eq!(rt.var("LASTKEY", TOP_LEVEL), Some("space"));
}

#[test]
fn clicks_publish_their_position() {
    let (mut rt, journal) = runtime("on click\necho clicked at $CLICKX,$CLICKY\n");
    let mut input = InputState::new();
    rt.frame(FrameClock::from_millis(10), &mut input);
    input.click(12.0, 34.0);
    rt.frame(FrameClock::from_millis(20), &mut input);
    rt.frame(FrameClock::from_millis(30), &mut input);
    assert_eq!(journal.echoes(), vec!["clicked at 12,34"]);
}

#[test]
fn when_fires_on_every_frame_it_holds() {
    let (mut rt, journal) = runtime("when $go\necho going\n");
    let mut input = InputState::new();
    rt.frame(FrameClock::from_millis(10), &mut input);
    assert!(journal.echoes().is_empty());
    assert!(!rt.take_diagnostics().is_empty());
    rt.set_var("go", "yes", TOP_LEVEL);
    rt.frame(FrameClock::from_millis(20), &mut input);
    rt.frame(FrameClock::from_millis(30), &mut input);
    rt.set_var("go", "no", TOP_LEVEL);
    rt.frame(FrameClock::from_millis(40), &mut input);
    assert_eq!(journal.echoes().len(), 2);
}

#[test]
fn while_evaluates_its_whole_expression() {
    let (mut rt, journal) = runtime("while $count < 3\necho count is $count\nmake count = ($count + 1)\n");
    rt.set_var("count", "0", TOP_LEVEL);
    let mut input = InputState::new();
    run(&mut rt, &mut input, 10, 10, 100);
    assert_eq!(journal.echoes(), vec!["count is 0", "count is 1", "count is 2"]);
}

#[test]
fn completed_actions_rerun_after_a_restart() {
    let (mut rt, journal) = runtime(
        "begin\nstart intro\n\
         scene intro\nevery 0 seconds\nmake x = 1\nquit\nend scene\n",
    );
    let mut input = InputState::new();
    rt.frame(FrameClock::from_millis(10), &mut input);
    assert!(rt.exit_requested());
    let intro = rt.scene("intro").expect("scene");
    assert!(intro.actions[1].complete);
    assert!(!intro.actions[0].complete);
    assert!(rt.start_scene("intro"));
    assert!(!rt.scene("intro").expect("scene").actions[1].complete);
    assert!(journal.is_empty());
}

#[test]
fn begin_mixed_with_another_trigger_waits_for_it() {
    let (mut rt, journal) = runtime("begin\necho at start\nbegin\nafter 1 second\necho later\n");
    assert_eq!(journal.echoes(), vec!["at start"]);
    run(&mut rt, &mut InputState::new(), 500, 500, 5000);
    assert_eq!(journal.echoes(), vec!["at start", "later"]);
}

#[test]
fn a_one_shot_in_a_mixed_group_dispatches_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("beep.wav"), b"RIFF").expect("write sound");
    let stage = HeadlessStage::new();
    let journal = stage.journal();
    let mut rt = Runtime::new(RuntimeConfig::default(), Box::new(stage));
    let script = "begin\nload beep.wav\nafter 60 seconds\nbegin\nafter 1 second\nplay beep\n";
    rt.install(parse_script(script, dir.path()).expect("parse script"));
    rt.start(FrameClock::from_millis(0));
    let plays = |journal: &Journal| {
        journal
            .effects()
            .iter()
            .filter(|effect| matches!(effect, me::StageEffect::PlaySound { .. }))
            .count()
    };
    assert_eq!(plays(&journal), 0);
    run(&mut rt, &mut InputState::new(), 500, 500, 3000);
    assert_eq!(plays(&journal), 1);
}
