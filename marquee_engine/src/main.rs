#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Marquee **
//! Headless runner for scheduled presentation scripts

use marquee_engine::config::CONFIG_FILE;
use marquee_engine::style::ConsoleStyle;
use marquee_engine::{FrameClock, HeadlessStage, InputState, Runtime, WallClock, load_config, load_script};

use anyhow::{Context, Result};
use log::info;

use std::env;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    env_logger::init();
    let config = load_config(Path::new(CONFIG_FILE)).with_env_overrides();
    let script_path = env::args().nth(1).map_or_else(|| config.script_path(), PathBuf::from);

    info!("Start: loading script '{}'...", script_path.display());
    let script = load_script(&script_path).with_context(|| format!("while loading '{}'", script_path.display()))?;

    let frame_length = Duration::from_secs_f64(1.0 / f64::from(config.framerate.max(1)));
    let max_frames = config.max_frames;
    let mut runtime = Runtime::new(config, Box::new(HeadlessStage::new().with_console_echo()));
    runtime.install(script);

    println!("{}", format!("MARQUEE {}", marquee_engine::MARQUEE_VERSION).heading_style());
    let started = Instant::now();
    runtime.start(FrameClock::new(0, WallClock::now()));
    report(&mut runtime);

    let mut input = InputState::new();
    while !runtime.exit_requested() && max_frames.is_none_or(|max| runtime.frames() < max) {
        let frame_start = Instant::now();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        runtime.frame(FrameClock::new(elapsed_ms, WallClock::now()), &mut input);
        report(&mut runtime);
        if let Some(rest) = frame_length.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    info!("show ended after {} frame(s)", runtime.frames());
    for line in runtime.snapshot().lines("scenes").unwrap_or_default() {
        println!("{}", line.dump_style());
    }
    Ok(())
}

/// Print and drop the diagnostics gathered since the last call.
fn report(runtime: &mut Runtime) {
    for diagnostic in runtime.take_diagnostics() {
        eprintln!("{}", diagnostic.to_string().diagnostic_style());
    }
}
