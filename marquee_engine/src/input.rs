//! Per-frame inputs: the clocks and the pending user events.
//!
//! The host owns an [`InputState`] and hands it to every frame by `&mut`.
//! Triggers consume key presses and clicks from it, so once one trigger has
//! taken a press no later trigger sees it. Whatever is left over after the
//! frame stays with the host.

use serde::Serialize;
use time::OffsetDateTime;

/// Calendar and time-of-day fields of the real clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WallClock {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    /// Full English weekday name.
    pub weekday: &'static str,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl WallClock {
    /// Current local time, falling back to UTC when the local offset is unknown.
    pub fn now() -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self::from_datetime(now)
    }

    pub fn from_datetime(now: OffsetDateTime) -> Self {
        Self {
            year: now.year(),
            month: u8::from(now.month()),
            day: now.day(),
            weekday: weekday_name(now.weekday()),
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
        }
    }

    /// A fixed time of day on an arbitrary date, for deterministic runs.
    pub fn at(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year: 2000,
            month: 1,
            day: 1,
            weekday: "Saturday",
            hour,
            minute,
            second,
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::at(0, 0, 0)
    }
}

fn weekday_name(day: time::Weekday) -> &'static str {
    use time::Weekday::*;
    match day {
        Monday => "Monday",
        Tuesday => "Tuesday",
        Wednesday => "Wednesday",
        Thursday => "Thursday",
        Friday => "Friday",
        Saturday => "Saturday",
        Sunday => "Sunday",
    }
}

/// The two clocks a frame runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameClock {
    /// Milliseconds since the runtime started.
    pub elapsed_ms: u64,
    pub wall: WallClock,
}

impl FrameClock {
    pub fn new(elapsed_ms: u64, wall: WallClock) -> Self {
        Self { elapsed_ms, wall }
    }

    /// Elapsed time only, wall clock pinned to midnight.
    pub fn from_millis(elapsed_ms: u64) -> Self {
        Self::new(elapsed_ms, WallClock::default())
    }
}

/// A key press as reported by the host, e.g. `space` or `a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub x: f64,
    pub y: f64,
}

/// Pending user events plus the pointer position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    pending_key: Option<KeyPress>,
    pending_click: Option<Click>,
    key_released: bool,
    pub pointer: (f64, f64),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press_key(&mut self, name: impl Into<String>) {
        self.pending_key = Some(KeyPress { name: name.into() });
    }

    pub fn release_key(&mut self) {
        self.key_released = true;
    }

    pub fn click(&mut self, x: f64, y: f64) {
        self.pending_click = Some(Click { x, y });
        self.pointer = (x, y);
    }

    pub fn move_pointer(&mut self, x: f64, y: f64) {
        self.pointer = (x, y);
    }

    pub fn pending_key(&self) -> Option<&KeyPress> {
        self.pending_key.as_ref()
    }

    pub fn pending_click(&self) -> Option<Click> {
        self.pending_click
    }

    /// Take the pending press if it matches `filter` (any press when `None`).
    pub fn take_key_if(&mut self, filter: Option<&str>) -> Option<KeyPress> {
        let matched = match (&self.pending_key, filter) {
            (Some(_), None) => true,
            (Some(key), Some(wanted)) => key.name.eq_ignore_ascii_case(wanted),
            (None, _) => false,
        };
        if matched { self.pending_key.take() } else { None }
    }

    pub fn take_click(&mut self) -> Option<Click> {
        self.pending_click.take()
    }

    /// Report and clear a key release since the last frame.
    pub fn take_release(&mut self) -> bool {
        std::mem::take(&mut self.key_released)
    }
}
