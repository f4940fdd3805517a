//! Script variables, `$name` expansion, `( ... )` evaluation and `if` guards.
//!
//! Variables are plain strings in one flat store. A variable set from inside a
//! scene is stored as `scene:name`; top-level variables use the bare name. A
//! leading `:` (`$:score`) always addresses the top level.

use std::collections::BTreeMap;

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::diagnostic::Diagnostic;
use crate::error::EvalError;
use crate::eval::{Evaluator, format_number};
use crate::input::WallClock;
use crate::scene::TOP_LEVEL;
use crate::stage::{SpriteProperty, Stage};

/// Placeholder substituted for names that could not be resolved.
pub const UNRESOLVED: &str = "???";

/// Result of expanding `$` references in a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub text: String,
    /// False when any reference was left unresolved.
    pub safe: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Storage key for `name` as seen from `scene`.
pub fn qualify(name: &str, scene: &str) -> String {
    if let Some(top) = name.strip_prefix(':') {
        top.to_string()
    } else if scene == TOP_LEVEL || name.contains(':') {
        name.to_string()
    } else {
        format!("{scene}:{name}")
    }
}

#[derive(Debug)]
pub struct VariableEnvironment {
    values: BTreeMap<String, String>,
    rng: StdRng,
    wall: WallClock,
    pointer: (f64, f64),
    display: (u32, u32),
    framerate: u32,
}

impl VariableEnvironment {
    /// A fresh store. `seed` makes `PERCENT`, `CHANCE`, `RANDOMX` and `RANDOMY` repeatable.
    pub fn new(display: (u32, u32), framerate: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut values = BTreeMap::new();
        for (name, value) in [
            ("KEY", "none"),
            ("LASTKEY", "none"),
            ("CLICKX", "0"),
            ("CLICKY", "0"),
            ("TRIGGER", "none"),
        ] {
            values.insert(name.to_string(), value.to_string());
        }
        Self {
            values,
            rng,
            wall: WallClock::default(),
            pointer: (0.0, 0.0),
            display,
            framerate,
        }
    }

    pub fn set_clock(&mut self, wall: WallClock) {
        self.wall = wall;
    }

    pub fn set_pointer(&mut self, pointer: (f64, f64)) {
        self.pointer = pointer;
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<String>, scene: &str) {
        self.values.insert(qualify(name, scene), value.into());
    }

    /// User variable lookup: scene-qualified first, then top level.
    pub fn get_var(&self, name: &str, scene: &str) -> Option<&str> {
        if let Some(top) = name.strip_prefix(':') {
            return self.values.get(top).map(String::as_str);
        }
        self.values
            .get(&qualify(name, scene))
            .or_else(|| self.values.get(name))
            .map(String::as_str)
    }

    /// Drop every variable owned by `scene`, returning how many went.
    pub fn purge(&mut self, scene: &str) -> usize {
        let prefix = format!("{scene}:");
        let before = self.values.len();
        self.values.retain(|key, _| !key.starts_with(&prefix));
        before - self.values.len()
    }

    /// Variables visible to `scene`. The top level sees everything.
    pub fn dump(&self, scene: &str) -> Vec<(String, String)> {
        let prefix = format!("{scene}:");
        self.values
            .iter()
            .filter(|(key, _)| scene == TOP_LEVEL || key.starts_with(&prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn builtin(&mut self, name: &str) -> Option<String> {
        let (width, height) = self.display;
        let value = match name {
            "SECOND" => self.wall.second.to_string(),
            "MINUTE" => self.wall.minute.to_string(),
            "HOUR" => self.wall.hour.to_string(),
            "DAY" => self.wall.day.to_string(),
            "MONTH" => self.wall.month.to_string(),
            "YEAR" => self.wall.year.to_string(),
            "WEEKDAY" => self.wall.weekday.to_string(),
            "MOUSEX" => format_number(self.pointer.0),
            "MOUSEY" => format_number(self.pointer.1),
            "FRAMERATE" => self.framerate.to_string(),
            "WIDTH" => width.to_string(),
            "HEIGHT" => height.to_string(),
            "CENTERX" | "CENTREX" => format_number(f64::from(width) / 2.0),
            "CENTERY" | "CENTREY" => format_number(f64::from(height) / 2.0),
            "PERCENT" => self.rng.random_range(0..=100).to_string(),
            "CHANCE" => self.rng.random::<f64>().to_string(),
            "RANDOMX" => self.rng.random_range(0..width.saturating_sub(1).max(1)).to_string(),
            "RANDOMY" => self.rng.random_range(0..height.saturating_sub(1).max(1)).to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// `tag.x`, `tag.y`, `tag.w`, `tag.h`, `tag.speed` for a placed sprite.
    fn sprite_value(name: &str, scene: &str, stage: &dyn Stage) -> Option<String> {
        let (tag, suffix) = name.rsplit_once('.')?;
        let property = SpriteProperty::from_suffix(suffix)?;
        let candidates = [qualify(tag, scene), tag.trim_start_matches(':').to_string()];
        candidates
            .iter()
            .find_map(|tag| stage.sprite_property(tag, property))
            .map(format_number)
    }

    fn lookup(&mut self, name: &str, scene: &str, stage: &dyn Stage) -> Option<String> {
        self.builtin(name)
            .or_else(|| Self::sprite_value(name, scene, stage))
            .or_else(|| self.get_var(name, scene).map(str::to_string))
    }

    /// `$file.png`: the name before the first dot, with the rest kept literal.
    fn lookup_head<'n>(&mut self, name: &'n str, scene: &str, stage: &dyn Stage) -> Option<(String, &'n str)> {
        let (head, _) = name.split_once('.')?;
        let value = self.lookup(head, scene, stage)?;
        Some((value, &name[head.len()..]))
    }

    /// Replace `$name` and `${name}` references.
    ///
    /// `\$` yields a literal dollar sign and a `$` not followed by a name is
    /// kept as is. An unbraced dotted name that is not a sprite property
    /// stops at its first dot. Unknown names become [`UNRESOLVED`] and mark
    /// the result unsafe.
    pub fn expand(&mut self, text: &str, scene: &str, stage: &dyn Stage) -> Expansion {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut diagnostics = Vec::new();
        let mut safe = true;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '\\' && chars.get(i + 1) == Some(&'$') {
                out.push('$');
                i += 2;
                continue;
            }
            if c != '$' {
                out.push(c);
                i += 1;
                continue;
            }
            let (name, next) = read_name(&chars, i + 1);
            if name.is_empty() {
                out.push('$');
                i += 1;
                continue;
            }
            let braced = chars.get(i + 1) == Some(&'{');
            let resolved = match self.lookup(&name, scene, stage) {
                Some(value) => Some(value),
                None if braced => None,
                None => self.lookup_head(&name, scene, stage).map(|(value, rest)| value + rest),
            };
            match resolved {
                Some(value) => out.push_str(&value),
                None => {
                    safe = false;
                    out.push_str(UNRESOLVED);
                    diagnostics.push(Diagnostic::reference(format!("variable '{name}' not found")).in_scene(scene));
                },
            }
            i = next;
        }
        Expansion {
            text: out,
            safe,
            diagnostics,
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Read a variable name starting at `start`, returning it and the index after it.
fn read_name(chars: &[char], start: usize) -> (String, usize) {
    if chars.get(start) == Some(&'{') {
        return match chars[start + 1..].iter().position(|&c| c == '}') {
            Some(len) => (chars[start + 1..start + 1 + len].iter().collect(), start + len + 2),
            None => (String::new(), start),
        };
    }
    let mut name = String::new();
    let mut i = start;
    while let Some(&c) = chars.get(i) {
        let joins = chars.get(i + 1).copied().is_some_and(is_name_char);
        let accepted = is_name_char(c) || (c == ':' && joins) || (c == '.' && joins && !name.is_empty());
        if !accepted {
            break;
        }
        name.push(c);
        i += 1;
    }
    (name, i)
}

/// Replace every balanced, unescaped `( ... )` span with its evaluated value.
///
/// `\(` and `\)` produce literal parentheses. An unclosed trailing span is left verbatim.
pub fn evaluate(text: &str, evaluator: &dyn Evaluator) -> Result<String, EvalError> {
    let mut out = String::with_capacity(text.len());
    let mut span = String::new();
    let mut depth = 0usize;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some('(' | ')')) {
            let escaped = chars.next().unwrap_or(c);
            if depth > 0 { span.push(escaped) } else { out.push(escaped) }
            continue;
        }
        match c {
            '(' => {
                depth += 1;
                span.push(c);
            },
            ')' if depth > 0 => {
                depth -= 1;
                span.push(c);
                if depth == 0 {
                    out.push_str(&evaluator.evaluate(&span)?);
                    span.clear();
                }
            },
            _ if depth > 0 => span.push(c),
            _ => out.push(c),
        }
    }
    if depth > 0 {
        warn!("unbalanced expression kept as text: {span}");
        out.push_str(&span);
    }
    Ok(out)
}

/// Truthiness of a guard word.
pub fn is_truthy(word: &str) -> bool {
    let lowered = word.to_lowercase();
    !(lowered.is_empty() || matches!(lowered.as_str(), "false" | "none" | "no") || lowered.starts_with('0'))
}

/// Apply a leading `if <condition> <rest>` guard.
///
/// Returns the text to run: `rest` when the condition holds, the whole line
/// when there is no guard, and `None` when the guard fails or guards nothing.
pub fn conditional(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let guarded = trimmed
        .get(..3)
        .is_some_and(|head| head.eq_ignore_ascii_case("if "));
    if !guarded {
        return Some(text);
    }
    let after_if = trimmed[3..].trim_start();
    let (condition, rest) = after_if.split_once(char::is_whitespace).unwrap_or((after_if, ""));
    let rest = rest.trim_start();
    (is_truthy(condition) && !rest.is_empty()).then_some(rest)
}
