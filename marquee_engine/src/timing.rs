//! Natural-language durations, times of day, and wall-clock patterns.
//!
//! Durations read the way people write them in scripts: `2 seconds`,
//! `one and a half minutes`, `half a minute`, `1 min 30 s`. The word `same`
//! repeats whatever duration was parsed last.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use serde::Serialize;

use crate::input::WallClock;

lazy_static! {
    static ref NUMBER_WORDS: HashMap<&'static str, f64> = HashMap::from([
        ("zero", 0.0),
        ("one", 1.0),
        ("two", 2.0),
        ("three", 3.0),
        ("four", 4.0),
        ("five", 5.0),
        ("six", 6.0),
        ("seven", 7.0),
        ("eight", 8.0),
        ("nine", 9.0),
        ("ten", 10.0),
        ("eleven", 11.0),
        ("twelve", 12.0),
        ("thirteen", 13.0),
        ("fourteen", 14.0),
        ("fifteen", 15.0),
        ("sixteen", 16.0),
        ("seventeen", 17.0),
        ("eighteen", 18.0),
        ("nineteen", 19.0),
        ("twenty", 20.0),
        ("thirty", 30.0),
        ("forty", 40.0),
        ("fifty", 50.0),
        ("sixty", 60.0),
        ("a", 1.0),
        ("an", 1.0),
    ]);
    static ref UNIT_WORDS: HashMap<&'static str, f64> = HashMap::from([
        ("s", 1.0),
        ("secs", 1.0),
        ("seconds", 1.0),
        ("m", 60.0),
        ("mins", 60.0),
        ("minutes", 60.0),
        ("h", 3600.0),
        ("hrs", 3600.0),
        ("hours", 3600.0),
    ]);
    static ref FRACTION_WORDS: HashMap<&'static str, f64> =
        HashMap::from([("half", 0.5), ("quarters", 0.25), ("thirds", 1.0 / 3.0)]);
    static ref TIME_SEPARATOR: Regex = Regex::new(r"\s*:\s*").expect("static regex");
}

/// Look a word up directly, then with a trailing `s` added (`min` -> `mins`).
fn lookup(table: &HashMap<&'static str, f64>, word: &str, plurals: bool) -> Option<f64> {
    table
        .get(word)
        .copied()
        .or_else(|| plurals.then(|| table.get(format!("{word}s").as_str()).copied()).flatten())
}

pub fn number_word(word: &str) -> Option<f64> {
    word.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .or_else(|| lookup(&NUMBER_WORDS, &word.to_lowercase(), false))
}

pub fn unit_word(word: &str) -> Option<f64> {
    lookup(&UNIT_WORDS, &word.to_lowercase(), true)
}

pub fn fraction_word(word: &str) -> Option<f64> {
    lookup(&FRACTION_WORDS, &word.to_lowercase(), true)
}

/// Duration parser that remembers the previous result for `same`.
#[derive(Debug, Clone, Default)]
pub struct DurationParser {
    previous: Option<f64>,
}

impl DurationParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a duration phrase into seconds.
    ///
    /// Unknown unit words are reported and counted as seconds. A number with no
    /// unit at the end of the phrase is also taken as seconds.
    pub fn parse(&mut self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        if words.contains(&"same") {
            return self.previous.unwrap_or(0.0);
        }

        let mut total = 0.0;
        let mut pending: Option<f64> = None;
        let mut scale = 1.0;
        let mut last_unit = 1.0;
        let mut joined = false;
        let mut fractional = false;
        for word in words {
            match pending {
                None => {
                    if matches!(word, "and" | "&" | "of") {
                        continue;
                    }
                    if let Some(fraction) = fraction_word(word) {
                        // "a minute and half" applies to the unit just read
                        if total > 0.0 && scale == 1.0 {
                            total += fraction * last_unit;
                        } else {
                            scale *= fraction;
                        }
                        continue;
                    }
                    pending = Some(number_word(word).unwrap_or(1.0) * scale);
                    scale = 1.0;
                },
                Some(number) => {
                    if let Some(fraction) = fraction_word(word) {
                        pending = Some(if joined { number + fraction } else { number * fraction });
                        fractional = !joined;
                        continue;
                    }
                    if matches!(word, "and" | "&") {
                        joined = true;
                        continue;
                    }
                    if matches!(word, "a" | "an" | "of") {
                        continue;
                    }
                    let unit = unit_word(word).unwrap_or_else(|| {
                        warn!("expected a time unit but found '{word}', assuming seconds");
                        1.0
                    });
                    total += number * unit;
                    last_unit = unit;
                    pending = None;
                    joined = false;
                    fractional = false;
                },
            }
        }
        match pending {
            // "a minute and a half": the trailing fraction belongs to the last unit
            Some(number) if fractional && total > 0.0 => total += number * last_unit,
            Some(number) => total += number,
            None => {},
        }
        self.previous = Some(total);
        total
    }
}

/// An absolute wall-clock time used by `at` triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    /// Parse `hh`, `hh:mm` or `hh:mm:ss`. Extra fields are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let fields: Vec<u8> = TIME_SEPARATOR
            .split(text.trim())
            .take(3)
            .map(|field| field.trim().parse::<u8>().ok())
            .collect::<Option<Vec<u8>>>()?;
        let time = TimeOfDay {
            hour: *fields.first()?,
            minute: fields.get(1).copied().unwrap_or(0),
            second: fields.get(2).copied().unwrap_or(0),
        };
        (time.hour < 24 && time.minute < 60 && time.second < 60).then_some(time)
    }

    /// True once the wall clock is in the target minute at or past the target second.
    pub fn reached(&self, wall: &WallClock) -> bool {
        wall.hour == self.hour && wall.minute == self.minute && wall.second >= self.second
    }
}

/// One field of a [`TimePattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Field {
    Any,
    Exact(u8),
}

impl Field {
    fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "*" => Some(Field::Any),
            other => other.parse::<u8>().ok().map(Field::Exact),
        }
    }

    fn accepts(self, value: u8) -> bool {
        match self {
            Field::Any => true,
            Field::Exact(wanted) => wanted == value,
        }
    }
}

/// A recurring wall-clock pattern used by `each` triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimePattern {
    pub hour: Field,
    pub minute: Field,
    pub second: Field,
}

impl TimePattern {
    /// Parse `ss`, `mm:ss` or `hh:mm:ss`, with `*` as a wildcard field.
    pub fn parse(text: &str) -> Option<Self> {
        let fields: Vec<&str> = TIME_SEPARATOR.split(text.trim()).collect();
        if fields.len() > 3 {
            warn!("unexpected time pattern '{text}', using the last three fields");
        }
        let mut parsed = fields
            .iter()
            .rev()
            .take(3)
            .map(|field| Field::parse(field))
            .collect::<Option<Vec<Field>>>()?
            .into_iter();
        Some(TimePattern {
            second: parsed.next().unwrap_or(Field::Any),
            minute: parsed.next().unwrap_or(Field::Any),
            hour: parsed.next().unwrap_or(Field::Any),
        })
    }

    pub fn matches(&self, wall: &WallClock) -> bool {
        self.hour.accepts(wall.hour) && self.minute.accepts(wall.minute) && self.second.accepts(wall.second)
    }
}

/// Pull a pixels-per-second figure out of text like `100 pixels per second`.
pub fn speed_from_text(text: &str) -> Option<f64> {
    text.split_whitespace().find_map(number_word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_worded_durations() {
        let mut parser = DurationParser::new();
        assert_eq!(parser.parse("2 seconds"), 2.0);
        assert_eq!(parser.parse("two minutes"), 120.0);
        assert_eq!(parser.parse("1 min 30 s"), 90.0);
        assert_eq!(parser.parse("1.5"), 1.5);
        assert_eq!(parser.parse("an hour"), 3600.0);
    }

    #[test]
    fn fractions_combine_with_units() {
        let mut parser = DurationParser::new();
        assert_eq!(parser.parse("half a minute"), 30.0);
        assert_eq!(parser.parse("a minute and a half"), 90.0);
        assert_eq!(parser.parse("one and a half minutes"), 90.0);
    }

    #[test]
    fn same_repeats_previous() {
        let mut parser = DurationParser::new();
        assert_eq!(parser.parse("same"), 0.0);
        parser.parse("3 secs");
        assert_eq!(parser.parse("the same"), 3.0);
    }

    #[test]
    fn time_of_day_reads_all_fields() {
        assert_eq!(
            TimeOfDay::parse("9:30"),
            Some(TimeOfDay {
                hour: 9,
                minute: 30,
                second: 0
            })
        );
        assert_eq!(TimeOfDay::parse("13 : 05 : 10").map(|t| t.second), Some(10));
        assert_eq!(TimeOfDay::parse("noon"), None);
        assert_eq!(TimeOfDay::parse("25"), None);
    }

    #[test]
    fn time_of_day_reached_within_minute() {
        let target = TimeOfDay::parse("10:15:30").unwrap();
        assert!(!target.reached(&WallClock::at(10, 15, 29)));
        assert!(target.reached(&WallClock::at(10, 15, 45)));
        assert!(!target.reached(&WallClock::at(10, 16, 31)));
    }

    #[test]
    fn time_patterns_with_wildcards() {
        let every_minute = TimePattern::parse("0").unwrap();
        assert!(every_minute.matches(&WallClock::at(3, 44, 0)));
        assert!(!every_minute.matches(&WallClock::at(3, 44, 1)));

        let half_past = TimePattern::parse("*:30:*").unwrap();
        assert!(half_past.matches(&WallClock::at(17, 30, 12)));
        assert!(!half_past.matches(&WallClock::at(17, 31, 12)));
    }

    #[test]
    fn speed_takes_first_number() {
        assert_eq!(speed_from_text("100 pixels per second"), Some(100.0));
        assert_eq!(speed_from_text("a crawl"), Some(1.0));
        assert_eq!(speed_from_text(""), None);
    }
}
