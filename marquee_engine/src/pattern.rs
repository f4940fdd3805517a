//! Declarative word-pattern matching for commands and trigger declarations.
//!
//! A pattern is a whitespace-separated list of `<marker>/<value>` tokens. The
//! lone `:` token splits the pattern into a *head*, which decides whether a
//! line is this command at all, and a *tail* holding the arguments.
//!
//! | marker | token          | behaviour |
//! |--------|----------------|-----------|
//! | `+`    | required       | binds the next word, diagnostic when input ran out |
//! | `?`    | optional       | binds the next word when there is one |
//! | `=`    | literal        | word must equal the value |
//! | `\|`   | choice         | word must equal one of `a\|b\|c`, bound under `a` |
//! | `~`    | flag           | consumes the word only if it matches, arms the next `&` |
//! | `&`    | flag-bound     | required if the preceding flag matched, else absent |
//! | `*`    | rest string    | all remaining words joined by single spaces |
//! | `>`    | rest list      | all remaining words as a list |
//! | `#`    | number         | binds the next word only if it parses as a number |
//!
//! Mismatches in the head are silent (the line is simply some other command),
//! mismatches in the tail keep the match valid but produce a diagnostic.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use variantly::Variantly;

use crate::diagnostic::Diagnostic;
use crate::error::PatternError;

/// One compiled pattern token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    Required(String),
    Optional(String),
    Literal(String),
    Choice(Vec<String>),
    Flag(String),
    FlagBound(String),
    RestString(String),
    RestList(String),
    Number(String),
    Divider,
}

impl PatternToken {
    fn is_rest(&self) -> bool {
        matches!(self, PatternToken::RestString(_) | PatternToken::RestList(_))
    }
}

impl FromStr for PatternToken {
    type Err = PatternError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token == ":" {
            return Ok(PatternToken::Divider);
        }
        let (marker, value) = token
            .split_once('/')
            .filter(|(marker, value)| !marker.is_empty() && !value.is_empty())
            .ok_or_else(|| PatternError::MalformedToken(token.to_string()))?;
        let value = value.to_string();
        let parsed = match marker {
            "+" => PatternToken::Required(value),
            "?" => PatternToken::Optional(value),
            "=" => PatternToken::Literal(value),
            "|" => PatternToken::Choice(value.split('|').map(str::to_string).collect()),
            "~" => PatternToken::Flag(value),
            "&" => PatternToken::FlagBound(value),
            "*" => PatternToken::RestString(value),
            ">" => PatternToken::RestList(value),
            "#" => PatternToken::Number(value),
            other => {
                return Err(PatternError::UnknownMarker {
                    marker: other.to_string(),
                    token: token.to_string(),
                });
            },
        };
        Ok(parsed)
    }
}

/// A compiled pattern ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpec {
    tokens: Vec<PatternToken>,
    ignore_case: bool,
    source: String,
}

impl PatternSpec {
    /// Compile pattern text into a spec.
    ///
    /// # Errors
    /// Returns a [`PatternError`] for empty patterns, tokens that are not of the
    /// form `<marker>/<value>`, unknown markers, or rest tokens that are not last.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let tokens = text
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<PatternToken>, _>>()?;
        if tokens.iter().all(|token| *token == PatternToken::Divider) {
            return Err(PatternError::Empty);
        }
        // a rest token swallows everything, so only a trailing divider may follow it
        if let Some(pos) = tokens.iter().position(PatternToken::is_rest) {
            if tokens[pos + 1..].iter().any(|token| *token != PatternToken::Divider) {
                let offender = text.split_whitespace().nth(pos).unwrap_or_default();
                return Err(PatternError::RestNotLast(offender.to_string()));
            }
        }
        Ok(Self {
            tokens,
            ignore_case: false,
            source: text.to_string(),
        })
    }

    /// Literal, choice and flag comparisons ignore ASCII case. Bound values stay verbatim.
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn same(&self, word: &str, literal: &str) -> bool {
        if self.ignore_case {
            word.eq_ignore_ascii_case(literal)
        } else {
            word == literal
        }
    }

    /// Match a tokenized line against this pattern.
    pub fn matches<S: AsRef<str>>(&self, words: &[S]) -> MatchResult {
        let mut result = MatchResult::default();
        if words.is_empty() {
            return result;
        }
        let mut pos = 0;
        let mut in_head = true;
        let mut flag_armed = false;

        for token in &self.tokens {
            if *token == PatternToken::Divider {
                in_head = false;
                continue;
            }
            let armed = std::mem::take(&mut flag_armed);
            let word = words.get(pos).map(AsRef::as_ref);
            let consumed = match token {
                PatternToken::Divider => false,
                PatternToken::Required(name) => {
                    if word.is_none() {
                        result.diagnose(format!("expected a value for '{name}'"));
                    }
                    result.bind_word(name, word)
                },
                PatternToken::Optional(name) => result.bind_word(name, word),
                PatternToken::FlagBound(name) => {
                    if !armed {
                        result.bindings.insert(name.clone(), Binding::Absent);
                        false
                    } else {
                        if word.is_none() {
                            result.diagnose(format!("expected a value for '{name}'"));
                        }
                        result.bind_word(name, word)
                    }
                },
                PatternToken::Literal(literal) => match word {
                    Some(word) if self.same(word, literal) => true,
                    Some(word) if !in_head => {
                        result.diagnose(format!("expected '{literal}' but found '{word}'"));
                        true
                    },
                    None if !in_head => {
                        result.diagnose(format!("expected the word '{literal}'"));
                        false
                    },
                    _ => return MatchResult::default(),
                },
                PatternToken::Choice(choices) => {
                    let canonical = choices[0].clone();
                    match word {
                        Some(word) => {
                            if let Some(choice) = choices.iter().find(|choice| self.same(word, choice)) {
                                result.bindings.insert(canonical, Binding::Text(choice.clone()));
                            } else if in_head {
                                return MatchResult::default();
                            } else {
                                result.diagnose(format!("expected one of {} but found '{word}'", choices.join(", ")));
                                result.bindings.insert(canonical, Binding::Absent);
                            }
                            true
                        },
                        None if in_head => return MatchResult::default(),
                        None => {
                            result.bindings.insert(canonical, Binding::Absent);
                            false
                        },
                    }
                },
                PatternToken::Flag(literal) => match word {
                    Some(word) if self.same(word, literal) => {
                        flag_armed = true;
                        true
                    },
                    _ => false,
                },
                PatternToken::Number(name) => match word {
                    Some(word) if word.parse::<f64>().is_ok() => result.bind_word(name, Some(word)),
                    _ => {
                        result.bindings.insert(name.clone(), Binding::Absent);
                        false
                    },
                },
                PatternToken::RestString(name) => {
                    let rest = words[pos.min(words.len())..]
                        .iter()
                        .map(AsRef::as_ref)
                        .collect::<Vec<&str>>()
                        .join(" ");
                    let binding = if rest.is_empty() {
                        Binding::Absent
                    } else {
                        Binding::Text(rest)
                    };
                    result.bindings.insert(name.clone(), binding);
                    false
                },
                PatternToken::RestList(name) => {
                    let rest = words[pos.min(words.len())..]
                        .iter()
                        .map(|word| word.as_ref().to_string())
                        .collect();
                    result.bindings.insert(name.clone(), Binding::List(rest));
                    false
                },
            };
            if consumed {
                if in_head {
                    if let Some(word) = word {
                        result.head_words.push(word.to_string());
                    }
                }
                pos += 1;
            }
        }
        result.valid = true;
        result
    }
}

impl FromStr for PatternSpec {
    type Err = PatternError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        PatternSpec::parse(text)
    }
}

impl fmt::Display for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// The value bound to a pattern name.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum Binding {
    Absent,
    Text(String),
    List(Vec<String>),
}

/// Outcome of matching one line against one pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub valid: bool,
    /// Words consumed before the divider, in order.
    pub head_words: Vec<String>,
    pub bindings: HashMap<String, Binding>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MatchResult {
    fn bind_word(&mut self, name: &str, word: Option<&str>) -> bool {
        let binding = word.map_or(Binding::Absent, |word| Binding::Text(word.to_string()));
        self.bindings.insert(name.to_string(), binding);
        word.is_some()
    }

    fn diagnose(&mut self, message: String) {
        self.diagnostics.push(Diagnostic::grammar(message));
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Bound text, if the name was bound to a word or rest string.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.bindings.get(name) {
            Some(Binding::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Bound list. A single bound word reads as a one-element list.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.bindings.get(name) {
            Some(Binding::List(items)) => items.clone(),
            Some(Binding::Text(text)) => vec![text.clone()],
            _ => Vec::new(),
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.text(name).and_then(|text| text.parse::<f64>().ok())
    }

    pub fn has_head_word(&self, word: &str) -> bool {
        self.head_words.iter().any(|head| head.eq_ignore_ascii_case(word))
    }
}

/// Split a line into the words pattern matching works on.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(text: &str) -> PatternSpec {
        PatternSpec::parse(text).unwrap()
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert_eq!(PatternSpec::parse(""), Err(PatternError::Empty));
        assert!(matches!(PatternSpec::parse("=echo"), Err(PatternError::MalformedToken(_))));
        assert!(matches!(PatternSpec::parse("@/x"), Err(PatternError::UnknownMarker { .. })));
        assert!(matches!(PatternSpec::parse("=/a */rest +/b"), Err(PatternError::RestNotLast(_))));
        assert!(PatternSpec::parse("|/exit|quit :").is_ok());
    }

    #[test]
    fn head_mismatch_is_silent_and_invalid() {
        let result = spec("=/move : +/tag").matches(&["remove", "cat"]);
        assert!(!result.valid);
        assert!(result.diagnostics.is_empty());
        assert!(result.bindings.is_empty());
    }

    #[test]
    fn empty_input_never_matches() {
        let empty: [&str; 0] = [];
        assert!(!spec("|/exit|quit :").matches(&empty).valid);
    }

    #[test]
    fn tail_literal_mismatch_is_loud_but_valid() {
        let result = spec("=/add : =/to +/group").matches(&["add", "into", "band"]);
        assert!(result.valid);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.text("group"), Some("band"));
    }

    #[test]
    fn choice_binds_canonical_name_and_records_head_words() {
        let result = spec("|/remove|erase : >/tags").matches(&["erase", "a", "b"]);
        assert!(result.valid);
        assert_eq!(result.text("remove"), Some("erase"));
        assert_eq!(result.head_words, vec!["erase"]);
        assert_eq!(result.list("tags"), vec!["a", "b"]);
        assert!(result.has_head_word("erase"));
    }

    #[test]
    fn flag_arms_following_bound_token() {
        let load = spec("=/load : +/filename ~/named &/tag");
        let named = load.matches(&["load", "cat.png", "named", "kitty"]);
        assert_eq!(named.text("tag"), Some("kitty"));

        let plain = load.matches(&["load", "cat.png"]);
        assert!(plain.valid);
        assert_eq!(plain.get("tag"), Some(&Binding::Absent));
        assert!(plain.diagnostics.is_empty());
    }

    #[test]
    fn missing_required_value_is_diagnosed() {
        let result = spec("=/window : +/stag +/ix").matches(&["window", "sky"]);
        assert!(result.valid);
        assert_eq!(result.get("ix"), Some(&Binding::Absent));
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn rest_tokens_collect_the_remainder() {
        let echo = spec("|/echo|log : */rest");
        assert_eq!(echo.matches(&["echo", "hello", "there"]).text("rest"), Some("hello there"));
        assert!(echo.matches(&["echo"]).get("rest").unwrap().is_absent());

        let stop = spec("|/stop|disable : >/list").matches(&["stop"]);
        assert_eq!(stop.get("list"), Some(&Binding::List(Vec::new())));
    }

    #[test]
    fn numeric_optional_is_zero_width_on_words() {
        let advance = spec("|/advance|reverse : +/tag |/by|to #/num ~/frames");
        let counted = advance.matches(&["advance", "cat", "by", "3", "frames"]);
        assert_eq!(counted.number("num"), Some(3.0));

        let uncounted = advance.matches(&["advance", "cat", "by", "frames"]);
        assert!(uncounted.valid);
        assert_eq!(uncounted.get("num"), Some(&Binding::Absent));
        assert!(uncounted.diagnostics.is_empty());
    }

    #[test]
    fn case_insensitive_specs_keep_bound_values_verbatim() {
        let after = spec("=/after : */rest").case_insensitive();
        let result = after.matches(&["After", "Two", "Seconds"]);
        assert!(result.valid);
        assert_eq!(result.text("rest"), Some("Two Seconds"));
        assert!(!spec("=/after : */rest").matches(&["After", "2"]).valid);
    }

    #[test]
    fn matching_is_repeatable() {
        let move_cmd = spec("=/move : +/tag |/to|by +/x +/y");
        let words = tokenize("move cat to 10 20");
        assert_eq!(move_cmd.matches(&words), move_cmd.matches(&words));
    }
}
