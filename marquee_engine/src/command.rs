//! Command registry and the built-in command set.
//!
//! Commands are tried in registration order and the first whose pattern head
//! matches runs; nothing after it is considered. Order therefore matters:
//! `move window` must come before `move`, `put ... as` before `put x = 1`.

pub mod control;
pub mod resources;
pub mod sprites;

use anyhow::{Result, anyhow};
use log::error;

use crate::error::PatternError;
use crate::pattern::{MatchResult, PatternSpec};
use crate::runtime::Runtime;

/// Whether an action is finished after its command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Run again the next time the action's trigger fires.
    Repeat,
    /// Never run this action again until its scene restarts.
    Complete,
}

/// A matched command line handed to its handler.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub scene: String,
    pub line: String,
    pub matched: MatchResult,
}

impl Invocation {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.matched.text(name)
    }

    pub fn list(&self, name: &str) -> Vec<String> {
        self.matched.list(name)
    }

    pub fn has_head_word(&self, word: &str) -> bool {
        self.matched.has_head_word(word)
    }

    /// A bound number, or an error naming what was expected.
    pub fn number(&self, name: &str, what: &str) -> Result<f64> {
        match self.text(name) {
            Some(text) => text
                .parse::<f64>()
                .map_err(|_| anyhow!("expected {what} but found '{text}'")),
            None => Err(anyhow!("expected {what}")),
        }
    }

    /// A bound number when present and numeric.
    pub fn optional_number(&self, name: &str) -> Option<f64> {
        self.matched.number(name)
    }

    /// A bound word that must be present.
    pub fn required(&self, name: &str, what: &str) -> Result<&str> {
        self.text(name).ok_or_else(|| anyhow!("expected {what}"))
    }
}

pub type Handler = fn(&mut Runtime, &Invocation) -> Result<Outcome>;

pub struct CommandSpec {
    pub id: &'static str,
    pub pattern: PatternSpec,
    pub handler: Handler,
    pub help: &'static str,
}

/// Built-in commands in dispatch order: (id, pattern, handler, help).
const BUILTIN_COMMANDS: &[(&str, &str, Handler, &str)] = &[
    ("echo", "|/echo|log : */rest", control::echo_handler, "echo <text>: print text"),
    ("from", "|/from|using|with : */rest", resources::from_handler, "from <folder>: load resources from a sub-folder"),
    (
        "load",
        "|/load|upload : +/filename ~/named &/tag ~/split ?/cols ?/by ?/rows",
        resources::load_handler,
        "load <file> [named <tag>] [split <cols> by <rows>]: register an image, movie or sound",
    ),
    ("unload", "|/unload|purge : >/tags", resources::unload_handler, "unload <tags...>: forget resources"),
    ("play", "=/play : >/tags", resources::play_handler, "play <tags...>: play sounds"),
    (
        "volume",
        "~/set |/volume|vol : ~/of +/tag ~/to +/value",
        resources::volume_handler,
        "set volume of <tag> to <0-100>",
    ),
    (
        "place",
        "=/place : +/itag ~/named &/stag ~/at +/x +/y ~/depth &/z |/size|scale ?/w ?/h",
        sprites::place_handler,
        "place <image> [named <sprite>] at <x> <y> [depth <z>] [size <w> <h> | scale <x%> <y%>]",
    ),
    (
        "put",
        "=/put : +/itag ~/named &/stag ~/as |/background|top|bottom|left|right|ground|sky ~/depth &/depth",
        sprites::put_handler,
        "put <image> [named <sprite>] as <background|top|bottom|left|right|ground|sky>",
    ),
    (
        "window",
        "=/window : +/stag ~/at +/ix +/iy +/iw +/ih",
        sprites::window_handler,
        "window <sprite> at <x> <y> <w> <h>: show part of an image",
    ),
    (
        "zoom_window",
        "=/zoom =/window : +/tag ~/to +/iw +/ih ~/in */time",
        sprites::zoom_window_handler,
        "zoom window <sprite> to <w> <h> [in <time>]",
    ),
    (
        "move_window",
        "=/move =/window : ~/of +/tag ~/to +/ix +/iy ~/in */time",
        sprites::move_window_handler,
        "move window of <sprite> to <x> <y> [in <time>]",
    ),
    ("remove", "|/remove|erase : >/tags", sprites::remove_handler, "remove <sprites...>"),
    (
        "move",
        "=/move : +/tag |/to|by +/x +/y |/in|at */rest",
        sprites::move_handler,
        "move <sprite> to|by <x> <y> [in <time> | at <speed>]",
    ),
    (
        "speed",
        "~/set =/speed ~/of : +/tag ~/to +/speed ~/in */time",
        sprites::speed_handler,
        "set speed of <sprite> to <speed> [in <time>]",
    ),
    (
        "blur",
        "~/set =/blur ~/of : +/tag ~/to +/blur ~/in */time",
        sprites::blur_handler,
        "set blur of <sprite> to <amount> [in <time>]",
    ),
    (
        "size",
        "|/size|resize : +/tag ~/to +/width +/height ~/in */time",
        sprites::size_handler,
        "size <sprite> to <w> <h> [in <time>]",
    ),
    (
        "scale",
        "|/scale|rescale : +/tag |/by|to +/xpct #/ypct ~/in */time",
        sprites::scale_handler,
        "scale <sprite> by|to <x%> [<y%>] [in <time>]",
    ),
    (
        "rotate",
        "|/rotate|turn : +/tag |/to|by #/degrees ~/in */time",
        sprites::rotate_handler,
        "rotate <sprite> to|by <degrees> [in <time>]",
    ),
    (
        "depth",
        "~/set |/raise|lower|depth ~/of : +/tag ~/depth |/by|to +/num",
        sprites::depth_handler,
        "raise|lower <sprite> by <n>, set depth of <sprite> to <z>",
    ),
    (
        "frame",
        "|/advance|reverse : +/tag |/by|to #/num ~/frames",
        sprites::frame_handler,
        "advance|reverse <sprite> by|to <n> [frames]",
    ),
    (
        "rate",
        "~/set |/frame|animation =/rate ~/of : +/tag ~/to +/value ~/in */time",
        sprites::rate_handler,
        "set frame rate of <sprite> to <fps> [in <time>]",
    ),
    (
        "brightness",
        "~/set |/darken|darkness|lightness|lighten ~/of : +/tag ~/to +/value ~/in */time",
        sprites::brightness_handler,
        "darken|lighten <sprite> to <amount> [in <time>]",
    ),
    (
        "transparency",
        "~/set |/trans|transparency ~/of : +/tag ~/to +/value ~/in */time",
        sprites::transparency_handler,
        "set transparency of <sprite> to <0-100> [in <time>]",
    ),
    ("start", "|/start|run : >/list", control::start_handler, "start <scenes...>"),
    ("stop", "|/stop|disable : >/list", control::stop_handler, "stop [scenes...]: stop scenes, this one if none named"),
    ("show", "|/show|hide : +/tag ~/for */time", sprites::show_handler, "show|hide <sprite> [for <time>]"),
    ("pause", "|/pause|freeze : >/list", sprites::pause_handler, "pause <sprites...>"),
    ("resume", "|/resume|unfreeze : >/list", sprites::resume_handler, "resume <sprites...>"),
    (
        "make",
        "|/make|let|put : +/name ~/be ~/as ~/= */rest",
        control::make_handler,
        "make <name> [be|as|=] <value>: set a variable",
    ),
    (
        "create",
        "=/create |/group|text : +/item_name |/from|size */content",
        sprites::create_handler,
        "create group <tag> [size <w> <h>], create text <tag> from <content>",
    ),
    (
        "set_text",
        "=/set |/content|text ~/of : +/text_item ~/to */rest",
        sprites::set_text_handler,
        "set text of <tag> to <content>",
    ),
    (
        "set_font",
        "=/set =/font : +/feature ~/of +/text_item ~/to */rest",
        sprites::set_font_handler,
        "set font <color|background|style|size> of <tag> to <value>",
    ),
    ("add_to_group", "=/add ~/to =/group : +/group >/list", sprites::add_to_group_handler, "add to group <group> <sprites...>"),
    ("dump", "=/dump : >/list", control::dump_handler, "dump [vars|scenes|actions|triggers|sprites]"),
    ("exit", "|/exit|quit :", control::exit_handler, "exit: end the show"),
];

/// Ordered list of command specifications.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in command set. Patterns that fail to compile are logged and skipped.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for &(id, pattern, handler, help) in BUILTIN_COMMANDS {
            if let Err(err) = registry.register(id, pattern, handler, help) {
                error!("built-in command '{id}' skipped: {err}");
            }
        }
        registry
    }

    fn compile(id: &'static str, pattern: &str, handler: Handler, help: &'static str) -> Result<CommandSpec, PatternError> {
        Ok(CommandSpec {
            id,
            pattern: PatternSpec::parse(pattern)?,
            handler,
            help,
        })
    }

    /// Append a command after all existing ones.
    ///
    /// # Errors
    /// Returns a [`PatternError`] when `pattern` does not compile.
    pub fn register(
        &mut self,
        id: &'static str,
        pattern: &str,
        handler: Handler,
        help: &'static str,
    ) -> Result<(), PatternError> {
        self.commands.push(Self::compile(id, pattern, handler, help)?);
        Ok(())
    }

    /// Insert a command just ahead of `before`, or at the end when `before` is unknown.
    ///
    /// # Errors
    /// Returns a [`PatternError`] when `pattern` does not compile.
    pub fn insert_before(
        &mut self,
        before: &str,
        id: &'static str,
        pattern: &str,
        handler: Handler,
        help: &'static str,
    ) -> Result<(), PatternError> {
        let spec = Self::compile(id, pattern, handler, help)?;
        match self.commands.iter().position(|command| command.id == before) {
            Some(index) => self.commands.insert(index, spec),
            None => self.commands.push(spec),
        }
        Ok(())
    }

    /// Drop a command by id, returning whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.commands.len();
        self.commands.retain(|command| command.id != id);
        self.commands.len() != before
    }

    /// The first command whose pattern matches `words`.
    pub fn find<S: AsRef<str>>(&self, words: &[S]) -> Option<(&CommandSpec, MatchResult)> {
        self.commands.iter().find_map(|command| {
            let matched = command.pattern.matches(words);
            matched.valid.then_some((command, matched))
        })
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.commands.iter().map(|command| command.id).collect()
    }

    pub fn help(&self) -> Vec<&'static str> {
        self.commands.iter().map(|command| command.help).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::tokenize;

    fn first(line: &str) -> Option<&'static str> {
        CommandRegistry::builtin().find(&tokenize(line)).map(|(spec, _)| spec.id)
    }

    fn noop(_: &mut Runtime, _: &Invocation) -> Result<Outcome> {
        Ok(Outcome::Complete)
    }

    #[test]
    fn every_builtin_pattern_compiles() {
        let registry = CommandRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN_COMMANDS.len());
        assert_eq!(registry.ids()[0], "echo");
        assert_eq!(registry.ids().last(), Some(&"exit"));
    }

    #[test]
    fn first_matching_head_wins() {
        assert_eq!(first("move window of sky to 10 20"), Some("move_window"));
        assert_eq!(first("move cat to 10 20"), Some("move"));
        assert_eq!(first("put sky as background"), Some("put"));
        assert_eq!(first("set speed of cat to 3"), Some("speed"));
        assert_eq!(first("set text of title to Hello"), Some("set_text"));
        assert_eq!(first("set font size of title to 12"), Some("set_font"));
        assert_eq!(first("lower cat by 2"), Some("depth"));
        assert_eq!(first("set frame rate of cat to 12"), Some("rate"));
        assert_eq!(first("quit"), Some("exit"));
        assert_eq!(first("let x be 4"), Some("make"));
        assert_eq!(first("dance wildly"), None);
    }

    #[test]
    fn commands_are_case_sensitive() {
        assert_eq!(first("Echo hi"), None);
    }

    #[test]
    fn insert_before_takes_precedence() {
        let mut registry = CommandRegistry::builtin();
        registry.insert_before("move", "nudge", "=/move =/gently : >/rest", noop, "").unwrap();
        let ids = registry.ids();
        let nudge = ids.iter().position(|id| *id == "nudge").unwrap();
        let plain = ids.iter().position(|id| *id == "move").unwrap();
        assert_eq!(nudge + 1, plain);
        assert!(registry.remove("nudge"));
        assert!(!registry.remove("nudge"));
        assert!(registry.register("bad", "=/x */a +/b", noop, "").is_err());
    }
}
