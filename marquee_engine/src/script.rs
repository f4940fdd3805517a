//! Script loading: turns script files into scenes.
//!
//! Lines are trimmed and filtered (comments, `#` lines, short lines, lines
//! with no letters). Directives are case-insensitive and may follow a leading
//! `and`:
//!
//! * `scene <name>` ... `end scene` delimit a scene
//! * `include <file>` reads another file, relative to the including one
//! * `end file` or `finish` stop reading the current file
//!
//! Everything else is content for the open scene, or for the top-level scene
//! when no scene is open.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::diagnostic::Diagnostic;
use crate::error::LoadError;
use crate::scene::{Scene, TOP_LEVEL};

/// Scenes read from a script, in the order they were defined.
#[derive(Debug, Clone, Default)]
pub struct LoadedScript {
    /// The top-level scene, when present, is last.
    pub scenes: Vec<Scene>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadedScript {
    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.name == name)
    }

    pub fn has_top_level(&self) -> bool {
        self.scene(TOP_LEVEL).is_some()
    }
}

/// Read a script file and everything it includes.
///
/// # Errors
/// Returns [`LoadError::MissingScript`] when the file, or any file it
/// includes, does not exist, and [`LoadError::Io`] when one cannot be read.
pub fn load_script(path: &Path) -> Result<LoadedScript, LoadError> {
    let mut loader = ScriptLoader::new(folder_of(path));
    loader.read_file(path)?;
    let script = loader.finish();
    info!(
        "loaded script '{}': {} scene(s), {} diagnostic(s)",
        path.display(),
        script.scenes.len(),
        script.diagnostics.len()
    );
    Ok(script)
}

/// Parse script text held in memory. Includes resolve against `folder`.
///
/// # Errors
/// Fails only when an included file is missing or unreadable.
pub fn parse_script(text: &str, folder: &Path) -> Result<LoadedScript, LoadError> {
    let mut loader = ScriptLoader::new(folder.to_path_buf());
    loader.read_text(text, folder, "<script>")?;
    Ok(loader.finish())
}

fn folder_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Drop a leading `and` connective.
fn strip_and(line: &str) -> &str {
    match line.split_once(char::is_whitespace) {
        Some((first, rest)) if first.eq_ignore_ascii_case("and") => rest.trim_start(),
        _ => line,
    }
}

struct ScriptLoader {
    root_folder: PathBuf,
    visited: HashSet<PathBuf>,
    scenes: Vec<Scene>,
    top_level: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

/// Reading state for one file.
#[derive(Default)]
struct FileState {
    scene: Option<String>,
    holding: Vec<String>,
    in_comment: bool,
}

impl ScriptLoader {
    fn new(root_folder: PathBuf) -> Self {
        Self {
            root_folder,
            visited: HashSet::new(),
            scenes: Vec::new(),
            top_level: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn diagnose(&mut self, source: &str, line_no: usize, message: impl AsRef<str>) {
        let diagnostic = Diagnostic::script(format!("{source}:{line_no}: {}", message.as_ref()));
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    fn read_file(&mut self, path: &Path) -> Result<(), LoadError> {
        if !path.is_file() {
            return Err(LoadError::MissingScript(path.to_path_buf()));
        }
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !self.visited.insert(canonical) {
            let diagnostic = Diagnostic::script(format!("'{}' is already being read, include skipped", path.display()));
            warn!("{diagnostic}");
            self.diagnostics.push(diagnostic);
            return Ok(());
        }
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = path.display().to_string();
        self.read_text(&text, &folder_of(path), &source)
    }

    fn read_text(&mut self, text: &str, folder: &Path, source: &str) -> Result<(), LoadError> {
        let mut state = FileState::default();
        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.len() < 2 || line.starts_with('#') {
                continue;
            }
            if state.in_comment {
                state.in_comment = !line.ends_with("*/");
                continue;
            }
            if line.starts_with("/*") {
                state.in_comment = !(line.len() >= 4 && line.ends_with("*/"));
                continue;
            }
            if !line.chars().any(char::is_alphabetic) {
                continue;
            }

            let content = strip_and(line);
            let lowered = content.to_lowercase();
            let mut words = lowered.split_whitespace();
            match (words.next(), words.next()) {
                (Some("scene"), None) => self.diagnose(source, line_no, "expected a scene name"),
                (Some("scene"), Some(name)) => {
                    self.close_scene(&mut state, folder);
                    if name == TOP_LEVEL {
                        self.diagnose(source, line_no, format!("'{TOP_LEVEL}' is reserved for top-level lines"));
                    } else {
                        state.scene = Some(name.to_string());
                    }
                },
                (Some("end"), Some("scene")) => self.close_scene(&mut state, folder),
                (Some("end"), Some("file")) | (Some("finish"), _) => break,
                (Some("end"), _) => self.diagnose(source, line_no, "'end' must be followed by 'scene' or 'file'"),
                (Some("include"), None) => self.diagnose(source, line_no, "expected a file name to include"),
                (Some("include"), Some(_)) => {
                    // file names keep their case
                    let name = content.split_whitespace().nth(1).unwrap_or_default();
                    self.read_file(&folder.join(name))?;
                },
                _ => match state.scene {
                    Some(_) => state.holding.push(content.to_string()),
                    None => self.top_level.push(content.to_string()),
                },
            }
        }
        self.close_scene(&mut state, folder);
        Ok(())
    }

    fn close_scene(&mut self, state: &mut FileState, folder: &Path) {
        let Some(name) = state.scene.take() else {
            return;
        };
        let content = std::mem::take(&mut state.holding);
        if content.is_empty() {
            let diagnostic = Diagnostic::script(format!("scene '{name}' has no content and was dropped"));
            warn!("{diagnostic}");
            self.diagnostics.push(diagnostic);
            return;
        }
        let scene = Scene::new(name.clone(), folder, content);
        if let Some(existing) = self.scenes.iter_mut().find(|scene| scene.name == name) {
            let diagnostic = Diagnostic::script(format!("scene '{name}' is defined more than once, keeping the last"));
            warn!("{diagnostic}");
            self.diagnostics.push(diagnostic);
            *existing = scene;
        } else {
            self.scenes.push(scene);
        }
    }

    fn finish(mut self) -> LoadedScript {
        if self.top_level.is_empty() {
            warn!("no top-level actions, nothing will happen");
            self.diagnostics
                .push(Diagnostic::script("no top-level actions, nothing will happen"));
        } else {
            let top = Scene::new(TOP_LEVEL, self.root_folder.clone(), std::mem::take(&mut self.top_level));
            self.scenes.push(top);
        }
        LoadedScript {
            scenes: self.scenes,
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> LoadedScript {
        parse_script(text, Path::new(".")).unwrap()
    }

    #[test]
    fn scenes_and_top_level_are_separated() {
        let script = parse(
            "# a comment\n\
             scene Intro\n\
             begin\n\
             and echo hello\n\
             end scene\n\
             begin\n\
             start intro\n",
        );
        assert_eq!(script.scenes.len(), 2);
        let intro = script.scene("intro").unwrap();
        assert_eq!(intro.content, vec!["begin", "echo hello"]);
        assert_eq!(script.scenes.last().unwrap().name, TOP_LEVEL);
        assert!(script.diagnostics.is_empty());
    }

    #[test]
    fn comments_and_noise_are_skipped() {
        let script = parse(
            "/* one line comment */\n\
             begin\n\
             /*\n\
             echo hidden\n\
             */\n\
             ---- 123 ----\n\
             x\n\
             echo shown\n",
        );
        let top = script.scene(TOP_LEVEL).unwrap();
        assert_eq!(top.content, vec!["begin", "echo shown"]);
    }

    #[test]
    fn finish_stops_reading() {
        let script = parse("begin\necho a\nfinish\necho b\n");
        assert_eq!(script.scene(TOP_LEVEL).unwrap().content, vec!["begin", "echo a"]);
    }

    #[test]
    fn structural_problems_are_diagnosed() {
        let script = parse("scene\nend nothing\nscene empty\nend scene\nscene main\nbegin\n");
        assert_eq!(script.diagnostics.len(), 4);
        assert!(script.scene("empty").is_none());
        assert_eq!(script.scene(TOP_LEVEL).unwrap().content, vec!["begin"]);
    }

    #[test]
    fn unterminated_scene_is_kept() {
        let script = parse("begin\nstart tail\nscene tail\nafter 1 second\necho bye\n");
        assert_eq!(script.scene("tail").unwrap().content.len(), 2);
    }

    #[test]
    fn missing_top_level_is_a_warning() {
        let script = parse("scene lonely\nbegin\nend scene\n");
        assert!(!script.has_top_level());
        assert_eq!(script.diagnostics.len(), 1);
    }

    #[test]
    fn missing_root_file_is_fatal() {
        let err = load_script(Path::new("definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, LoadError::MissingScript(_)));
    }
}
