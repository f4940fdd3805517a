//! The boundary between the script runtime and whatever renders the show.
//!
//! Command handlers never draw, play, or decode anything themselves. They ask
//! the [`Stage`] what exists and send it typed [`StageEffect`]s. Rendering,
//! tweening, and audio all live on the far side of this trait.
//!
//! [`HeadlessStage`] is the in-crate implementation. It keeps the resource and
//! sprite registries, applies geometry changes instantly, and writes every
//! effect to a shared [`Journal`].

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, info};
use serde::Serialize;
use variantly::Variantly;

use crate::style::ConsoleStyle;

/// Sprite attributes readable from scripts as `$tag.x` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpriteProperty {
    X,
    Y,
    Width,
    Height,
    Speed,
}

impl SpriteProperty {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.to_ascii_lowercase().as_str() {
            "x" => Some(SpriteProperty::X),
            "y" => Some(SpriteProperty::Y),
            "w" | "width" => Some(SpriteProperty::Width),
            "h" | "height" => Some(SpriteProperty::Height),
            "speed" => Some(SpriteProperty::Speed),
            _ => None,
        }
    }
}

/// What kind of file a `load` registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    Image,
    /// A single image split into `cols` x `rows` animation frames.
    ImageGrid { cols: u32, rows: u32 },
    /// A folder of frames.
    ImageFolder,
    Movie,
    Sound,
}

impl ResourceKind {
    pub fn is_sound(self) -> bool {
        self == ResourceKind::Sound
    }
}

/// How a change is spread over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Motion {
    Instant,
    /// Complete the change over this many seconds.
    Over(f64),
    /// Travel at this many pixels per second.
    Speed(f64),
}

/// Where and how large a new sprite is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Percentage scale applied instead of an explicit size.
    pub scale: Option<(f64, f64)>,
}

impl Placement {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            width: None,
            height: None,
            scale: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FontStyle {
    Bold,
    Italic,
    Underline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FontFeature {
    Color(String),
    Background(String),
    Style(FontStyle),
    Size(u32),
}

/// One requested change to the presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Variantly)]
pub enum StageEffect {
    Echo(String),
    LoadResource {
        tag: String,
        path: PathBuf,
        kind: ResourceKind,
    },
    UnloadResource {
        tag: String,
    },
    PlaySound {
        tag: String,
    },
    /// Volume in the range 0.0 to 1.0.
    SetVolume {
        tag: String,
        volume: f64,
    },
    PlaceSprite {
        image: String,
        sprite: String,
        scene: String,
        placement: Placement,
    },
    SetWindow {
        sprite: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    ZoomWindow {
        sprite: String,
        width: f64,
        height: f64,
        over: f64,
    },
    ScrollWindow {
        sprite: String,
        x: f64,
        y: f64,
        over: f64,
    },
    RemoveSprite {
        sprite: String,
    },
    MoveSprite {
        sprite: String,
        x: f64,
        y: f64,
        relative: bool,
        motion: Motion,
    },
    SetSpeed {
        sprite: String,
        speed: f64,
        over: f64,
    },
    SetBlur {
        sprite: String,
        blur: f64,
        over: f64,
    },
    Resize {
        sprite: String,
        width: f64,
        height: f64,
        over: f64,
    },
    Rescale {
        sprite: String,
        x_pct: f64,
        y_pct: f64,
        relative: bool,
        over: f64,
    },
    Rotate {
        sprite: String,
        degrees: f64,
        relative: bool,
        over: f64,
    },
    ChangeDepth {
        sprite: String,
        by: f64,
    },
    SetDepth {
        sprite: String,
        depth: f64,
    },
    StepFrame {
        sprite: String,
        by: i64,
    },
    SeekFrame {
        sprite: String,
        frame: i64,
    },
    SetAnimationRate {
        sprite: String,
        rate: f64,
        over: f64,
    },
    SetBrightness {
        sprite: String,
        amount: f64,
        darken: bool,
        over: f64,
    },
    /// Transparency in percent, 0 opaque to 100 invisible.
    SetTransparency {
        sprite: String,
        amount: f64,
        over: f64,
    },
    SetVisibility {
        sprite: String,
        visible: bool,
        /// Revert after this many seconds.
        duration: Option<f64>,
    },
    SetPaused {
        sprite: String,
        paused: bool,
    },
    CreateGroup {
        tag: String,
        size: Option<(f64, f64)>,
    },
    CreateText {
        tag: String,
        content: String,
    },
    SetText {
        tag: String,
        content: String,
    },
    SetFont {
        tag: String,
        feature: FontFeature,
    },
    AddToGroup {
        group: String,
        sprite: String,
    },
}

/// Everything the runtime needs from the presentation layer.
pub trait Stage {
    /// Whether a drawable (image, grid, movie, group, or text) is registered under `tag`.
    fn has_image(&self, tag: &str) -> bool;
    fn has_sound(&self, tag: &str) -> bool;
    fn has_sprite(&self, tag: &str) -> bool;
    fn sprite_property(&self, tag: &str, property: SpriteProperty) -> Option<f64>;
    /// Natural size of a drawable, when known.
    fn image_size(&self, tag: &str) -> Option<(f64, f64)>;
    fn sprite_tags(&self) -> Vec<String>;
    fn apply(&mut self, effect: StageEffect);
    /// Remove every sprite placed by `scene`, returning how many went.
    fn remove_scene_sprites(&mut self, scene: &str) -> usize;
}

/// Shared, append-only record of applied effects.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<StageEffect>>>);

impl Journal {
    fn record(&self, effect: StageEffect) {
        self.0.borrow_mut().push(effect);
    }

    pub fn effects(&self) -> Vec<StageEffect> {
        self.0.borrow().clone()
    }

    /// Text of every `Echo` so far.
    pub fn echoes(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|effect| match effect {
                StageEffect::Echo(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SpriteState {
    image: String,
    scene: String,
    x: f64,
    y: f64,
    z: f64,
    width: f64,
    height: f64,
    speed: f64,
}

/// Registry-only stage with no rendering.
#[derive(Debug, Default)]
pub struct HeadlessStage {
    images: HashMap<String, Option<(f64, f64)>>,
    sounds: HashMap<String, f64>,
    sprites: BTreeMap<String, SpriteState>,
    journal: Journal,
    echo_to_console: bool,
}

impl HeadlessStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print `Echo` effects to stdout as they arrive.
    #[must_use]
    pub fn with_console_echo(mut self) -> Self {
        self.echo_to_console = true;
        self
    }

    /// Handle to the effect journal, usable after the stage is boxed.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Declare the natural size of an image, as a decoder would.
    pub fn set_image_size(&mut self, tag: &str, width: f64, height: f64) {
        self.images.insert(tag.to_string(), Some((width, height)));
    }

    fn sprite_mut(&mut self, tag: &str) -> Option<&mut SpriteState> {
        self.sprites.get_mut(tag)
    }

    fn track(&mut self, effect: &StageEffect) {
        match effect {
            StageEffect::Echo(text) => {
                if self.echo_to_console {
                    println!("{}", text.as_str().echo_style());
                }
            },
            StageEffect::LoadResource { tag, kind, .. } => {
                if kind.is_sound() {
                    self.sounds.insert(tag.clone(), 0.5);
                } else {
                    self.images.entry(tag.clone()).or_insert(None);
                }
            },
            StageEffect::UnloadResource { tag } => {
                self.images.remove(tag);
                self.sounds.remove(tag);
            },
            StageEffect::SetVolume { tag, volume } => {
                if let Some(level) = self.sounds.get_mut(tag) {
                    *level = *volume;
                }
            },
            StageEffect::PlaceSprite {
                image,
                sprite,
                scene,
                placement,
            } => {
                let natural = self.images.get(image).copied().flatten().unwrap_or((0.0, 0.0));
                let (width, height) = match (placement.width, placement.height, placement.scale) {
                    (Some(w), Some(h), _) => (w, h),
                    (_, _, Some((sx, sy))) => (natural.0 * sx / 100.0, natural.1 * sy / 100.0),
                    _ => natural,
                };
                let state = SpriteState {
                    image: image.clone(),
                    scene: scene.clone(),
                    x: placement.x,
                    y: placement.y,
                    z: placement.z,
                    width,
                    height,
                    speed: 0.0,
                };
                self.sprites.insert(sprite.clone(), state);
            },
            StageEffect::RemoveSprite { sprite } => {
                self.sprites.remove(sprite);
            },
            StageEffect::MoveSprite {
                sprite, x, y, relative, ..
            } => {
                let (x, y, relative) = (*x, *y, *relative);
                if let Some(state) = self.sprite_mut(sprite) {
                    if relative {
                        state.x += x;
                        state.y += y;
                    } else {
                        state.x = x;
                        state.y = y;
                    }
                }
            },
            StageEffect::SetSpeed { sprite, speed, .. } => {
                let speed = *speed;
                if let Some(state) = self.sprite_mut(sprite) {
                    state.speed = speed;
                }
            },
            StageEffect::Resize {
                sprite, width, height, ..
            } => {
                let (width, height) = (*width, *height);
                if let Some(state) = self.sprite_mut(sprite) {
                    state.width = width;
                    state.height = height;
                }
            },
            StageEffect::Rescale {
                sprite,
                x_pct,
                y_pct,
                relative,
                ..
            } => {
                let (x_pct, y_pct, relative) = (*x_pct, *y_pct, *relative);
                let natural = self
                    .sprites
                    .get(sprite)
                    .and_then(|state| self.images.get(&state.image).copied().flatten());
                if let Some(state) = self.sprite_mut(sprite) {
                    if relative {
                        state.width *= x_pct / 100.0;
                        state.height *= y_pct / 100.0;
                    } else if let Some((w, h)) = natural {
                        state.width = w * x_pct / 100.0;
                        state.height = h * y_pct / 100.0;
                    }
                }
            },
            StageEffect::ChangeDepth { sprite, by } => {
                let by = *by;
                if let Some(state) = self.sprite_mut(sprite) {
                    state.z += by;
                }
            },
            StageEffect::SetDepth { sprite, depth } => {
                let depth = *depth;
                if let Some(state) = self.sprite_mut(sprite) {
                    state.z = depth;
                }
            },
            StageEffect::CreateGroup { tag, size } => {
                self.images.insert(tag.clone(), *size);
            },
            StageEffect::CreateText { tag, .. } => {
                self.images.insert(tag.clone(), None);
            },
            _ => {},
        }
    }
}

impl Stage for HeadlessStage {
    fn has_image(&self, tag: &str) -> bool {
        self.images.contains_key(tag)
    }

    fn has_sound(&self, tag: &str) -> bool {
        self.sounds.contains_key(tag)
    }

    fn has_sprite(&self, tag: &str) -> bool {
        self.sprites.contains_key(tag)
    }

    fn sprite_property(&self, tag: &str, property: SpriteProperty) -> Option<f64> {
        let state = self.sprites.get(tag)?;
        Some(match property {
            SpriteProperty::X => state.x,
            SpriteProperty::Y => state.y,
            SpriteProperty::Width => state.width,
            SpriteProperty::Height => state.height,
            SpriteProperty::Speed => state.speed,
        })
    }

    fn image_size(&self, tag: &str) -> Option<(f64, f64)> {
        self.images.get(tag).copied().flatten()
    }

    fn sprite_tags(&self) -> Vec<String> {
        self.sprites.keys().cloned().collect()
    }

    fn apply(&mut self, effect: StageEffect) {
        debug!("stage effect: {effect:?}");
        self.track(&effect);
        self.journal.record(effect);
    }

    fn remove_scene_sprites(&mut self, scene: &str) -> usize {
        let before = self.sprites.len();
        self.sprites.retain(|_, state| state.scene != scene);
        let removed = before - self.sprites.len();
        if removed > 0 {
            info!("removed {removed} sprite(s) placed by scene '{scene}'");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(stage: &mut HeadlessStage, sprite: &str, scene: &str) {
        stage.apply(StageEffect::PlaceSprite {
            image: "img".into(),
            sprite: sprite.into(),
            scene: scene.into(),
            placement: Placement::at(10.0, 20.0),
        });
    }

    #[test]
    fn loads_register_by_kind() {
        let mut stage = HeadlessStage::new();
        stage.apply(StageEffect::LoadResource {
            tag: "beep".into(),
            path: PathBuf::from("beep.wav"),
            kind: ResourceKind::Sound,
        });
        stage.apply(StageEffect::LoadResource {
            tag: "sky".into(),
            path: PathBuf::from("sky.png"),
            kind: ResourceKind::Image,
        });
        assert!(stage.has_sound("beep"));
        assert!(!stage.has_image("beep"));
        assert!(stage.has_image("sky"));
        assert_eq!(stage.image_size("sky"), None);
    }

    #[test]
    fn moves_update_reported_properties() {
        let mut stage = HeadlessStage::new();
        placed(&mut stage, "cat", "intro");
        stage.apply(StageEffect::MoveSprite {
            sprite: "cat".into(),
            x: 5.0,
            y: -5.0,
            relative: true,
            motion: Motion::Instant,
        });
        assert_eq!(stage.sprite_property("cat", SpriteProperty::X), Some(15.0));
        assert_eq!(stage.sprite_property("cat", SpriteProperty::Y), Some(15.0));
        assert_eq!(stage.sprite_property("dog", SpriteProperty::X), None);
    }

    #[test]
    fn scene_sprites_removed_together() {
        let mut stage = HeadlessStage::new();
        placed(&mut stage, "intro:cat", "intro");
        placed(&mut stage, "intro:dog", "intro");
        placed(&mut stage, "logo", "main");
        assert_eq!(stage.remove_scene_sprites("intro"), 2);
        assert_eq!(stage.sprite_tags(), vec!["logo".to_string()]);
    }

    #[test]
    fn journal_survives_boxing() {
        let stage = HeadlessStage::new();
        let journal = stage.journal();
        let mut boxed: Box<dyn Stage> = Box::new(stage);
        boxed.apply(StageEffect::Echo("hello".into()));
        assert_eq!(journal.echoes(), vec!["hello".to_string()]);
        assert!(journal.effects()[0].is_echo());
    }
}
