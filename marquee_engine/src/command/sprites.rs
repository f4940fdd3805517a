//! `command::sprites` module
//!
//! Handlers that create and change what is on screen. A handler that cannot
//! resolve its tag reports it and leaves the action to try again next time.

use anyhow::{Result, bail};
use log::debug;

use crate::command::{Invocation, Outcome};
use crate::runtime::Runtime;
use crate::stage::{FontFeature, FontStyle, Motion, Placement, StageEffect};
use crate::timing::speed_from_text;

/// True when the choice bound under `canonical` was `word`.
fn chose(inv: &Invocation, canonical: &str, word: &str) -> bool {
    inv.text(canonical).is_some_and(|choice| choice.eq_ignore_ascii_case(word))
}

/// Duration bound to `time`, in seconds.
fn over(rt: &mut Runtime, inv: &Invocation) -> f64 {
    rt.parse_duration(inv.text("time"))
}

fn target_sprite(rt: &mut Runtime, inv: &Invocation, name: &str) -> Result<Option<String>> {
    let tag = inv.required(name, "a sprite tag")?;
    Ok(rt.resolve_sprite(&inv.scene, tag))
}

/// The name a new sprite gets: its own tag, or its image's.
fn new_sprite_tag(rt: &Runtime, inv: &Invocation, image_tag: &str) -> String {
    rt.qualify_tag(&inv.scene, inv.text("stag").unwrap_or(image_tag))
}

/// `place cat [named kitty] at 10 20 [depth 3] [size 40 40 | scale 50 50]`
///
/// Placing an existing sprite moves it instead.
pub fn place_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let image_tag = inv.required("itag", "an image tag")?;
    let x = inv.number("x", "an x position")?;
    let y = inv.number("y", "a y position")?;
    let z = inv.optional_number("z");
    let sprite = new_sprite_tag(rt, inv, image_tag);

    if rt.stage().has_sprite(&sprite) {
        debug!("'{sprite}' already placed, moving it");
        rt.stage_mut().apply(StageEffect::MoveSprite {
            sprite: sprite.clone(),
            x,
            y,
            relative: false,
            motion: Motion::Instant,
        });
        if let Some(depth) = z {
            rt.stage_mut().apply(StageEffect::SetDepth { sprite, depth });
        }
        return Ok(Outcome::Repeat);
    }
    let Some(image) = rt.resolve_image(&inv.scene, image_tag) else {
        return Ok(Outcome::Repeat);
    };

    let mut placement = Placement::at(x, y);
    placement.z = z.unwrap_or(0.0);
    let first = inv.optional_number("w");
    let second = inv.optional_number("h");
    if chose(inv, "size", "size") {
        placement.width = first;
        placement.height = second;
    } else if chose(inv, "size", "scale") {
        placement.scale = first.map(|sx| (sx, second.unwrap_or(sx)));
    }
    rt.stage_mut().apply(StageEffect::PlaceSprite {
        image,
        sprite,
        scene: inv.scene.clone(),
        placement,
    });
    Ok(Outcome::Repeat)
}

/// `put sky as background`: places an image against an edge of the display.
pub fn put_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let image_tag = inv.required("itag", "an image tag")?;
    let Some(image) = rt.resolve_image(&inv.scene, image_tag) else {
        return Ok(Outcome::Repeat);
    };
    let sprite = new_sprite_tag(rt, inv, image_tag);
    let (display_w, display_h) = rt.config().display_size();
    let (screen_w, screen_h) = (f64::from(display_w), f64::from(display_h));
    let (image_w, image_h) = rt.stage().image_size(&image).unwrap_or((0.0, 0.0));

    let centre_x = (screen_w - image_w) / 2.0;
    let centre_y = (screen_h - image_h) / 2.0;
    let anchor = inv.text("background").unwrap_or_default().to_ascii_lowercase();
    let mut placement = match anchor.as_str() {
        "background" => {
            let mut placement = Placement::at(0.0, 0.0);
            placement.width = Some(screen_w);
            placement.height = Some(screen_h);
            placement
        },
        "top" => Placement::at(centre_x, 0.0),
        "bottom" => Placement::at(centre_x, screen_h - image_h),
        "left" => Placement::at(0.0, centre_y),
        "right" => Placement::at(screen_w - image_w, centre_y),
        "sky" | "ground" => {
            let y = if anchor == "sky" { 0.0 } else { screen_h - image_h };
            let mut placement = Placement::at(0.0, y);
            placement.width = Some(screen_w);
            placement.height = Some(image_h);
            placement
        },
        _ => Placement::at(centre_x, centre_y),
    };
    placement.z = inv.optional_number("depth").unwrap_or(0.0);

    if rt.stage().has_sprite(&sprite) {
        rt.stage_mut().apply(StageEffect::RemoveSprite { sprite: sprite.clone() });
    }
    rt.stage_mut().apply(StageEffect::PlaceSprite {
        image,
        sprite,
        scene: inv.scene.clone(),
        placement,
    });
    Ok(Outcome::Repeat)
}

pub fn window_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let x = inv.number("ix", "a window x")?;
    let y = inv.number("iy", "a window y")?;
    let width = inv.number("iw", "a window width")?;
    let height = inv.number("ih", "a window height")?;
    if let Some(sprite) = target_sprite(rt, inv, "stag")? {
        rt.stage_mut().apply(StageEffect::SetWindow {
            sprite,
            x,
            y,
            width,
            height,
        });
    }
    Ok(Outcome::Repeat)
}

pub fn zoom_window_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let width = inv.number("iw", "a window width")?;
    let height = inv.number("ih", "a window height")?;
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::ZoomWindow {
            sprite,
            width,
            height,
            over,
        });
    }
    Ok(Outcome::Repeat)
}

pub fn move_window_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let x = inv.number("ix", "a window x")?;
    let y = inv.number("iy", "a window y")?;
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::ScrollWindow { sprite, x, y, over });
    }
    Ok(Outcome::Repeat)
}

pub fn remove_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    for tag in inv.list("tags") {
        if let Some(sprite) = rt.resolve_sprite(&inv.scene, &tag) {
            rt.stage_mut().apply(StageEffect::RemoveSprite { sprite });
        }
    }
    Ok(Outcome::Repeat)
}

/// `move cat to|by 10 20 [in 2 seconds | at 100 pixels per second]`
pub fn move_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let x = inv.number("x", "an x position")?;
    let y = inv.number("y", "a y position")?;
    let relative = chose(inv, "to", "by");
    let rest = inv.text("rest");
    let motion = if chose(inv, "in", "in") {
        Motion::Over(rt.parse_duration(rest))
    } else if chose(inv, "in", "at") {
        match rest.and_then(speed_from_text) {
            Some(speed) => Motion::Speed(speed),
            None => bail!("expected a speed after 'at'"),
        }
    } else {
        Motion::Instant
    };
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::MoveSprite {
            sprite,
            x,
            y,
            relative,
            motion,
        });
    }
    Ok(Outcome::Repeat)
}

pub fn speed_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let speed = inv.number("speed", "a speed")?;
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::SetSpeed { sprite, speed, over });
    }
    Ok(Outcome::Repeat)
}

pub fn blur_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let blur = inv.number("blur", "a blur amount")?;
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::SetBlur { sprite, blur, over });
    }
    Ok(Outcome::Repeat)
}

pub fn size_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let width = inv.number("width", "a width")?;
    let height = inv.number("height", "a height")?;
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::Resize {
            sprite,
            width,
            height,
            over,
        });
    }
    Ok(Outcome::Repeat)
}

/// `scale cat by 50 [75]`: relative with `by`, against the natural size with `to`.
pub fn scale_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let x_pct = inv.number("xpct", "a percentage")?;
    let y_pct = inv.optional_number("ypct").unwrap_or(x_pct);
    let relative = !chose(inv, "by", "to");
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::Rescale {
            sprite,
            x_pct,
            y_pct,
            relative,
            over,
        });
    }
    Ok(Outcome::Repeat)
}

pub fn rotate_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let degrees = inv.number("degrees", "an angle in degrees")?;
    let relative = chose(inv, "to", "by");
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::Rotate {
            sprite,
            degrees,
            relative,
            over,
        });
    }
    Ok(Outcome::Repeat)
}

/// `raise cat by 2`, `lower cat by 2`, `set depth of cat to 5`.
pub fn depth_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let amount = inv.number("num", "a depth")?;
    let Some(sprite) = target_sprite(rt, inv, "tag")? else {
        return Ok(Outcome::Repeat);
    };
    let effect = if chose(inv, "by", "to") {
        StageEffect::SetDepth { sprite, depth: amount }
    } else if inv.has_head_word("lower") {
        StageEffect::ChangeDepth { sprite, by: -amount }
    } else {
        StageEffect::ChangeDepth { sprite, by: amount }
    };
    rt.stage_mut().apply(effect);
    Ok(Outcome::Repeat)
}

/// `advance cat [by 3] [frames]`, `reverse cat`, `advance cat to 12`.
///
/// A missing or zero step means one frame. Seeks take the frame as given.
pub fn frame_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let frame = if chose(inv, "by", "to") {
        Some(inv.number("num", "a frame number")?.round().max(0.0) as i64)
    } else {
        None
    };
    let count = match inv.optional_number("num") {
        Some(n) if n != 0.0 => n.round() as i64,
        _ => 1,
    };
    let Some(sprite) = target_sprite(rt, inv, "tag")? else {
        return Ok(Outcome::Repeat);
    };
    let effect = if let Some(frame) = frame {
        StageEffect::SeekFrame { sprite, frame }
    } else if inv.has_head_word("reverse") {
        StageEffect::StepFrame { sprite, by: -count }
    } else {
        StageEffect::StepFrame { sprite, by: count }
    };
    rt.stage_mut().apply(effect);
    Ok(Outcome::Repeat)
}

pub fn rate_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let rate = inv.number("value", "a frame rate")?;
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::SetAnimationRate { sprite, rate, over });
    }
    Ok(Outcome::Repeat)
}

/// `darken cat to 40`, `lighten cat to 10 in 2 seconds`.
pub fn brightness_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let amount = inv.number("value", "an amount")?;
    let darken = inv.has_head_word("darken") || inv.has_head_word("darkness");
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::SetBrightness {
            sprite,
            amount,
            darken,
            over,
        });
    }
    Ok(Outcome::Repeat)
}

pub fn transparency_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let amount = inv.number("value", "a transparency from 0 to 100")?.clamp(0.0, 100.0);
    let over = over(rt, inv);
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::SetTransparency { sprite, amount, over });
    }
    Ok(Outcome::Repeat)
}

/// `show cat`, `hide cat for 3 seconds`.
pub fn show_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let visible = !inv.has_head_word("hide");
    let duration = inv.text("time").map(|time| rt.parse_duration(Some(time)));
    if let Some(sprite) = target_sprite(rt, inv, "tag")? {
        rt.stage_mut().apply(StageEffect::SetVisibility {
            sprite,
            visible,
            duration,
        });
    }
    Ok(Outcome::Repeat)
}

fn set_paused(rt: &mut Runtime, inv: &Invocation, paused: bool) -> Outcome {
    for tag in inv.list("list") {
        if let Some(sprite) = rt.resolve_sprite(&inv.scene, &tag) {
            rt.stage_mut().apply(StageEffect::SetPaused { sprite, paused });
        }
    }
    Outcome::Repeat
}

pub fn pause_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    Ok(set_paused(rt, inv, true))
}

pub fn resume_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    Ok(set_paused(rt, inv, false))
}

/// `create group band [size 400 300]`, `create text title from Hello there`.
///
/// Groups and texts are drawables: place them like images once created.
pub fn create_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let name = inv.required("item_name", "a name")?;
    let tag = rt.qualify_tag(&inv.scene, name);
    if rt.stage().has_image(&tag) {
        debug!("'{tag}' already exists");
        return Ok(Outcome::Complete);
    }
    let content = inv.text("content").unwrap_or_default();
    let effect = if inv.has_head_word("group") {
        let numbers: Vec<f64> = content
            .split_whitespace()
            .filter_map(|word| word.parse::<f64>().ok())
            .collect();
        let size = match numbers.as_slice() {
            [width, height, ..] => Some((*width, *height)),
            _ => None,
        };
        StageEffect::CreateGroup { tag, size }
    } else {
        StageEffect::CreateText {
            tag,
            content: content.to_string(),
        }
    };
    rt.stage_mut().apply(effect);
    Ok(Outcome::Complete)
}

pub fn set_text_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let item = inv.required("text_item", "a text tag")?;
    let content = inv.text("rest").unwrap_or_default().to_string();
    if let Some(tag) = rt.resolve_image(&inv.scene, item) {
        rt.stage_mut().apply(StageEffect::SetText { tag, content });
    }
    Ok(Outcome::Repeat)
}

fn font_feature(feature: &str, value: &str) -> Result<FontFeature> {
    let feature = match feature.to_ascii_lowercase().as_str() {
        "color" | "colour" => FontFeature::Color(value.to_string()),
        "background" => FontFeature::Background(value.to_string()),
        "style" => FontFeature::Style(match value.to_ascii_lowercase().as_str() {
            "bold" => FontStyle::Bold,
            "italic" => FontStyle::Italic,
            "underline" => FontStyle::Underline,
            other => bail!("unknown font style '{other}'"),
        }),
        "size" => match value.parse::<u32>() {
            Ok(size) => FontFeature::Size(size),
            Err(_) => bail!("expected a font size but found '{value}'"),
        },
        other => bail!("unknown font feature '{other}'"),
    };
    Ok(feature)
}

/// `set font color of title to red`
pub fn set_font_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let item = inv.required("text_item", "a text tag")?;
    let feature = font_feature(
        inv.required("feature", "a font feature")?,
        inv.text("rest").unwrap_or_default(),
    )?;
    if let Some(tag) = rt.resolve_image(&inv.scene, item) {
        rt.stage_mut().apply(StageEffect::SetFont { tag, feature });
    }
    Ok(Outcome::Repeat)
}

pub fn add_to_group_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let group_tag = inv.required("group", "a group tag")?;
    let Some(group) = rt.resolve_image(&inv.scene, group_tag) else {
        return Ok(Outcome::Repeat);
    };
    for tag in inv.list("list") {
        if let Some(sprite) = rt.resolve_sprite(&inv.scene, &tag) {
            rt.stage_mut().apply(StageEffect::AddToGroup {
                group: group.clone(),
                sprite,
            });
        }
    }
    Ok(Outcome::Repeat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::runtime;
    use crate::input::FrameClock;
    use crate::scene::TOP_LEVEL;
    use crate::stage::{HeadlessStage, Journal, SpriteProperty, Stage};

    fn with_cat() -> (Runtime, Journal) {
        let (mut rt, journal) = runtime("begin\necho hi\n");
        rt.stage_mut().apply(StageEffect::CreateGroup {
            tag: "cat".into(),
            size: Some((100.0, 50.0)),
        });
        assert!(!rt.dispatch("place cat at 10 20", TOP_LEVEL));
        journal.clear();
        (rt, journal)
    }

    fn last(journal: &Journal) -> StageEffect {
        journal.effects().pop().unwrap()
    }

    fn x_of(rt: &Runtime, sprite: &str) -> Option<f64> {
        rt.stage().sprite_property(sprite, SpriteProperty::X)
    }

    #[test]
    fn place_uses_image_tag_or_name() {
        let (mut rt, _) = with_cat();
        assert_eq!(x_of(&rt, "cat"), Some(10.0));
        rt.dispatch("place cat named kitty at 1 2 depth 4 scale 50", TOP_LEVEL);
        assert_eq!(rt.stage().sprite_property("kitty", SpriteProperty::Width), Some(50.0));
        assert_eq!(rt.stage().sprite_property("kitty", SpriteProperty::Height), Some(25.0));
    }

    #[test]
    fn placing_again_moves() {
        let (mut rt, journal) = with_cat();
        rt.dispatch("place cat at 30 40", TOP_LEVEL);
        assert_eq!(x_of(&rt, "cat"), Some(30.0));
        assert!(journal.effects()[0].is_move_sprite());
    }

    #[test]
    fn put_anchors_against_the_display() {
        let (mut rt, _) = with_cat();
        rt.dispatch("put cat named floor as ground", TOP_LEVEL);
        assert_eq!(rt.stage().sprite_property("floor", SpriteProperty::Y), Some(1870.0));
        assert_eq!(rt.stage().sprite_property("floor", SpriteProperty::Width), Some(1080.0));
        rt.dispatch("put cat named east as right", TOP_LEVEL);
        assert_eq!(x_of(&rt, "east"), Some(980.0));
        rt.dispatch("put cat named back as background depth -5", TOP_LEVEL);
        assert_eq!(rt.stage().sprite_property("back", SpriteProperty::Height), Some(1920.0));
    }

    #[test]
    fn moves_choose_motion_from_the_tail() {
        let (mut rt, journal) = with_cat();
        rt.dispatch("move cat by 5 5", TOP_LEVEL);
        assert_eq!(x_of(&rt, "cat"), Some(15.0));
        rt.dispatch("move cat to 0 0 in 2 seconds", TOP_LEVEL);
        assert_eq!(
            last(&journal),
            StageEffect::MoveSprite {
                sprite: "cat".into(),
                x: 0.0,
                y: 0.0,
                relative: false,
                motion: Motion::Over(2.0),
            }
        );
        rt.dispatch("move cat to 9 9 at 100 pixels per second", TOP_LEVEL);
        assert!(matches!(
            last(&journal),
            StageEffect::MoveSprite {
                motion: Motion::Speed(speed),
                ..
            } if speed == 100.0
        ));
    }

    #[test]
    fn head_words_pick_the_direction() {
        let (mut rt, journal) = with_cat();
        rt.dispatch("lower cat by 2", TOP_LEVEL);
        assert_eq!(last(&journal), StageEffect::ChangeDepth { sprite: "cat".into(), by: -2.0 });
        rt.dispatch("set depth of cat to 7", TOP_LEVEL);
        assert_eq!(last(&journal), StageEffect::SetDepth { sprite: "cat".into(), depth: 7.0 });
        rt.dispatch("reverse cat by frames", TOP_LEVEL);
        assert_eq!(last(&journal), StageEffect::StepFrame { sprite: "cat".into(), by: -1 });
        rt.dispatch("advance cat to 12", TOP_LEVEL);
        assert_eq!(last(&journal), StageEffect::SeekFrame { sprite: "cat".into(), frame: 12 });
        rt.dispatch("advance cat to 0", TOP_LEVEL);
        assert_eq!(last(&journal), StageEffect::SeekFrame { sprite: "cat".into(), frame: 0 });
        rt.dispatch("advance cat by 0", TOP_LEVEL);
        assert_eq!(last(&journal), StageEffect::StepFrame { sprite: "cat".into(), by: 1 });
        rt.dispatch("darken cat to 40", TOP_LEVEL);
        assert!(matches!(last(&journal), StageEffect::SetBrightness { darken: true, .. }));
        rt.dispatch("set lightness of cat to 40", TOP_LEVEL);
        assert!(matches!(last(&journal), StageEffect::SetBrightness { darken: false, .. }));
        rt.dispatch("hide cat for 3 seconds", TOP_LEVEL);
        assert_eq!(
            last(&journal),
            StageEffect::SetVisibility {
                sprite: "cat".into(),
                visible: false,
                duration: Some(3.0)
            }
        );
        assert!(rt.take_diagnostics().is_empty());
    }

    #[test]
    fn scale_and_rotate_default_sensibly() {
        let (mut rt, journal) = with_cat();
        rt.dispatch("scale cat by 200", TOP_LEVEL);
        assert_eq!(rt.stage().sprite_property("cat", SpriteProperty::Width), Some(200.0));
        assert_eq!(rt.stage().sprite_property("cat", SpriteProperty::Height), Some(100.0));
        rt.dispatch("rotate cat by 90 in 1 second", TOP_LEVEL);
        assert_eq!(
            last(&journal),
            StageEffect::Rotate {
                sprite: "cat".into(),
                degrees: 90.0,
                relative: true,
                over: 1.0
            }
        );
    }

    #[test]
    fn unknown_sprites_repeat_with_a_diagnostic() {
        let (mut rt, journal) = with_cat();
        assert!(!rt.dispatch("size dog to 10 10", TOP_LEVEL));
        assert!(journal.is_empty());
        assert_eq!(rt.take_diagnostics().len(), 1);
    }

    #[test]
    fn bad_numbers_become_diagnostics() {
        let (mut rt, journal) = with_cat();
        assert!(!rt.dispatch("move cat to left right", TOP_LEVEL));
        assert!(journal.is_empty());
        assert!(!rt.take_diagnostics().is_empty());
    }

    #[test]
    fn text_items_and_groups() {
        let (mut rt, journal) = with_cat();
        assert!(rt.dispatch("create text title from Hello there", TOP_LEVEL));
        assert!(rt.stage().has_image("title"));
        rt.dispatch("set text of title to Goodbye now", TOP_LEVEL);
        assert_eq!(
            last(&journal),
            StageEffect::SetText {
                tag: "title".into(),
                content: "Goodbye now".into()
            }
        );
        rt.dispatch("set font style of title to bold", TOP_LEVEL);
        assert_eq!(
            last(&journal),
            StageEffect::SetFont {
                tag: "title".into(),
                feature: FontFeature::Style(FontStyle::Bold)
            }
        );
        assert!(rt.dispatch("create group band size 400 300", TOP_LEVEL));
        assert_eq!(rt.stage().image_size("band"), Some((400.0, 300.0)));
        rt.dispatch("add to group band cat ghost", TOP_LEVEL);
        assert!(last(&journal).is_add_to_group());
        assert_eq!(rt.take_diagnostics().len(), 1);
    }

    #[test]
    fn font_features_parse() {
        assert_eq!(font_feature("SIZE", "12").unwrap(), FontFeature::Size(12));
        assert_eq!(font_feature("colour", "red").unwrap(), FontFeature::Color("red".into()));
        assert!(font_feature("size", "big").is_err());
        assert!(font_feature("kerning", "tight").is_err());
    }

    #[test]
    fn scene_sprites_go_when_the_scene_stops() {
        let (mut rt, _) = runtime(
            "begin\nstart intro\nscene intro\nbegin\ncreate group box size 5 5\nplace box at 1 1\nend scene\n",
        );
        rt.start(FrameClock::from_millis(0));
        assert!(rt.stage().has_sprite("intro:box"));
        rt.stop_scene("intro");
        assert!(!rt.stage().has_sprite("intro:box"));
        assert!(HeadlessStage::new().sprite_tags().is_empty());
    }
}
