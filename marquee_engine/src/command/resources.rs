//! `command::resources` module
//!
//! Handlers that register, drop and play resources. Each of these runs once per
//! scene start: the action is complete after its first dispatch.

use std::path::Path;

use anyhow::{Result, bail};
use log::{debug, info};

use crate::command::{Invocation, Outcome};
use crate::diagnostic::Diagnostic;
use crate::runtime::Runtime;
use crate::stage::{ResourceKind, StageEffect};

/// Sets the sub-folder `load` reads from for the rest of this scene run.
pub fn from_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let folder = inv.text("rest").unwrap_or_default().to_string();
    match rt.scene_mut(&inv.scene) {
        Some(scene) => scene.from_folder = folder,
        None => bail!("no scene named '{}'", inv.scene),
    }
    Ok(Outcome::Complete)
}

/// Picks a resource kind from what is on disk.
fn resource_kind(path: &Path, grid: Option<(u32, u32)>) -> Option<ResourceKind> {
    if path.is_dir() {
        return Some(ResourceKind::ImageFolder);
    }
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" | "jpg" | "jpeg" | "bmp" | "svg" => Some(match grid {
            Some((cols, rows)) => ResourceKind::ImageGrid { cols, rows },
            None => ResourceKind::Image,
        }),
        "gif" | "mov" | "mp4" | "avi" => Some(ResourceKind::Movie),
        "wav" | "ogg" | "mp3" => Some(ResourceKind::Sound),
        _ => None,
    }
}

fn grid_size(inv: &Invocation) -> Option<(u32, u32)> {
    let cols = inv.optional_number("cols")?;
    let rows = inv.optional_number("rows").unwrap_or(1.0);
    if cols < 1.0 || rows < 1.0 {
        return None;
    }
    Some((cols as u32, rows as u32))
}

/// `load cat.png [named kitty] [split 4 by 2]`
pub fn load_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let filename = inv.required("filename", "a file name")?;
    let Some(folder) = rt.scene(&inv.scene).map(|scene| scene.resource_folder()) else {
        bail!("no scene named '{}'", inv.scene);
    };
    let path = folder.join(filename);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
        .to_string();
    let tag = rt.qualify_tag(&inv.scene, inv.text("tag").unwrap_or(&stem));

    if rt.stage().has_image(&tag) || rt.stage().has_sound(&tag) {
        debug!("'{tag}' is already loaded");
        return Ok(Outcome::Complete);
    }
    if !path.exists() {
        rt.report(Diagnostic::reference(format!("file '{}' not found", path.display())).in_scene(&inv.scene));
        return Ok(Outcome::Complete);
    }
    let Some(kind) = resource_kind(&path, grid_size(inv)) else {
        rt.report(
            Diagnostic::script(format!("don't know how to load '{}'", path.display())).in_scene(&inv.scene),
        );
        return Ok(Outcome::Complete);
    };
    info!("loading '{}' as '{tag}' ({kind:?})", path.display());
    rt.stage_mut().apply(StageEffect::LoadResource { tag, path, kind });
    Ok(Outcome::Complete)
}

pub fn unload_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    for tag in inv.list("tags") {
        let resolved = rt.resolve_tag(&inv.scene, &tag, "resource", |stage, candidate| {
            stage.has_image(candidate) || stage.has_sound(candidate)
        });
        if let Some(tag) = resolved {
            rt.stage_mut().apply(StageEffect::UnloadResource { tag });
        }
    }
    Ok(Outcome::Complete)
}

pub fn play_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    for tag in inv.list("tags") {
        if let Some(tag) = rt.resolve_sound(&inv.scene, &tag) {
            rt.stage_mut().apply(StageEffect::PlaySound { tag });
        }
    }
    Ok(Outcome::Complete)
}

/// `set volume of beep to 40`, on a 0 to 100 scale.
pub fn volume_handler(rt: &mut Runtime, inv: &Invocation) -> Result<Outcome> {
    let tag = inv.required("tag", "a sound tag")?;
    let value = inv.number("value", "a volume from 0 to 100")?;
    if let Some(tag) = rt.resolve_sound(&inv.scene, tag) {
        let volume = value.clamp(0.0, 100.0) / 100.0;
        rt.stage_mut().apply(StageEffect::SetVolume { tag, volume });
    }
    Ok(Outcome::Complete)
}
