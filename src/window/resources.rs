//! Window resource cache (C4): `ensure_*` / `invalidate_*` operations over
//! a [`WindowRecord`]'s cached server-side resources.
//!
//! Each cached field is an `Option`, following the "optional owning
//! handle, release guaranteed on overwrite or drop" design note: an
//! `invalidate_*` always frees the server-side resource (if present)
//! before clearing the field, and an `ensure_*` only builds what is
//! missing.

use super::record::{Geometry, Mode, VisualClass, WindowRecord, WindowType, OPAQUE};
use crate::config::{CompositeMode, CompositorSettings};
use crate::display::Display;
use crate::error::Result;
use crate::geometry::Region;
use crate::ignore::IgnoreSet;
use crate::shadow::ShadowKernel;

/// Records the serial `display`'s next request will get as ignorable, then
/// issues it. The window these speculative teardown requests target may
/// already be gone server-side (§4.1, §9 "out-of-order server-side
/// destruction").
fn ignoring<T>(
    display: &mut dyn Display,
    ignore: &mut IgnoreSet,
    request: impl FnOnce(&mut dyn Display) -> Result<T>,
) -> Result<T> {
    ignore.note_ignorable(display.next_request_serial());
    request(display)
}

/// Whether an `ensure_*` call built a fresh resource or found one cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub was_recreated: bool,
}

impl EnsureOutcome {
    const fn existing() -> Self {
        Self { was_recreated: false }
    }
    const fn created() -> Self {
        Self { was_recreated: true }
    }
}

/// Releases `picture`, `pixmap`, `alpha_pict`, `shadow_pict` and `shadow`
/// and clears them to `None`. Does not touch `border_size`/`extents`/
/// `border_clip`, which are driven by geometry rather than mode.
pub fn invalidate_picture(
    display: &mut dyn Display,
    ignore: &mut IgnoreSet,
    win: &mut WindowRecord,
) -> Result<()> {
    if let Some(picture) = win.resources.picture.take() {
        ignoring(display, ignore, |d| d.free_picture(picture))?;
    }
    if let Some(pixmap) = win.resources.pixmap.take() {
        ignoring(display, ignore, |d| d.free_pixmap(pixmap))?;
    }
    invalidate_alpha_and_shadow_pictures(display, ignore, win)?;
    invalidate_shadow(display, ignore, win)
}

fn invalidate_alpha_and_shadow_pictures(
    display: &mut dyn Display,
    ignore: &mut IgnoreSet,
    win: &mut WindowRecord,
) -> Result<()> {
    if let Some(p) = win.resources.alpha_pict.take() {
        ignoring(display, ignore, |d| d.free_picture(p))?;
    }
    if let Some(p) = win.resources.shadow_pict.take() {
        ignoring(display, ignore, |d| d.free_picture(p))?;
    }
    Ok(())
}

pub fn invalidate_shadow(
    display: &mut dyn Display,
    ignore: &mut IgnoreSet,
    win: &mut WindowRecord,
) -> Result<()> {
    win.resources.shadow = None;
    invalidate_alpha_and_shadow_pictures(display, ignore, win)
}

pub fn invalidate_border_size(_display: &mut dyn Display, win: &mut WindowRecord) {
    win.resources.border_size = None;
}

pub fn invalidate_extents(_display: &mut dyn Display, win: &mut WindowRecord) {
    win.resources.extents = None;
}

pub fn invalidate_border_clip(win: &mut WindowRecord) {
    win.resources.border_clip = None;
}

/// Builds `picture` from the named window pixmap if absent. Only valid
/// while the window is mapped and has a drawable visual (§3).
pub fn ensure_picture(
    display: &mut dyn Display,
    win: &mut WindowRecord,
) -> Result<EnsureOutcome> {
    if win.resources.picture.is_some() {
        return Ok(EnsureOutcome::existing());
    }
    if !win.is_mapped() || win.visual_class.is_input_only() {
        return Ok(EnsureOutcome::existing());
    }
    let has_alpha = win.visual_class.has_alpha();
    let drawable = match display.name_window_pixmap(win.id)? {
        Some(pixmap) => {
            win.resources.pixmap = Some(pixmap);
            pixmap
        }
        None => win.id,
    };
    let picture = display.create_picture(drawable, has_alpha)?;
    win.resources.picture = Some(picture);
    Ok(EnsureOutcome::created())
}

pub fn ensure_border_size(
    display: &mut dyn Display,
    win: &mut WindowRecord,
) -> Result<EnsureOutcome> {
    if win.resources.border_size.is_some() {
        return Ok(EnsureOutcome::existing());
    }
    let region =
        display.border_size_region(win.id, &win.geometry, win.shaped, win.shape_bounds)?;
    win.resources.border_size = Some(region);
    Ok(EnsureOutcome::created())
}

/// Returns the bounding rectangle of (window ∪ shadow) for the current
/// mode and compositor mode (§4.4).
pub fn ensure_extents(
    display: &mut dyn Display,
    win: &mut WindowRecord,
    settings: &CompositorSettings,
    kernel: &ShadowKernel,
) -> Result<EnsureOutcome> {
    if win.resources.extents.is_some() {
        return Ok(EnsureOutcome::existing());
    }
    ensure_border_size(display, win)?;
    let border = win.resources.border_size.clone().unwrap_or_default();

    if settings.mode == CompositeMode::Simple || win.window_type == WindowType::Desktop {
        win.resources.extents = Some(border);
        return Ok(EnsureOutcome::created());
    }

    let (dx, dy) = settings.shadow_offset();
    let size = kernel.size() as u32;
    let shadow_w = win.geometry.width + size;
    let shadow_h = win.geometry.height + size;
    let shadow_rect = crate::geometry::Rectangle::new(
        win.geometry.x + dx,
        win.geometry.y + dy,
        shadow_w,
        shadow_h,
    );
    let extents = border.union(&Region::from_rect(shadow_rect));
    win.resources.extents = Some(extents);
    Ok(EnsureOutcome::created())
}

/// Effective shadow opacity for a window: `base_shadow_opacity *
/// opacity/OPAQUE` for translucent windows, `base_shadow_opacity`
/// otherwise (§4.4).
pub fn effective_shadow_opacity(win: &WindowRecord, settings: &CompositorSettings) -> f64 {
    match win.mode {
        Mode::Trans => settings.shadow_opacity * (win.opacity as f64 / OPAQUE as f64),
        _ => settings.shadow_opacity,
    }
}

/// Builds the shadow alpha image (and its mask picture) if absent. Dock
/// windows are skipped when `exclude_dock_shadows` is set (§4.4); desktop
/// windows never receive a shadow either way (§4.7 pass 2).
pub fn ensure_shadow(
    display: &mut dyn Display,
    win: &mut WindowRecord,
    settings: &CompositorSettings,
    kernel: &ShadowKernel,
) -> Result<EnsureOutcome> {
    if win.resources.shadow.is_some() {
        return Ok(EnsureOutcome::existing());
    }
    if settings.mode != CompositeMode::ClientShadows {
        return Ok(EnsureOutcome::existing());
    }
    if win.window_type == WindowType::Desktop {
        return Ok(EnsureOutcome::existing());
    }
    if win.window_type == WindowType::Dock && settings.exclude_dock_shadows {
        return Ok(EnsureOutcome::existing());
    }

    let opacity = effective_shadow_opacity(win, settings);
    let image = kernel.make_shadow(opacity, win.geometry.width as usize, win.geometry.height as usize);
    let shadow_pict = display.upload_shadow_mask(&image)?;
    win.resources.shadow = Some(image);
    win.resources.shadow_pict = Some(shadow_pict);
    Ok(EnsureOutcome::created())
}

/// Builds the window's constant-alpha mask picture, used only in
/// [`Mode::Trans`] (a non-alpha visual painted at fractional opacity).
/// `Argb` windows carry their own per-pixel alpha and need no mask.
pub fn ensure_alpha_pict(display: &mut dyn Display, win: &mut WindowRecord) -> Result<EnsureOutcome> {
    if win.resources.alpha_pict.is_some() || win.mode != Mode::Trans {
        return Ok(EnsureOutcome::existing());
    }
    let alpha = ((win.opacity as u64 * 0xffff) / OPAQUE as u64) as u16;
    let pict = display.create_solid_fill((0, 0, 0, alpha))?;
    win.resources.alpha_pict = Some(pict);
    Ok(EnsureOutcome::created())
}

/// `determine_mode` (§4.4): Argb if the visual has an alpha channel, else
/// Trans if opacity isn't fully opaque, else Solid.
pub fn determine_mode(win: &WindowRecord) -> Mode {
    if win.visual_class.has_alpha() {
        Mode::Argb
    } else if win.opacity != OPAQUE {
        Mode::Trans
    } else {
        Mode::Solid
    }
}

/// Recomputes `win.mode`; if it changed, invalidates `alpha_pict` and
/// `shadow_pict` and unions the window's current extents into `damage`.
/// Returns the window's extents-before-transition so the caller can union
/// them into the accumulator (extents are cleared here since mode affects
/// shadow opacity, which affects the extents union with border_size).
pub fn apply_mode_transition(
    display: &mut dyn Display,
    ignore: &mut IgnoreSet,
    win: &mut WindowRecord,
) -> Result<Option<Region>> {
    let new_mode = determine_mode(win);
    if new_mode == win.mode {
        return Ok(None);
    }
    win.mode = new_mode;
    let prior_extents = win.resources.extents.clone();
    invalidate_alpha_and_shadow_pictures(display, ignore, win)?;
    win.resources.shadow = None;
    win.resources.extents = None;
    Ok(prior_extents)
}

/// Name → [`WindowType`] for a single `_NET_WM_WINDOW_TYPE` atom value.
fn window_type_for_atom(display: &mut dyn Display, atom: crate::geometry::AtomId) -> Result<Option<WindowType>> {
    use crate::display::atoms::*;
    let name_of = |n: &str| display.intern_atom(n);
    Ok(if atom == name_of(NET_WM_WINDOW_TYPE_DESKTOP)? {
        Some(WindowType::Desktop)
    } else if atom == name_of(NET_WM_WINDOW_TYPE_DOCK)? {
        Some(WindowType::Dock)
    } else if atom == name_of(NET_WM_WINDOW_TYPE_TOOLBAR)? {
        Some(WindowType::Toolbar)
    } else if atom == name_of(NET_WM_WINDOW_TYPE_MENU)? {
        Some(WindowType::Menu)
    } else if atom == name_of(NET_WM_WINDOW_TYPE_UTILITY)? {
        Some(WindowType::Utility)
    } else if atom == name_of(NET_WM_WINDOW_TYPE_SPLASH)? {
        Some(WindowType::Splash)
    } else if atom == name_of(NET_WM_WINDOW_TYPE_DIALOG)? {
        Some(WindowType::Dialog)
    } else if atom == name_of(NET_WM_WINDOW_TYPE_NORMAL)? {
        Some(WindowType::Normal)
    } else {
        None
    })
}

/// Maximum recursion depth for the `_NET_WM_WINDOW_TYPE` child walk, a
/// defensive bound not present in the original (SPEC_FULL §9).
const MAX_WINTYPE_DEPTH: u32 = 32;

/// `determine_wintype` (§4.4): reads `_NET_WM_WINDOW_TYPE` directly; if
/// absent, recurses into children until one returns a non-normal type,
/// otherwise yields `Normal`.
pub fn determine_wintype(
    display: &mut dyn Display,
    window: crate::geometry::WindowId,
    type_atom: crate::geometry::AtomId,
) -> Result<WindowType> {
    determine_wintype_depth(display, window, type_atom, 0)
}

fn determine_wintype_depth(
    display: &mut dyn Display,
    window: crate::geometry::WindowId,
    type_atom: crate::geometry::AtomId,
    depth: u32,
) -> Result<WindowType> {
    for atom in display.get_atom_list_property(window, type_atom)? {
        if let Some(wt) = window_type_for_atom(display, atom)? {
            return Ok(wt);
        }
    }
    if depth >= MAX_WINTYPE_DEPTH {
        return Ok(WindowType::Normal);
    }
    for child in display.query_tree_children(window)? {
        let wt = determine_wintype_depth(display, child, type_atom, depth + 1)?;
        if wt != WindowType::Normal {
            return Ok(wt);
        }
    }
    Ok(WindowType::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::mock::RecordingDisplay;
    use crate::geometry::Rectangle;
    use crate::window::record::Geometry as Geom;

    fn window(id: u32) -> WindowRecord {
        let mut w = WindowRecord::new(
            id,
            Geom { x: 0, y: 0, width: 100, height: 100, border_width: 0 },
            VisualClass::Drawable { has_alpha: false },
        );
        w.map_state = super::super::record::MapState::Viewable;
        w
    }

    #[test]
    fn ensure_picture_is_idempotent() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 1024, 768));
        let mut w = window(1);
        let first = ensure_picture(&mut display, &mut w).unwrap();
        assert!(first.was_recreated);
        let calls_after_first = display.calls.len();
        let second = ensure_picture(&mut display, &mut w).unwrap();
        assert!(!second.was_recreated);
        assert_eq!(display.calls.len(), calls_after_first);
    }

    #[test]
    fn invalidate_picture_releases_and_clears() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 1024, 768));
        let mut ignore = crate::ignore::IgnoreSet::new();
        let mut w = window(1);
        ensure_picture(&mut display, &mut w).unwrap();
        assert!(w.resources.picture.is_some());
        invalidate_picture(&mut display, &mut ignore, &mut w).unwrap();
        assert!(w.resources.picture.is_none());
        assert!(w.resources.pixmap.is_none());
        assert!(display.calls.iter().any(|c| c.starts_with("free_picture")));
    }

    #[test]
    fn invalidate_picture_marks_its_requests_ignorable() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 1024, 768));
        let mut ignore = crate::ignore::IgnoreSet::new();
        let mut w = window(1);
        ensure_picture(&mut display, &mut w).unwrap();
        assert!(ignore.is_empty());
        invalidate_picture(&mut display, &mut ignore, &mut w).unwrap();
        // free_picture and free_pixmap each noted their serial as ignorable
        // before issuing the request; neither has been matched against an
        // error yet, so both entries are still queued.
        assert!(!ignore.is_empty());
    }

    #[test]
    fn determine_mode_picks_argb_over_trans() {
        let mut w = window(1);
        w.visual_class = VisualClass::Drawable { has_alpha: true };
        w.opacity = OPAQUE;
        assert_eq!(determine_mode(&w), Mode::Argb);
    }

    #[test]
    fn determine_mode_picks_trans_when_not_opaque() {
        let mut w = window(1);
        w.opacity = OPAQUE / 2;
        assert_eq!(determine_mode(&w), Mode::Trans);
    }

    #[test]
    fn determine_wintype_falls_back_to_children() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 1024, 768));
        let type_atom = display.intern_atom(crate::display::atoms::NET_WM_WINDOW_TYPE).unwrap();
        let dock_atom = display.intern_atom(crate::display::atoms::NET_WM_WINDOW_TYPE_DOCK).unwrap();
        display.set_children(1, vec![2]);
        display.set_atom_list_property(2, type_atom, vec![dock_atom]);
        let wt = determine_wintype(&mut display, 1, type_atom).unwrap();
        assert_eq!(wt, WindowType::Dock);
    }
}
