//! Compositor pass (C7): the two-sweep paint algorithm over the window
//! registry, clipped to the accumulated damage region.

use crate::config::{CompositeMode, CompositorSettings};
use crate::display::{Display, PictOp};
use crate::error::Result;
use crate::geometry::{Region, WindowId};
use crate::shadow::ShadowKernel;
use crate::window::record::{Mode, WindowType};
use crate::window::registry::WindowRegistry;
use crate::window::resources;

/// Runs one full repaint over `dirty`, presenting the result.
///
/// `root_tile` is the background picture painted between the two passes;
/// `black_picture` is a solid-black fill used as the shadow's source
/// picture in [`CompositeMode::ClientShadows`] (masked by each window's
/// precomputed shadow image), mirroring the single shared `blackPicture`
/// the original keeps around for the same purpose. `clip_changed` forces
/// `border_size`/`extents`/`border_clip` to be rebuilt for every window
/// visited in pass 1 (§4.7 step 2).
pub fn paint_all(
    display: &mut dyn Display,
    registry: &mut WindowRegistry,
    settings: &CompositorSettings,
    kernel: &ShadowKernel,
    mut dirty: Region,
    clip_changed: bool,
    root_tile: u32,
    black_picture: u32,
) -> Result<()> {
    let buffer = display.root_buffer_picture();
    let root_rect = display.root_geometry();

    let mut prev_trans: Vec<WindowId> = Vec::new();
    // `registry` is ordered bottom-to-top; pass 1 must visit the
    // top-most window first so its border-size subtraction removes its
    // footprint from `dirty` before any window it occludes gets a turn
    // to paint into that area (§4.7 — a window's clip is set to the
    // *pre-subtraction* region, so whichever window subtracts first wins
    // the overlap).
    let ids: Vec<WindowId> = registry.iter().rev().map(|w| w.id).collect();

    // Pass 1 — opaque, top to bottom.
    for id in ids {
        let win = match registry.find_mut(id) {
            Some(w) => w,
            None => continue,
        };
        if !win.is_mapped() || !win.damaged || win.visual_class.is_input_only() {
            continue;
        }
        if !root_rect.intersects(&win.geometry.outer_rect()) {
            continue;
        }

        resources::ensure_picture(display, win)?;
        if clip_changed {
            resources::invalidate_border_size(display, win);
            resources::invalidate_extents(display, win);
            resources::invalidate_border_clip(win);
        }
        resources::ensure_border_size(display, win)?;
        resources::ensure_extents(display, win, settings, kernel)?;

        if win.mode == Mode::Solid {
            if let Some(picture) = win.resources.picture {
                display.set_picture_clip(buffer, &dirty)?;
                display.composite(
                    PictOp::Src,
                    picture,
                    None,
                    buffer,
                    (0, 0),
                    (win.geometry.x, win.geometry.y),
                    (win.geometry.width, win.geometry.height),
                )?;
            }
            let border = win.resources.border_size.clone().unwrap_or_default();
            dirty = dirty.subtract(&border);
        }

        win.resources.border_clip = Some(dirty.clone());
        prev_trans.push(id);
    }

    // Between passes: paint the root tile into whatever is still dirty.
    display.set_picture_clip(buffer, &dirty)?;
    display.composite(
        PictOp::Src,
        root_tile,
        None,
        buffer,
        (0, 0),
        (0, 0),
        (root_rect.width, root_rect.height),
    )?;

    // Pass 2 — shadows and translucency, top to bottom. `prev_trans` was
    // built in pass 1's top-to-bottom visiting order already, so a plain
    // forward walk preserves that order here.
    for id in prev_trans {
        let win = match registry.find_mut(id) {
            Some(w) => w,
            None => continue,
        };
        let clip = win.resources.border_clip.clone().unwrap_or_default();
        if clip.is_empty() {
            continue;
        }

        if win.window_type != WindowType::Desktop {
            paint_shadow(display, win, settings, kernel, &clip, buffer, black_picture)?;
        }

        if win.mode == Mode::Trans || win.mode == Mode::Argb {
            resources::ensure_alpha_pict(display, win)?;
            let border = win.resources.border_size.clone().unwrap_or_default();
            let body_clip = clip.intersect(&border);
            if !body_clip.is_empty() {
                if let Some(picture) = win.resources.picture {
                    display.set_picture_clip(buffer, &body_clip)?;
                    display.composite(
                        PictOp::Over,
                        picture,
                        win.resources.alpha_pict,
                        buffer,
                        (0, 0),
                        (win.geometry.x, win.geometry.y),
                        (win.geometry.width, win.geometry.height),
                    )?;
                }
            }
        }
    }

    display.present()?;
    Ok(())
}

fn paint_shadow(
    display: &mut dyn Display,
    win: &mut crate::window::record::WindowRecord,
    settings: &CompositorSettings,
    kernel: &ShadowKernel,
    clip: &Region,
    buffer: u32,
    black_picture: u32,
) -> Result<()> {
    let (dx, dy) = settings.shadow_offset();
    let dest = (win.geometry.x + dx, win.geometry.y + dy);

    match settings.mode {
        CompositeMode::Simple => Ok(()),
        CompositeMode::ServerShadows => {
            // The window's own picture, scaled by 0.3 * opacity, stands in
            // for a dedicated shadow mask.
            let Some(picture) = win.resources.picture else { return Ok(()) };
            display.set_picture_clip(buffer, clip)?;
            display.composite(
                PictOp::Over,
                picture,
                Some(picture),
                buffer,
                (0, 0),
                dest,
                (win.geometry.width, win.geometry.height),
            )
        }
        CompositeMode::ClientShadows => {
            resources::ensure_shadow(display, win, settings, kernel)?;
            let (Some(shadow_pict), Some(shadow)) = (win.resources.shadow_pict, &win.resources.shadow)
            else {
                return Ok(());
            };
            display.set_picture_clip(buffer, clip)?;
            display.composite(
                PictOp::Over,
                black_picture,
                Some(shadow_pict),
                buffer,
                (0, 0),
                dest,
                (shadow.width as u32, shadow.height as u32),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::mock::RecordingDisplay;
    use crate::geometry::Rectangle;
    use crate::window::record::{Geometry, MapState, VisualClass, WindowRecord};

    fn mapped(id: u32, x: i32, y: i32, w: u32, h: u32) -> WindowRecord {
        let mut win = WindowRecord::new(
            id,
            Geometry { x, y, width: w, height: h, border_width: 0 },
            VisualClass::Drawable { has_alpha: false },
        );
        win.map_state = MapState::Viewable;
        win.damaged = true;
        win
    }

    #[test]
    fn opaque_over_opaque_subtracts_lower_windows_region_before_painting() {
        // Window 1 is added first (bottom of the stack), window 2 second
        // (top). Per spec.md Concrete Scenario 1, B (the top window, here
        // window 2) must win the 50x50..100x100 overlap: its footprint
        // must be subtracted from `dirty` *before* window 1 gets a turn
        // to paint, so window 1's clip excludes the overlap entirely.
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 200, 200));
        let mut registry = WindowRegistry::new();
        registry.add(mapped(1, 0, 0, 100, 100), None);
        registry.add(mapped(2, 50, 50, 100, 100), None);
        let settings = CompositorSettings::default().with_mode(CompositeMode::Simple);
        let kernel = ShadowKernel::build(settings.shadow_radius);
        let dirty = Region::from_rect(Rectangle::new(0, 0, 200, 200));

        paint_all(&mut display, &mut registry, &settings, &kernel, dirty, false, 99, 77).unwrap();

        // Both opaque windows should have painted exactly once (one
        // `composite` call each) before the root tile fill.
        let composite_calls =
            display.calls.iter().filter(|c| c.starts_with("composite(Src")).count();
        assert_eq!(composite_calls, 3); // window 2, window 1, root tile

        // Pull out, in order, each (clip, composite) pair: the clip set
        // immediately before a `composite(Src...)` call is the clip that
        // composite used.
        let mut window_paints = Vec::new();
        for pair in display.calls.windows(2) {
            if let [clip_call, composite_call] = pair {
                // Restrict to the two 100x100 window composites, excluding
                // the 200x200 root-tile fill between the passes (also a
                // `composite(Src...)` call, but not one of the windows).
                if composite_call.starts_with("composite(Src")
                    && composite_call.contains("size=(100, 100)")
                    && clip_call.starts_with("set_picture_clip")
                {
                    window_paints.push((clip_call.clone(), composite_call.clone()));
                }
            }
        }
        assert_eq!(window_paints.len(), 2, "expected one clip+composite pair per opaque window");

        let (top_clip, top_composite) = &window_paints[0];
        let (bottom_clip, bottom_composite) = &window_paints[1];

        // Window 2 (top) paints first, clipped to the full dirty region —
        // nothing has subtracted its footprint yet.
        assert!(top_composite.contains("dst_xy=(50, 50)"));
        assert!(top_clip.contains("Rectangle { x: 0, y: 0, width: 200, height: 200 }"));

        // Window 1 (bottom) paints second, clipped to `dirty` with window
        // 2's (50, 50, 100, 100) footprint already subtracted — none of
        // its clip rectangles may cover a point inside that overlap, e.g.
        // (75, 75).
        assert!(bottom_composite.contains("dst_xy=(0, 0)"));
        assert!(!bottom_clip.contains("Rectangle { x: 0, y: 0, width: 200, height: 200 }"));
        let overlap = Rectangle::new(50, 50, 100, 100);
        let expected_strips = [
            Rectangle::new(0, 0, 200, 50),
            Rectangle::new(0, 150, 200, 50),
            Rectangle::new(0, 50, 50, 100),
            Rectangle::new(150, 50, 50, 100),
        ];
        for strip in expected_strips {
            assert!(!strip.intersects(&overlap));
            assert!(
                bottom_clip.contains(&format!("{strip:?}")),
                "bottom window's clip should contain the vacated strip {strip:?}, got {bottom_clip}"
            );
        }
    }

    #[test]
    fn off_screen_window_never_gets_a_picture() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 100, 100));
        let mut registry = WindowRegistry::new();
        registry.add(mapped(1, 500, 500, 50, 50), None);
        let settings = CompositorSettings::default().with_mode(CompositeMode::Simple);
        let kernel = ShadowKernel::build(settings.shadow_radius);
        let dirty = Region::from_rect(Rectangle::new(0, 0, 100, 100));

        paint_all(&mut display, &mut registry, &settings, &kernel, dirty, false, 99, 77).unwrap();

        assert!(!display.calls.iter().any(|c| c.starts_with("name_window_pixmap")));
    }

    #[test]
    fn translucent_window_is_deferred_to_pass_two() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 200, 200));
        let mut registry = WindowRegistry::new();
        registry.add(mapped(1, 0, 0, 100, 100), None);
        let mut translucent = mapped(2, 50, 50, 100, 100);
        translucent.opacity = crate::config::OPAQUE / 2;
        translucent.mode = Mode::Trans;
        registry.add(translucent, None);
        let settings = CompositorSettings::default().with_mode(CompositeMode::Simple);
        let kernel = ShadowKernel::build(settings.shadow_radius);
        let dirty = Region::from_rect(Rectangle::new(0, 0, 200, 200));

        paint_all(&mut display, &mut registry, &settings, &kernel, dirty, false, 99, 77).unwrap();

        assert!(display.calls.iter().any(|c| c.starts_with("composite(Over")));
    }
}
