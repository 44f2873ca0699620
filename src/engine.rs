//! Event dispatcher (C8): owns C1–C6 plus the root-level pictures, and
//! translates server events into mutations on the registry, damage
//! accumulator and fade scheduler, driving a repaint whenever damage is
//! pending (§4.8, §9's "single compositor context" design note).

use crate::compositor;
use crate::config::{CompositeMode, CompositorSettings, OPAQUE};
use crate::damage::{DamageAccumulator, ExposeAccumulator};
use crate::display::{atoms, Display, SelectionOutcome, ServerEvent};
use crate::error::{CompositorError, Result};
use crate::fade::{FadeFinish, FadeScheduler};
use crate::geometry::{AtomId, Region, WindowId};
use crate::shadow::ShadowKernel;
use crate::window::record::{MapState, Mode, WindowRecord};
use crate::window::registry::{CirculatePlace, WindowRegistry};
use crate::window::resources;

use std::time::Instant;

/// Owns the whole engine: window registry, damage/fade/ignore state, and
/// the root-level resources a repaint needs. One value per running
/// compositor; no process-wide statics (§9).
pub struct Compositor {
    pub settings: CompositorSettings,
    kernel: ShadowKernel,
    registry: WindowRegistry,
    damage: DamageAccumulator,
    expose: ExposeAccumulator,
    fades: FadeScheduler,
    ignore: IgnoreSetHandle,
    clip_changed: bool,
    root_tile: Option<u32>,
    black_picture: u32,
    opacity_atom: AtomId,
    type_atom: AtomId,
    rootpmap_atom: AtomId,
    xsetroot_atom: AtomId,
    last_tick: Option<Instant>,
}

/// The ignore-set is consulted only from error handling, but is owned here
/// alongside everything else a request might need to suppress an error
/// for — a thin newtype keeps `Compositor`'s field list self-documenting.
type IgnoreSetHandle = crate::ignore::IgnoreSet;

impl Compositor {
    /// Performs the manager handshake (§6) and builds the engine: acquires
    /// the `_NET_WM_CM_S<screen>` selection, subscribes to root events,
    /// redirects subwindows, and enumerates root's existing children in
    /// stacking order.
    pub fn start(display: &mut dyn Display, screen: usize, settings: CompositorSettings) -> Result<Self> {
        match display.acquire_manager_selection(screen)? {
            SelectionOutcome::Acquired => {}
            SelectionOutcome::AlreadyOwned { incumbent_name } => {
                return Err(CompositorError::AnotherManagerRunning(
                    incumbent_name.unwrap_or_else(|| "<unknown>".to_string()),
                ));
            }
        }
        display.select_root_input()?;
        display.redirect_subwindows(false)?;

        let opacity_atom = display.intern_atom(atoms::NET_WM_WINDOW_OPACITY)?;
        let type_atom = display.intern_atom(atoms::NET_WM_WINDOW_TYPE)?;
        let rootpmap_atom = display.intern_atom(atoms::XROOTPMAP_ID)?;
        let xsetroot_atom = display.intern_atom(atoms::XSETROOT_ID)?;
        let black_picture = display.create_solid_fill((0, 0, 0, 0xffff))?;

        let mut engine = Self {
            kernel: ShadowKernel::build(settings.shadow_radius),
            settings,
            registry: WindowRegistry::new(),
            damage: DamageAccumulator::new(),
            expose: ExposeAccumulator::new(),
            fades: FadeScheduler::new(10),
            ignore: IgnoreSetHandle::new(),
            clip_changed: false,
            root_tile: None,
            black_picture,
            opacity_atom,
            type_atom,
            rootpmap_atom,
            xsetroot_atom,
            last_tick: None,
        };
        engine.fades = FadeScheduler::new(engine.settings.fade_delta_ms);

        let root = display.root_window();
        let children = display.query_tree_children(root)?;
        let mut below = None;
        for child in children {
            engine.add_window(display, child, below)?;
            below = Some(child);
        }
        Ok(engine)
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn pending_damage(&self) -> &Region {
        self.damage.peek()
    }

    /// Runs one iteration of the event loop (§4.8, §5): drains any events
    /// already queued, or blocks on the single suspension point (a poll
    /// bounded by the next fade tick) and either drains the events that
    /// woke it or advances fades on timeout; then, if damage accumulated,
    /// repaints exactly once.
    pub fn run_iteration(&mut self, display: &mut dyn Display) -> Result<()> {
        if !self.drain_ready_events(display)? {
            let timeout = self.fades.timeout_ms();
            if display.poll(timeout)? {
                self.drain_ready_events(display)?;
            } else {
                self.run_fade_tick(display)?;
            }
        }

        if !self.damage.is_empty() {
            let dirty = self.damage.take();
            let root_tile = self.root_tile(display)?;
            compositor::paint_all(
                display,
                &mut self.registry,
                &self.settings,
                &self.kernel,
                dirty,
                self.clip_changed,
                root_tile,
                self.black_picture,
            )?;
            display.sync()?;
            self.clip_changed = false;
        }
        Ok(())
    }

    /// Drains every event already buffered (non-blocking), dispatching
    /// each. Returns whether at least one event was handled.
    fn drain_ready_events(&mut self, display: &mut dyn Display) -> Result<bool> {
        let mut any = false;
        while let Some(event) = display.next_event()? {
            any = true;
            self.handle_event(display, event)?;
        }
        Ok(any)
    }

    fn root_tile(&mut self, display: &mut dyn Display) -> Result<u32> {
        if let Some(tile) = self.root_tile {
            return Ok(tile);
        }
        let tile = display.root_tile_picture(self.rootpmap_atom, self.xsetroot_atom)?;
        self.root_tile = Some(tile);
        Ok(tile)
    }

    fn handle_event(&mut self, display: &mut dyn Display, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::CreateNotify { window } => self.add_window(display, window, None),
            ServerEvent::ConfigureNotifyRoot { width, height } => {
                display.resize_root(width, height)?;
                self.damage.add(Region::from_rect(display.root_geometry()));
                Ok(())
            }
            ServerEvent::ConfigureNotifyWindow { window, geometry, sibling_below } => {
                self.handle_configure_window(display, window, geometry, sibling_below)
            }
            ServerEvent::DestroyNotify { window } => self.destroy_window(display, window, true),
            ServerEvent::MapNotify { window } => self.handle_map(display, window),
            ServerEvent::UnmapNotify { window } => self.handle_unmap(display, window),
            ServerEvent::ReparentNotify { window, is_root, .. } => {
                if is_root {
                    self.add_window(display, window, None)
                } else {
                    self.destroy_window(display, window, false)
                }
            }
            ServerEvent::CirculateNotify { window, place_on_top } => {
                let place =
                    if place_on_top { CirculatePlace::PlaceOnTop } else { CirculatePlace::PlaceOnBottom };
                self.registry.circulate(window, place);
                Ok(())
            }
            ServerEvent::ExposeRoot { rect, count } => {
                if let Some(region) = self.expose.push(rect, count) {
                    self.damage.add(region);
                }
                Ok(())
            }
            ServerEvent::PropertyNotifyBackground => {
                self.root_tile = None;
                self.damage.add(Region::from_rect(display.root_geometry()));
                Ok(())
            }
            ServerEvent::PropertyNotifyOpacity { window } => {
                self.handle_property_opacity(display, window)
            }
            ServerEvent::PropertyNotifyWindowType { window } => {
                self.handle_property_window_type(display, window)
            }
            ServerEvent::DamageNotify { window, .. } => self.handle_damage_notify(display, window),
            ServerEvent::ShapeNotify { window, shaped, bounds } => {
                self.handle_shape_notify(display, window, shaped, bounds)
            }
            ServerEvent::UnhandledError { error_code, request_opcode, minor_opcode, serial } => {
                if !self.ignore.is_ignored(serial) {
                    log::error!(
                        "X error {error_code} on request {request_opcode}.{minor_opcode} (serial {serial})"
                    );
                }
                Ok(())
            }
            ServerEvent::Other => Ok(()),
        }
    }

    fn add_window(
        &mut self,
        display: &mut dyn Display,
        window: WindowId,
        sibling_below: Option<WindowId>,
    ) -> Result<()> {
        if self.registry.find(window).is_some() {
            return Ok(());
        }
        let geometry = display.window_geometry(window)?;
        let visual_class = display.window_visual_class(window)?;
        let mut record = WindowRecord::new(window, geometry, visual_class);

        if !visual_class.is_input_only() {
            display.select_window_input(window)?;
            record.damage_id = Some(display.create_damage(window)?);
            let (shaped, bounds) = display.window_shape_bounds(window)?;
            record.shaped = shaped;
            record.shape_bounds = if shaped { bounds } else { geometry.outer_rect() };
            record.window_type = resources::determine_wintype(display, window, self.type_atom)?;
            if let Some(opacity) = display.get_cardinal_property(window, self.opacity_atom)? {
                record.opacity = opacity;
            }
            record.mode = resources::determine_mode(&record);
        }

        self.registry.add(record, sibling_below);
        if display.window_is_viewable(window)? {
            self.handle_map(display, window)?;
        }
        Ok(())
    }

    fn handle_map(&mut self, display: &mut dyn Display, window: WindowId) -> Result<()> {
        let opacity = display.get_cardinal_property(window, self.opacity_atom)?.unwrap_or(OPAQUE);
        let fade_in = self.settings.fade_on_map_unmap;
        let fade_in_step = self.settings.fade_in_step;

        let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
        if win.visual_class.is_input_only() {
            win.map_state = MapState::Viewable;
            return Ok(());
        }
        win.map_state = MapState::Viewable;
        win.damaged = false;
        win.opacity = opacity;

        if fade_in {
            let target = opacity as f64 / OPAQUE as f64;
            win.opacity = 0;
            win.mode = resources::determine_mode(win);
            let (key, _) =
                self.fades.enqueue(win.fade_key, window, 0.0, target, fade_in_step, FadeFinish::None, true);
            win.fade_key = Some(key);
        } else {
            win.mode = resources::determine_mode(win);
        }
        Ok(())
    }

    fn handle_unmap(&mut self, display: &mut dyn Display, window: WindowId) -> Result<()> {
        let fade_out = self.settings.fade_on_map_unmap;
        let fade_out_step = self.settings.fade_out_step;

        let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
        win.map_state = MapState::Unmapped;
        let extents = win.resources.extents.clone().unwrap_or_else(|| Region::from_rect(win.geometry.outer_rect()));
        self.damage.add(extents);

        if !win.visual_class.is_input_only() {
            display.deselect_window_input(window)?;
        }

        let keep_pixmap = fade_out && win.resources.pixmap.is_some();
        resources::invalidate_border_size(display, win);
        resources::invalidate_extents(display, win);
        resources::invalidate_border_clip(win);

        if keep_pixmap {
            let start = win.opacity as f64 / OPAQUE as f64;
            let (key, _) = self.fades.enqueue(
                win.fade_key,
                window,
                start,
                0.0,
                -fade_out_step,
                FadeFinish::UnmapFinish(window),
                true,
            );
            win.fade_key = Some(key);
        } else {
            resources::invalidate_picture(display, &mut self.ignore, win)?;
        }
        Ok(())
    }

    fn handle_configure_window(
        &mut self,
        display: &mut dyn Display,
        window: WindowId,
        new_geometry: crate::window::record::Geometry,
        sibling_below: Option<WindowId>,
    ) -> Result<()> {
        let settings = self.settings.clone();
        let kernel = self.kernel.clone();

        let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
        resources::ensure_border_size(display, win)?;
        resources::ensure_extents(display, win, &settings, &kernel)?;
        if let Some(old_extents) = win.resources.extents.clone() {
            self.damage.add(old_extents);
        }

        let size_changed =
            win.geometry.width != new_geometry.width || win.geometry.height != new_geometry.height;
        win.geometry = new_geometry;
        if !win.shaped {
            win.shape_bounds = new_geometry.outer_rect();
        }
        if size_changed {
            resources::invalidate_picture(display, &mut self.ignore, win)?;
        }
        resources::invalidate_border_size(display, win);
        resources::invalidate_extents(display, win);
        resources::invalidate_border_clip(win);
        self.clip_changed = true;

        self.registry.restack_above(window, sibling_below);

        let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
        resources::ensure_border_size(display, win)?;
        resources::ensure_extents(display, win, &settings, &kernel)?;
        if let Some(new_extents) = win.resources.extents.clone() {
            self.damage.add(new_extents);
        }
        Ok(())
    }

    fn handle_damage_notify(&mut self, display: &mut dyn Display, window: WindowId) -> Result<()> {
        let settings = self.settings.clone();
        let kernel = self.kernel.clone();

        let Some(damage_id) = self.registry.find(window).and_then(|w| w.damage_id) else {
            return Ok(());
        };
        // Un-sets the server's reported flag for this Damage object;
        // without this the extension stops notifying after the first hit
        // (§4.5 NON_EMPTY reporting).
        let local_region = display.fetch_and_clear_damage(damage_id)?;

        let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
        if !win.damaged {
            win.damaged = true;
            resources::ensure_border_size(display, win)?;
            resources::ensure_extents(display, win, &settings, &kernel)?;
            if let Some(extents) = win.resources.extents.clone() {
                self.damage.add(extents);
            }
        } else {
            let mut region = local_region.translated(win.geometry.x, win.geometry.y);
            if settings.mode == CompositeMode::ServerShadows {
                let (dx, dy) = settings.shadow_offset();
                let shifted = region.translated(dx, dy);
                region.union_with(shifted);
            }
            self.damage.add(region);
        }
        Ok(())
    }

    fn handle_shape_notify(
        &mut self,
        display: &mut dyn Display,
        window: WindowId,
        shaped: bool,
        bounds: crate::geometry::Rectangle,
    ) -> Result<()> {
        let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
        let old_bounds = win.shape_bounds;
        win.shaped = shaped;
        win.shape_bounds = if shaped { bounds } else { win.geometry.outer_rect() };
        resources::invalidate_border_size(display, win);
        resources::invalidate_extents(display, win);
        resources::invalidate_border_clip(win);
        self.clip_changed = true;
        let region = Region::from_rect(old_bounds).union(&Region::from_rect(win.shape_bounds));
        self.damage.add(region);
        Ok(())
    }

    fn handle_property_opacity(&mut self, display: &mut dyn Display, window: WindowId) -> Result<()> {
        let new_opacity = display.get_cardinal_property(window, self.opacity_atom)?.unwrap_or(OPAQUE);
        let fade_on_change = self.settings.fade_on_opacity_change;
        let fade_in_step = self.settings.fade_in_step;
        let fade_out_step = self.settings.fade_out_step;

        let mut displaced = None;
        {
            let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
            if fade_on_change {
                let start = win.opacity as f64 / OPAQUE as f64;
                let target = new_opacity as f64 / OPAQUE as f64;
                let step = if target >= start { fade_in_step } else { -fade_out_step };
                let (key, disp) =
                    self.fades.enqueue(win.fade_key, window, start, target, step, FadeFinish::None, true);
                win.fade_key = Some(key);
                displaced = disp;
            } else {
                win.opacity = new_opacity;
                if let Some(prior) = resources::apply_mode_transition(display, &mut self.ignore, win)? {
                    self.damage.add(prior);
                }
                resources::invalidate_shadow(display, &mut self.ignore, win)?;
            }
        }
        self.dispatch_displaced_fade(display, displaced)
    }

    fn handle_property_window_type(&mut self, display: &mut dyn Display, window: WindowId) -> Result<()> {
        let new_type = resources::determine_wintype(display, window, self.type_atom)?;
        let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
        if win.window_type != new_type {
            win.window_type = new_type;
            resources::invalidate_extents(display, win);
            resources::invalidate_shadow(display, &mut self.ignore, win)?;
            self.clip_changed = true;
        }
        Ok(())
    }

    /// Advances every in-flight fade by the number of `fade_delta_ms`
    /// ticks elapsed since the last call, applying each opacity update to
    /// its window and firing completed fades' callbacks.
    fn run_fade_tick(&mut self, display: &mut dyn Display) -> Result<()> {
        let now = Instant::now();
        let delta_ms = self.settings.fade_delta_ms.max(1);
        let steps = match self.last_tick {
            Some(last) => (now.duration_since(last).as_millis() / delta_ms as u128) as u32,
            None => 1,
        };
        self.last_tick = Some(now);
        self.tick_fades(display, steps.max(1))
    }

    /// The pure step-driven core of [`Self::run_fade_tick`], exposed so
    /// tests can advance fades deterministically without depending on wall
    /// clock timing.
    pub fn tick_fades(&mut self, display: &mut dyn Display, steps: u32) -> Result<()> {
        let (updates, finishes) = self.fades.tick(steps);
        for update in updates {
            let Some(win) = self.registry.find_mut(update.window) else { continue };
            win.opacity = update.opacity;
            if let Some(prior) = resources::apply_mode_transition(display, &mut self.ignore, win)? {
                self.damage.add(prior);
            }
            resources::invalidate_shadow(display, &mut self.ignore, win)?;
            let extents =
                win.resources.extents.clone().unwrap_or_else(|| Region::from_rect(win.geometry.outer_rect()));
            self.damage.add(extents);
        }
        for finish in finishes {
            self.dispatch_finish(display, finish)?;
        }
        Ok(())
    }

    fn dispatch_displaced_fade(
        &mut self,
        display: &mut dyn Display,
        displaced: Option<FadeFinish>,
    ) -> Result<()> {
        match displaced {
            Some(finish) => self.dispatch_finish(display, finish),
            None => Ok(()),
        }
    }

    fn dispatch_finish(&mut self, display: &mut dyn Display, finish: FadeFinish) -> Result<()> {
        match finish {
            FadeFinish::None => Ok(()),
            FadeFinish::UnmapFinish(window) => self.finish_unmap(display, window),
            FadeFinish::DestroyFinish(window, _gone) => self.teardown_window(display, window),
        }
    }

    fn finish_unmap(&mut self, display: &mut dyn Display, window: WindowId) -> Result<()> {
        let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
        resources::invalidate_picture(display, &mut self.ignore, win)?;
        resources::invalidate_border_size(display, win);
        resources::invalidate_extents(display, win);
        resources::invalidate_border_clip(win);
        win.fade_key = None;
        Ok(())
    }

    fn destroy_window(&mut self, display: &mut dyn Display, window: WindowId, gone: bool) -> Result<()> {
        let fade_out = self.settings.fade_on_map_unmap;
        let fade_out_step = self.settings.fade_out_step;

        let existing_fade = self.registry.find(window).and_then(|w| w.fade_key);
        if let Some(key) = existing_fade {
            self.fades.cancel(key);
            if let Some(win) = self.registry.find_mut(window) {
                win.fade_key = None;
            }
        }

        let has_pixmap = self.registry.find(window).is_some_and(|w| w.resources.pixmap.is_some());
        if fade_out && has_pixmap {
            let Some(win) = self.registry.find_mut(window) else { return Ok(()) };
            let start = win.opacity as f64 / OPAQUE as f64;
            let (key, _) = self.fades.enqueue(
                None,
                window,
                start,
                0.0,
                -fade_out_step,
                FadeFinish::DestroyFinish(window, gone),
                true,
            );
            win.fade_key = Some(key);
            Ok(())
        } else {
            self.teardown_window(display, window)
        }
    }

    fn teardown_window(&mut self, display: &mut dyn Display, window: WindowId) -> Result<()> {
        let Some(mut win) = self.registry.remove(window) else { return Ok(()) };
        let extents =
            win.resources.extents.clone().unwrap_or_else(|| Region::from_rect(win.geometry.outer_rect()));
        self.damage.add(extents);

        resources::invalidate_picture(display, &mut self.ignore, &mut win)?;
        resources::invalidate_border_size(display, &mut win);
        resources::invalidate_extents(display, &mut win);
        resources::invalidate_border_clip(&mut win);
        if let Some(damage_id) = win.damage_id.take() {
            self.ignore.note_ignorable(display.next_request_serial());
            display.destroy_damage(damage_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompositorSettings;
    use crate::display::mock::RecordingDisplay;
    use crate::geometry::Rectangle;
    use crate::window::record::Geometry as Geom;

    fn started(root: Rectangle) -> (RecordingDisplay, Compositor) {
        let mut display = RecordingDisplay::new(root);
        let compositor = Compositor::start(&mut display, 0, CompositorSettings::default()).unwrap();
        (display, compositor)
    }

    #[test]
    fn startup_enumerates_existing_children_in_stacking_order() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 800, 600));
        display.set_children(0, vec![1, 2, 3]);
        for id in [1, 2, 3] {
            display.set_geometry(id, Geom { x: 0, y: 0, width: 10, height: 10, border_width: 0 });
        }
        let compositor = Compositor::start(&mut display, 0, CompositorSettings::default()).unwrap();
        let ids: Vec<_> = compositor.registry().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn second_manager_present_is_reported_as_an_error() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 800, 600));
        display.set_selection_outcome(crate::display::SelectionOutcome::AlreadyOwned {
            incumbent_name: Some("other-compositor".to_string()),
        });
        let err = Compositor::start(&mut display, 0, CompositorSettings::default()).unwrap_err();
        assert!(matches!(err, CompositorError::AnotherManagerRunning(name) if name == "other-compositor"));
    }

    #[test]
    fn create_notify_then_map_notify_makes_window_paintable() {
        let (mut display, mut compositor) = started(Rectangle::new(0, 0, 800, 600));
        display.set_geometry(5, Geom { x: 10, y: 10, width: 50, height: 50, border_width: 0 });
        display.push_event(ServerEvent::CreateNotify { window: 5 });
        display.push_event(ServerEvent::MapNotify { window: 5 });
        display.push_event(ServerEvent::DamageNotify { window: 5, area: Rectangle::new(0, 0, 50, 50) });
        compositor.run_iteration(&mut display).unwrap();

        let win = compositor.registry().find(5).unwrap();
        assert!(win.is_mapped());
        assert!(win.damaged);
        assert!(compositor.pending_damage().is_empty());
    }

    #[test]
    fn destroy_without_fade_removes_window_and_damages_vacated_area() {
        let (mut display, mut compositor) = started(Rectangle::new(0, 0, 800, 600));
        display.set_geometry(5, Geom { x: 10, y: 10, width: 50, height: 50, border_width: 0 });
        display.push_event(ServerEvent::CreateNotify { window: 5 });
        display.push_event(ServerEvent::DestroyNotify { window: 5 });
        compositor.run_iteration(&mut display).unwrap();
        assert!(compositor.registry().find(5).is_none());
    }

    #[test]
    fn destroy_with_fade_configured_defers_removal_until_fade_completes() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 800, 600));
        let settings = CompositorSettings::default().with_fade_on_map_unmap(true);
        let mut compositor = Compositor::start(&mut display, 0, settings).unwrap();
        display.set_geometry(5, Geom { x: 10, y: 10, width: 50, height: 50, border_width: 0 });
        display.push_event(ServerEvent::CreateNotify { window: 5 });
        display.push_event(ServerEvent::MapNotify { window: 5 });
        display.push_event(ServerEvent::DamageNotify { window: 5, area: Rectangle::new(0, 0, 50, 50) });
        compositor.run_iteration(&mut display).unwrap();

        display.push_event(ServerEvent::DestroyNotify { window: 5 });
        compositor.run_iteration(&mut display).unwrap();
        // Window is still tracked: the fade-out has not completed yet.
        assert!(compositor.registry().find(5).is_some());

        for _ in 0..200 {
            compositor.tick_fades(&mut display, 1).unwrap();
        }
        assert!(compositor.registry().find(5).is_none());
    }

    #[test]
    fn damage_coalesces_across_one_drain_into_a_single_union() {
        let (mut display, mut compositor) = started(Rectangle::new(0, 0, 800, 600));
        display.set_geometry(5, Geom { x: 0, y: 0, width: 100, height: 100, border_width: 0 });
        display.push_event(ServerEvent::CreateNotify { window: 5 });
        display.push_event(ServerEvent::MapNotify { window: 5 });
        display.push_event(ServerEvent::DamageNotify { window: 5, area: Rectangle::new(0, 0, 100, 100) });
        for i in 0..10 {
            display.push_event(ServerEvent::DamageNotify { window: 5, area: Rectangle::new(i, i, 5, 5) });
        }
        compositor.run_iteration(&mut display).unwrap();
        // One repaint call for the whole drain, not one per damage event.
        let presents = display.calls.iter().filter(|c| *c == "present").count();
        assert_eq!(presents, 1);
    }

    #[test]
    fn circulate_notify_moves_window_in_registry() {
        let (mut display, mut compositor) = started(Rectangle::new(0, 0, 800, 600));
        for id in [1, 2] {
            display.set_geometry(id, Geom { x: 0, y: 0, width: 10, height: 10, border_width: 0 });
            display.push_event(ServerEvent::CreateNotify { window: id });
        }
        display.push_event(ServerEvent::CirculateNotify { window: 1, place_on_top: true });
        compositor.run_iteration(&mut display).unwrap();
        let ids: Vec<_> = compositor.registry().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
