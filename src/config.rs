//! Compositor Settings
//!
//! Mirrors the teacher's `RendererSettings` shape: a plain struct with a
//! `Default` impl and `with_*` builder methods. Parsing the CLI surface
//! (`-r`, `-o`, `-l`, ...) into this struct is out of scope per spec §1;
//! the struct itself, and the values it carries, are not.

/// Overall painting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// No shadows; windows composited with opacity only.
    Simple,
    /// Shadows synthesized from the window's own alpha channel.
    ServerShadows,
    /// Shadows synthesized from the precomputed gaussian kernel.
    #[default]
    ClientShadows,
}

/// The fixed shadow offset used in [`CompositeMode::ServerShadows`] mode.
pub const SERVER_SHADOW_OFFSET: (i32, i32) = (2, 7);

/// Full opacity, per `_NET_WM_WINDOW_OPACITY`'s convention.
pub const OPAQUE: u32 = 0xFFFF_FFFF;

/// Tunable parameters for the compositing engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorSettings {
    /// Overall painting strategy.
    pub mode: CompositeMode,
    /// Gaussian shadow radius, in pixels.
    pub shadow_radius: f64,
    /// Base shadow opacity (before per-window opacity scaling) in `[0,1]`.
    pub shadow_opacity: f64,
    /// Client-shadow horizontal offset, in pixels. Unused in
    /// `ServerShadows` mode, which always uses [`SERVER_SHADOW_OFFSET`].
    pub shadow_offset_x: i32,
    /// Client-shadow vertical offset, in pixels.
    pub shadow_offset_y: i32,
    /// Opacity step applied per fade tick when fading a window in.
    pub fade_in_step: f64,
    /// Opacity step applied per fade tick when fading a window out.
    pub fade_out_step: f64,
    /// Milliseconds between fade ticks.
    pub fade_delta_ms: u64,
    /// Animate opacity on map/unmap.
    pub fade_on_map_unmap: bool,
    /// Animate opacity when `_NET_WM_WINDOW_OPACITY` changes mid-life.
    pub fade_on_opacity_change: bool,
    /// Suppress shadows on dock-type windows.
    pub exclude_dock_shadows: bool,
    /// Request the server run synchronously (debugging aid).
    pub synchronize: bool,
    /// Alias the off-screen buffer directly onto the root picture, so every
    /// repaint is visible even outside the damaged region (debugging aid
    /// for watching the repaint pattern live).
    pub debug_monitor_repaint: bool,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            mode: CompositeMode::default(),
            shadow_radius: 12.0,
            shadow_opacity: 0.75,
            shadow_offset_x: -15,
            shadow_offset_y: -15,
            fade_in_step: 0.028,
            fade_out_step: 0.03,
            fade_delta_ms: 10,
            fade_on_map_unmap: false,
            fade_on_opacity_change: false,
            exclude_dock_shadows: false,
            synchronize: false,
            debug_monitor_repaint: false,
        }
    }
}

impl CompositorSettings {
    pub fn with_mode(mut self, mode: CompositeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_shadow_radius(mut self, radius: f64) -> Self {
        self.shadow_radius = radius;
        self
    }

    pub fn with_shadow_opacity(mut self, opacity: f64) -> Self {
        self.shadow_opacity = opacity;
        self
    }

    pub fn with_shadow_offset(mut self, x: i32, y: i32) -> Self {
        self.shadow_offset_x = x;
        self.shadow_offset_y = y;
        self
    }

    pub fn with_fade_steps(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade_in_step = fade_in;
        self.fade_out_step = fade_out;
        self
    }

    pub fn with_fade_delta_ms(mut self, delta_ms: u64) -> Self {
        self.fade_delta_ms = delta_ms;
        self
    }

    pub fn with_fade_on_map_unmap(mut self, enabled: bool) -> Self {
        self.fade_on_map_unmap = enabled;
        self
    }

    pub fn with_fade_on_opacity_change(mut self, enabled: bool) -> Self {
        self.fade_on_opacity_change = enabled;
        self
    }

    pub fn with_exclude_dock_shadows(mut self, enabled: bool) -> Self {
        self.exclude_dock_shadows = enabled;
        self
    }

    pub fn with_synchronize(mut self, enabled: bool) -> Self {
        self.synchronize = enabled;
        self
    }

    pub fn with_debug_monitor_repaint(mut self, enabled: bool) -> Self {
        self.debug_monitor_repaint = enabled;
        self
    }

    /// Effective shadow offset for the current [`CompositeMode`].
    pub fn shadow_offset(&self) -> (i32, i32) {
        match self.mode {
            CompositeMode::ServerShadows => SERVER_SHADOW_OFFSET,
            _ => (self.shadow_offset_x, self.shadow_offset_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_original_constants() {
        let s = CompositorSettings::default();
        assert_eq!(s.shadow_radius, 12.0);
        assert_eq!(s.shadow_opacity, 0.75);
        assert_eq!(s.fade_in_step, 0.028);
        assert_eq!(s.fade_out_step, 0.03);
        assert_eq!(s.fade_delta_ms, 10);
    }

    #[test]
    fn server_shadows_mode_overrides_configured_offset() {
        let s = CompositorSettings::default()
            .with_mode(CompositeMode::ServerShadows)
            .with_shadow_offset(-99, -99);
        assert_eq!(s.shadow_offset(), SERVER_SHADOW_OFFSET);
    }

    #[test]
    fn client_shadows_mode_uses_configured_offset() {
        let s = CompositorSettings::default()
            .with_mode(CompositeMode::ClientShadows)
            .with_shadow_offset(-20, -10);
        assert_eq!(s.shadow_offset(), (-20, -10));
    }
}
