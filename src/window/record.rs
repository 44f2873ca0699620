//! Per-window state (§3 "Window record") and its cached server-side
//! resources.

use crate::geometry::{Region, WindowId};
use crate::shadow::AlphaImage;

/// Window geometry as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
}

impl Geometry {
    pub fn outer_rect(&self) -> crate::geometry::Rectangle {
        let b = self.border_width as i32;
        crate::geometry::Rectangle::new(
            self.x - b,
            self.y - b,
            self.width + 2 * self.border_width,
            self.height + 2 * self.border_width,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapState {
    #[default]
    Unmapped,
    Viewable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualClass {
    InputOnly,
    #[default]
    Drawable { has_alpha: bool },
}

impl VisualClass {
    pub fn is_input_only(&self) -> bool {
        matches!(self, VisualClass::InputOnly)
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, VisualClass::Drawable { has_alpha: true })
    }
}

/// Derived painting mode, per `determine_mode` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Solid,
    Trans,
    Argb,
}

/// EWMH `_NET_WM_WINDOW_TYPE` classification (§3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    #[default]
    Normal,
}

/// Full opacity, matching [`crate::config::OPAQUE`].
pub const OPAQUE: u32 = crate::config::OPAQUE;

/// Cached server-side resources for one window (§3 resource lifecycle).
///
/// Each field is `None` when the corresponding resource has not been built
/// (or has been invalidated) this frame; dropping or overwriting a `Some`
/// goes through `release`, so there is never a dangling handle that both
/// the record and the server believe is freed.
#[derive(Debug, Clone, Default)]
pub struct WindowResources {
    pub pixmap: Option<u32>,
    pub picture: Option<u32>,
    pub alpha_pict: Option<u32>,
    pub shadow_pict: Option<u32>,
    pub shadow: Option<AlphaImage>,
    pub border_size: Option<Region>,
    pub extents: Option<Region>,
    pub border_clip: Option<Region>,
}

impl WindowResources {
    pub fn is_fully_released(&self) -> bool {
        self.pixmap.is_none()
            && self.picture.is_none()
            && self.alpha_pict.is_none()
            && self.shadow_pict.is_none()
            && self.shadow.is_none()
            && self.border_size.is_none()
            && self.extents.is_none()
            && self.border_clip.is_none()
    }
}

/// One tracked top-level window (§3).
#[derive(Debug, Clone)]
pub struct WindowRecord {
    pub id: WindowId,
    pub geometry: Geometry,
    pub map_state: MapState,
    pub visual_class: VisualClass,
    pub mode: Mode,
    pub opacity: u32,
    pub window_type: WindowType,
    pub damaged: bool,
    pub shaped: bool,
    pub shape_bounds: crate::geometry::Rectangle,
    pub resources: WindowResources,
    /// Server-side `Damage` object subscribed for this window, if any.
    pub damage_id: Option<u32>,
    /// Key into the fade scheduler, if a fade is in flight for this window.
    pub fade_key: Option<crate::fade::FadeKey>,
}

impl WindowRecord {
    pub fn new(id: WindowId, geometry: Geometry, visual_class: VisualClass) -> Self {
        Self {
            id,
            geometry,
            map_state: MapState::Unmapped,
            visual_class,
            mode: Mode::Solid,
            opacity: OPAQUE,
            window_type: WindowType::Normal,
            damaged: false,
            shaped: false,
            shape_bounds: geometry.outer_rect(),
            resources: WindowResources::default(),
            damage_id: None,
            fade_key: None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.map_state, MapState::Viewable)
    }

    pub fn participates_in_compositing(&self) -> bool {
        !self.visual_class.is_input_only()
    }
}
