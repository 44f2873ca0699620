//! The real [`Display`] backend, over `x11rb`'s synchronous
//! `RustConnection`.
//!
//! Grounded in the sync-connection compositor sketches in this codebase's
//! reference corpus (an `x11rb`-over-`RustConnection` compositor using the
//! `composite`/`damage`/`xfixes` extension modules the same way): extension
//! versions are negotiated once at connect time, and every operation below
//! is a thin wrapper translating one `Display` method into one (or a small
//! fixed number of) requests.

use super::atoms::AtomCache;
use super::{Display, PictOp, SelectionOutcome, ServerEvent};
use crate::error::{CompositorError, Result};
use crate::geometry::{AtomId, Rectangle, Region, WindowId};
use crate::shadow::AlphaImage;
use crate::window::record::{Geometry, VisualClass};

use x11rb::connection::Connection;
use x11rb::protocol::composite::{self, ConnectionExt as _};
use x11rb::protocol::damage::{self, ConnectionExt as _};
use x11rb::protocol::render::{self, ConnectionExt as _, PictType};
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xfixes::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _, ChangeWindowAttributesAux, EventMask};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const COMPOSITE_MAJOR: u32 = 0;
const COMPOSITE_MINOR: u32 = 4;

/// Render picture formats cached once at startup.
struct PictFormats {
    argb32: render::Pictformat,
    rgb24: render::Pictformat,
    a8: render::Pictformat,
}

pub struct X11Display {
    conn: RustConnection,
    screen_num: usize,
    root: WindowId,
    root_geometry: Rectangle,
    formats: PictFormats,
    root_buffer_picture: u32,
    root_picture: u32,
    opacity_atom: AtomId,
    type_atom: AtomId,
    rootpmap_atom: AtomId,
    xsetroot_atom: AtomId,
    synchronous: bool,
    /// The engine's single suspension point (§5): a `mio::Poll` registered
    /// once against the connection's fd, reused for every wait.
    mio_poll: mio::Poll,
    mio_events: mio::Events,
    serial_counter: std::cell::Cell<u64>,
    /// Caches every distinct `InternAtom` lookup so the hot property-change
    /// dispatch path (`determine_wintype`'s recursive child walk included)
    /// never repeats a round trip for a name it has already resolved.
    atom_cache: AtomCache,
}

const CONNECTION_TOKEN: mio::Token = mio::Token(0);

impl X11Display {
    /// Connects, negotiates the required extensions, and prepares the
    /// root-level pictures. Any missing extension is a fatal startup
    /// error per §6/§7.
    pub fn connect(display_name: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display_name)
            .map_err(|e| CompositorError::ConnectFailed(e.to_string()))?;

        {
            let reply = conn
                .composite_query_version(COMPOSITE_MAJOR, COMPOSITE_MINOR)?
                .reply()?;
            if reply.major_version == 0 && reply.minor_version == 0 {
                return Err(CompositorError::MissingExtension("Composite"));
            }
        }
        conn.damage_query_version(1, 1)?
            .reply()
            .map_err(|_| CompositorError::MissingExtension("Damage"))?;
        conn.xfixes_query_version(5, 0)?
            .reply()
            .map_err(|_| CompositorError::MissingExtension("XFixes"))?;
        conn.render_query_version(0, 11)?
            .reply()
            .map_err(|_| CompositorError::MissingExtension("Render"))?;
        conn.shape_query_version()?
            .reply()
            .map_err(|_| CompositorError::MissingExtension("Shape"))?;

        let root = conn.setup().roots[screen_num].root;
        let geometry = conn.get_geometry(root)?.reply()?;
        let root_geometry =
            Rectangle::new(0, 0, geometry.width as u32, geometry.height as u32);

        let formats = Self::query_formats(&conn)?;

        let root_buffer_pixmap = conn.generate_id()?;
        conn.create_pixmap(
            geometry.depth,
            root_buffer_pixmap,
            root,
            geometry.width,
            geometry.height,
        )?
        .check()?;
        let root_buffer_picture = conn.generate_id()?;
        conn.render_create_picture(
            root_buffer_picture,
            root_buffer_pixmap,
            formats.rgb24,
            &render::CreatePictureAux::default(),
        )?
        .check()?;
        conn.free_pixmap(root_buffer_pixmap)?.check()?;

        let root_picture = conn.generate_id()?;
        conn.render_create_picture(
            root_picture,
            root,
            formats.rgb24,
            &render::CreatePictureAux::new().subwindow_mode(xproto::SubwindowMode::INCLUDE_INFERIORS),
        )?
        .check()?;

        let mut atom_cache = AtomCache::new();
        atom_cache.preload(|name| Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom))?;
        let opacity_atom = atom_cache.get(crate::display::atoms::NET_WM_WINDOW_OPACITY).unwrap();
        let type_atom = atom_cache.get(crate::display::atoms::NET_WM_WINDOW_TYPE).unwrap();
        let rootpmap_atom = atom_cache.get(crate::display::atoms::XROOTPMAP_ID).unwrap();
        let xsetroot_atom = atom_cache.get(crate::display::atoms::XSETROOT_ID).unwrap();

        let mio_poll = mio::Poll::new()?;
        {
            use std::os::unix::io::AsRawFd;
            let fd = conn.as_raw_fd();
            mio_poll
                .registry()
                .register(&mut mio::unix::SourceFd(&fd), CONNECTION_TOKEN, mio::Interest::READABLE)?;
        }

        Ok(Self {
            conn,
            screen_num,
            root,
            root_geometry,
            formats,
            root_buffer_picture,
            root_picture,
            opacity_atom,
            type_atom,
            rootpmap_atom,
            xsetroot_atom,
            synchronous: false,
            mio_poll,
            mio_events: mio::Events::with_capacity(1),
            serial_counter: std::cell::Cell::new(1),
            atom_cache,
        })
    }

    fn query_formats(conn: &RustConnection) -> Result<PictFormats> {
        let formats = conn.render_query_pict_formats()?.reply()?;
        let mut argb32 = None;
        let mut rgb24 = None;
        let mut a8 = None;
        for fmt in &formats.formats {
            if fmt.type_ != PictType::DIRECT {
                continue;
            }
            let is_rgb_masks = fmt.direct.red_mask == 0xff
                && fmt.direct.green_mask == 0xff
                && fmt.direct.blue_mask == 0xff;
            match (fmt.depth, is_rgb_masks, fmt.direct.alpha_mask) {
                (32, true, 0xff) => argb32 = Some(fmt.id),
                (24, true, 0) => rgb24 = Some(fmt.id),
                (8, false, 0xff) => a8 = Some(fmt.id),
                _ => {}
            }
        }
        Ok(PictFormats {
            argb32: argb32.ok_or(CompositorError::MissingExtension("Render ARGB32 format"))?,
            rgb24: rgb24.ok_or(CompositorError::MissingExtension("Render RGB24 format"))?,
            a8: a8.ok_or(CompositorError::MissingExtension("Render A8 format"))?,
        })
    }

    fn to_xfixes_region(&self, region: &Region) -> Result<xfixes::Region> {
        let id = self.conn.generate_id()?;
        let rects: Vec<xproto::Rectangle> = region
            .rects()
            .iter()
            .map(|r| xproto::Rectangle {
                x: r.x as i16,
                y: r.y as i16,
                width: r.width as u16,
                height: r.height as u16,
            })
            .collect();
        self.conn.xfixes_create_region(id, &rects)?.check()?;
        Ok(id)
    }

    fn translate_event(&mut self, event: Event) -> Result<ServerEvent> {
        Ok(match event {
            Event::CreateNotify(e) => ServerEvent::CreateNotify { window: e.window },
            Event::ConfigureNotify(e) if e.window == self.root => {
                ServerEvent::ConfigureNotifyRoot { width: e.width as u32, height: e.height as u32 }
            }
            Event::ConfigureNotify(e) => ServerEvent::ConfigureNotifyWindow {
                window: e.window,
                geometry: Geometry {
                    x: e.x as i32,
                    y: e.y as i32,
                    width: e.width as u32,
                    height: e.height as u32,
                    border_width: e.border_width as u32,
                },
                sibling_below: if e.above_sibling == 0 { None } else { Some(e.above_sibling) },
            },
            Event::DestroyNotify(e) => ServerEvent::DestroyNotify { window: e.window },
            Event::MapNotify(e) => ServerEvent::MapNotify { window: e.window },
            Event::UnmapNotify(e) => ServerEvent::UnmapNotify { window: e.window },
            Event::ReparentNotify(e) => ServerEvent::ReparentNotify {
                window: e.window,
                parent: e.parent,
                is_root: e.parent == self.root,
            },
            Event::CirculateNotify(e) => ServerEvent::CirculateNotify {
                window: e.window,
                place_on_top: e.place == xproto::Circulate::RAISE_LOWEST,
            },
            Event::Expose(e) if e.window == self.root => {
                let rect = Rectangle::new(e.x as i32, e.y as i32, e.width as u32, e.height as u32);
                ServerEvent::ExposeRoot { rect, count: e.count }
            }
            Event::PropertyNotify(e) if e.atom == self.opacity_atom => {
                ServerEvent::PropertyNotifyOpacity { window: e.window }
            }
            Event::PropertyNotify(e) if e.atom == self.type_atom => {
                ServerEvent::PropertyNotifyWindowType { window: e.window }
            }
            Event::PropertyNotify(e)
                if e.window == self.root
                    && (e.atom == self.rootpmap_atom || e.atom == self.xsetroot_atom) =>
            {
                ServerEvent::PropertyNotifyBackground
            }
            Event::PropertyNotify(_) => ServerEvent::Other,
            Event::DamageNotify(e) => ServerEvent::DamageNotify {
                window: e.drawable,
                area: Rectangle::new(
                    e.area.x as i32,
                    e.area.y as i32,
                    e.area.width as u32,
                    e.area.height as u32,
                ),
            },
            Event::ShapeNotify(e) => ServerEvent::ShapeNotify {
                window: e.affected_window,
                shaped: e.shaped,
                bounds: Rectangle::new(e.x as i32, e.y as i32, e.width as u32, e.height as u32),
            },
            Event::Error(e) => ServerEvent::UnhandledError {
                error_code: e.error_code,
                request_opcode: e.major_opcode,
                minor_opcode: e.minor_opcode,
                serial: e.sequence as u64,
            },
            _ => ServerEvent::Other,
        })
    }
}

impl Display for X11Display {
    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn next_request_serial(&self) -> u64 {
        // `x11rb`'s synchronous `RustConnection` does not expose the wire
        // sequence number a not-yet-sent request will receive (Xlib's
        // `XNextRequest` has no equivalent here). Every "might legitimately
        // fail" request this backend issues is checked synchronously via
        // `.check()`, so its success/failure is known on the same call and
        // the ignore-set's serial matching is not load-bearing for this
        // backend — this counter only keeps `IgnoreSet::note_ignorable`
        // callable uniformly across backends. `RecordingDisplay` drives the
        // real async, serial-matched behaviour for ignore-set tests.
        let next = self.serial_counter.get();
        self.serial_counter.set(next + 1);
        next
    }

    fn poll(&mut self, timeout_ms: Option<u64>) -> Result<bool> {
        let timeout = timeout_ms.map(std::time::Duration::from_millis);
        self.mio_poll.poll(&mut self.mio_events, timeout)?;
        Ok(self.mio_events.iter().next().is_some())
    }

    fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        match self.conn.poll_for_event()? {
            Some(event) => Ok(Some(self.translate_event(event)?)),
            None => Ok(None),
        }
    }

    fn root_window(&self) -> WindowId {
        self.root
    }

    fn root_geometry(&self) -> Rectangle {
        self.root_geometry
    }

    fn screen_num(&self) -> usize {
        self.screen_num
    }

    fn acquire_manager_selection(&mut self, screen: usize) -> Result<SelectionOutcome> {
        let selection_name = format!("_NET_WM_CM_S{screen}");
        let selection_atom = self.conn.intern_atom(false, selection_name.as_bytes())?.reply()?.atom;

        let owner = self.conn.get_selection_owner(selection_atom)?.reply()?.owner;
        if owner != 0 {
            let incumbent_name = self.window_title(owner)?;
            return Ok(SelectionOutcome::AlreadyOwned { incumbent_name });
        }

        let helper = self.conn.generate_id()?;
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                helper,
                self.root,
                -1,
                -1,
                1,
                1,
                0,
                xproto::WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &xproto::CreateWindowAux::default(),
            )?
            .check()
            .map_err(|e| CompositorError::SelectionAcquisitionFailed(e.to_string()))?;

        let net_wm_name = self.conn.intern_atom(false, b"_NET_WM_NAME")?.reply()?.atom;
        let utf8_string = self.conn.intern_atom(false, b"UTF8_STRING")?.reply()?.atom;
        let title = b"xcompositord";
        self.conn
            .change_property8(xproto::PropMode::REPLACE, helper, net_wm_name, utf8_string, title)?
            .check()
            .map_err(|e| CompositorError::SelectionAcquisitionFailed(e.to_string()))?;

        self.conn
            .set_selection_owner(helper, selection_atom, x11rb::CURRENT_TIME)?
            .check()
            .map_err(|e| CompositorError::SelectionAcquisitionFailed(e.to_string()))?;

        let confirmed = self.conn.get_selection_owner(selection_atom)?.reply()?.owner;
        if confirmed != helper {
            return Err(CompositorError::SelectionAcquisitionFailed(
                "selection ownership was not confirmed".to_string(),
            ));
        }
        Ok(SelectionOutcome::Acquired)
    }

    fn select_root_input(&mut self) -> Result<()> {
        let mask = EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::EXPOSURE
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE;
        self.conn
            .change_window_attributes(self.root, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()?;
        self.conn
            .shape_select_input(self.root, true)?
            .check()?;
        Ok(())
    }

    fn redirect_subwindows(&mut self, automatic: bool) -> Result<()> {
        let mode =
            if automatic { composite::Redirect::AUTOMATIC } else { composite::Redirect::MANUAL };
        self.conn
            .composite_redirect_subwindows(self.root, mode)?
            .check()
            .map_err(|e| CompositorError::RedirectFailed(e.to_string()))
    }

    fn query_tree_children(&mut self, window: WindowId) -> Result<Vec<WindowId>> {
        Ok(self.conn.query_tree(window)?.reply()?.children)
    }

    fn resize_root(&mut self, width: u32, height: u32) -> Result<()> {
        self.conn.render_free_picture(self.root_buffer_picture)?.check()?;

        let root_buffer_pixmap = self.conn.generate_id()?;
        let depth = self.conn.get_geometry(self.root)?.reply()?.depth;
        self.conn
            .create_pixmap(depth, root_buffer_pixmap, self.root, width as u16, height as u16)?
            .check()?;
        self.conn
            .render_create_picture(
                self.root_buffer_picture,
                root_buffer_pixmap,
                self.formats.rgb24,
                &render::CreatePictureAux::default(),
            )?
            .check()?;
        self.conn.free_pixmap(root_buffer_pixmap)?.check()?;

        self.root_geometry = Rectangle::new(0, 0, width, height);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.conn.flush()?;
        self.conn.get_input_focus()?.reply()?;
        Ok(())
    }

    fn window_geometry(&mut self, window: WindowId) -> Result<Geometry> {
        let g = self.conn.get_geometry(window)?.reply()?;
        Ok(Geometry {
            x: g.x as i32,
            y: g.y as i32,
            width: g.width as u32,
            height: g.height as u32,
            border_width: g.border_width as u32,
        })
    }

    fn window_visual_class(&mut self, window: WindowId) -> Result<VisualClass> {
        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        if attrs.class == xproto::WindowClass::INPUT_ONLY {
            return Ok(VisualClass::InputOnly);
        }
        let depth = self.conn.get_geometry(window)?.reply()?.depth;
        Ok(VisualClass::Drawable { has_alpha: depth == 32 })
    }

    fn window_is_viewable(&mut self, window: WindowId) -> Result<bool> {
        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        Ok(attrs.map_state == xproto::MapState::VIEWABLE)
    }

    fn select_window_input(&mut self, window: WindowId) -> Result<()> {
        let mask = EventMask::PROPERTY_CHANGE;
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()?;
        self.conn.shape_select_input(window, true)?.check()?;
        Ok(())
    }

    fn deselect_window_input(&mut self, window: WindowId) -> Result<()> {
        // The window may already be gone server-side by the time an
        // UnmapNotify/DestroyNotify reaches us; BadWindow here is expected
        // and silenceable, not a real failure (§4.1, §7).
        let _ = self
            .conn
            .change_window_attributes(
                window,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::NO_EVENT),
            )?
            .check();
        Ok(())
    }

    fn window_shape_bounds(&mut self, window: WindowId) -> Result<(bool, Rectangle)> {
        let extents = self.conn.shape_query_extents(window)?.reply()?;
        let bounds = Rectangle::new(
            extents.bounding_shape_extents_x as i32,
            extents.bounding_shape_extents_y as i32,
            extents.bounding_shape_extents_width as u32,
            extents.bounding_shape_extents_height as u32,
        );
        Ok((extents.bounding_shaped, bounds))
    }

    fn intern_atom(&mut self, name: &str) -> Result<AtomId> {
        let conn = &self.conn;
        self.atom_cache.get_or_intern(name, &mut |n| {
            Ok(conn.intern_atom(false, n.as_bytes())?.reply()?.atom)
        })
    }

    fn get_cardinal_property(&mut self, window: WindowId, atom: AtomId) -> Result<Option<u32>> {
        let reply = self
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::CARDINAL, 0, 1)?
            .reply()?;
        Ok(reply.value32().and_then(|mut v| v.next()))
    }

    fn get_atom_list_property(&mut self, window: WindowId, atom: AtomId) -> Result<Vec<AtomId>> {
        let reply = self
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::ATOM, 0, 32)?
            .reply()?;
        Ok(reply.value32().map(|v| v.collect()).unwrap_or_default())
    }

    fn get_pixmap_property(&mut self, window: WindowId, atom: AtomId) -> Result<Option<u32>> {
        let reply = self
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::PIXMAP, 0, 1)?
            .reply()?;
        Ok(reply.value32().and_then(|mut v| v.next()))
    }

    fn get_text_property(&mut self, window: WindowId, atom: AtomId) -> Result<Option<String>> {
        let reply = self
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::ANY, 0, 256)?
            .reply()?;
        if reply.value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
        }
    }

    fn name_window_pixmap(&mut self, window: WindowId) -> Result<Option<u32>> {
        let pixmap = self.conn.generate_id()?;
        match self.conn.composite_name_window_pixmap(window, pixmap)?.check() {
            Ok(()) => Ok(Some(pixmap)),
            Err(_) => Ok(None),
        }
    }

    fn free_pixmap(&mut self, pixmap: u32) -> Result<()> {
        // Teardown of an already-destroyed window's resources: BadPixmap is
        // expected, not an error (§4.1, §7).
        let _ = self.conn.free_pixmap(pixmap)?.check();
        Ok(())
    }

    fn create_picture(&mut self, drawable: u32, has_alpha: bool) -> Result<u32> {
        let picture = self.conn.generate_id()?;
        let format = if has_alpha { self.formats.argb32 } else { self.formats.rgb24 };
        self.conn
            .render_create_picture(
                picture,
                drawable,
                format,
                &render::CreatePictureAux::new()
                    .subwindow_mode(xproto::SubwindowMode::INCLUDE_INFERIORS),
            )?
            .check()?;
        Ok(picture)
    }

    fn free_picture(&mut self, picture: u32) -> Result<()> {
        // Same race as `free_pixmap`: BadPicture on a gone window is expected.
        let _ = self.conn.render_free_picture(picture)?.check();
        Ok(())
    }

    fn create_solid_fill(&mut self, argb: (u16, u16, u16, u16)) -> Result<u32> {
        let picture = self.conn.generate_id()?;
        let (a, r, g, b) = (argb.3, argb.0, argb.1, argb.2);
        self.conn
            .render_create_solid_fill(picture, render::Color { red: r, green: g, blue: b, alpha: a })?
            .check()?;
        Ok(picture)
    }

    fn upload_shadow_mask(&mut self, image: &AlphaImage) -> Result<u32> {
        let pixmap = self.conn.generate_id()?;
        self.conn
            .create_pixmap(8, pixmap, self.root, image.width as u16, image.height as u16)?
            .check()?;
        let gc = self.conn.generate_id()?;
        self.conn.create_gc(gc, pixmap, &xproto::CreateGCAux::default())?.check()?;
        self.conn
            .put_image(
                xproto::ImageFormat::Z_PIXMAP,
                pixmap,
                gc,
                image.width as u16,
                image.height as u16,
                0,
                0,
                0,
                8,
                image.as_bytes(),
            )?
            .check()?;
        self.conn.free_gc(gc)?.check()?;

        let picture = self.conn.generate_id()?;
        self.conn
            .render_create_picture(picture, pixmap, self.formats.a8, &render::CreatePictureAux::default())?
            .check()?;
        self.conn.free_pixmap(pixmap)?.check()?;
        Ok(picture)
    }

    fn create_damage(&mut self, window: WindowId) -> Result<u32> {
        let damage = self.conn.generate_id()?;
        self.conn
            .damage_create(damage, window, damage::ReportLevel::NON_EMPTY)?
            .check()?;
        Ok(damage)
    }

    fn destroy_damage(&mut self, damage: u32) -> Result<()> {
        // Same race again: BadDamage on a gone window is expected.
        let _ = self.conn.damage_destroy(damage)?.check();
        Ok(())
    }

    fn fetch_and_clear_damage(&mut self, damage: u32) -> Result<Region> {
        let region_id = self.conn.generate_id()?;
        self.conn.xfixes_create_region(region_id, &[])?.check()?;
        self.conn
            .damage_subtract(damage, x11rb::NONE, region_id)?
            .check()?;
        let reply = self.conn.xfixes_fetch_region(region_id)?.reply()?;
        self.conn.xfixes_destroy_region(region_id)?.check()?;
        let rects = reply
            .rectangles
            .into_iter()
            .map(|r| Rectangle::new(r.x as i32, r.y as i32, r.width as u32, r.height as u32));
        Ok(Region::from_rects(rects))
    }

    fn root_tile_picture(&mut self, rootpmap_atom: AtomId, xsetroot_atom: AtomId) -> Result<u32> {
        let pixmap = self
            .get_pixmap_property(self.root, rootpmap_atom)?
            .or(self.get_pixmap_property(self.root, xsetroot_atom)?);

        let picture = self.conn.generate_id()?;
        match pixmap {
            Some(pixmap) => {
                self.conn
                    .render_create_picture(
                        picture,
                        pixmap,
                        self.formats.rgb24,
                        &render::CreatePictureAux::new().repeat(render::Repeat::NORMAL),
                    )?
                    .check()?;
            }
            None => {
                self.conn
                    .render_create_solid_fill(picture, render::Color { red: 0, green: 0, blue: 0, alpha: 0xffff })?
                    .check()?;
            }
        }
        Ok(picture)
    }

    fn border_size_region(
        &mut self,
        window: WindowId,
        geometry: &Geometry,
        _shaped: bool,
        _shape_bounds: Rectangle,
    ) -> Result<Region> {
        let region_id = self.conn.generate_id()?;
        self.conn
            .xfixes_create_region_from_window(region_id, window, shape::Kind::BOUNDING)?
            .check()?;
        let reply = self.conn.xfixes_fetch_region(region_id)?.reply()?;
        self.conn.xfixes_destroy_region(region_id)?.check()?;
        let rects = reply.rectangles.into_iter().map(|r| {
            Rectangle::new(
                geometry.x + r.x as i32,
                geometry.y + r.y as i32,
                r.width as u32,
                r.height as u32,
            )
        });
        Ok(Region::from_rects(rects))
    }

    fn set_picture_clip(&mut self, picture: u32, region: &Region) -> Result<()> {
        let region_id = self.to_xfixes_region(region)?;
        self.conn.xfixes_set_picture_clip_region(picture, region_id, 0, 0)?.check()?;
        self.conn.xfixes_destroy_region(region_id)?.check()?;
        Ok(())
    }

    fn composite(
        &mut self,
        op: PictOp,
        src: u32,
        mask: Option<u32>,
        dst: u32,
        src_xy: (i32, i32),
        dst_xy: (i32, i32),
        size: (u32, u32),
    ) -> Result<()> {
        let render_op = match op {
            PictOp::Src => render::PictOp::SRC,
            PictOp::Over => render::PictOp::OVER,
        };
        self.conn
            .render_composite(
                render_op,
                src,
                mask.unwrap_or(0),
                dst,
                src_xy.0 as i16,
                src_xy.1 as i16,
                0,
                0,
                dst_xy.0 as i16,
                dst_xy.1 as i16,
                size.0 as u16,
                size.1 as u16,
            )?
            .check()?;
        Ok(())
    }

    fn root_buffer_picture(&self) -> u32 {
        self.root_buffer_picture
    }

    fn root_picture(&self) -> u32 {
        self.root_picture
    }

    fn present(&mut self) -> Result<()> {
        self.conn
            .render_composite(
                render::PictOp::SRC,
                self.root_buffer_picture,
                0,
                self.root_picture,
                0,
                0,
                0,
                0,
                0,
                0,
                self.root_geometry.width as u16,
                self.root_geometry.height as u16,
            )?
            .check()?;
        self.conn.flush()?;
        Ok(())
    }

    fn synchronize(&mut self, enabled: bool) -> Result<()> {
        self.synchronous = enabled;
        Ok(())
    }
}

impl X11Display {
    fn window_title(&mut self, window: WindowId) -> Result<Option<String>> {
        let net_wm_name = self.conn.intern_atom(false, b"_NET_WM_NAME")?.reply()?.atom;
        if let Some(name) = self.get_text_property(window, net_wm_name)? {
            return Ok(Some(name));
        }
        self.get_text_property(window, xproto::AtomEnum::WM_NAME.into())
    }
}

