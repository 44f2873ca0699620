//! An in-memory [`Display`] used by tests.
//!
//! Records every call in call order and returns caller-supplied canned
//! data, so the registry/cache/fade/damage/compositor-pass logic can be
//! exercised without a running X server.

use super::{Display, PictOp, SelectionOutcome, ServerEvent};
use crate::error::Result;
use crate::geometry::{AtomId, Rectangle, Region, WindowId};
use crate::shadow::AlphaImage;
use crate::window::record::{Geometry, VisualClass};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// A fake display backend for unit and integration tests.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub calls: Vec<String>,
    next_serial: u64,
    next_resource_id: u32,
    events: VecDeque<ServerEvent>,

    root_geometry: Rectangle,
    geometries: FxHashMap<WindowId, Geometry>,
    visual_classes: FxHashMap<WindowId, VisualClass>,
    shape_bounds: FxHashMap<WindowId, (bool, Rectangle)>,
    children: FxHashMap<WindowId, Vec<WindowId>>,
    cardinal_props: FxHashMap<(WindowId, AtomId), u32>,
    atom_list_props: FxHashMap<(WindowId, AtomId), Vec<AtomId>>,
    pixmap_props: FxHashMap<(WindowId, AtomId), u32>,
    text_props: FxHashMap<(WindowId, AtomId), String>,
    atom_names: FxHashMap<String, AtomId>,
    next_atom: AtomId,
    damage_regions: FxHashMap<u32, Region>,
    selection_outcome: SelectionOutcome,
    viewable: FxHashMap<WindowId, bool>,
    root_tile: Option<u32>,
}

impl RecordingDisplay {
    pub fn new(root_geometry: Rectangle) -> Self {
        Self {
            root_geometry,
            next_serial: 1,
            next_resource_id: 1,
            next_atom: 1000,
            ..Default::default()
        }
    }

    fn alloc_resource(&mut self) -> u32 {
        let id = self.next_resource_id;
        self.next_resource_id += 1;
        id
    }

    pub fn set_geometry(&mut self, window: WindowId, geometry: Geometry) {
        self.geometries.insert(window, geometry);
    }

    pub fn set_visual_class(&mut self, window: WindowId, class: VisualClass) {
        self.visual_classes.insert(window, class);
    }

    pub fn set_shape_bounds(&mut self, window: WindowId, shaped: bool, bounds: Rectangle) {
        self.shape_bounds.insert(window, (shaped, bounds));
    }

    pub fn set_children(&mut self, window: WindowId, children: Vec<WindowId>) {
        self.children.insert(window, children);
    }

    pub fn set_cardinal_property(&mut self, window: WindowId, atom: AtomId, value: u32) {
        self.cardinal_props.insert((window, atom), value);
    }

    pub fn set_atom_list_property(&mut self, window: WindowId, atom: AtomId, values: Vec<AtomId>) {
        self.atom_list_props.insert((window, atom), values);
    }

    pub fn set_damage_region(&mut self, damage: u32, region: Region) {
        self.damage_regions.insert(damage, region);
    }

    pub fn set_selection_outcome(&mut self, outcome: SelectionOutcome) {
        self.selection_outcome = outcome;
    }

    pub fn push_event(&mut self, event: ServerEvent) {
        self.events.push_back(event);
    }

    pub fn set_viewable(&mut self, window: WindowId, viewable: bool) {
        self.viewable.insert(window, viewable);
    }
}

impl Display for RecordingDisplay {
    fn flush(&mut self) -> Result<()> {
        self.calls.push("flush".into());
        Ok(())
    }

    fn next_request_serial(&self) -> u64 {
        self.next_serial
    }

    fn poll(&mut self, _timeout_ms: Option<u64>) -> Result<bool> {
        Ok(!self.events.is_empty())
    }

    fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        self.next_serial += 1;
        Ok(self.events.pop_front())
    }

    fn root_window(&self) -> WindowId {
        0
    }

    fn root_geometry(&self) -> Rectangle {
        self.root_geometry
    }

    fn screen_num(&self) -> usize {
        0
    }

    fn acquire_manager_selection(&mut self, _screen: usize) -> Result<SelectionOutcome> {
        self.calls.push("acquire_manager_selection".into());
        Ok(self.selection_outcome.clone())
    }

    fn select_root_input(&mut self) -> Result<()> {
        self.calls.push("select_root_input".into());
        Ok(())
    }

    fn redirect_subwindows(&mut self, automatic: bool) -> Result<()> {
        self.calls.push(format!("redirect_subwindows({automatic})"));
        Ok(())
    }

    fn query_tree_children(&mut self, window: WindowId) -> Result<Vec<WindowId>> {
        self.calls.push(format!("query_tree_children({window})"));
        Ok(self.children.get(&window).cloned().unwrap_or_default())
    }

    fn resize_root(&mut self, width: u32, height: u32) -> Result<()> {
        self.calls.push(format!("resize_root({width}, {height})"));
        self.root_geometry = Rectangle::new(0, 0, width, height);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.calls.push("sync".into());
        Ok(())
    }

    fn window_geometry(&mut self, window: WindowId) -> Result<Geometry> {
        self.calls.push(format!("window_geometry({window})"));
        Ok(self.geometries.get(&window).copied().unwrap_or_default())
    }

    fn window_visual_class(&mut self, window: WindowId) -> Result<VisualClass> {
        self.calls.push(format!("window_visual_class({window})"));
        Ok(self
            .visual_classes
            .get(&window)
            .copied()
            .unwrap_or(VisualClass::Drawable { has_alpha: false }))
    }

    fn window_is_viewable(&mut self, window: WindowId) -> Result<bool> {
        self.calls.push(format!("window_is_viewable({window})"));
        Ok(self.viewable.get(&window).copied().unwrap_or(false))
    }

    fn select_window_input(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(format!("select_window_input({window})"));
        Ok(())
    }

    fn deselect_window_input(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(format!("deselect_window_input({window})"));
        Ok(())
    }

    fn window_shape_bounds(&mut self, window: WindowId) -> Result<(bool, Rectangle)> {
        self.calls.push(format!("window_shape_bounds({window})"));
        Ok(self
            .shape_bounds
            .get(&window)
            .copied()
            .unwrap_or((false, Rectangle::default())))
    }

    fn intern_atom(&mut self, name: &str) -> Result<AtomId> {
        self.calls.push(format!("intern_atom({name})"));
        if let Some(&id) = self.atom_names.get(name) {
            return Ok(id);
        }
        let id = self.next_atom;
        self.next_atom += 1;
        self.atom_names.insert(name.to_string(), id);
        Ok(id)
    }

    fn get_cardinal_property(&mut self, window: WindowId, atom: AtomId) -> Result<Option<u32>> {
        self.calls.push(format!("get_cardinal_property({window}, {atom})"));
        Ok(self.cardinal_props.get(&(window, atom)).copied())
    }

    fn get_atom_list_property(&mut self, window: WindowId, atom: AtomId) -> Result<Vec<AtomId>> {
        self.calls.push(format!("get_atom_list_property({window}, {atom})"));
        Ok(self.atom_list_props.get(&(window, atom)).cloned().unwrap_or_default())
    }

    fn get_pixmap_property(&mut self, window: WindowId, atom: AtomId) -> Result<Option<u32>> {
        self.calls.push(format!("get_pixmap_property({window}, {atom})"));
        Ok(self.pixmap_props.get(&(window, atom)).copied())
    }

    fn get_text_property(&mut self, window: WindowId, atom: AtomId) -> Result<Option<String>> {
        self.calls.push(format!("get_text_property({window}, {atom})"));
        Ok(self.text_props.get(&(window, atom)).cloned())
    }

    fn name_window_pixmap(&mut self, window: WindowId) -> Result<Option<u32>> {
        self.calls.push(format!("name_window_pixmap({window})"));
        Ok(Some(self.alloc_resource()))
    }

    fn free_pixmap(&mut self, pixmap: u32) -> Result<()> {
        self.calls.push(format!("free_pixmap({pixmap})"));
        Ok(())
    }

    fn create_picture(&mut self, drawable: u32, has_alpha: bool) -> Result<u32> {
        self.calls.push(format!("create_picture({drawable}, {has_alpha})"));
        Ok(self.alloc_resource())
    }

    fn free_picture(&mut self, picture: u32) -> Result<()> {
        self.calls.push(format!("free_picture({picture})"));
        Ok(())
    }

    fn create_solid_fill(&mut self, argb: (u16, u16, u16, u16)) -> Result<u32> {
        self.calls.push(format!("create_solid_fill({argb:?})"));
        Ok(self.alloc_resource())
    }

    fn upload_shadow_mask(&mut self, image: &AlphaImage) -> Result<u32> {
        self.calls.push(format!("upload_shadow_mask({}x{})", image.width, image.height));
        Ok(self.alloc_resource())
    }

    fn create_damage(&mut self, window: WindowId) -> Result<u32> {
        self.calls.push(format!("create_damage({window})"));
        Ok(self.alloc_resource())
    }

    fn destroy_damage(&mut self, damage: u32) -> Result<()> {
        self.calls.push(format!("destroy_damage({damage})"));
        Ok(())
    }

    fn fetch_and_clear_damage(&mut self, damage: u32) -> Result<Region> {
        self.calls.push(format!("fetch_and_clear_damage({damage})"));
        Ok(self.damage_regions.remove(&damage).unwrap_or_default())
    }

    fn root_tile_picture(&mut self, _rootpmap_atom: AtomId, _xsetroot_atom: AtomId) -> Result<u32> {
        self.calls.push("root_tile_picture".into());
        if let Some(id) = self.root_tile {
            return Ok(id);
        }
        let id = self.alloc_resource();
        self.root_tile = Some(id);
        Ok(id)
    }

    fn border_size_region(
        &mut self,
        window: WindowId,
        geometry: &Geometry,
        _shaped: bool,
        _shape_bounds: Rectangle,
    ) -> Result<Region> {
        self.calls.push(format!("border_size_region({window})"));
        Ok(Region::from_rect(geometry.outer_rect()))
    }

    fn set_picture_clip(&mut self, picture: u32, region: &Region) -> Result<()> {
        self.calls.push(format!("set_picture_clip({picture}, {:?})", region.rects()));
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
        self.calls.push(format!(
            "composite({op:?}, src={src}, mask={mask:?}, dst={dst}, src_xy={src_xy:?}, dst_xy={dst_xy:?}, size={size:?})"
        ));
        Ok(())
    }

    fn root_buffer_picture(&self) -> u32 {
        1
    }

    fn root_picture(&self) -> u32 {
        2
    }

    fn present(&mut self) -> Result<()> {
        self.calls.push("present".into());
        Ok(())
    }

    fn synchronize(&mut self, enabled: bool) -> Result<()> {
        self.calls.push(format!("synchronize({enabled})"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 1024, 768));
        display.flush().unwrap();
        display.select_root_input().unwrap();
        assert_eq!(display.calls, vec!["flush".to_string(), "select_root_input".to_string()]);
    }

    #[test]
    fn canned_geometry_is_returned() {
        let mut display = RecordingDisplay::new(Rectangle::new(0, 0, 1024, 768));
        let geometry = Geometry { x: 1, y: 2, width: 3, height: 4, border_width: 0 };
        display.set_geometry(7, geometry);
        assert_eq!(display.window_geometry(7).unwrap(), geometry);
    }
}
