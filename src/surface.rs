//! The drawing surface: an ordered object list with one active object.
//!
//! [`Surface`] is the small capability set the controller needs. [`SceneSurface`]
//! implements it and also owns the pointer-facing operations (picking, handles,
//! move/resize/rotate) that the view drives.

use egui::{Pos2, Vec2};
use tracing::{debug, trace};

use crate::config::SurfaceConfig;
use crate::model::{Color4, Corner, Handle, ObjectId, SceneObject};

pub trait Surface {
    /// Append `object` on top of everything else.
    fn insert(&mut self, object: SceneObject) -> ObjectId;
    fn remove(&mut self, id: ObjectId) -> Option<SceneObject>;
    fn clear(&mut self);
    fn active_object(&self) -> Option<ObjectId>;
    fn resize(&mut self, width: u32, height: u32);
    fn redraw(&mut self);
    fn size(&self) -> (u32, u32);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct SurfaceEntry {
    pub id: ObjectId,
    pub object: SceneObject,
}

#[derive(Debug)]
pub struct SceneSurface {
    width: u32,
    height: u32,
    background: Color4,
    entries: Vec<SurfaceEntry>,
    active: Option<ObjectId>,
    next_id: u64,
    revision: u64,
}

impl SceneSurface {
    pub fn new(config: &SurfaceConfig) -> Self {
        debug!(width = config.width, height = config.height, "surface created");
        Self {
            width: config.width,
            height: config.height,
            background: config.background,
            entries: Vec::new(),
            active: None,
            next_id: 0,
            revision: 0,
        }
    }

    pub fn background(&self) -> Color4 {
        self.background
    }

    /// Objects bottom to top.
    pub fn entries(&self) -> &[SurfaceEntry] {
        &self.entries
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.object)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| &mut e.object)
    }

    /// Bumped on every visible change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Topmost selectable object under `p`.
    pub fn pick(&self, p: Pos2) -> Option<ObjectId> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.object.is_selectable() && e.object.contains(p))
            .map(|e| e.id)
    }

    /// Make `id` the active object, or clear the selection with `None`.
    /// Unknown or unselectable ids clear it too.
    pub fn select(&mut self, id: Option<ObjectId>) {
        let next = id.filter(|&id| self.get(id).is_some_and(SceneObject::is_selectable));
        if next != self.active {
            trace!(?next, "selection changed");
            self.active = next;
            self.redraw();
        }
    }

    /// Control handle of the active object under `p`.
    pub fn handle_at(&self, p: Pos2) -> Option<Handle> {
        let id = self.active?;
        self.get(id)?.as_shape()?.handle_at(p)
    }

    /// Feed back the size a text box took when it was laid out.
    pub fn record_text_size(&mut self, id: ObjectId, laid_out: Vec2) {
        let changed = self
            .get_mut(id)
            .and_then(SceneObject::as_editable_mut)
            .is_some_and(|shape| shape.record_text_size(laid_out));
        if changed {
            self.redraw();
        }
    }

    pub fn translate(&mut self, id: ObjectId, delta: Vec2) {
        if let Some(shape) = self.get_mut(id).and_then(SceneObject::as_editable_mut) {
            shape.translate(delta);
            self.redraw();
        }
    }

    pub fn resize_object(&mut self, id: ObjectId, corner: Corner, pointer: Pos2) {
        if let Some(shape) = self.get_mut(id).and_then(SceneObject::as_editable_mut) {
            shape.resize_corner(corner, pointer);
            self.redraw();
        }
    }

    pub fn rotate_object(&mut self, id: ObjectId, pointer: Pos2) {
        if let Some(shape) = self.get_mut(id).and_then(SceneObject::as_editable_mut) {
            shape.rotate_towards(pointer);
            self.redraw();
        }
    }
}

impl Surface for SceneSurface {
    fn insert(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        debug!(%id, kind = object.label(), "object added");
        self.entries.push(SurfaceEntry { id, object });
        self.redraw();
        id
    }

    fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(index);
        if self.active == Some(id) {
            self.active = None;
        }
        debug!(%id, kind = entry.object.label(), "object removed");
        self.redraw();
        Some(entry.object)
    }

    fn clear(&mut self) {
        debug!(count = self.entries.len(), "surface cleared");
        self.entries.clear();
        self.active = None;
        self.redraw();
    }

    fn active_object(&self) -> Option<ObjectId> {
        self.active
    }

    fn resize(&mut self, width: u32, height: u32) {
        debug!(width, height, "surface resized");
        self.width = width;
        self.height = height;
        self.redraw();
    }

    fn redraw(&mut self) {
        self.revision += 1;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
