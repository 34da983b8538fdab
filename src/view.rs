use std::collections::HashMap;

use egui::epaint::TextShape;
use egui::{pos2, vec2, Color32, CursorIcon, Painter, PointerButton, Pos2, Rect, Sense, Stroke};

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::model::{Corner, Handle, ImageLayer, ObjectId, SceneObject, Shape, ShapeKind, HANDLE_RADIUS};
use crate::surface::{SceneSurface, Surface};

const SELECTION_COLOR: Color32 = Color32::from_rgb(0, 120, 255);

#[derive(Clone, Copy, Debug)]
enum DragState {
    None,
    Moving { id: ObjectId },
    Resizing { id: ObjectId, corner: Corner },
    Rotating { id: ObjectId },
}

/// Paints a [`SceneSurface`] and feeds pointer input back into it.
pub struct SurfaceView {
    textures: HashMap<ObjectId, egui::TextureHandle>,
    drag: DragState,
}

impl Default for SurfaceView {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceView {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            drag: DragState::None,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, surface: &mut SceneSurface) {
        let (width, height) = surface.size();
        let (response, painter) =
            ui.allocate_painter(vec2(width as f32, height as f32), Sense::click_and_drag());
        let offset = response.rect.min.to_vec2();
        let to_surface = |p: Pos2| p - offset;

        self.sync_textures(ui.ctx(), surface);

        painter.rect_filled(response.rect, 0.0, surface.background().to_egui());
        let clipped = painter.with_clip_rect(response.rect);
        let mut laid_out = Vec::new();
        for entry in surface.entries() {
            match &entry.object {
                SceneObject::Image(layer) => self.draw_image(&clipped, layer, entry.id, offset),
                SceneObject::Shape(shape) => {
                    if let Some(size) = draw_shape(&clipped, shape, offset) {
                        laid_out.push((entry.id, size));
                    }
                }
            }
        }
        for (id, size) in laid_out {
            surface.record_text_size(id, size);
        }
        if let Some(id) = surface.active_object() {
            if let Some(object) = surface.get(id) {
                draw_selection(&clipped, object, offset);
            }
        }

        if let Some(hover) = response.hover_pos() {
            if let Some(handle) = surface.handle_at(to_surface(hover)) {
                ui.ctx().set_cursor_icon(handle_cursor(handle));
            }
        }

        if response.drag_started_by(PointerButton::Primary) {
            let start = ui
                .ctx()
                .input(|i| i.pointer.press_origin())
                .or(response.interact_pointer_pos());
            if let Some(start) = start.map(to_surface) {
                self.drag = match surface.handle_at(start) {
                    Some(Handle::Resize(corner)) => surface
                        .active_object()
                        .map_or(DragState::None, |id| DragState::Resizing { id, corner }),
                    Some(Handle::Rotate) => surface
                        .active_object()
                        .map_or(DragState::None, |id| DragState::Rotating { id }),
                    None => {
                        let picked = surface.pick(start);
                        surface.select(picked);
                        picked.map_or(DragState::None, |id| DragState::Moving { id })
                    }
                };
            }
        }

        if response.dragged_by(PointerButton::Primary) {
            let pointer = response.interact_pointer_pos().map(to_surface);
            match (self.drag, pointer) {
                (DragState::Moving { id }, _) => surface.translate(id, response.drag_delta()),
                (DragState::Resizing { id, corner }, Some(p)) => {
                    surface.resize_object(id, corner, p)
                }
                (DragState::Rotating { id }, Some(p)) => surface.rotate_object(id, p),
                _ => {}
            }
        }

        if response.drag_stopped_by(PointerButton::Primary) {
            self.drag = DragState::None;
        }

        if response.clicked_by(PointerButton::Primary) {
            if let Some(p) = response.interact_pointer_pos().map(to_surface) {
                if surface.handle_at(p).is_none() {
                    surface.select(surface.pick(p));
                }
            }
        }
    }

    /// Upload new image layers to the GPU and forget removed ones.
    fn sync_textures(&mut self, ctx: &egui::Context, surface: &SceneSurface) {
        self.textures
            .retain(|id, _| matches!(surface.get(*id), Some(SceneObject::Image(_))));
        let max_side = ctx.input(|i| i.max_texture_side);
        for entry in surface.entries() {
            let SceneObject::Image(layer) = &entry.object else {
                continue;
            };
            self.textures.entry(entry.id).or_insert_with(|| {
                ctx.load_texture(
                    format!("image-{}", entry.id),
                    texture_image(layer, max_side),
                    egui::TextureOptions::LINEAR,
                )
            });
        }
    }

    fn draw_image(&self, painter: &Painter, layer: &ImageLayer, id: ObjectId, offset: egui::Vec2) {
        if let Some(tex) = self.textures.get(&id) {
            painter.image(
                tex.id(),
                layer.bounds().translate(offset),
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
    }
}

/// Largest size no bigger than `max_side` on either axis, keeping the
/// aspect ratio. The layer itself keeps its natural size.
fn texture_size(width: u32, height: u32, max_side: usize) -> (u32, u32) {
    let max_side = u32::try_from(max_side).unwrap_or(u32::MAX).max(1);
    let longest = width.max(height);
    if longest <= max_side {
        return (width, height);
    }
    let scale = f64::from(max_side) / f64::from(longest);
    let fit = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max_side);
    (fit(width), fit(height))
}

fn texture_image(layer: &ImageLayer, max_side: usize) -> egui::ColorImage {
    let (width, height) = texture_size(layer.width(), layer.height(), max_side);
    if (width, height) == (layer.width(), layer.height()) {
        let pixels = layer.pixels.as_flat_samples();
        return egui::ColorImage::from_rgba_unmultiplied(
            [width as usize, height as usize],
            pixels.as_slice(),
        );
    }
    debug!(
        natural_width = layer.width(),
        natural_height = layer.height(),
        width,
        height,
        "image layer downscaled for display"
    );
    let scaled = imageops::resize(&*layer.pixels, width, height, FilterType::Triangle);
    egui::ColorImage::from_rgba_unmultiplied([width as usize, height as usize], scaled.as_raw())
}

/// Returns the laid-out size of text boxes.
fn draw_shape(painter: &Painter, shape: &Shape, offset: egui::Vec2) -> Option<egui::Vec2> {
    let fill = shape.style.fill.to_egui();
    let stroke = shape
        .style
        .stroke
        .map_or(Stroke::NONE, |s| Stroke::new(s.width, s.color.to_egui()));
    match &shape.kind {
        ShapeKind::Rectangle { .. } => {
            let points = shape.corners(0.0).iter().map(|p| *p + offset).collect();
            painter.add(egui::Shape::convex_polygon(points, fill, stroke));
            None
        }
        ShapeKind::Circle { radius } => {
            let center = shape.center() + offset;
            painter.circle(center, *radius, fill, stroke);
            None
        }
        ShapeKind::TextBox {
            text, font_size, ..
        } => {
            let galley =
                painter.layout_no_wrap(text.clone(), egui::FontId::proportional(*font_size), fill);
            let pos = shape.rotated_origin() + offset;
            let size = galley.size();
            painter.add(TextShape::new(pos, galley, fill).with_angle(shape.angle));
            Some(size)
        }
    }
}

fn draw_selection(painter: &Painter, object: &SceneObject, offset: egui::Vec2) {
    let stroke = Stroke::new(1.5, SELECTION_COLOR);
    match object {
        SceneObject::Image(layer) => {
            painter.rect_stroke(
                layer.bounds().translate(offset),
                0.0,
                stroke,
                egui::StrokeKind::Inside,
            );
        }
        SceneObject::Shape(shape) => {
            if shape.has_borders {
                let mut outline: Vec<Pos2> = shape.corners(2.0).iter().map(|p| *p + offset).collect();
                outline.push(outline[0]);
                painter.add(egui::Shape::line(outline, stroke));
            }
            let handles = shape.handles();
            if let Some((_, rotate)) = handles.iter().find(|(h, _)| *h == Handle::Rotate) {
                let top = shape.corners(0.0);
                let top_mid = top[0] + (top[1] - top[0]) * 0.5;
                painter.line_segment([top_mid + offset, *rotate + offset], stroke);
            }
            for (_, at) in handles {
                painter.circle(at + offset, HANDLE_RADIUS - 1.0, Color32::WHITE, stroke);
            }
        }
    }
}

fn handle_cursor(handle: Handle) -> CursorIcon {
    match handle {
        Handle::Resize(Corner::TopLeft | Corner::BottomRight) => CursorIcon::ResizeNwSe,
        Handle::Resize(Corner::TopRight | Corner::BottomLeft) => CursorIcon::ResizeNeSw,
        Handle::Rotate => CursorIcon::Grab,
    }
}
