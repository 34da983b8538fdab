use std::fmt;
use std::sync::Arc;

use egui::emath::Rot2;
use egui::{pos2, vec2, Pos2, Rect, Vec2};
use image::RgbaImage;

// ── Constants ───────────────────────────────────────────────────────────────

/// Slack around an object's bounds that still counts as a hit.
pub const HIT_PADDING: f32 = 4.0;
/// Grab radius around a control handle.
pub const HANDLE_RADIUS: f32 = 6.0;
/// Distance of the rotate handle above the top edge.
pub const ROTATE_HANDLE_OFFSET: f32 = 24.0;
/// Smallest width/height a resize may produce.
pub const MIN_EXTENT: f32 = 4.0;

const TEXT_CHAR_WIDTH: f32 = 0.6;
const TEXT_LINE_HEIGHT: f32 = 1.2;

// ── Colours & style ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    /// CSS-style `rgba(r, g, b, a)`: 8-bit channels, alpha in `0.0..=1.0`.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a,
        }
    }

    pub fn to_egui(&self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            (self.a * 255.0).round() as u8,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Color4,
    pub width: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub fill: Color4,
    pub stroke: Option<StrokeStyle>,
}

impl Style {
    pub const fn filled(fill: Color4) -> Self {
        Self { fill, stroke: None }
    }
}

// ── Shapes ──────────────────────────────────────────────────────────────────

pub const RECTANGLE_ORIGIN: Pos2 = pos2(50.0, 50.0);
pub const RECTANGLE_SIZE: Vec2 = vec2(100.0, 80.0);
pub const RECTANGLE_FILL: Color4 = Color4 {
    r: 0.0,
    g: 0.0,
    b: 1.0,
    a: 0.3,
};

pub const CIRCLE_ORIGIN: Pos2 = pos2(200.0, 200.0);
pub const CIRCLE_RADIUS: f32 = 50.0;
pub const CIRCLE_FILL: Color4 = Color4 {
    r: 1.0,
    g: 0.0,
    b: 0.0,
    a: 0.3,
};

pub const TEXT_ORIGIN: Pos2 = pos2(300.0, 300.0);
pub const TEXT_CONTENT: &str = "Sample Text";
pub const TEXT_FONT_SIZE: f32 = 20.0;

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Rectangle { width: f32, height: f32 },
    Circle { radius: f32 },
    /// `measured` is the laid-out size at font size 1, filled in once the
    /// text has been drawn. Until then the size is estimated.
    TextBox {
        text: String,
        font_size: f32,
        measured: Option<Vec2>,
    },
}

impl ShapeKind {
    /// Size of the unrotated bounding box.
    pub fn extent(&self) -> Vec2 {
        match self {
            ShapeKind::Rectangle { width, height } => vec2(*width, *height),
            ShapeKind::Circle { radius } => Vec2::splat(radius * 2.0),
            ShapeKind::TextBox {
                text,
                font_size,
                measured,
            } => match measured {
                Some(per_point) => *per_point * *font_size,
                None => vec2(
                    text.chars().count() as f32 * font_size * TEXT_CHAR_WIDTH,
                    font_size * TEXT_LINE_HEIGHT,
                ),
            },
        }
    }

    /// Adjust the geometry towards `target` and return the extent actually taken.
    /// Circles stay round and text scales through its font size.
    fn fit(&mut self, target: Vec2) -> Vec2 {
        match self {
            ShapeKind::Rectangle { width, height } => {
                *width = target.x.max(MIN_EXTENT);
                *height = target.y.max(MIN_EXTENT);
            }
            ShapeKind::Circle { radius } => {
                *radius = target.x.max(target.y).max(MIN_EXTENT) / 2.0;
            }
            ShapeKind::TextBox {
                font_size,
                measured,
                ..
            } => {
                let line_height = measured.map_or(TEXT_LINE_HEIGHT, |m| m.y);
                *font_size = (target.y / line_height).max(MIN_EXTENT);
            }
        }
        self.extent()
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle { .. } => "rectangle",
            ShapeKind::Circle { .. } => "circle",
            ShapeKind::TextBox { .. } => "text",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Direction of this corner from the centre, per axis.
    fn signs(self) -> Vec2 {
        match self {
            Corner::TopLeft => vec2(-1.0, -1.0),
            Corner::TopRight => vec2(1.0, -1.0),
            Corner::BottomLeft => vec2(-1.0, 1.0),
            Corner::BottomRight => vec2(1.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    Resize(Corner),
    Rotate,
}

/// A user-added overlay. `origin` is the top-left of the unrotated bounds;
/// `angle` (radians) rotates about the centre.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub origin: Pos2,
    pub angle: f32,
    pub style: Style,
    pub selectable: bool,
    pub has_borders: bool,
    pub has_controls: bool,
}

impl Shape {
    fn new(kind: ShapeKind, origin: Pos2, style: Style) -> Self {
        Self {
            kind,
            origin,
            angle: 0.0,
            style,
            selectable: true,
            has_borders: true,
            has_controls: true,
        }
    }

    pub fn rectangle() -> Self {
        Self::new(
            ShapeKind::Rectangle {
                width: RECTANGLE_SIZE.x,
                height: RECTANGLE_SIZE.y,
            },
            RECTANGLE_ORIGIN,
            Style::filled(RECTANGLE_FILL),
        )
    }

    pub fn circle() -> Self {
        Self::new(
            ShapeKind::Circle {
                radius: CIRCLE_RADIUS,
            },
            CIRCLE_ORIGIN,
            Style::filled(CIRCLE_FILL),
        )
    }

    pub fn text_box() -> Self {
        Self::new(
            ShapeKind::TextBox {
                text: TEXT_CONTENT.to_owned(),
                font_size: TEXT_FONT_SIZE,
                measured: None,
            },
            TEXT_ORIGIN,
            Style::filled(Color4::BLACK),
        )
    }

    pub fn extent(&self) -> Vec2 {
        self.kind.extent()
    }

    pub fn center(&self) -> Pos2 {
        self.origin + self.extent() * 0.5
    }

    fn rotation(&self) -> Rot2 {
        Rot2::from_angle(self.angle)
    }

    /// Offset from the centre in the shape's own (unrotated) frame.
    fn to_local(&self, p: Pos2) -> Vec2 {
        self.rotation().inverse() * (p - self.center())
    }

    fn to_world(&self, local: Vec2) -> Pos2 {
        self.center() + self.rotation() * local
    }

    /// Bounds corners in world space, clockwise from the top-left, grown by `pad`.
    pub fn corners(&self, pad: f32) -> [Pos2; 4] {
        let half = self.extent() * 0.5 + Vec2::splat(pad);
        [
            self.to_world(vec2(-half.x, -half.y)),
            self.to_world(vec2(half.x, -half.y)),
            self.to_world(vec2(half.x, half.y)),
            self.to_world(vec2(-half.x, half.y)),
        ]
    }

    /// Where the text baseline box starts once rotated.
    pub fn rotated_origin(&self) -> Pos2 {
        self.to_world(-self.extent() * 0.5)
    }

    pub fn contains(&self, p: Pos2) -> bool {
        let local = self.to_local(p);
        match &self.kind {
            ShapeKind::Circle { radius } => local.length() <= radius + HIT_PADDING,
            _ => {
                let half = self.extent() * 0.5 + Vec2::splat(HIT_PADDING);
                local.x.abs() <= half.x && local.y.abs() <= half.y
            }
        }
    }

    pub fn handles(&self) -> Vec<(Handle, Pos2)> {
        if !self.has_controls {
            return Vec::new();
        }
        let half = self.extent() * 0.5;
        let mut handles: Vec<(Handle, Pos2)> = Corner::ALL
            .iter()
            .map(|&corner| {
                let s = corner.signs();
                (
                    Handle::Resize(corner),
                    self.to_world(vec2(s.x * half.x, s.y * half.y)),
                )
            })
            .collect();
        handles.push((
            Handle::Rotate,
            self.to_world(vec2(0.0, -half.y - ROTATE_HANDLE_OFFSET)),
        ));
        handles
    }

    pub fn handle_at(&self, p: Pos2) -> Option<Handle> {
        self.handles()
            .into_iter()
            .find(|(_, at)| (p - *at).length() <= HANDLE_RADIUS)
            .map(|(handle, _)| handle)
    }

    /// Replace the estimated text size with what layout actually produced.
    /// Returns true if the bounds changed.
    pub fn record_text_size(&mut self, laid_out: Vec2) -> bool {
        let ShapeKind::TextBox {
            font_size,
            measured,
            ..
        } = &mut self.kind
        else {
            return false;
        };
        if *font_size <= 0.0 || laid_out.x <= 0.0 || laid_out.y <= 0.0 {
            return false;
        }
        let per_point = laid_out / *font_size;
        if measured.is_some_and(|m| (m - per_point).length() < 1e-4) {
            return false;
        }
        *measured = Some(per_point);
        true
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.origin += delta;
    }

    /// Drag `corner` to `pointer`, keeping the opposite corner where it is.
    pub fn resize_corner(&mut self, corner: Corner, pointer: Pos2) {
        let s = corner.signs();
        let half = self.extent() * 0.5;
        let anchor = self.to_world(vec2(-s.x * half.x, -s.y * half.y));
        let along = self.rotation().inverse() * (pointer - anchor);
        let actual = self.kind.fit(vec2(along.x * s.x, along.y * s.y));
        let center = anchor + self.rotation() * vec2(s.x * actual.x, s.y * actual.y) * 0.5;
        self.origin = center - actual * 0.5;
    }

    /// Turn the shape so its rotate handle points at `pointer`.
    pub fn rotate_towards(&mut self, pointer: Pos2) {
        let v = pointer - self.center();
        if v.length_sq() > 0.0 {
            self.angle = v.y.atan2(v.x) + std::f32::consts::FRAC_PI_2;
        }
    }
}

// ── Image layer ─────────────────────────────────────────────────────────────

/// The uploaded picture. Pinned at the origin with unit scale.
#[derive(Clone, Debug)]
pub struct ImageLayer {
    pub pixels: Arc<RgbaImage>,
    pub origin: Pos2,
    pub scale: Vec2,
    pub selectable: bool,
}

impl ImageLayer {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
            origin: Pos2::ZERO,
            scale: Vec2::splat(1.0),
            selectable: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn bounds(&self) -> Rect {
        let size = vec2(self.width() as f32, self.height() as f32) * self.scale;
        Rect::from_min_size(self.origin, size)
    }
}

// ── Scene objects ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub enum SceneObject {
    Image(ImageLayer),
    Shape(Shape),
}

impl SceneObject {
    pub fn is_selectable(&self) -> bool {
        match self {
            SceneObject::Image(layer) => layer.selectable,
            SceneObject::Shape(shape) => shape.selectable,
        }
    }

    pub fn contains(&self, p: Pos2) -> bool {
        match self {
            SceneObject::Image(layer) => layer.bounds().contains(p),
            SceneObject::Shape(shape) => shape.contains(p),
        }
    }

    /// Shapes the user may move, resize and rotate. Image layers are locked.
    pub fn as_editable_mut(&mut self) -> Option<&mut Shape> {
        match self {
            SceneObject::Shape(shape) => Some(shape),
            SceneObject::Image(_) => None,
        }
    }

    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            SceneObject::Shape(shape) => Some(shape),
            SceneObject::Image(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SceneObject::Image(_) => "image",
            SceneObject::Shape(shape) => shape.kind.label(),
        }
    }
}

impl From<Shape> for SceneObject {
    fn from(shape: Shape) -> Self {
        SceneObject::Shape(shape)
    }
}

impl From<ImageLayer> for SceneObject {
    fn from(layer: ImageLayer) -> Self {
        SceneObject::Image(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn default_shapes_match_toolbar_geometry() {
        let rect = Shape::rectangle();
        assert_eq!(rect.origin, pos2(50.0, 50.0));
        assert_eq!(rect.extent(), vec2(100.0, 80.0));
        assert_eq!(rect.style.fill, Color4::from_rgba8(0, 0, 255, 0.3));

        let circle = Shape::circle();
        assert_eq!(circle.origin, pos2(200.0, 200.0));
        assert_eq!(circle.kind, ShapeKind::Circle { radius: 50.0 });
        assert_eq!(circle.center(), pos2(250.0, 250.0));

        let text = Shape::text_box();
        assert_eq!(text.origin, pos2(300.0, 300.0));
        assert_eq!(
            text.kind,
            ShapeKind::TextBox {
                text: "Sample Text".into(),
                font_size: 20.0,
                measured: None,
            }
        );

        for shape in [rect, circle, text] {
            assert!(shape.selectable && shape.has_borders && shape.has_controls);
            assert_eq!(shape.angle, 0.0);
        }
    }

    #[test]
    fn circle_hit_uses_radius() {
        let circle = Shape::circle();
        assert!(circle.contains(pos2(250.0, 250.0)));
        assert!(circle.contains(pos2(250.0, 202.0)));
        // inside the bounding square but outside the disc
        assert!(!circle.contains(pos2(205.0, 205.0)));
    }

    #[test]
    fn rotated_rectangle_hit() {
        let mut rect = Shape::rectangle();
        rect.angle = FRAC_PI_2;
        // centre (100, 90); turned a quarter the box spans 80 wide, 100 tall
        assert!(rect.contains(pos2(100.0, 138.0)));
        assert!(!rect.contains(pos2(148.0, 90.0)));
    }

    #[test]
    fn resize_keeps_opposite_corner() {
        let mut rect = Shape::rectangle();
        rect.resize_corner(Corner::BottomRight, pos2(250.0, 200.0));
        assert_eq!(rect.origin, pos2(50.0, 50.0));
        assert_eq!(rect.extent(), vec2(200.0, 150.0));

        rect.resize_corner(Corner::TopLeft, pos2(100.0, 100.0));
        assert!(approx(rect.origin, pos2(100.0, 100.0)));
        assert_eq!(rect.extent(), vec2(150.0, 100.0));
    }

    #[test]
    fn resize_clamps_to_minimum() {
        let mut rect = Shape::rectangle();
        rect.resize_corner(Corner::BottomRight, pos2(0.0, 0.0));
        assert_eq!(rect.extent(), Vec2::splat(MIN_EXTENT));
        assert_eq!(rect.origin, pos2(50.0, 50.0));
    }

    #[test]
    fn circle_resize_stays_round() {
        let mut circle = Shape::circle();
        circle.resize_corner(Corner::BottomRight, pos2(340.0, 260.0));
        assert_eq!(circle.kind, ShapeKind::Circle { radius: 70.0 });
        assert_eq!(circle.origin, pos2(200.0, 200.0));
    }

    #[test]
    fn text_resize_scales_font() {
        let mut text = Shape::text_box();
        let bottom = text.origin.y + 48.0;
        text.resize_corner(Corner::BottomRight, pos2(1000.0, bottom));
        match text.kind {
            ShapeKind::TextBox { font_size, .. } => assert!((font_size - 40.0).abs() < 1e-3),
            _ => unreachable!(),
        }
    }

    #[test]
    fn laid_out_text_size_replaces_estimate() {
        let mut text = Shape::text_box();
        assert_eq!(text.extent(), vec2(132.0, 24.0));
        // right edge of the estimate, beyond the real glyphs
        assert!(text.contains(pos2(430.0, 310.0)));

        assert!(text.record_text_size(vec2(100.0, 22.0)));
        assert!(!text.record_text_size(vec2(100.0, 22.0)));
        assert!((text.extent() - vec2(100.0, 22.0)).length() < 1e-3);
        assert!(!text.contains(pos2(430.0, 310.0)));
        assert!(text.contains(pos2(398.0, 310.0)));

        // scaling keeps the measured proportions
        text.resize_corner(Corner::BottomRight, pos2(1000.0, text.origin.y + 44.0));
        assert!((text.extent() - vec2(200.0, 44.0)).length() < 1e-2);
    }

    #[test]
    fn text_size_ignored_for_other_shapes() {
        let mut rect = Shape::rectangle();
        assert!(!rect.record_text_size(vec2(10.0, 10.0)));
        assert_eq!(rect.extent(), vec2(100.0, 80.0));
    }

    #[test]
    fn rotate_handle_follows_pointer() {
        let mut rect = Shape::rectangle();
        let center = rect.center();
        rect.rotate_towards(center + vec2(10.0, 0.0));
        assert!((rect.angle - FRAC_PI_2).abs() < 1e-5);
        rect.rotate_towards(center + vec2(0.0, -10.0));
        assert!(rect.angle.abs() < 1e-5);
    }

    #[test]
    fn handles_found_at_corners_and_above() {
        let rect = Shape::rectangle();
        assert_eq!(
            rect.handle_at(pos2(150.0, 130.0)),
            Some(Handle::Resize(Corner::BottomRight))
        );
        assert_eq!(
            rect.handle_at(pos2(100.0, 50.0 - ROTATE_HANDLE_OFFSET)),
            Some(Handle::Rotate)
        );
        assert_eq!(rect.handle_at(pos2(100.0, 90.0)), None);
    }

    #[test]
    fn image_layer_sits_at_origin() {
        let layer = ImageLayer::new(RgbaImage::new(800, 600));
        assert_eq!(layer.bounds(), Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0)));
        let mut object = SceneObject::from(layer);
        assert!(object.is_selectable());
        assert!(object.as_editable_mut().is_none());
    }
}
