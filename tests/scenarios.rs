use std::io::Write;

use annotate_canvas::model::{SceneObject, ShapeKind};
use annotate_canvas::{
    AnnotationController, SceneSurface, SelectedFile, Surface, SurfaceConfig, UploadError,
    UploadPipeline,
};
use egui::{pos2, vec2};
use image::{ImageFormat, RgbaImage};
use tempfile::NamedTempFile;
use tokio::runtime::Handle;

fn fresh() -> AnnotationController<SceneSurface> {
    AnnotationController::new(
        SceneSurface::new(&SurfaceConfig::default()),
        UploadPipeline::new(Handle::current()),
    )
}

fn temp_with(suffix: &str, bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file
}

fn png(width: u32, height: u32) -> NamedTempFile {
    let mut out = std::io::Cursor::new(Vec::new());
    RgbaImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    temp_with(".png", out.get_ref())
}

#[tokio::test]
async fn upload_annotate_and_delete() {
    let mut c = fresh();
    assert_eq!(c.surface().size(), (500, 500));
    assert!(c.surface().is_empty());

    let photo = png(800, 600);
    c.upload_image(SelectedFile::from_path(photo.path())).unwrap();
    c.next_upload().await.unwrap().unwrap();
    assert_eq!(c.surface().size(), (800, 600));
    assert_eq!(c.image_size(), (800, 600));
    assert_eq!(c.surface().len(), 1);

    let rect = c.add_rectangle();
    assert_eq!(c.surface().len(), 2);
    match c.surface().get(rect) {
        Some(SceneObject::Shape(shape)) => {
            assert_eq!(shape.origin, pos2(50.0, 50.0));
            assert_eq!(shape.extent(), vec2(100.0, 80.0));
        }
        other => panic!("expected rectangle, got {other:?}"),
    }

    c.add_circle();
    assert_eq!(c.surface().len(), 3);

    let picked = c.surface().pick(pos2(60.0, 60.0));
    assert_eq!(picked, Some(rect));
    c.surface_mut().select(picked);
    c.delete_selected();

    let kinds: Vec<_> = c
        .surface()
        .entries()
        .iter()
        .map(|e| e.object.label())
        .collect();
    assert_eq!(kinds, vec!["image", "circle"]);
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let mut c = fresh();
    c.add_text();
    let notes = temp_with(".txt", b"just some notes");

    let err = c
        .upload_image(SelectedFile::from_path(notes.path()))
        .unwrap_err();
    assert!(matches!(err, UploadError::InvalidInput { .. }));
    assert_eq!(c.surface().size(), (500, 500));
    assert_eq!(c.surface().len(), 1);
    assert!(matches!(
        c.surface().entries()[0].object.as_shape().map(|s| &s.kind),
        Some(ShapeKind::TextBox { .. })
    ));
}

#[tokio::test]
async fn mislabelled_media_type_is_rejected() {
    let mut c = fresh();
    let photo = png(4, 4);
    let err = c
        .upload_image(SelectedFile::with_media_type(photo.path(), "text/plain"))
        .unwrap_err();
    assert!(err.is_user_facing());
    assert!(c.surface().is_empty());
}

#[tokio::test]
async fn delete_with_nothing_selected() {
    let mut c = fresh();
    assert!(c.delete_selected().is_none());
    assert!(c.surface().is_empty());
}

#[tokio::test]
async fn new_upload_wipes_annotations() {
    let mut c = fresh();
    let first = png(300, 200);
    c.upload_image(SelectedFile::from_path(first.path())).unwrap();
    c.next_upload().await.unwrap().unwrap();
    c.add_rectangle();
    c.add_circle();

    let second = png(120, 90);
    c.upload_image(SelectedFile::from_path(second.path())).unwrap();
    c.next_upload().await.unwrap().unwrap();

    assert_eq!(c.surface().size(), (120, 90));
    assert_eq!(c.surface().len(), 1);
    assert!(c
        .surface()
        .entries()
        .iter()
        .all(|e| matches!(e.object, SceneObject::Image(_))));
}
