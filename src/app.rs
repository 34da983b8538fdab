use std::path::PathBuf;

use eframe::egui;
use tracing::info;

use crate::config::SurfaceConfig;
use crate::controller::{AnnotationController, INVALID_IMAGE_MESSAGE};
use crate::surface::SceneSurface;
use crate::upload::{image_extensions, SelectedFile, UploadPipeline};
use crate::view::SurfaceView;

pub const TITLE: &str = "Image Annotation Tool";

pub struct AnnotateApp {
    controller: AnnotationController<SceneSurface>,
    view: SurfaceView,
    // declared last so it outlives the pipeline handle held by the controller
    _runtime: tokio::runtime::Runtime,
}

impl AnnotateApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: SurfaceConfig,
        initial_image: Option<PathBuf>,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("annotate-io")
            .build()?;
        let ctx = cc.egui_ctx.clone();
        let uploads = UploadPipeline::new(runtime.handle().clone())
            .on_complete(move || ctx.request_repaint());

        let mut app = Self {
            controller: AnnotationController::new(SceneSurface::new(&config), uploads),
            view: SurfaceView::new(),
            _runtime: runtime,
        };
        if let Some(path) = initial_image {
            app.upload(SelectedFile::from_path(path));
        }
        Ok(app)
    }

    fn upload(&mut self, file: SelectedFile) {
        if let Err(err) = self.controller.upload_image(file) {
            if err.is_user_facing() {
                alert(INVALID_IMAGE_MESSAGE);
            }
        }
    }

    fn pick_image(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Choose an image")
            .add_filter("Images", image_extensions().as_slice())
            .pick_file();
        if let Some(path) = picked {
            self.upload(SelectedFile::from_path(path));
        }
    }
}

/// Blocking modal, the desktop stand-in for a browser alert.
fn alert(message: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title(TITLE)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

impl eframe::App for AnnotateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.poll_uploads();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Upload Image…").clicked() {
                    self.pick_image();
                }
                ui.separator();
                if ui.button("Add Rectangle").clicked() {
                    self.controller.add_rectangle();
                }
                if ui.button("Add Circle").clicked() {
                    self.controller.add_circle();
                }
                if ui.button("Add Text").clicked() {
                    self.controller.add_text();
                }
                if ui.button("Delete Selected").clicked() {
                    self.controller.delete_selected();
                }
                ui.separator();
                let (w, h) = self.controller.image_size();
                ui.label(format!("{w} × {h}"));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                self.view.show(ui, self.controller.surface_mut());
            });
        });
    }
}

impl Drop for AnnotateApp {
    fn drop(&mut self) {
        info!("closing annotation view");
    }
}
