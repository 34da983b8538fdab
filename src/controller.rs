use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::model::{ImageLayer, ObjectId, SceneObject, Shape};
use crate::surface::Surface;
use crate::upload::{SelectedFile, UploadCompletion, UploadPipeline, UploadTicket};

pub const INVALID_IMAGE_MESSAGE: &str = "Please upload a valid image file.";

/// Mediates between the toolbar and one surface for as long as the view lives.
pub struct AnnotationController<S: Surface> {
    surface: S,
    uploads: UploadPipeline,
    latest_upload: Option<UploadTicket>,
    image_size: (u32, u32),
}

impl<S: Surface> AnnotationController<S> {
    pub fn new(surface: S, uploads: UploadPipeline) -> Self {
        let image_size = surface.size();
        info!(width = image_size.0, height = image_size.1, "annotation surface ready");
        Self {
            surface,
            uploads,
            latest_upload: None,
            image_size,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Size of the last uploaded image, or the initial surface size.
    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    /// Check the file type and start reading it. The surface is untouched
    /// until [`finish_upload`](Self::finish_upload) sees the decoded image.
    pub fn upload_image(&mut self, file: SelectedFile) -> Result<UploadTicket, UploadError> {
        if !file.is_image() {
            warn!(file = file.name(), media_type = file.media_type(), "rejected non-image upload");
            return Err(UploadError::InvalidInput {
                name: file.name().to_owned(),
                media_type: file.media_type().to_owned(),
            });
        }
        let ticket = self.uploads.start(file);
        self.latest_upload = Some(ticket);
        Ok(ticket)
    }

    /// Apply one completed upload. Returns the new image layer, or `None` if
    /// a newer upload has been started since.
    pub fn finish_upload(
        &mut self,
        completion: UploadCompletion,
    ) -> Result<Option<ObjectId>, UploadError> {
        if self.latest_upload != Some(completion.ticket) {
            if let Err(err) = &completion.outcome {
                error!(file = %completion.file_name, error = %err, "superseded image upload failed");
            }
            debug!(file = %completion.file_name, ticket = ?completion.ticket, "discarding superseded upload");
            return Ok(None);
        }
        let decoded = completion.outcome.inspect_err(|err| {
            error!(error = %err, "image upload failed");
        })?;

        let (width, height) = (decoded.width(), decoded.height());
        self.surface.clear();
        self.surface.resize(width, height);
        self.image_size = (width, height);
        let id = self
            .surface
            .insert(SceneObject::Image(ImageLayer::new(decoded.pixels)));
        self.surface.redraw();
        info!(file = %completion.file_name, width, height, "image loaded");
        Ok(Some(id))
    }

    /// Apply whatever uploads have finished. Returns true if any arrived.
    pub fn poll_uploads(&mut self) -> bool {
        let mut any = false;
        while let Some(completion) = self.uploads.try_next() {
            any = true;
            // failures are already logged
            let _ = self.finish_upload(completion);
        }
        any
    }

    /// Wait for the next upload to finish and apply it.
    pub async fn next_upload(&mut self) -> Option<Result<Option<ObjectId>, UploadError>> {
        let completion = self.uploads.next().await?;
        Some(self.finish_upload(completion))
    }

    pub fn add_rectangle(&mut self) -> ObjectId {
        self.add_shape(Shape::rectangle())
    }

    pub fn add_circle(&mut self) -> ObjectId {
        self.add_shape(Shape::circle())
    }

    pub fn add_text(&mut self) -> ObjectId {
        self.add_shape(Shape::text_box())
    }

    fn add_shape(&mut self, shape: Shape) -> ObjectId {
        self.surface.insert(SceneObject::Shape(shape))
    }

    /// Remove the active object, if there is one.
    pub fn delete_selected(&mut self) -> Option<SceneObject> {
        let id = self.surface.active_object()?;
        self.surface.remove(id)
    }
}

impl<S: Surface> Drop for AnnotationController<S> {
    fn drop(&mut self) {
        debug!(objects = self.surface.len(), "annotation surface released");
    }
}
