//! Upload an image, drop rectangles, circles and text boxes on top of it,
//! select and delete them.

pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod surface;
pub mod upload;
pub mod view;

pub use config::{Cli, SurfaceConfig};
pub use controller::AnnotationController;
pub use error::UploadError;
pub use model::{ObjectId, SceneObject, Shape, ShapeKind};
pub use surface::{SceneSurface, Surface};
pub use upload::{SelectedFile, UploadPipeline};
