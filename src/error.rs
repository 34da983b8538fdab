use thiserror::Error;

/// Why an image upload did not reach the surface.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{name} is not an image (type {media_type})")]
    InvalidInput { name: String, media_type: String },

    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

impl UploadError {
    /// Only invalid input is shown to the user; the rest go to the log.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, UploadError::InvalidInput { .. })
    }
}
