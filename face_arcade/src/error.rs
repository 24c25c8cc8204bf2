use thiserror::Error;

use crate::camera::CameraError;
use crate::config::ConfigError;

/// Anything that stops the app before or while the window is up.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("window: {0}")]
    Window(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Camera(#[from] CameraError),
}
