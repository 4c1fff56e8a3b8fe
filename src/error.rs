use std::{fmt::Display, path::PathBuf};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while loading images, walking directories or running the backbone
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("Failed to load image from {location}: {reason}")]
    Load {
        location: String,
        #[source]
        reason: BoxedError,
    },
    #[error(
        "Folder {} not found or does not have images. If there's one folder per class, please make sure to set classes_as_folders to true",
        .0.display()
    )]
    EmptyDirectory(PathBuf),
    #[error("Model `{0}` is not supported. Supported models: resnet")]
    UnsupportedModel(String),
    #[error("Failed to download dataset from {url}: {reason}")]
    Download {
        url: String,
        #[source]
        reason: BoxedError,
    },
    #[error("Invalid target shape {0:?}: height and width must be equal and non-zero with 3 channels")]
    InvalidTargetShape((u32, u32, u32)),
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,
    #[error("Unexpected output tensor shape: {0:?}")]
    UnexpectedOutputShape(Vec<usize>),
}

impl FeatureError {
    pub(crate) fn load(location: impl Display, reason: impl Into<BoxedError>) -> Self {
        FeatureError::Load {
            location: location.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn download(url: impl Display, reason: impl Into<BoxedError>) -> Self {
        FeatureError::Download {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
