use crate::{get_cache_dir, FeatureError};
use ort::execution_providers::ExecutionProviderDispatch;
use std::path::PathBuf;

/// Input geometry of the backbone, `(height, width, channels)`
///
/// Height and width are both the center crop size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetShape {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

impl TargetShape {
    /// Square RGB shape with the given crop size
    pub fn square(size: u32) -> Self {
        Self {
            height: size,
            width: size,
            channels: 3,
        }
    }

    /// Side of the center crop
    pub fn crop_size(&self) -> u32 {
        self.height
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.height == 0 || self.height != self.width || self.channels != 3 {
            return Err(FeatureError::InvalidTargetShape((
                self.height,
                self.width,
                self.channels,
            )));
        }
        Ok(())
    }
}

impl Default for TargetShape {
    fn default() -> Self {
        Self::square(224)
    }
}

impl TryFrom<(u32, u32, u32)> for TargetShape {
    type Error = FeatureError;

    fn try_from((height, width, channels): (u32, u32, u32)) -> Result<Self, Self::Error> {
        let shape = Self {
            height,
            width,
            channels,
        };
        shape.validate()?;
        Ok(shape)
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct InitOptions<M> {
    pub model_name: M,
    pub target_shape: TargetShape,
    pub execution_providers: Vec<ExecutionProviderDispatch>,
    pub cache_dir: PathBuf,
    pub show_download_progress: bool,
}

impl<M: Default> Default for InitOptions<M> {
    fn default() -> Self {
        Self {
            model_name: M::default(),
            target_shape: TargetShape::default(),
            execution_providers: Default::default(),
            cache_dir: get_cache_dir().into(),
            show_download_progress: true,
        }
    }
}

impl<M: Default> InitOptions<M> {
    /// Create a new InitOptions with the given model name
    pub fn new(model_name: M) -> Self {
        Self {
            model_name,
            ..Default::default()
        }
    }

    /// Set the input shape of the backbone
    pub fn with_target_shape(mut self, target_shape: TargetShape) -> Self {
        self.target_shape = target_shape;
        self
    }

    /// Set the cache directory for the model file
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    /// Set the execution providers for the model
    pub fn with_execution_providers(
        mut self,
        execution_providers: Vec<ExecutionProviderDispatch>,
    ) -> Self {
        self.execution_providers = execution_providers;
        self
    }

    /// Set whether to show download progress
    pub fn with_show_download_progress(mut self, show_download_progress: bool) -> Self {
        self.show_download_progress = show_download_progress;
        self
    }
}
