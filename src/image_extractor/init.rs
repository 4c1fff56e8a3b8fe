use ort::{execution_providers::ExecutionProviderDispatch, session::Session};

use crate::{
    init::InitOptions, models::image_feature::Normalization, FeatureError, ImageFeatureModel,
    TargetShape,
};

use super::{utils::Compose, DEFAULT_BATCH_SIZE};

/// Options for initializing the ImageFeatureExtractor
pub type ImageInitOptions = InitOptions<ImageFeatureModel>;

impl ImageInitOptions {
    /// Options for a backbone given by name, e.g. `"resnet"`
    ///
    /// Unknown names fail here, before anything is downloaded.
    pub fn from_model_name(model_name: &str) -> Result<Self, FeatureError> {
        Ok(Self::new(model_name.parse()?))
    }
}

/// Options for initializing UserDefinedImageFeatureModel
///
/// Model files are held by the UserDefinedImageFeatureModel struct
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ImageInitOptionsUserDefined {
    pub execution_providers: Vec<ExecutionProviderDispatch>,
    pub target_shape: TargetShape,
}

impl ImageInitOptionsUserDefined {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_shape(mut self, target_shape: TargetShape) -> Self {
        self.target_shape = target_shape;
        self
    }

    pub fn with_execution_providers(
        mut self,
        execution_providers: Vec<ExecutionProviderDispatch>,
    ) -> Self {
        self.execution_providers = execution_providers;
        self
    }
}

/// Convert ImageInitOptions to ImageInitOptionsUserDefined
///
/// This is useful for when the user wants to use the same options for both the default and user-defined models
impl From<ImageInitOptions> for ImageInitOptionsUserDefined {
    fn from(options: ImageInitOptions) -> Self {
        ImageInitOptionsUserDefined {
            execution_providers: options.execution_providers,
            target_shape: options.target_shape,
        }
    }
}

/// Struct for "bring your own" backbones
///
/// The onnx_file is expecting the file's bytes. The graph must take a
/// `[batch, 3, size, size]` input and emit either pooled `[batch, dim]`
/// features or a `[batch, dim, h, w]` feature map.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDefinedImageFeatureModel {
    pub onnx_file: Vec<u8>,
    pub dim: usize,
    pub normalization: Normalization,
}

impl UserDefinedImageFeatureModel {
    pub fn new(onnx_file: Vec<u8>, dim: usize) -> Self {
        Self {
            onnx_file,
            dim,
            normalization: Normalization::IMAGENET,
        }
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }
}

/// Options for [`ImageFeatureExtractor::extract_from_directory`](crate::ImageFeatureExtractor::extract_from_directory)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryOptions {
    /// Images per inference call, at least 1
    pub batch_size: usize,
    /// One subfolder per class instead of a flat list of files
    pub classes_as_folders: bool,
    /// Add a `classes` column, only meaningful with `classes_as_folders`
    pub export_class_names: bool,
    /// Return a [`FeatureTable`](crate::FeatureTable) instead of the raw matrix
    pub export_as_table: bool,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            classes_as_folders: true,
            export_class_names: false,
            export_as_table: true,
        }
    }
}

impl DirectoryOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_classes_as_folders(mut self, classes_as_folders: bool) -> Self {
        self.classes_as_folders = classes_as_folders;
        self
    }

    pub fn with_export_class_names(mut self, export_class_names: bool) -> Self {
        self.export_class_names = export_class_names;
        self
    }

    pub fn with_export_as_table(mut self, export_as_table: bool) -> Self {
        self.export_as_table = export_as_table;
        self
    }
}

/// Rust representation of the feature extractor
///
/// Holds only read-only state: every extraction call returns its results by value.
pub struct ImageFeatureExtractor {
    pub(crate) preprocessor: Compose,
    pub(crate) session: Session,
    pub(crate) dim: usize,
    pub(crate) target_shape: TargetShape,
}
