//! [deepfeatx](https://docs.rs/deepfeatx) - Extract deep features from images with pretrained convolutional backbones.
//!
//! The library provides the [ImageFeatureExtractor] struct, a ResNet-50 backbone
//! whose classification head is replaced by global average pooling, so every
//! image maps to a 2048 dimensional vector.
//!
//! ### Instantiating [ImageFeatureExtractor](crate::ImageFeatureExtractor)
//! ```
//! use deepfeatx::{ImageFeatureExtractor, ImageInitOptions, TargetShape};
//!
//!# fn model_demo() -> anyhow::Result<()> {
//! // With default ImageInitOptions: "resnet", 224x224x3
//! let extractor = ImageFeatureExtractor::try_new(Default::default())?;
//!
//! // List all supported models
//! dbg!(ImageFeatureExtractor::list_supported_models());
//!
//! // By name, with a custom target shape
//! let extractor = ImageFeatureExtractor::try_new(
//!     ImageInitOptions::from_model_name("resnet")?
//!         .with_target_shape(TargetShape::try_from((256, 256, 3))?)
//!         .with_show_download_progress(false),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature extraction
//!```
//!# use deepfeatx::{DirectoryOptions, ImageFeatureExtractor};
//!# fn extraction_demo() -> anyhow::Result<()> {
//!# let extractor = ImageFeatureExtractor::try_new(Default::default())?;
//! // A single image, from disk or over HTTP
//! let vector = extractor.embed_from_path("cats/a.jpg")?;
//! println!("Vector length: {}", vector.len()); // -> Vector length: 2048
//!
//! // A folder with one subfolder per class
//! let table = extractor
//!     .extract_from_directory(
//!         "pets/",
//!         DirectoryOptions::default().with_export_class_names(true),
//!     )?
//!     .table()
//!     .expect("tables are the default output");
//! println!("Columns: {:?}", &table.columns()[..3]); // -> ["filepaths", "classes", "0"]
//! # Ok(())
//! # }
//! ```
//!

mod common;
mod directory;
mod download;
mod error;
mod image_extractor;
mod init;
mod loader;
mod models;
mod output;
pub mod pooling;

pub use ort::execution_providers::ExecutionProviderDispatch;

pub use crate::common::{get_cache_dir, read_file_to_bytes, Embedding, Error, DEFAULT_CACHE_DIR};
pub use crate::directory::{
    BatchManifest, ClassLabels, DirectoryLayout, ManifestBatches, IMAGE_EXTENSIONS,
};
pub use crate::download::{download_dataset, try_download_dataset, ArchiveKind};
pub use crate::error::FeatureError;
pub use crate::image_extractor::{
    Compose, DirectoryOptions, ImageFeatureExtractor, ImageInitOptions,
    ImageInitOptionsUserDefined, UserDefinedImageFeatureModel,
};
pub use crate::init::{InitOptions, TargetShape};
pub use crate::loader::{decode_image_bytes, load_image_path, load_image_url};
pub use crate::models::{
    image_feature::{ImageFeatureModel, Normalization},
    model_info::ModelInfo,
    ModelTrait,
};
pub use crate::output::{
    assemble, vectors_to_matrix, ExtractionOutput, FeatureRow, FeatureTable, CLASSES_COLUMN,
    FILEPATHS_COLUMN,
};
