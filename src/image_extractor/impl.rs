#[cfg(feature = "online")]
use hf_hub::{
    api::sync::{ApiBuilder, ApiRepo},
    Cache,
};
use image::DynamicImage;
use ndarray::{Array4, ArrayView3, Axis};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
#[cfg(feature = "online")]
use std::path::PathBuf;
use std::{path::Path, thread::available_parallelism};

use crate::{
    load_image_path, load_image_url,
    models::image_feature::{models_list, models_map},
    output::{assemble, ExtractionOutput, FeatureTable},
    pooling, BatchManifest, DirectoryLayout, Embedding, FeatureError, ImageFeatureModel,
    ModelInfo, TargetShape,
};
use anyhow::{anyhow, Context};

#[cfg(feature = "online")]
use super::ImageInitOptions;
use super::{
    init::{DirectoryOptions, ImageInitOptionsUserDefined, UserDefinedImageFeatureModel},
    utils::Compose,
    ImageFeatureExtractor, DEFAULT_BATCH_SIZE,
};

impl ImageFeatureExtractor {
    /// Try to generate a new ImageFeatureExtractor Instance
    ///
    /// Uses the highest level of Graph optimization
    ///
    /// Uses the total number of CPUs available as the number of intra-threads
    #[cfg(feature = "online")]
    pub fn try_new(options: ImageInitOptions) -> anyhow::Result<Self> {
        let ImageInitOptions {
            model_name,
            target_shape,
            execution_providers,
            cache_dir,
            show_download_progress,
        } = options;
        target_shape.validate()?;

        let threads = available_parallelism()?.get();
        let model_info = ImageFeatureExtractor::get_model_info(&model_name)?;

        log::info!("Loading {} ({})", model_name, model_info.description);
        let model_repo =
            ImageFeatureExtractor::retrieve_model(model_name, cache_dir, show_download_progress)?;

        let model_file_reference = model_repo
            .get(&model_info.model_file)
            .context(format!("Failed to retrieve {}", model_info.model_file))?;

        let session = Session::builder()?
            .with_execution_providers(execution_providers)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(model_file_reference)?;

        let preprocessor = Compose::for_backbone(target_shape, model_info.normalization);
        Ok(Self::new(preprocessor, session, model_info.dim, target_shape))
    }

    /// Create a ImageFeatureExtractor instance from model files provided by the user.
    ///
    /// This can be used for 'bring your own' backbones
    pub fn try_new_from_user_defined(
        model: UserDefinedImageFeatureModel,
        options: ImageInitOptionsUserDefined,
    ) -> anyhow::Result<Self> {
        let ImageInitOptionsUserDefined {
            execution_providers,
            target_shape,
        } = options;
        target_shape.validate()?;

        let threads = available_parallelism()?.get();

        let session = Session::builder()?
            .with_execution_providers(execution_providers)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_memory(&model.onnx_file)?;

        let preprocessor = Compose::for_backbone(target_shape, model.normalization);
        Ok(Self::new(preprocessor, session, model.dim, target_shape))
    }

    /// Private method to return an instance
    fn new(preprocessor: Compose, session: Session, dim: usize, target_shape: TargetShape) -> Self {
        Self {
            preprocessor,
            session,
            dim,
            target_shape,
        }
    }

    /// Return the backbone's directory from cache or remote retrieval
    #[cfg(feature = "online")]
    fn retrieve_model(
        model: ImageFeatureModel,
        cache_dir: PathBuf,
        show_download_progress: bool,
    ) -> anyhow::Result<ApiRepo> {
        let cache = Cache::new(cache_dir);
        let api = ApiBuilder::from_cache(cache)
            .with_progress(show_download_progress)
            .build()?;

        let repo = api.model(model.to_string());
        Ok(repo)
    }

    /// Retrieve a list of supported models
    pub fn list_supported_models() -> Vec<ModelInfo<ImageFeatureModel>> {
        models_list()
    }

    /// Get ModelInfo from ImageFeatureModel
    pub fn get_model_info(
        model: &ImageFeatureModel,
    ) -> Result<&'static ModelInfo<ImageFeatureModel>, FeatureError> {
        models_map()
            .get(model)
            .ok_or_else(|| FeatureError::UnsupportedModel(model.to_string()))
    }

    /// Length of every produced vector
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn target_shape(&self) -> TargetShape {
        self.target_shape
    }

    /// Load an image from a URL, optionally resized and center-cropped to the target size
    pub fn read_image_url(&self, url: &str, center_crop: bool) -> anyhow::Result<DynamicImage> {
        let image = load_image_url(url)?;
        self.maybe_crop(image, center_crop)
    }

    /// Load an image from disk, optionally resized and center-cropped to the target size
    pub fn read_image_path<P: AsRef<Path>>(
        &self,
        path: P,
        center_crop: bool,
    ) -> anyhow::Result<DynamicImage> {
        let image = load_image_path(path)?;
        self.maybe_crop(image, center_crop)
    }

    fn maybe_crop(&self, image: DynamicImage, center_crop: bool) -> anyhow::Result<DynamicImage> {
        if center_crop {
            Compose::geometry(self.target_shape.crop_size()).to_image(image)
        } else {
            Ok(image)
        }
    }

    /// Model input for a single image, `[1, 3, size, size]`
    pub fn preprocess(&self, image: DynamicImage) -> anyhow::Result<Array4<f32>> {
        let array = self.preprocessor.to_array(image)?;
        Ok(array.insert_axis(Axis(0)))
    }

    /// Feature vector of an image fetched from `url`
    pub fn embed_from_url(&self, url: &str) -> anyhow::Result<Embedding> {
        let image = load_image_url(url)?;
        self.embed_image(image)
    }

    /// Feature vector of the image at `path`
    pub fn embed_from_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<Embedding> {
        let image = load_image_path(path)?;
        self.embed_image(image)
    }

    /// Feature vector of an already decoded image
    pub fn embed_image(&self, image: DynamicImage) -> anyhow::Result<Embedding> {
        let input = self.preprocess(image)?;
        self.embed_batch(input)?
            .pop()
            .ok_or_else(|| anyhow!("Backbone returned no vector"))
    }

    /// Run the backbone on a preprocessed `[batch, 3, size, size]` array
    pub fn embed_batch(&self, pixel_values: Array4<f32>) -> anyhow::Result<Vec<Embedding>> {
        let input_name = self.session.inputs[0].name.clone();
        let session_inputs = ort::inputs![
            input_name => Value::from_array(pixel_values)?,
        ]?;

        let outputs = self.session.run(session_inputs)?;

        // Try to get the only output key
        // If multiple, then default to the first one the graph declares
        let output_key = match outputs.len() {
            1 => outputs
                .keys()
                .next()
                .ok_or_else(|| anyhow!("Backbone produced no output"))?
                .to_string(),
            _ => self.session.outputs[0].name.clone(),
        };

        let output_data = outputs
            .get(output_key.as_str())
            .ok_or_else(|| anyhow!("Missing output {}", output_key))?
            .try_extract_tensor::<f32>()?;

        let pooled = pooling::global_average(&output_data)?;
        Ok(pooling::into_embeddings(pooled, self.dim)?)
    }

    /// Method to generate feature vectors for a Vec of image paths
    // Generic type to accept String, &str, OsString, &OsStr
    pub fn embed<S: AsRef<Path>>(
        &self,
        images: Vec<S>,
        batch_size: Option<usize>,
    ) -> anyhow::Result<Vec<Embedding>> {
        // Determine the batch size, default if not specified
        let batch_size = batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(FeatureError::InvalidBatchSize.into());
        }

        let mut output = Vec::with_capacity(images.len());
        for batch in images.chunks(batch_size) {
            let inputs = batch
                .iter()
                .map(|img| self.preprocessor.to_array(load_image_path(img)?))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let inputs_view: Vec<ArrayView3<f32>> = inputs.iter().map(|img| img.view()).collect();
            let pixel_values_array = ndarray::stack(Axis(0), &inputs_view)?;
            output.extend(self.embed_batch(pixel_values_array)?);
        }

        Ok(output)
    }

    /// Extract a vector for every image under `directory`.
    ///
    /// With `classes_as_folders` every immediate subfolder is a class; otherwise
    /// the images directly inside `directory` are used. Rows follow the sorted
    /// manifest order.
    pub fn extract_from_directory<P: AsRef<Path>>(
        &self,
        directory: P,
        options: DirectoryOptions,
    ) -> anyhow::Result<ExtractionOutput> {
        let layout = DirectoryLayout::from_classes_as_folders(options.classes_as_folders);
        let manifest = BatchManifest::from_directory(directory, layout)?;
        let batches = manifest.batches(options.batch_size, &self.preprocessor)?;

        let total = batches.len();
        let mut vectors = Vec::with_capacity(manifest.len());
        for (index, batch) in batches.enumerate() {
            vectors.extend(self.embed_batch(batch?)?);
            log::debug!("Batch {}/{} done", index + 1, total);
        }

        assemble(vectors, self.dim, &manifest, &options)
    }

    /// Extract every directory as a table and concatenate the rows in order
    pub fn extract_from_directories<P: AsRef<Path>>(
        &self,
        directories: &[P],
        options: DirectoryOptions,
    ) -> anyhow::Result<FeatureTable> {
        let options = options.with_export_as_table(true);
        let tables = directories
            .iter()
            .map(|directory| {
                self.extract_from_directory(directory, options)?
                    .table()
                    .ok_or_else(|| anyhow!("Expected a table"))
            })
            .collect::<anyhow::Result<Vec<FeatureTable>>>()?;
        FeatureTable::concat(tables)
    }
}
