use std::{collections::HashMap, fmt::Display, str::FromStr, sync::OnceLock};

use crate::FeatureError;

use super::{model_info::ModelInfo, ModelTrait};

/// Lazy static list of all available backbones.
static MODEL_MAP: OnceLock<HashMap<ImageFeatureModel, ModelInfo<ImageFeatureModel>>> =
    OnceLock::new();

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFeatureModel {
    /// Qdrant/resnet50-onnx, ImageNet pretrained, classification head removed
    #[default]
    Resnet50,
}

/// Per-channel normalization applied to the `0..=255` pixel array before inference
///
/// `value = (pixel * rescale - mean[c]) / std[c]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub rescale: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    /// Torchvision style ImageNet statistics
    pub const IMAGENET: Normalization = Normalization {
        rescale: 1.0 / 255.0,
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };
}

fn init_models_map() -> HashMap<ImageFeatureModel, ModelInfo<ImageFeatureModel>> {
    let models_list = vec![ModelInfo {
        model: ImageFeatureModel::Resnet50,
        dim: 2048,
        description: String::from("ResNet-50 from `Deep Residual Learning for Image Recognition <https://arxiv.org/abs/1512.03385>`__."),
        model_code: String::from("Qdrant/resnet50-onnx"),
        model_file: String::from("model.onnx"),
        aliases: vec![String::from("resnet"), String::from("resnet50")],
        normalization: Normalization::IMAGENET,
    }];

    models_list
        .into_iter()
        .fold(HashMap::new(), |mut map, model| {
            map.insert(model.model, model);
            map
        })
}

/// Get a map of all available backbones.
pub fn models_map() -> &'static HashMap<ImageFeatureModel, ModelInfo<ImageFeatureModel>> {
    MODEL_MAP.get_or_init(init_models_map)
}

/// Get a list of all available backbones.
pub fn models_list() -> Vec<ModelInfo<ImageFeatureModel>> {
    models_map().values().cloned().collect()
}

impl ModelTrait for ImageFeatureModel {
    type Model = Self;

    fn get_model_info(model: &ImageFeatureModel) -> Option<&ModelInfo<ImageFeatureModel>> {
        models_map().get(model)
    }
}

impl Display for ImageFeatureModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let model_info = ImageFeatureModel::get_model_info(self).ok_or(std::fmt::Error)?;
        write!(f, "{}", model_info.model_code)
    }
}

impl FromStr for ImageFeatureModel {
    type Err = FeatureError;

    /// Accepts a registered alias (`resnet`, `resnet50`) or the hub model code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        models_map()
            .values()
            .find(|m| {
                m.model_code.eq_ignore_ascii_case(s)
                    || m.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(s))
            })
            .map(|m| m.model)
            .ok_or_else(|| FeatureError::UnsupportedModel(s.to_string()))
    }
}

impl TryFrom<String> for ImageFeatureModel {
    type Error = FeatureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
