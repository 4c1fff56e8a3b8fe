use crate::ModelInfo;

pub mod image_feature;
pub mod model_info;

pub trait ModelTrait {
    type Model;
    fn get_model_info(model: &Self::Model) -> Option<&ModelInfo<Self::Model>>;
}
