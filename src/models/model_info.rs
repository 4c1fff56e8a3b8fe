use super::image_feature::Normalization;

/// Data struct about the available models
#[derive(Debug, Clone)]
pub struct ModelInfo<T> {
    pub model: T,
    /// Length of the pooled feature vector
    pub dim: usize,
    pub description: String,
    pub model_code: String,
    pub model_file: String,
    /// Names accepted when parsing the model from a string
    pub aliases: Vec<String>,
    pub normalization: Normalization,
}
