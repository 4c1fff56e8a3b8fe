use anyhow::Result;
use std::io::Read;
use std::{fs::File, path::PathBuf};

pub const DEFAULT_CACHE_DIR: &str = ".deepfeatx_cache";

/// Type alias for the feature vector
pub type Embedding = Vec<f32>;

/// Type alias for the error type
pub type Error = anyhow::Error;

/// Cache directory for downloaded models, `DEEPFEATX_CACHE_DIR` takes precedence
pub fn get_cache_dir() -> String {
    std::env::var("DEEPFEATX_CACHE_DIR").unwrap_or(DEFAULT_CACHE_DIR.into())
}

/// Public function to read a file to bytes.
/// To be used when loading local model files.
///
/// Could be used to read the onnx file from a local cache in order to constitute a UserDefinedImageFeatureModel.
pub fn read_file_to_bytes(file: &PathBuf) -> Result<Vec<u8>> {
    let mut file = File::open(file)?;
    let file_size = file.metadata()?.len() as usize;
    let mut buffer = Vec::with_capacity(file_size);
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}
