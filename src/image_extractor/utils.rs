use anyhow::anyhow;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{Array, Array3};
use std::ops::{Div, Sub};

use crate::{models::image_feature::Normalization, TargetShape};

pub enum TransformData {
    Image(DynamicImage),
    NdArray(Array3<f32>),
}

impl TransformData {
    pub fn image(self) -> anyhow::Result<DynamicImage> {
        match self {
            TransformData::Image(img) => Ok(img),
            _ => Err(anyhow!("TransformData convert error")),
        }
    }

    pub fn array(self) -> anyhow::Result<Array3<f32>> {
        match self {
            TransformData::NdArray(array) => Ok(array),
            _ => Err(anyhow!("TransformData convert error")),
        }
    }
}

pub trait Transform: Send + Sync {
    fn transform(&self, images: TransformData) -> anyhow::Result<TransformData>;
}

struct ConvertToRGB;

impl Transform for ConvertToRGB {
    fn transform(&self, data: TransformData) -> anyhow::Result<TransformData> {
        let image = data.image()?;
        let image = image.into_rgb8().into();
        Ok(TransformData::Image(image))
    }
}

/// Resize so the shorter side equals `size`, keeping the aspect ratio
pub struct ResizeShortestEdge {
    pub size: u32,
    pub resample: FilterType,
}

impl ResizeShortestEdge {
    /// Output dimensions for an input of `width x height`
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        let size = self.size as u64;
        let (width, height) = (width.max(1) as u64, height.max(1) as u64);
        if width <= height {
            (self.size, (size * height / width) as u32)
        } else {
            ((size * width / height) as u32, self.size)
        }
    }
}

impl Transform for ResizeShortestEdge {
    fn transform(&self, data: TransformData) -> anyhow::Result<TransformData> {
        let image = data.image()?;
        let (width, height) = self.output_size(image.width(), image.height());
        if (width, height) == image.dimensions() {
            return Ok(TransformData::Image(image));
        }
        let image = image.resize_exact(width, height, self.resample);
        Ok(TransformData::Image(image))
    }
}

pub struct CenterCrop {
    pub size: (u32, u32),
}

impl Transform for CenterCrop {
    fn transform(&self, data: TransformData) -> anyhow::Result<TransformData> {
        let image = data.image()?;
        let (origin_width, origin_height) = image.dimensions();
        let (crop_width, crop_height) = self.size;
        if origin_width < crop_width || origin_height < crop_height {
            return Err(anyhow!(
                "Cannot crop {}x{} out of a {}x{} image",
                crop_width,
                crop_height,
                origin_width,
                origin_height
            ));
        }
        let x = (origin_width - crop_width) / 2;
        let y = (origin_height - crop_height) / 2;
        let image = image.crop_imm(x, y, crop_width, crop_height);
        Ok(TransformData::Image(image))
    }
}

/// Pixels to a channels-first `f32` array, values kept in `0..=255`
struct ImageToArray;

impl Transform for ImageToArray {
    fn transform(&self, data: TransformData) -> anyhow::Result<TransformData> {
        match data {
            TransformData::Image(image) => {
                let image = image.to_rgb8();
                let (width, height) = image.dimensions();
                // whc -> chw
                let mut pixels_array = Array3::zeros((3usize, height as usize, width as usize));
                for (x, y, pixel) in image.enumerate_pixels() {
                    pixels_array[[0, y as usize, x as usize]] = pixel[0] as f32;
                    pixels_array[[1, y as usize, x as usize]] = pixel[1] as f32;
                    pixels_array[[2, y as usize, x as usize]] = pixel[2] as f32;
                }
                Ok(TransformData::NdArray(pixels_array))
            }
            ndarray => Ok(ndarray),
        }
    }
}

pub struct Rescale {
    pub scale: f32,
}

impl Transform for Rescale {
    fn transform(&self, data: TransformData) -> anyhow::Result<TransformData> {
        let array = data.array()?;
        let array = array * self.scale;
        Ok(TransformData::NdArray(array))
    }
}

pub struct Normalize {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Transform for Normalize {
    fn transform(&self, data: TransformData) -> anyhow::Result<TransformData> {
        let array = data.array()?;
        let mean = Array::from_vec(self.mean.clone()).into_shape_with_order((3, 1, 1))?;
        let std = Array::from_vec(self.std.clone()).into_shape_with_order((3, 1, 1))?;

        let shape = array.shape().to_vec();
        match shape.as_slice() {
            [c, h, w] => {
                let broadcast_error = || anyhow!("Normalize got a {:?} array", shape);
                let array_normalized = array
                    .sub(mean.broadcast((*c, *h, *w)).ok_or_else(broadcast_error)?)
                    .div(std.broadcast((*c, *h, *w)).ok_or_else(broadcast_error)?);
                Ok(TransformData::NdArray(array_normalized))
            }
            _ => Err(anyhow!(
                "Transformer convert error. Normalize operator get error shape."
            )),
        }
    }
}

pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    /// Resize the shorter side to the crop size, then center-crop a square
    pub fn geometry(crop_size: u32) -> Self {
        Compose::new(geometry_transforms(crop_size))
    }

    /// Full pipeline feeding a backbone: geometry, array conversion, normalization
    pub fn for_backbone(target_shape: TargetShape, normalization: Normalization) -> Self {
        let mut transformers = geometry_transforms(target_shape.crop_size());
        transformers.push(Box::new(ImageToArray));
        transformers.push(Box::new(Rescale {
            scale: normalization.rescale,
        }));
        transformers.push(Box::new(Normalize {
            mean: normalization.mean.to_vec(),
            std: normalization.std.to_vec(),
        }));
        Compose::new(transformers)
    }

    /// Run the pipeline and expect an array out of it
    pub fn to_array(&self, image: DynamicImage) -> anyhow::Result<Array3<f32>> {
        match self.transform(TransformData::Image(image))? {
            TransformData::NdArray(array) => Ok(array),
            _ => Err(anyhow!("Preprocessor configuration error!")),
        }
    }

    /// Run the pipeline and expect an image out of it
    pub fn to_image(&self, image: DynamicImage) -> anyhow::Result<DynamicImage> {
        self.transform(TransformData::Image(image))?.image()
    }
}

impl Transform for Compose {
    fn transform(&self, mut image: TransformData) -> anyhow::Result<TransformData> {
        for transform in &self.transforms {
            image = transform.transform(image)?;
        }
        Ok(image)
    }
}

fn geometry_transforms(crop_size: u32) -> Vec<Box<dyn Transform>> {
    vec![
        Box::new(ConvertToRGB),
        Box::new(ResizeShortestEdge {
            size: crop_size,
            resample: FilterType::Triangle,
        }),
        Box::new(CenterCrop {
            size: (crop_size, crop_size),
        }),
    ]
}
