use ndarray::{Array2, ArrayViewD, Axis, Ix2, Ix4};

use crate::{Embedding, FeatureError};

/// Reduce the backbone output to one vector per image.
///
/// `[batch, channels]` is returned as is, `[batch, channels, height, width]`
/// feature maps are averaged over their spatial axes.
pub fn global_average(output: &ArrayViewD<f32>) -> Result<Array2<f32>, FeatureError> {
    let shape_error = || FeatureError::UnexpectedOutputShape(output.shape().to_vec());
    match output.ndim() {
        2 => Ok(output
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| shape_error())?
            .to_owned()),
        4 => output
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| shape_error())?
            .mean_axis(Axis(3))
            .and_then(|reduced| reduced.mean_axis(Axis(2)))
            .ok_or_else(shape_error),
        _ => Err(shape_error()),
    }
}

/// Split pooled features into per-image vectors, checking the expected length
pub fn into_embeddings(pooled: Array2<f32>, dim: usize) -> Result<Vec<Embedding>, FeatureError> {
    if pooled.ncols() != dim {
        return Err(FeatureError::UnexpectedOutputShape(pooled.shape().to_vec()));
    }
    Ok(pooled.rows().into_iter().map(|row| row.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array4};

    #[test]
    fn averages_spatial_feature_map() {
        // 1 image, 2 channels, 2x2 map
        let map: Array4<f32> =
            Array::from_shape_vec((1, 2, 2, 2), vec![1., 2., 3., 4., 10., 10., 10., 10.]).unwrap();
        let pooled = global_average(&map.view().into_dyn()).unwrap();
        assert_eq!(pooled.shape(), &[1, 2]);
        assert_eq!(pooled.row(0).to_vec(), vec![2.5, 10.0]);
    }

    #[test]
    fn keeps_already_pooled_output() {
        let pooled = Array2::<f32>::ones((3, 4));
        let out = global_average(&pooled.view().into_dyn()).unwrap();
        assert_eq!(out, pooled);
        let embeddings = into_embeddings(out, 4).unwrap();
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings.iter().all(|e| e.len() == 4));
    }

    #[test]
    fn rejects_other_ranks_and_dims() {
        let cube = ndarray::Array3::<f32>::zeros((1, 2, 3));
        assert!(matches!(
            global_average(&cube.view().into_dyn()),
            Err(FeatureError::UnexpectedOutputShape(shape)) if shape == vec![1, 2, 3]
        ));
        assert!(into_embeddings(Array2::zeros((1, 512)), 2048).is_err());
    }
}
