//! Packaging of extracted feature vectors into a matrix or a labeled table.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::anyhow;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

use crate::{BatchManifest, DirectoryOptions, Embedding, FeatureError};

pub const FILEPATHS_COLUMN: &str = "filepaths";
pub const CLASSES_COLUMN: &str = "classes";

/// One row per image: file path, optional class name and the feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    filepaths: Vec<PathBuf>,
    classes: Option<Vec<String>>,
    features: Array2<f32>,
}

/// Borrowed view of one table row
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow<'a> {
    pub filepath: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<&'a str>,
    #[serde(serialize_with = "serialize_features")]
    pub features: ArrayView1<'a, f32>,
}

fn serialize_features<S: serde::Serializer>(
    features: &ArrayView1<'_, f32>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(features.iter())
}

impl FeatureTable {
    pub fn new(
        filepaths: Vec<PathBuf>,
        classes: Option<Vec<String>>,
        features: Array2<f32>,
    ) -> anyhow::Result<Self> {
        if filepaths.len() != features.nrows() {
            return Err(anyhow!(
                "{} file paths for {} feature rows",
                filepaths.len(),
                features.nrows()
            ));
        }
        if let Some(classes) = &classes {
            if classes.len() != filepaths.len() {
                return Err(anyhow!(
                    "{} class names for {} file paths",
                    classes.len(),
                    filepaths.len()
                ));
            }
        }
        Ok(Self {
            filepaths,
            classes,
            features,
        })
    }

    /// Join tables row-wise. All tables must share the feature dimension;
    /// the class column is kept only if every table has one.
    pub fn concat(tables: Vec<FeatureTable>) -> anyhow::Result<FeatureTable> {
        let dim = tables.first().map(FeatureTable::dim).unwrap_or(0);
        if let Some(table) = tables.iter().find(|table| table.dim() != dim) {
            return Err(anyhow!(
                "Cannot concatenate tables of dimension {} and {}",
                dim,
                table.dim()
            ));
        }

        let views: Vec<ArrayView2<f32>> =
            tables.iter().map(|table| table.features.view()).collect();
        let features = if views.is_empty() {
            Array2::zeros((0, 0))
        } else {
            ndarray::concatenate(Axis(0), &views)?
        };
        let classes = if !tables.is_empty() && tables.iter().all(|table| table.classes.is_some()) {
            Some(
                tables
                    .iter()
                    .flat_map(|table| table.classes.iter().flatten().cloned())
                    .collect(),
            )
        } else {
            None
        };
        let filepaths = tables
            .into_iter()
            .flat_map(|table| table.filepaths)
            .collect();

        FeatureTable::new(filepaths, classes, features)
    }

    pub fn len(&self) -> usize {
        self.filepaths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filepaths.is_empty()
    }

    /// Length of every feature vector
    pub fn dim(&self) -> usize {
        self.features.ncols()
    }

    pub fn filepaths(&self) -> &[PathBuf] {
        &self.filepaths
    }

    pub fn classes(&self) -> Option<&[String]> {
        self.classes.as_deref()
    }

    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// Column names: `filepaths`, optionally `classes`, then `0..dim`
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![FILEPATHS_COLUMN.to_string()];
        if self.classes.is_some() {
            columns.push(CLASSES_COLUMN.to_string());
        }
        columns.extend((0..self.dim()).map(|index| index.to_string()));
        columns
    }

    pub fn row(&self, index: usize) -> Option<FeatureRow<'_>> {
        let filepath = self.filepaths.get(index)?;
        Some(FeatureRow {
            filepath,
            class: self
                .classes
                .as_ref()
                .and_then(|classes| classes.get(index))
                .map(String::as_str),
            features: self.features.row(index),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = FeatureRow<'_>> {
        (0..self.len()).filter_map(|index| self.row(index))
    }

    pub fn into_matrix(self) -> Array2<f32> {
        self.features
    }

    /// Write one JSON object per row
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for row in self.rows() {
            serde_json::to_writer(&mut writer, &row)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Result of a directory extraction
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutput {
    Table(FeatureTable),
    Matrix(Array2<f32>),
}

impl ExtractionOutput {
    pub fn table(self) -> Option<FeatureTable> {
        match self {
            ExtractionOutput::Table(table) => Some(table),
            ExtractionOutput::Matrix(_) => None,
        }
    }

    /// Feature matrix, whichever form was requested
    pub fn into_matrix(self) -> Array2<f32> {
        match self {
            ExtractionOutput::Table(table) => table.into_matrix(),
            ExtractionOutput::Matrix(matrix) => matrix,
        }
    }
}

/// Stack per-image vectors into a `[images, dim]` matrix
pub fn vectors_to_matrix(vectors: Vec<Embedding>, dim: usize) -> Result<Array2<f32>, FeatureError> {
    let rows = vectors.len();
    if let Some(vector) = vectors.iter().find(|vector| vector.len() != dim) {
        return Err(FeatureError::UnexpectedOutputShape(vec![rows, vector.len()]));
    }
    let flat: Vec<f32> = vectors.into_iter().flatten().collect();
    Array2::from_shape_vec((rows, dim), flat)
        .map_err(|_| FeatureError::UnexpectedOutputShape(vec![rows, dim]))
}

/// Package vectors produced in manifest order according to `options`
pub fn assemble(
    vectors: Vec<Embedding>,
    dim: usize,
    manifest: &BatchManifest,
    options: &DirectoryOptions,
) -> anyhow::Result<ExtractionOutput> {
    if vectors.len() != manifest.len() {
        return Err(anyhow!(
            "{} vectors for {} images",
            vectors.len(),
            manifest.len()
        ));
    }
    let matrix = vectors_to_matrix(vectors, dim)?;
    if !options.export_as_table {
        return Ok(ExtractionOutput::Matrix(matrix));
    }

    let classes = match manifest.labels() {
        Some(labels) if options.classes_as_folders && options.export_class_names => Some(
            labels
                .resolve()
                .ok_or_else(|| anyhow!("Class id without a class name"))?,
        ),
        _ => None,
    };
    let table = FeatureTable::new(manifest.filepaths().to_vec(), classes, matrix)?;
    Ok(ExtractionOutput::Table(table))
}
