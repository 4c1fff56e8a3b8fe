//! Directory batch source: enumerate images under a folder and stream them
//! through the preprocessor in fixed-size batches.

use std::{
    fs::read_dir,
    path::{Path, PathBuf},
    slice::Chunks,
};

use anyhow::Context;
use ndarray::{Array3, Array4, ArrayView3, Axis};
use walkdir::{DirEntry, WalkDir};

use crate::{load_image_path, Compose, FeatureError};

/// File extensions picked up when enumerating a directory, compared case-insensitively
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff", "gif", "webp",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryLayout {
    /// Images directly under the directory, no labels
    Flat,
    /// One subfolder per class, images anywhere below it
    ClassFolders,
}

impl DirectoryLayout {
    pub fn from_classes_as_folders(classes_as_folders: bool) -> Self {
        if classes_as_folders {
            DirectoryLayout::ClassFolders
        } else {
            DirectoryLayout::Flat
        }
    }
}

/// Class id of every file, plus the id -> name mapping taken from subfolder names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels {
    pub class_ids: Vec<usize>,
    /// `class_names[id]` is the subfolder name of class `id`
    pub class_names: Vec<String>,
}

impl ClassLabels {
    pub fn class_name(&self, id: usize) -> Option<&str> {
        self.class_names.get(id).map(String::as_str)
    }

    /// Class name of every file, in manifest order.
    ///
    /// `None` if an id has no name in `class_names`.
    pub fn resolve(&self) -> Option<Vec<String>> {
        self.class_ids
            .iter()
            .map(|&id| self.class_name(id).map(String::from))
            .collect()
    }
}

/// Ordered list of the images processed by one directory extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchManifest {
    filepaths: Vec<PathBuf>,
    labels: Option<ClassLabels>,
}

impl BatchManifest {
    /// Enumerate `directory` with the given layout.
    ///
    /// The order is sorted and therefore reproducible: by path for flat
    /// directories, by class name and then path for class folders.
    pub fn from_directory<P: AsRef<Path>>(
        directory: P,
        layout: DirectoryLayout,
    ) -> Result<Self, FeatureError> {
        let directory = directory.as_ref();
        let manifest = match layout {
            DirectoryLayout::Flat => Self::flat(directory),
            DirectoryLayout::ClassFolders => Self::class_folders(directory),
        };
        if manifest.is_empty() {
            return Err(FeatureError::EmptyDirectory(directory.to_path_buf()));
        }
        Ok(manifest)
    }

    fn flat(directory: &Path) -> Self {
        let mut filepaths: Vec<PathBuf> = match read_dir(directory) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && !is_hidden_path(path))
                .filter(|path| {
                    let keep = has_image_extension(path);
                    if !keep {
                        log::debug!("Skipping {}: not an image file", path.display());
                    }
                    keep
                })
                .collect(),
            Err(err) => {
                log::debug!("Cannot read {}: {}", directory.display(), err);
                Vec::new()
            }
        };
        filepaths.sort();
        log::info!("Found {} images.", filepaths.len());

        Self {
            filepaths,
            labels: None,
        }
    }

    fn class_folders(directory: &Path) -> Self {
        let mut class_dirs: Vec<PathBuf> = match read_dir(directory) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir() && !is_hidden_path(path))
                .collect(),
            Err(err) => {
                log::debug!("Cannot read {}: {}", directory.display(), err);
                Vec::new()
            }
        };
        class_dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut class_names = Vec::with_capacity(class_dirs.len());
        let mut filepaths = Vec::new();
        let mut class_ids = Vec::new();
        for (class_id, class_dir) in class_dirs.iter().enumerate() {
            let class_name = class_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            class_names.push(class_name);

            let mut class_files: Vec<PathBuf> = WalkDir::new(class_dir)
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        log::warn!("Skipping unreadable entry: {}", err);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && has_image_extension(entry.path()))
                .map(DirEntry::into_path)
                .collect();
            // files of a folder come before those of its subfolders
            class_files.sort_by(|a, b| {
                (a.parent(), a.file_name()).cmp(&(b.parent(), b.file_name()))
            });
            class_ids.extend(std::iter::repeat(class_id).take(class_files.len()));
            filepaths.extend(class_files);
        }
        log::info!(
            "Found {} images belonging to {} classes.",
            filepaths.len(),
            class_names.len()
        );

        Self {
            filepaths,
            labels: Some(ClassLabels {
                class_ids,
                class_names,
            }),
        }
    }

    pub fn filepaths(&self) -> &[PathBuf] {
        &self.filepaths
    }

    /// Labels, present for class-folder manifests only
    pub fn labels(&self) -> Option<&ClassLabels> {
        self.labels.as_ref()
    }

    pub fn len(&self) -> usize {
        self.filepaths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filepaths.is_empty()
    }

    /// Lazily decode and preprocess the manifest in batches of `batch_size` images
    pub fn batches<'a>(
        &'a self,
        batch_size: usize,
        preprocessor: &'a Compose,
    ) -> Result<ManifestBatches<'a>, FeatureError> {
        if batch_size == 0 {
            return Err(FeatureError::InvalidBatchSize);
        }
        Ok(ManifestBatches {
            chunks: self.filepaths.chunks(batch_size),
            preprocessor,
        })
    }
}

/// Iterator over preprocessed `[batch, 3, size, size]` arrays, in manifest order
///
/// Consumed once; build a new one from the manifest to go through the images again.
pub struct ManifestBatches<'a> {
    chunks: Chunks<'a, PathBuf>,
    preprocessor: &'a Compose,
}

impl ManifestBatches<'_> {
    fn load_batch(&self, paths: &[PathBuf]) -> anyhow::Result<Array4<f32>> {
        let inputs = paths
            .iter()
            .map(|path| {
                let image = load_image_path(path)?;
                self.preprocessor
                    .to_array(image)
                    .with_context(|| format!("Failed to preprocess {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<Array3<f32>>>>()?;

        let inputs_view: Vec<ArrayView3<f32>> = inputs.iter().map(|img| img.view()).collect();
        Ok(ndarray::stack(Axis(0), &inputs_view)?)
    }
}

impl Iterator for ManifestBatches<'_> {
    type Item = anyhow::Result<Array4<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        let paths = self.chunks.next()?;
        Some(self.load_batch(paths))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for ManifestBatches<'_> {}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn is_hidden_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
