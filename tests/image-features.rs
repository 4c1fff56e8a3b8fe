#![cfg(feature = "online")]

mod common;

use std::collections::HashMap;

use common::{serve, write_image, TestDir};
use deepfeatx::{
    DirectoryOptions, ExtractionOutput, FeatureError, ImageFeatureExtractor, ImageFeatureModel,
    ImageInitOptions, TargetShape, CLASSES_COLUMN, FILEPATHS_COLUMN,
};

fn extractor() -> ImageFeatureExtractor {
    ImageFeatureExtractor::try_new(ImageInitOptions::default()).unwrap()
}

fn pets() -> TestDir {
    let dir = TestDir::new("pets-model");
    write_image(&dir.join("cats/a.jpg"), 300, 200, 1);
    write_image(&dir.join("cats/b.jpg"), 180, 260, 2);
    write_image(&dir.join("dogs/c.jpg"), 224, 224, 3);
    dir
}

#[test]
fn test_supported_models() {
    for info in ImageFeatureExtractor::list_supported_models() {
        assert_eq!(info.model, ImageFeatureModel::Resnet50);
        assert_eq!(info.dim, 2048);
    }
    assert!(matches!(
        ImageInitOptions::from_model_name("vgg16"),
        Err(FeatureError::UnsupportedModel(ref name)) if name == "vgg16"
    ));
}

#[test]
fn test_single_image_features() {
    let model = extractor();
    let dir = TestDir::new("single");
    write_image(&dir.join("small.png"), 64, 48, 7);
    write_image(&dir.join("large.png"), 640, 480, 7);

    let small = model.embed_from_path(dir.join("small.png")).unwrap();
    let large = model.embed_from_path(dir.join("large.png")).unwrap();
    assert_eq!(small.len(), 2048);
    assert_eq!(large.len(), 2048);
    // post-ReLU averages
    assert!(small.iter().all(|value| *value >= 0.0));

    let again = model.embed_from_path(dir.join("small.png")).unwrap();
    assert_eq!(small, again);
}

#[test]
fn test_url_matches_path() {
    let model = extractor();
    let dir = TestDir::new("url");
    let path = dir.join("cat.png");
    write_image(&path, 256, 256, 11);
    let base = serve(HashMap::from([(
        "/cat.png".to_string(),
        std::fs::read(&path).unwrap(),
    )]));

    let from_path = model.embed_from_path(&path).unwrap();
    let from_url = model.embed_from_url(&format!("{}/cat.png", base)).unwrap();
    assert_eq!(from_path, from_url);
}

#[test]
fn test_read_image_center_crop() {
    let model = ImageFeatureExtractor::try_new(
        ImageInitOptions::default().with_target_shape(TargetShape::square(160)),
    )
    .unwrap();
    let dir = TestDir::new("crop");
    let path = dir.join("wide.png");
    write_image(&path, 400, 200, 5);

    let untouched = model.read_image_path(&path, false).unwrap();
    assert_eq!((untouched.width(), untouched.height()), (400, 200));
    let cropped = model.read_image_path(&path, true).unwrap();
    assert_eq!((cropped.width(), cropped.height()), (160, 160));

    assert_eq!(model.preprocess(cropped).unwrap().shape(), &[1, 3, 160, 160]);
    assert_eq!(model.embed_from_path(&path).unwrap().len(), 2048);
}

#[test]
fn test_directory_table() {
    let model = extractor();
    let dir = pets();

    let table = model
        .extract_from_directory(
            &dir.path,
            DirectoryOptions::default()
                .with_batch_size(2)
                .with_export_class_names(true),
        )
        .unwrap()
        .table()
        .unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.dim(), 2048);
    assert_eq!(
        table.classes().unwrap(),
        &["cats".to_string(), "cats".to_string(), "dogs".to_string()]
    );
    assert!(table.filepaths()[2].ends_with("dogs/c.jpg"));
    let columns = table.columns();
    assert_eq!(columns.len(), 2048 + 2);
    assert_eq!(&columns[..3], &[FILEPATHS_COLUMN, CLASSES_COLUMN, "0"]);

    // rows match single-image extraction
    let single = model.embed_from_path(dir.join("cats/a.jpg")).unwrap();
    let row = table.row(0).unwrap();
    for (batched, alone) in row.features.iter().zip(&single) {
        assert!((batched - alone).abs() < 1e-3);
    }
}

#[test]
fn test_directory_matrix_and_flat() {
    let model = extractor();
    let dir = pets();

    let output = model
        .extract_from_directory(
            &dir.path,
            DirectoryOptions::default().with_export_as_table(false),
        )
        .unwrap();
    assert!(matches!(output, ExtractionOutput::Matrix(_)));
    assert_eq!(output.into_matrix().shape(), &[3, 2048]);

    let flat = model
        .extract_from_directory(
            dir.join("cats"),
            DirectoryOptions::default()
                .with_classes_as_folders(false)
                .with_export_class_names(true),
        )
        .unwrap()
        .table()
        .unwrap();
    assert_eq!(flat.len(), 2);
    assert!(flat.classes().is_none());
    assert_eq!(flat.columns()[0], FILEPATHS_COLUMN);
    assert_eq!(flat.columns()[1], "0");
}

#[test]
fn test_multiple_directories() {
    let model = extractor();
    let first = pets();
    let second = TestDir::new("birds");
    write_image(&second.join("birds/d.png"), 100, 100, 9);

    let table = model
        .extract_from_directories(
            &[&first.path, &second.path],
            DirectoryOptions::default().with_export_class_names(true),
        )
        .unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.classes().unwrap()[3], "birds");
}

#[test]
fn test_empty_directory() {
    let model = extractor();
    let dir = TestDir::new("nothing");
    let err = model
        .extract_from_directory(&dir.path, DirectoryOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FeatureError>(),
        Some(FeatureError::EmptyDirectory(_))
    ));
}

#[test]
fn test_embed_paths_in_batches() {
    let model = extractor();
    let dir = pets();
    let images = vec![
        dir.join("cats/a.jpg"),
        dir.join("cats/b.jpg"),
        dir.join("dogs/c.jpg"),
    ];
    let vectors = model.embed(images.clone(), Some(2)).unwrap();
    assert_eq!(vectors.len(), 3);
    assert!(vectors.iter().all(|vector| vector.len() == 2048));
    assert!(model.embed(images, Some(0)).is_err());
}
