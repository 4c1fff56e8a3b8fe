mod common;

use std::collections::HashMap;

use common::{serve, TestDir};
use deepfeatx::{try_download_dataset, FeatureError};
use flate2::{write::GzEncoder, Compression};

fn tar_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *contents).unwrap();
    }
    builder.into_inner().unwrap()
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn tgz_archive_is_unpacked_and_removed() {
    let archive = gzip(&tar_bytes(&[
        ("flowers/roses/a.txt", b"rose"),
        ("flowers/tulips/b.txt", b"tulip"),
    ]));
    let base = serve(HashMap::from([("/flowers.tgz".to_string(), archive)]));
    let dir = TestDir::new("download-tgz");

    try_download_dataset(&format!("{}/flowers.tgz", base), "flowers.tgz", &dir.path).unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.join("flowers/roses/a.txt")).unwrap(),
        "rose"
    );
    assert!(dir.join("flowers/tulips/b.txt").exists());
    assert!(!dir.join("flowers.tgz").exists());
}

#[test]
fn plain_tar_archive_is_unpacked() {
    let archive = tar_bytes(&[("data/readme.txt", b"hello")]);
    let base = serve(HashMap::from([("/data.tar".to_string(), archive)]));
    let dir = TestDir::new("download-tar");

    try_download_dataset(&format!("{}/data.tar", base), "data.tar", &dir.path).unwrap();

    assert!(dir.join("data/readme.txt").exists());
    assert!(!dir.join("data.tar").exists());
}

#[test]
fn missing_archive_reports_the_url() {
    let base = serve(HashMap::new());
    let dir = TestDir::new("download-missing");
    let url = format!("{}/nothing.tgz", base);

    let err = try_download_dataset(&url, "nothing.tgz", &dir.path).unwrap_err();
    assert!(matches!(err, FeatureError::Download { url: ref failed, .. } if failed == &url));
    assert!(err.to_string().contains("404"));
    assert!(!dir.join("nothing.tgz").exists());
}

#[test]
fn corrupt_archive_is_a_download_error() {
    let base = serve(HashMap::from([(
        "/broken.tgz".to_string(),
        b"this is not gzip".to_vec(),
    )]));
    let dir = TestDir::new("download-broken");

    assert!(matches!(
        try_download_dataset(&format!("{}/broken.tgz", base), "broken.tgz", &dir.path),
        Err(FeatureError::Download { .. })
    ));
    assert!(!dir.join("broken.tgz").exists());
}
