//! Best-effort helper to fetch and unpack an image dataset archive.

use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::Path,
    process::Command,
};

use flate2::read::GzDecoder;

use crate::FeatureError;

/// How an archive is unpacked, decided from its file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.tgz` / `.tar.gz`
    TarGz,
    /// `.tar`
    Tar,
    /// Anything else, handed to the external `unzip` utility
    Zip,
}

impl ArchiveKind {
    pub fn from_filename(archive_filename: &str) -> Self {
        let lower = archive_filename.to_ascii_lowercase();
        if lower.contains("tgz") || lower.ends_with(".tar.gz") {
            ArchiveKind::TarGz
        } else if lower.ends_with(".tar") {
            ArchiveKind::Tar
        } else {
            ArchiveKind::Zip
        }
    }
}

/// Download `url` into the current directory as `archive_filename`, unpack it
/// and remove the archive.
///
/// Never fails: on error the problem is reported on stderr together with the
/// URL to download the dataset from manually.
pub fn download_dataset(url: &str, archive_filename: &str) {
    if let Err(err) = try_download_dataset(url, archive_filename, ".") {
        log::error!("{}", err);
        eprintln!("Something went wrong. Please download the dataset manually at {url}");
        eprintln!("The following error was thrown:\n{err}");
    }
}

/// Fallible core of [`download_dataset`], unpacking into `destination`
pub fn try_download_dataset<P: AsRef<Path>>(
    url: &str,
    archive_filename: &str,
    destination: P,
) -> Result<(), FeatureError> {
    let destination = destination.as_ref();
    let archive_path = destination.join(archive_filename);

    log::info!("Downloading dataset from {}", url);
    let response = minreq::get(url)
        .send()
        .map_err(|err| FeatureError::download(url, err))?;
    if !(200..300).contains(&response.status_code) {
        return Err(FeatureError::download(
            url,
            format!(
                "HTTP status {} {}",
                response.status_code, response.reason_phrase
            ),
        ));
    }
    fs::create_dir_all(destination).map_err(|err| FeatureError::download(url, err))?;
    File::create(&archive_path)
        .and_then(|mut file| file.write_all(response.as_bytes()))
        .map_err(|err| FeatureError::download(url, err))?;

    log::info!("Unpacking {}", archive_path.display());
    if let Err(reason) = unpack(&archive_path, destination) {
        if let Err(err) = fs::remove_file(&archive_path) {
            log::warn!("Cannot remove {}: {}", archive_path.display(), err);
        }
        return Err(FeatureError::download(url, reason));
    }

    log::info!("Removing {}", archive_path.display());
    fs::remove_file(&archive_path).map_err(|err| FeatureError::download(url, err))?;
    Ok(())
}

fn unpack(
    archive_path: &Path,
    destination: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let archive_filename = archive_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match ArchiveKind::from_filename(&archive_filename) {
        ArchiveKind::TarGz => {
            let file = BufReader::new(File::open(archive_path)?);
            tar::Archive::new(GzDecoder::new(file)).unpack(destination)?;
        }
        ArchiveKind::Tar => {
            let file = BufReader::new(File::open(archive_path)?);
            tar::Archive::new(file).unpack(destination)?;
        }
        ArchiveKind::Zip => {
            let status = Command::new("unzip")
                .arg("-o")
                .arg("-q")
                .arg(archive_path)
                .arg("-d")
                .arg(destination)
                .status()?;
            if !status.success() {
                return Err(format!("unzip exited with {}", status).into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_kind_from_name() {
        assert_eq!(ArchiveKind::from_filename("flowers.tgz"), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::from_filename("flowers.TAR.GZ"), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::from_filename("flowers.tar"), ArchiveKind::Tar);
        assert_eq!(ArchiveKind::from_filename("flowers.zip"), ArchiveKind::Zip);
    }

    #[test]
    fn unreachable_url_is_reported() {
        let err = try_download_dataset(
            "http://127.0.0.1:9/data.tgz",
            "data.tgz",
            std::env::temp_dir(),
        )
        .unwrap_err();
        assert!(matches!(err, FeatureError::Download { ref url, .. } if url.ends_with("data.tgz")));
        // the helper swallows the same failure
        download_dataset("http://127.0.0.1:9/data.tgz", "data.tgz");
    }
}
