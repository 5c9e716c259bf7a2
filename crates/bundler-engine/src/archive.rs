//! gzip-compressed tar primitives, run on the blocking pool.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::BundleError;

/// Paths of every entry whose file name is in `lookup`.
pub async fn list_entries(
    archive: &Path,
    lookup: BTreeSet<String>,
) -> Result<Vec<String>, BundleError> {
    let path = archive.to_path_buf();
    tokio::task::spawn_blocking(move || {
        list_blocking(&path, &lookup).map_err(|e| BundleError::Archive { path, source: e })
    })
    .await?
}

/// Unpack `archive` into `destination`, creating it if needed.
pub async fn extract(archive: &Path, destination: &Path) -> Result<(), BundleError> {
    let path = archive.to_path_buf();
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&destination).map_err(|e| BundleError::Create {
            path: destination.clone(),
            source: e,
        })?;
        let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(
            File::open(&path).map_err(|e| BundleError::Archive {
                path: path.clone(),
                source: e,
            })?,
        )));
        archive
            .unpack(&destination)
            .map_err(|e| BundleError::Archive { path, source: e })
    })
    .await?
}

/// Write the contents of `source_dir` to a new `.tar.gz` at `archive`.
pub async fn create(archive: &Path, source_dir: &Path) -> Result<(), BundleError> {
    let path = archive.to_path_buf();
    let source_dir = source_dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BundleError::Create {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        create_blocking(&path, &source_dir).map_err(|e| BundleError::Archive { path, source: e })
    })
    .await?
}

fn list_blocking(archive: &Path, lookup: &BTreeSet<String>) -> io::Result<Vec<String>> {
    let file = File::open(archive)?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut found = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        let path = entry.path()?;
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| lookup.contains(name));
        if matches {
            found.push(path.to_string_lossy().into_owned());
        }
    }
    Ok(found)
}

fn create_blocking(archive: &Path, source_dir: &Path) -> io::Result<()> {
    let file = File::create(archive)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", source_dir)?;
    builder.into_inner()?.finish()?.into_inner().map_err(|e| e.into_error())?;
    Ok(())
}
