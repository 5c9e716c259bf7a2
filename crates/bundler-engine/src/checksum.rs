use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest;
use tokio::io::AsyncReadExt;

use crate::error::BundleError;
use crate::manifest::BaseOutput;

const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Sha1,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha1" => Ok(Self::Sha1),
            _ => Err(format!(
                "unknown checksum algorithm '{s}' (expected sha256 or sha1)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    /// Lowercase hex digest
    pub hash: String,
}

/// Sidecar record written next to the bundle archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksumOutput {
    #[serde(flatten)]
    pub base: BaseOutput,
    pub checksum: Checksum,
}

/// Hash the file at `path`, reading it in fixed-size chunks.
pub async fn checksum(path: &Path, algorithm: ChecksumAlgorithm) -> Result<Checksum, BundleError> {
    let hash = match algorithm {
        ChecksumAlgorithm::Sha256 => hash_file::<sha2::Sha256>(path).await?,
        ChecksumAlgorithm::Sha1 => hash_file::<sha1::Sha1>(path).await?,
    };
    tracing::debug!(path = %path.display(), %algorithm, %hash, "checksum computed");
    Ok(Checksum { algorithm, hash })
}

async fn hash_file<D: Digest>(path: &Path) -> Result<String, BundleError> {
    let read_err = |e| BundleError::Read {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = tokio::fs::File::open(path).await.map_err(read_err)?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer).await.map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
