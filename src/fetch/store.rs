use crate::error::StoreError;
use crate::resolution::TargetRef;
use async_trait::async_trait;
use base64::Engine;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Marker between the media type and the payload of a data URL
const BASE64_MARKER: &str = ";base64,";

/// Persists a fetched payload and returns where it landed
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(&self, target: &TargetRef, payload: &[u8]) -> Result<PathBuf, StoreError>;
}

/// Writes one image file per camera into a directory
pub struct FileArtifactStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the image for `camera` is written to
    pub fn path_for(&self, camera: &str) -> PathBuf {
        let file_name: String = camera
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.jpg", file_name))
    }

    /// Turn the payload into image bytes: raw bodies pass through, a
    /// `data:image/...;base64,` URL is decoded
    fn decode(&self, camera: &str, payload: &[u8]) -> Result<Vec<u8>, StoreError> {
        if payload.is_empty() {
            return Err(StoreError::Empty {
                camera: camera.to_string(),
            });
        }

        let image = match data_url_body(payload) {
            Some(encoded) => {
                let encoded: Vec<u8> = encoded
                    .iter()
                    .copied()
                    .filter(|b| !b.is_ascii_whitespace())
                    .collect();
                // Decoded size is at most 3/4 of the encoded size
                let estimated = encoded.len() / 4 * 3;
                if estimated > self.max_bytes + 3 {
                    return Err(StoreError::TooLarge {
                        camera: camera.to_string(),
                        size: estimated,
                        limit: self.max_bytes,
                    });
                }
                base64::engine::general_purpose::STANDARD
                    .decode(&encoded)
                    .map_err(|e| StoreError::Decode {
                        camera: camera.to_string(),
                        details: e.to_string(),
                    })?
            }
            None => payload.to_vec(),
        };

        if image.is_empty() {
            return Err(StoreError::Empty {
                camera: camera.to_string(),
            });
        }
        if image.len() > self.max_bytes {
            return Err(StoreError::TooLarge {
                camera: camera.to_string(),
                size: image.len(),
                limit: self.max_bytes,
            });
        }

        Ok(image)
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn store(&self, target: &TargetRef, payload: &[u8]) -> Result<PathBuf, StoreError> {
        let image = self.decode(&target.camera, payload)?;

        let path = self.path_for(&target.camera);
        let staging = path.with_extension("jpg.tmp");

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Write {
                path: self.dir.clone(),
                source,
            })?;
        fs::write(&staging, &image)
            .await
            .map_err(|source| StoreError::Write {
                path: staging.clone(),
                source,
            })?;
        fs::rename(&staging, &path)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(
            "Stored {} bytes for {} at {}",
            image.len(),
            target,
            path.display()
        );
        info!("File written, name: {}, bytes: {}", path.display(), image.len());

        Ok(path)
    }
}

/// Base64 body of a `data:` URL, if the payload is one
fn data_url_body(payload: &[u8]) -> Option<&[u8]> {
    let trimmed = payload.trim_ascii_start();
    if !trimmed.starts_with(b"data:") {
        return None;
    }
    let header_end = trimmed
        .windows(BASE64_MARKER.len())
        .position(|window| window == BASE64_MARKER.as_bytes())?;
    Some(trimmed[header_end + BASE64_MARKER.len()..].trim_ascii_end())
}
