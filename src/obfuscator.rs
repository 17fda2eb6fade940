//! Thumbnail obfuscation
//!
//! Gaussian blur over downloaded thumbnails. The transform is compiled in
//! with the `blur` feature; without it every call passes the original
//! through unchanged.

use crate::cache::{AssetCache, LocalAsset};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Whether the image transform is usable in this build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurCapability {
    Available,
    Unavailable,
}

impl BlurCapability {
    /// Detected once at startup
    pub fn detect() -> Self {
        if cfg!(feature = "blur") {
            Self::Available
        } else {
            Self::Unavailable
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ObfuscateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "blur")]
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(not(feature = "blur"))]
    #[error("Image support not compiled in")]
    Unsupported,
}

/// Applies the configured blur and registers derivatives with the cache
#[derive(Clone)]
pub struct ImageObfuscator {
    cache: Arc<AssetCache>,
    capability: BlurCapability,
}

impl ImageObfuscator {
    pub fn new(cache: Arc<AssetCache>, capability: BlurCapability) -> Self {
        Self { cache, capability }
    }

    /// Blur `asset` with sigma = `intensity`.
    ///
    /// Returns the original asset when intensity is zero, when the transform
    /// is unavailable, or when processing fails. Never errors.
    pub async fn apply(&self, asset: LocalAsset, intensity: u32) -> LocalAsset {
        if intensity == 0 {
            info!("Blur level is 0, skipping blur");
            return asset;
        }

        if self.capability == BlurCapability::Unavailable {
            warn!("Image support unavailable, sending thumbnail unblurred");
            return asset;
        }

        let source = asset.path.clone();
        let target = derivative_path(&source);
        let job = {
            let target = target.clone();
            tokio::task::spawn_blocking(move || blur_file(&source, &target, intensity))
        };

        match job.await {
            Ok(Ok(())) => {
                self.cache.register(&target);
                info!("Blurred thumbnail with level {}", intensity);
                LocalAsset::derivative(target)
            }
            Ok(Err(e)) => {
                error!("Blur failed for {}: {}", asset.path.display(), e);
                discard_partial(&target).await;
                asset
            }
            Err(e) => {
                error!("Blur task panicked for {}: {}", asset.path.display(), e);
                discard_partial(&target).await;
                asset
            }
        }
    }
}

/// `{dir}/{stem}_blurred.jpg`
fn derivative_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    source.with_file_name(format!("{}_blurred.jpg", stem))
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial blur output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!("Could not remove partial blur output {}: {}", path.display(), e),
    }
}

#[cfg(feature = "blur")]
fn blur_file(source: &Path, target: &Path, sigma: u32) -> Result<(), ObfuscateError> {
    let img = image::ImageReader::open(source)?
        .with_guessed_format()?
        .decode()?;

    // JPEG has no alpha channel
    let blurred = image::DynamicImage::ImageRgb8(img.blur(sigma as f32).to_rgb8());
    blurred.save_with_format(target, image::ImageFormat::Jpeg)?;
    Ok(())
}

#[cfg(not(feature = "blur"))]
fn blur_file(_source: &Path, _target: &Path, _sigma: u32) -> Result<(), ObfuscateError> {
    Err(ObfuscateError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(capability: BlurCapability) -> (TempDir, Arc<AssetCache>, ImageObfuscator) {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(AssetCache::new(dir.path()));
        let obfuscator = ImageObfuscator::new(Arc::clone(&cache), capability);
        (dir, cache, obfuscator)
    }

    #[test]
    fn test_derivative_path() {
        assert_eq!(
            derivative_path(Path::new("/c/temp_1_abcd.jpg")),
            PathBuf::from("/c/temp_1_abcd_blurred.jpg")
        );
        assert_eq!(
            derivative_path(Path::new("/c/temp_1_abcd.png")),
            PathBuf::from("/c/temp_1_abcd_blurred.jpg")
        );
    }

    #[tokio::test]
    async fn test_zero_intensity_passes_through() {
        let (dir, cache, obfuscator) = setup(BlurCapability::Available);
        let asset = LocalAsset::original(dir.path().join("in.jpg"));

        let out = obfuscator.apply(asset.clone(), 0).await;
        assert_eq!(out, asset);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_passes_through() {
        let (dir, cache, obfuscator) = setup(BlurCapability::Unavailable);
        let asset = LocalAsset::original(dir.path().join("in.jpg"));

        let out = obfuscator.apply(asset.clone(), 5).await;
        assert_eq!(out, asset);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_image_falls_back_to_original() {
        let (dir, cache, obfuscator) = setup(BlurCapability::Available);
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let asset = LocalAsset::original(path);

        let out = obfuscator.apply(asset.clone(), 3).await;
        assert_eq!(out, asset);
        assert!(cache.is_empty());
        assert!(!dir.path().join("broken_blurred.jpg").exists());
    }

    #[tokio::test]
    async fn test_discard_partial() {
        let dir = TempDir::new().unwrap();
        let partial = dir.path().join("x_blurred.jpg");
        std::fs::write(&partial, b"half").unwrap();

        discard_partial(&partial).await;
        assert!(!partial.exists());

        // Nothing written is fine too
        discard_partial(&partial).await;
    }

    #[cfg(feature = "blur")]
    #[tokio::test]
    async fn test_blur_writes_registered_derivative() {
        let (dir, cache, obfuscator) = setup(BlurCapability::Available);
        let path = dir.path().join("thumb.png");
        let img = image::RgbaImage::from_fn(16, 16, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 128])
            }
        });
        img.save(&path).unwrap();

        let out = obfuscator.apply(LocalAsset::original(path.clone()), 4).await;
        assert!(out.derived);
        assert_ne!(out.path, path);
        assert!(out.path.exists());
        assert_eq!(cache.registered(), vec![out.path.clone()]);

        let decoded = image::open(&out.path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }
}
