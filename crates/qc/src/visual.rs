//! Screenshot comparison against per-viewport baselines

use std::path::{Path, PathBuf};

use image::{GenericImageView, Pixel, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{QcError, Result};

/// Result of a visual comparison
#[derive(Debug, Clone)]
pub struct VisualDiff {
    /// Whether the images match (within threshold)
    pub matches: bool,

    /// Percentage of pixels that differ
    pub diff_percent: f64,

    pub diff_pixels: u64,
    pub total_pixels: u64,

    /// Red-on-dimmed diff image, written only when pixels differ
    pub diff_image_path: Option<PathBuf>,

    pub actual_hash: String,
    pub baseline_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub enabled: bool,
    pub baseline_dir: PathBuf,
    pub diff_dir: PathBuf,
    /// Allowed share of differing pixels, in percent
    pub threshold: f64,
    /// Overwrite baselines with the current screenshots
    pub update_baselines: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            baseline_dir: PathBuf::from("qc-baselines"),
            diff_dir: PathBuf::from("qc-reports/diffs"),
            threshold: 0.5,
            update_baselines: false,
        }
    }
}

pub struct VisualTester {
    baseline_dir: PathBuf,
    diff_dir: PathBuf,
    threshold: f64,
    update_baselines: bool,
}

impl VisualTester {
    pub fn new(config: &VisualConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.baseline_dir)?;
        std::fs::create_dir_all(&config.diff_dir)?;

        Ok(Self {
            baseline_dir: config.baseline_dir.clone(),
            diff_dir: config.diff_dir.clone(),
            threshold: config.threshold,
            update_baselines: config.update_baselines,
        })
    }

    fn baseline_path(&self, name: &str) -> PathBuf {
        self.baseline_dir.join(format!("{}.png", name))
    }

    /// Compare `actual` against the baseline stored under `name`
    pub fn compare(&self, name: &str, actual: &Path) -> Result<VisualDiff> {
        if !actual.exists() {
            return Err(QcError::VisualRegression(format!(
                "Actual screenshot not found: {}",
                actual.display()
            )));
        }

        let baseline_path = self.baseline_path(name);
        if self.update_baselines || !baseline_path.exists() {
            if !self.update_baselines {
                return Err(QcError::BaselineNotFound(
                    baseline_path.to_string_lossy().to_string(),
                ));
            }
            std::fs::copy(actual, &baseline_path)?;
            info!("Updated baseline for '{}'", name);

            let hash = hash_file(actual)?;
            return Ok(VisualDiff {
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: 0,
                diff_image_path: None,
                actual_hash: hash.clone(),
                baseline_hash: hash,
            });
        }

        let actual_hash = hash_file(actual)?;
        let baseline_hash = hash_file(&baseline_path)?;
        let actual_img = image::open(actual)?;

        if actual_hash == baseline_hash {
            debug!("Screenshots match exactly (same hash)");
            return Ok(VisualDiff {
                matches: true,
                diff_percent: 0.0,
                diff_pixels: 0,
                total_pixels: (actual_img.width() as u64) * (actual_img.height() as u64),
                diff_image_path: None,
                actual_hash,
                baseline_hash,
            });
        }

        let baseline_img = image::open(&baseline_path)?;
        if actual_img.dimensions() != baseline_img.dimensions() {
            warn!(
                "Screenshot dimensions differ for '{}': actual {:?} vs baseline {:?}",
                name,
                actual_img.dimensions(),
                baseline_img.dimensions()
            );
        }

        let (width, height) = actual_img.dimensions();
        let actual_rgba = actual_img.to_rgba8();
        let baseline_rgba = baseline_img.to_rgba8();

        // pixels outside the overlap count as different
        let total_pixels = (width.max(baseline_img.width()) as u64)
            * (height.max(baseline_img.height()) as u64);
        let overlap_w = width.min(baseline_img.width());
        let overlap_h = height.min(baseline_img.height());
        let mut diff_img = RgbaImage::new(width, height);
        let mut same_pixels = 0u64;

        for y in 0..height {
            for x in 0..width {
                let actual_pixel = actual_rgba.get_pixel(x, y);
                let differs = x >= overlap_w
                    || y >= overlap_h
                    || pixels_differ(actual_pixel, baseline_rgba.get_pixel(x, y));

                if differs {
                    diff_img.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
                } else {
                    same_pixels += 1;
                    let c = actual_pixel.channels();
                    diff_img.put_pixel(x, y, image::Rgba([c[0] / 2, c[1] / 2, c[2] / 2, 128]));
                }
            }
        }

        let diff_pixels = total_pixels - same_pixels;
        let diff_percent = if total_pixels == 0 {
            0.0
        } else {
            (diff_pixels as f64 / total_pixels as f64) * 100.0
        };
        let matches = diff_percent <= self.threshold;

        let diff_image_path = if diff_pixels > 0 {
            let path = self.diff_dir.join(format!("{}-diff.png", name));
            diff_img.save(&path)?;
            Some(path)
        } else {
            None
        };

        if !matches {
            warn!(
                "Visual difference in '{}': {:.2}% pixels differ (threshold: {:.2}%)",
                name, diff_percent, self.threshold
            );
        }

        Ok(VisualDiff {
            matches,
            diff_percent,
            diff_pixels,
            total_pixels,
            diff_image_path,
            actual_hash,
            baseline_hash,
        })
    }
}

/// Channels may drift by a few levels from anti-aliasing and compression
fn pixels_differ(a: &image::Rgba<u8>, b: &image::Rgba<u8>) -> bool {
    const TOLERANCE: i32 = 5;

    a.channels()
        .iter()
        .zip(b.channels())
        .any(|(x, y)| (*x as i32 - *y as i32).abs() > TOLERANCE)
}

fn hash_file(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
