use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageDecoder;

use crate::model::{EmbeddedImage, ImageFormat};

/// Environment variable naming the directory that holds `static/`.
pub const ASSETS_DIR_ENV: &str = "PAYSLIP_ASSETS_DIR";

pub const REGULAR_FONT_PATH: &str = "static/fonts/DejaVuSans.ttf";
pub const BOLD_FONT_PATH: &str = "static/fonts/DejaVuSans-Bold.ttf";
pub const LOGO_PATH: &str = "static/images/logo.png";

/// Locates the read-only static assets. Every asset is optional.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetConfig {
    pub base_dir: PathBuf,
}

impl AssetConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `$PAYSLIP_ASSETS_DIR`, or the working directory when unset.
    pub fn from_env() -> Self {
        let base_dir = std::env::var_os(ASSETS_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { base_dir }
    }

    pub fn regular_font_path(&self) -> PathBuf {
        self.base_dir.join(REGULAR_FONT_PATH)
    }

    pub fn bold_font_path(&self) -> PathBuf {
        self.base_dir.join(BOLD_FONT_PATH)
    }

    pub fn logo_path(&self) -> PathBuf {
        self.base_dir.join(LOGO_PATH)
    }

    pub fn load_logo(&self) -> Option<EmbeddedImage> {
        load_image(&self.logo_path())
    }
}

/// Read a PNG or JPEG from disk. Absence and decode failures are logged and
/// yield `None`.
pub(crate) fn load_image(path: &Path) -> Option<EmbeddedImage> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("Image asset not found: {}", path.display());
            return None;
        }
        Err(e) => {
            log::warn!("Cannot read image {}: {e}", path.display());
            return None;
        }
    };

    let image_format = match image::guess_format(&data) {
        Ok(f @ (image::ImageFormat::Png | image::ImageFormat::Jpeg)) => f,
        Ok(other) => {
            log::warn!("Unsupported image format {other:?}: {}", path.display());
            return None;
        }
        Err(e) => {
            log::warn!("Unrecognized image {}: {e}", path.display());
            return None;
        }
    };
    let format = if image_format == image::ImageFormat::Png {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg
    };

    // Header only; pixels are decoded once, when the image is embedded
    let decoder = match image::ImageReader::with_format(Cursor::new(&data), image_format)
        .into_decoder()
    {
        Ok(decoder) => decoder,
        Err(e) => {
            log::warn!("Cannot decode image {}: {e}", path.display());
            return None;
        }
    };
    let (pixel_width, pixel_height) = decoder.dimensions();
    let grayscale = matches!(
        decoder.color_type(),
        image::ColorType::L8 | image::ColorType::L16
    );
    drop(decoder);

    Some(EmbeddedImage {
        pixel_width,
        pixel_height,
        grayscale,
        data,
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_paths_hang_off_base_dir() {
        let config = AssetConfig::new("/srv/payroll");
        assert_eq!(
            config.regular_font_path(),
            PathBuf::from("/srv/payroll/static/fonts/DejaVuSans.ttf")
        );
        assert_eq!(
            config.logo_path(),
            PathBuf::from("/srv/payroll/static/images/logo.png")
        );
    }

    #[test]
    fn missing_logo_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AssetConfig::new(dir.path()).load_logo().is_none());
    }

    #[test]
    fn garbage_logo_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssetConfig::new(dir.path());
        let path = config.logo_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(config.load_logo().is_none());
    }

    #[test]
    fn png_logo_loads_with_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssetConfig::new(dir.path());
        let path = config.logo_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::from_pixel(4, 3, image::Rgba([91, 77, 158, 255]))
            .save(&path)
            .unwrap();
        let logo = config.load_logo().unwrap();
        assert_eq!(logo.format, ImageFormat::Png);
        assert_eq!((logo.pixel_width, logo.pixel_height), (4, 3));
        assert!(!logo.grayscale);
    }

    #[test]
    fn grayscale_png_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssetConfig::new(dir.path());
        let path = config.logo_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::GrayImage::from_pixel(5, 2, image::Luma([40]))
            .save(&path)
            .unwrap();
        let logo = config.load_logo().unwrap();
        assert_eq!((logo.pixel_width, logo.pixel_height), (5, 2));
        assert!(logo.grayscale);
        assert_eq!(logo.data, std::fs::read(&path).unwrap());
    }
}
