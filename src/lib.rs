mod assets;
mod builder;
mod error;
mod fonts;
mod format;
pub mod model;
mod payslip;
mod pdf;

pub use assets::{ASSETS_DIR_ENV, AssetConfig};
pub use builder::{BuildAssets, COMPANY_ADDRESS, COMPANY_NAME, build_blocks};
pub use error::Error;
pub use fonts::{FontSet, FontSource, resolve_fonts, shared_fonts};
pub use format::{CURRENCY_SYMBOL, format_currency};
pub use payslip::PayslipRecord;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use model::{Block, EmbeddedImage, PageGeometry};
use pdf::DocumentMeta;

/// Where rendered bytes go.
pub enum OutputTarget<'a> {
    /// Written through a temporary file in the same directory, then renamed
    /// into place. A failed write leaves nothing behind.
    File(&'a Path),
    /// Replaces the buffer's contents.
    Buffer(&'a mut Vec<u8>),
}

/// Renders payslips with an explicit font set and asset directory.
pub struct PayslipRenderer<'f> {
    fonts: &'f FontSet,
    logo: Option<Arc<EmbeddedImage>>,
    geometry: PageGeometry,
}

impl<'f> PayslipRenderer<'f> {
    /// Loads the logo from `assets` once; it is reused for every render.
    pub fn new(fonts: &'f FontSet, assets: &AssetConfig) -> Self {
        Self {
            fonts,
            logo: assets.load_logo().map(Arc::new),
            geometry: PageGeometry::A4,
        }
    }

    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn build(&self, payslip: &PayslipRecord) -> Vec<Block> {
        build_blocks(
            payslip,
            &BuildAssets {
                fonts: self.fonts,
                logo: self.logo.clone(),
            },
        )
    }

    pub fn render_to_vec(&self, payslip: &PayslipRecord) -> Result<Vec<u8>, Error> {
        let t0 = Instant::now();

        for issue in payslip.consistency_issues() {
            log::warn!("Payslip for {:?}: {issue}", payslip.employee_id);
        }

        let blocks = self.build(payslip);
        let t_build = t0.elapsed();

        let meta = DocumentMeta {
            title: format!("Payslip - {} - {}", payslip.employee_name, payslip.pay_period),
            author: COMPANY_NAME.to_string(),
        };
        let bytes = pdf::render(&blocks, self.fonts, &self.geometry, &meta)?;
        let t_total = t0.elapsed();

        log::debug!(
            "Timing: build={:.1}ms, render={:.1}ms, total={:.1}ms (output {} bytes)",
            t_build.as_secs_f64() * 1000.0,
            (t_total - t_build).as_secs_f64() * 1000.0,
            t_total.as_secs_f64() * 1000.0,
            bytes.len(),
        );

        Ok(bytes)
    }

    pub fn render(&self, target: OutputTarget<'_>, payslip: &PayslipRecord) -> Result<(), Error> {
        let bytes = self.render_to_vec(payslip)?;
        match target {
            OutputTarget::Buffer(buf) => {
                buf.clear();
                buf.extend_from_slice(&bytes);
            }
            OutputTarget::File(path) => {
                write_atomically(path, &bytes)?;
                log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
            }
        }
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Render one payslip with the process-wide fonts and the assets named by
/// `PAYSLIP_ASSETS_DIR` (or the working directory).
pub fn render_payslip(target: OutputTarget<'_>, payslip: &PayslipRecord) -> Result<(), Error> {
    let assets = AssetConfig::from_env();
    let fonts = shared_fonts(&assets.base_dir);
    PayslipRenderer::new(fonts, &assets).render(target, payslip)
}

/// `payslip_{employee_id}_{YYYYmmdd_HHMMSS}.pdf`, with the id made safe for
/// use as a file name.
pub fn payslip_filename(employee_id: &str, timestamp: chrono::NaiveDateTime) -> String {
    let id = sanitize_filename::sanitize(employee_id.trim());
    let id = if id.is_empty() { "unknown".to_string() } else { id };
    format!("payslip_{id}_{}.pdf", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Render into `dir` under a timestamped name and return the written path.
pub fn render_payslip_to_dir(dir: &Path, payslip: &PayslipRecord) -> Result<PathBuf, Error> {
    std::fs::create_dir_all(dir)?;
    let name = payslip_filename(&payslip.employee_id, chrono::Local::now().naive_local());
    let path = dir.join(name);
    render_payslip(OutputTarget::File(&path), payslip)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 31)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn filename_carries_id_and_timestamp() {
        assert_eq!(
            payslip_filename("E100", at(9, 5, 7)),
            "payslip_E100_20251031_090507.pdf"
        );
    }

    #[test]
    fn filename_strips_path_separators() {
        let name = payslip_filename("../etc/E1", at(0, 0, 0));
        assert!(!name.contains('/'));
        assert!(name.starts_with("payslip_"));
        assert!(name.ends_with("_20251031_000000.pdf"));
    }

    #[test]
    fn blank_id_gets_placeholder() {
        assert_eq!(
            payslip_filename("  ", at(12, 0, 0)),
            "payslip_unknown_20251031_120000.pdf"
        );
    }

    #[test]
    fn buffer_target_is_replaced() {
        let fonts = FontSet::builtin();
        let dir = tempfile::tempdir().unwrap();
        let renderer = PayslipRenderer::new(&fonts, &AssetConfig::new(dir.path()));
        let mut buf = b"stale".to_vec();
        renderer
            .render(OutputTarget::Buffer(&mut buf), &PayslipRecord::default())
            .unwrap();
        assert!(buf.starts_with(b"%PDF-"));
    }
}
