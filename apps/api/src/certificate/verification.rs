//! QR verification code for a certificate identifier.
//!
//! Output is always a 120×120 PNG, black modules on white with a one-module
//! quiet margin. Every module is the same whole number of pixels; the code is
//! centred on the canvas and the leftover pixels are white.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::certificate::errors::CertificateError;

pub const QR_PIXELS: u32 = 120;
const QUIET_MODULES: usize = 1;
const DARK: u8 = 0;
const LIGHT: u8 = 255;

/// Stateless; share freely across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationEncoder;

impl VerificationEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encodes `certificate_id` byte-for-byte into a PNG QR code.
    pub fn encode(&self, certificate_id: &str) -> Result<Vec<u8>, CertificateError> {
        let raster = self.raster(certificate_id)?;
        let mut png = Cursor::new(Vec::new());
        raster
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| CertificateError::Encoding(format!("PNG encoding failed: {e}")))?;
        Ok(png.into_inner())
    }

    fn raster(&self, certificate_id: &str) -> Result<GrayImage, CertificateError> {
        let code = QrCode::with_error_correction_level(certificate_id.as_bytes(), EcLevel::M)
            .map_err(|e| CertificateError::Encoding(format!("{e}")))?;

        let modules = code.width();
        let span = modules + 2 * QUIET_MODULES;
        if span > QR_PIXELS as usize {
            return Err(CertificateError::Encoding(format!(
                "identifier needs {span} modules, more than {QR_PIXELS} pixels"
            )));
        }

        let colors = code.to_colors();
        let scale = QR_PIXELS as usize / span;
        let origin = (QR_PIXELS as usize - span * scale) / 2 + QUIET_MODULES * scale;
        let extent = modules * scale;
        let module_at = |px: u32| {
            (px as usize)
                .checked_sub(origin)
                .filter(|offset| *offset < extent)
                .map(|offset| offset / scale)
        };

        Ok(GrayImage::from_fn(QR_PIXELS, QR_PIXELS, |x, y| {
            match (module_at(x), module_at(y)) {
                (Some(mx), Some(my)) if colors[my * modules + mx] == Color::Dark => Luma([DARK]),
                _ => Luma([LIGHT]),
            }
        }))
    }
}
