//! Certificate page composition: turns validated student details into PDF bytes.
//!
//! Drawing order: background (template image or fallback fill), four centred
//! body lines, the verification code, then the caption under the code. The
//! page is written with lopdf; fonts are referenced from the standard 14 and
//! never embedded, images are embedded as raw samples and flate-compressed,
//! with any alpha channel carried as a soft mask.
//!
//! Composition is CPU-bound (image decoding and compression). Async callers
//! run it inside `tokio::task::spawn_blocking`.

use std::sync::Arc;

use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};

use crate::certificate::errors::CertificateError;
use crate::layout::font_metrics::{StandardFont, TextMeasurer};
use crate::layout::page::{
    body_lines, caption_lines, caption_right_edge, qr_origin, BodyFields, CAPTION_FONT_SIZE,
    CAPTION_GRAY, FALLBACK_BORDER_GRAY, FALLBACK_BORDER_INSET, FALLBACK_BORDER_WIDTH,
    FALLBACK_FILL_GRAY, PAGE_HEIGHT, PAGE_WIDTH, QR_SIZE,
};
use crate::models::student::CertificateDetails;

const BACKGROUND_XOBJECT: &str = "Bg";
const QR_XOBJECT: &str = "Qr";

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Lays out the fixed certificate page.
#[derive(Clone)]
pub struct LayoutEngine {
    measurer: Arc<dyn TextMeasurer>,
}

impl LayoutEngine {
    pub fn new(measurer: Arc<dyn TextMeasurer>) -> Self {
        Self { measurer }
    }

    /// Composes the certificate and serializes it to a complete PDF.
    ///
    /// A background that cannot be decoded is replaced with the fallback
    /// drawing. A verification image that cannot be decoded is an error: the
    /// code is what makes the certificate checkable.
    pub fn compose(
        &self,
        details: &CertificateDetails,
        background: Option<&[u8]>,
        verification_png: &[u8],
        issued_on: NaiveDate,
    ) -> Result<Vec<u8>, CertificateError> {
        let qr_image = image_xobject(verification_png, ColorModel::Gray).map_err(|e| {
            CertificateError::Layout(format!("verification code could not be embedded: {e}"))
        })?;

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut xobjects = Dictionary::new();
        let mut ops = Vec::new();

        // 1. Background
        let background_image = match background {
            Some(bytes) => match image_xobject(bytes, ColorModel::Rgb) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Template image could not be embedded, using fallback background: {e}");
                    None
                }
            },
            None => {
                debug!("No template image supplied, using fallback background");
                None
            }
        };
        match background_image {
            Some(image) => {
                let id = image.add_to(&mut doc);
                xobjects.set(BACKGROUND_XOBJECT, id);
                ops.extend(place_image(BACKGROUND_XOBJECT, 0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
            }
            None => ops.extend(fallback_background()),
        }

        // 2–5. Body text
        let lines = body_lines(BodyFields {
            name: &details.name,
            course_name: details.course_name.as_deref(),
            company_name: details.company_name.as_deref(),
            start_date: details.start_date,
            end_date: details.end_date,
        });
        for line in &lines {
            let shown = displayable(&line.text);
            let width = self.measurer.measure(&shown, line.font, line.size);
            let x = PAGE_WIDTH / 2.0 - width / 2.0;
            ops.extend(show_text(&shown, line.font, line.size, x, line.baseline_y(), line.gray));
        }

        // 6. Verification code
        let qr_id = qr_image.add_to(&mut doc);
        xobjects.set(QR_XOBJECT, qr_id);
        let (qr_x, qr_y) = qr_origin();
        ops.extend(place_image(QR_XOBJECT, qr_x, qr_y, QR_SIZE, QR_SIZE));

        // 7. Caption, right-aligned to the code
        for (text, y) in caption_lines(&details.certificate_id, issued_on) {
            let shown = displayable(&text);
            let width = self
                .measurer
                .measure(&shown, StandardFont::Helvetica, CAPTION_FONT_SIZE);
            ops.extend(show_text(
                &shown,
                StandardFont::Helvetica,
                CAPTION_FONT_SIZE,
                caption_right_edge() - width,
                y,
                CAPTION_GRAY,
            ));
        }

        // 8. Serialize
        let content = Content { operations: ops }
            .encode()
            .map_err(|e| CertificateError::Layout(format!("content stream encoding failed: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let mut fonts = Dictionary::new();
        for font in StandardFont::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }
        let resources_id = doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
        });

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(format!("Certificate {}", details.certificate_id)),
            "Producer" => Object::string_literal(env!("CARGO_PKG_NAME")),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        doc.compress();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| CertificateError::Layout(format!("PDF serialization failed: {e}")))?;

        debug!(
            "Composed certificate {} ({} bytes)",
            details.certificate_id,
            bytes.len()
        );
        Ok(bytes)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Drawing helpers
// ────────────────────────────────────────────────────────────────────────────

enum ColorModel {
    Gray,
    Rgb,
}

/// A decoded raster ready to embed, with its alpha channel kept apart.
struct EmbeddedImage {
    image: Stream,
    alpha: Option<Stream>,
}

impl EmbeddedImage {
    /// Adds the image (and its soft mask, if any) and returns the image's id.
    fn add_to(self, doc: &mut Document) -> ObjectId {
        let mut image = self.image;
        if let Some(alpha) = self.alpha {
            let mask_id = doc.add_object(alpha);
            image.dict.set("SMask", mask_id);
        }
        doc.add_object(image)
    }
}

/// Decodes an encoded raster (PNG, JPEG) into an image XObject with 8-bit
/// samples. Transparency becomes a DeviceGray soft mask.
fn image_xobject(bytes: &[u8], model: ColorModel) -> Result<EmbeddedImage, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = (decoded.width(), decoded.height());
    let alpha = decoded.color().has_alpha().then(|| {
        let samples = decoded
            .to_luma_alpha8()
            .pixels()
            .map(|p| p.0[1])
            .collect::<Vec<u8>>();
        sample_stream(width, height, "DeviceGray", samples)
    });
    let image = match model {
        ColorModel::Gray => sample_stream(width, height, "DeviceGray", decoded.to_luma8().into_raw()),
        ColorModel::Rgb => sample_stream(width, height, "DeviceRGB", decoded.to_rgb8().into_raw()),
    };
    Ok(EmbeddedImage { image, alpha })
}

fn sample_stream(width: u32, height: u32, color_space: &str, samples: Vec<u8>) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        },
        samples,
    )
}

fn place_image(name: &str, x: f32, y: f32, width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

/// Flat light fill with an inset border. Uses no external input, so it cannot fail.
fn fallback_background() -> Vec<Operation> {
    let inset = FALLBACK_BORDER_INSET;
    vec![
        Operation::new("q", vec![]),
        Operation::new("g", vec![FALLBACK_FILL_GRAY.into()]),
        Operation::new(
            "re",
            vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        ),
        Operation::new("f", vec![]),
        Operation::new("G", vec![FALLBACK_BORDER_GRAY.into()]),
        Operation::new("w", vec![FALLBACK_BORDER_WIDTH.into()]),
        Operation::new(
            "re",
            vec![
                inset.into(),
                inset.into(),
                (PAGE_WIDTH - 2.0 * inset).into(),
                (PAGE_HEIGHT - 2.0 * inset).into(),
            ],
        ),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]
}

fn show_text(text: &str, font: StandardFont, size: f32, x: f32, y: f32, gray: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("g", vec![gray.into()]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(font.resource_name().as_bytes().to_vec()),
                size.into(),
            ],
        ),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(win_ansi_bytes(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// The text as it will actually be drawn: characters WinAnsiEncoding cannot
/// represent (outside printable Latin-1) become `?`.
fn displayable(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c,
            _ => '?',
        })
        .collect()
}

/// Encodes already-displayable text; Latin-1 code points map 1:1 onto WinAnsi here.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
