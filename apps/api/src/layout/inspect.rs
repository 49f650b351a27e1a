//! Reads generated certificates back for assertions in tests.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::content::Content;
use lopdf::{Document, Object, Stream};

/// One `Tj` run with the position set by the preceding `Td`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

fn load(pdf: &[u8]) -> Document {
    Document::load_mem(pdf).expect("generated PDF must parse")
}

fn page_operations(doc: &Document) -> Vec<lopdf::content::Operation> {
    let page_id = *doc.get_pages().values().next().expect("one page");
    let data = doc.get_page_content(page_id).expect("page content");
    Content::decode(&data).expect("content stream").operations
}

fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r as f32,
        other => panic!("expected number, got {other:?}"),
    }
}

pub fn text_runs(pdf: &[u8]) -> Vec<TextRun> {
    let doc = load(pdf);
    let mut runs = Vec::new();
    let (mut x, mut y) = (0.0, 0.0);
    for op in page_operations(&doc) {
        match op.operator.as_str() {
            "Td" => {
                x = number(&op.operands[0]);
                y = number(&op.operands[1]);
            }
            "Tj" => {
                if let Object::String(bytes, _) = &op.operands[0] {
                    let text = bytes.iter().map(|b| *b as char).collect();
                    runs.push(TextRun { text, x, y });
                }
            }
            _ => {}
        }
    }
    runs
}

/// True when the page strokes the inset fallback border.
pub fn has_fallback_border(pdf: &[u8]) -> bool {
    page_operations(&load(pdf))
        .iter()
        .any(|op| op.operator == "S")
}

pub fn xobject(pdf: &[u8], name: &str) -> Option<Stream> {
    let doc = load(pdf);
    let page_id = *doc.get_pages().values().next()?;
    let page = doc.get_dictionary(page_id).ok()?;
    let resources = match page.get(b"Resources").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let xobjects = resources.get(b"XObject").ok()?.as_dict().ok()?;
    let id = xobjects.get(name.as_bytes()).ok()?.as_reference().ok()?;
    doc.get_object(id).ok()?.as_stream().ok().cloned()
}

/// The soft mask attached to an image XObject, if any.
pub fn soft_mask(pdf: &[u8], name: &str) -> Option<Stream> {
    let doc = load(pdf);
    let image = xobject(pdf, name)?;
    let id = image.dict.get(b"SMask").ok()?.as_reference().ok()?;
    doc.get_object(id).ok()?.as_stream().ok().cloned()
}

/// Raw samples of an image stream. lopdf refuses to decompress image streams
/// itself, so FlateDecode content is inflated here.
pub fn image_samples(stream: &Stream) -> Vec<u8> {
    let flate = matches!(
        stream.dict.get(b"Filter"),
        Ok(Object::Name(name)) if name.as_slice() == b"FlateDecode"
    );
    if !flate {
        return stream.content.clone();
    }
    let mut samples = Vec::new();
    ZlibDecoder::new(stream.content.as_slice())
        .read_to_end(&mut samples)
        .expect("image stream must inflate");
    samples
}

/// Pixel width and height of an image stream.
pub fn image_size(stream: &Stream) -> (usize, usize) {
    let width = stream.dict.get(b"Width").map(number).expect("Width") as usize;
    let height = stream.dict.get(b"Height").map(number).expect("Height") as usize;
    (width, height)
}

/// Decodes a raw 8-bit grayscale QR raster. The raster is enlarged by a whole
/// factor (so one-pixel modules stay uniform) and padded with white space so
/// the detector has a generous quiet zone.
pub fn decode_qr_samples(width: usize, height: usize, samples: &[u8]) -> String {
    const SCALE: usize = 3;
    const PAD: usize = 40;
    let (scaled_w, scaled_h) = (width * SCALE, height * SCALE);
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        scaled_w + 2 * PAD,
        scaled_h + 2 * PAD,
        |x, y| {
            if x < PAD || y < PAD || x >= scaled_w + PAD || y >= scaled_h + PAD {
                255
            } else {
                samples[(y - PAD) / SCALE * width + (x - PAD) / SCALE]
            }
        },
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR code");
    let (_meta, content) = grids[0].decode().expect("QR code must decode");
    content
}

/// Decodes the verification code embedded in a generated certificate.
pub fn decode_embedded_qr(pdf: &[u8]) -> String {
    let stream = xobject(pdf, "Qr").expect("verification code XObject");
    let (width, height) = image_size(&stream);
    let samples = image_samples(&stream);
    assert_eq!(samples.len(), width * height, "8-bit grayscale samples");
    decode_qr_samples(width, height, &samples)
}
