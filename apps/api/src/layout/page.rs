//! Fixed certificate geometry and the text lines placed on it.
//!
//! Coordinates are PDF user units (1/72 in), origin at the bottom-left corner.
//! Nothing here depends on the student record except the text content itself.

use chrono::NaiveDate;

use crate::layout::font_metrics::StandardFont;

/// US letter, landscape (11 in × 8.5 in).
pub const PAGE_WIDTH: f32 = 792.0;
pub const PAGE_HEIGHT: f32 = 612.0;

pub const FALLBACK_FILL_GRAY: f32 = 0.98;
pub const FALLBACK_BORDER_GRAY: f32 = 0.2;
pub const FALLBACK_BORDER_WIDTH: f32 = 2.0;
pub const FALLBACK_BORDER_INSET: f32 = 20.0;

pub const QR_SIZE: f32 = 120.0;
/// Distance of the verification code from the right and top edges (1.2 in).
pub const QR_INSET: f32 = 86.0;

pub const CAPTION_FONT_SIZE: f32 = 10.0;
pub const CAPTION_GRAY: f32 = 0.4;
pub const CERTIFICATE_ID_OFFSET: f32 = 110.0;
pub const ISSUED_OFFSET: f32 = 125.0;

pub const DEFAULT_COURSE: &str = "FULL STACK DEVELOPMENT";
pub const DEFAULT_COMPANY: &str = "ADDWISE TECH INNOVATIONS";
pub const DEFAULT_START: &str = "MAY 20, 2025";
pub const DEFAULT_END: &str = "JULY 20, 2025";

/// One horizontally centred line of body text.
#[derive(Debug, Clone, PartialEq)]
pub struct CenteredLine {
    pub text: String,
    pub font: StandardFont,
    pub size: f32,
    /// Distance of the baseline below the top edge.
    pub from_top: f32,
    pub gray: f32,
}

impl CenteredLine {
    pub fn baseline_y(&self) -> f32 {
        PAGE_HEIGHT - self.from_top
    }
}

/// Fields the body text is built from, already validated.
#[derive(Debug, Clone, Copy)]
pub struct BodyFields<'a> {
    pub name: &'a str,
    pub course_name: Option<&'a str>,
    pub company_name: Option<&'a str>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// The four centred body lines, top to bottom.
pub fn body_lines(fields: BodyFields<'_>) -> [CenteredLine; 4] {
    let course = non_blank(fields.course_name).unwrap_or(DEFAULT_COURSE);
    let company = non_blank(fields.company_name).unwrap_or(DEFAULT_COMPANY);
    let start = fields
        .start_date
        .map(format_date)
        .unwrap_or_else(|| DEFAULT_START.to_string());
    let end = fields
        .end_date
        .map(format_date)
        .unwrap_or_else(|| DEFAULT_END.to_string());

    [
        CenteredLine {
            text: fields.name.to_string(),
            font: StandardFont::TimesBold,
            size: 48.0,
            from_top: 248.0,
            gray: 0.2,
        },
        CenteredLine {
            text: format!("has successfully completed a {course} program at"),
            font: StandardFont::TimesRoman,
            size: 20.0,
            from_top: 317.0,
            gray: 0.3,
        },
        CenteredLine {
            text: company.to_string(),
            font: StandardFont::TimesBold,
            size: 20.0,
            from_top: 345.0,
            gray: 0.0,
        },
        CenteredLine {
            text: format!("FROM {start} TO {end}"),
            font: StandardFont::TimesRoman,
            size: 20.0,
            from_top: 373.0,
            gray: 0.3,
        },
    ]
}

/// Lower-left corner of the verification code.
pub fn qr_origin() -> (f32, f32) {
    (
        PAGE_WIDTH - QR_SIZE - QR_INSET,
        PAGE_HEIGHT - QR_SIZE - QR_INSET,
    )
}

/// Right edge the caption lines are aligned to.
pub fn caption_right_edge() -> f32 {
    PAGE_WIDTH - QR_INSET
}

/// Caption lines under the code as `(text, baseline_y)`.
pub fn caption_lines(certificate_id: &str, issued_on: NaiveDate) -> [(String, f32); 2] {
    [
        (
            format!("Certificate ID: {certificate_id}"),
            PAGE_HEIGHT - QR_SIZE - CERTIFICATE_ID_OFFSET,
        ),
        (
            format!("Issued: {}", format_issued_date(issued_on)),
            PAGE_HEIGHT - QR_SIZE - ISSUED_OFFSET,
        ),
    ]
}

/// "20 May 2025": day without leading zero, full month name.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// "October 18, 2026".
pub fn format_issued_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
