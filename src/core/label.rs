//! Printable shipping label, rendered as a single A4 SVG page.
//!
//! Coordinates are millimetres in a `0 0 210 297` viewBox. The output only
//! depends on the shipment and the base URL, so rendering the same record
//! twice yields byte-identical documents.

use crate::domain::model::Shipment;
use crate::utils::error::{AppError, Result};
use qrcode::{Color, QrCode};
use std::fmt::Write as _;

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;

const PRIMARY: &str = "rgb(255,126,0)";
const DARK_GRAY: &str = "rgb(51,51,51)";
const LIGHT_GRAY: &str = "rgb(128,128,128)";
const PANEL_GRAY: &str = "rgb(245,245,245)";

const SANS: &str = "Helvetica, Arial, sans-serif";
const MONO: &str = "Courier, monospace";

const BARCODE_START_X: f64 = 30.0;
const BARCODE_WIDTH: f64 = PAGE_WIDTH - 60.0;
const BAR_HEIGHT: f64 = 18.0;

const QR_SIZE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f64,
    pub width: f64,
}

/// (bar width, advance) pairs.
const GUARD: [(f64, f64); 3] = [(1.0, 2.0), (2.0, 3.0), (1.0, 3.0)];
const NARROW: (f64, f64) = (1.0, 2.0);
const WIDE: (f64, f64) = (2.5, 3.5);

fn char_pattern(c: char) -> &'static [(f64, f64)] {
    match (c as u32) % 4 {
        0 => &[NARROW, WIDE],
        1 => &[WIDE, NARROW],
        2 => &[NARROW, NARROW, WIDE],
        _ => &[WIDE, NARROW, NARROW],
    }
}

/// Decorative barcode derived from the tracking number's characters.
///
/// Not a real symbology. Character bars stop once the cursor passes the
/// right margin so long numbers never run into the stop guard.
pub fn barcode_bars(tracking_number: &str) -> Vec<Bar> {
    let mut bars = Vec::new();
    let mut x = BARCODE_START_X;
    let push = |bars: &mut Vec<Bar>, x: &mut f64, (width, advance): (f64, f64)| {
        bars.push(Bar { x: *x, width });
        *x += advance;
    };

    for step in GUARD {
        push(&mut bars, &mut x, step);
    }

    let limit = BARCODE_START_X + BARCODE_WIDTH - 20.0;
    for c in tracking_number.chars() {
        if x > limit {
            break;
        }
        for &step in char_pattern(c) {
            push(&mut bars, &mut x, step);
        }
    }

    let mut x = BARCODE_START_X + BARCODE_WIDTH - 10.0;
    for step in GUARD {
        push(&mut bars, &mut x, step);
    }
    bars
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn tracking_url(public_base_url: &str, tracking_number: &str) -> String {
    format!(
        "{}/track?tn={}",
        public_base_url.trim_end_matches('/'),
        tracking_number
    )
}

#[derive(Clone, Copy)]
enum Anchor {
    Start,
    Middle,
}

struct Svg {
    body: String,
}

impl Svg {
    fn new() -> Self {
        Self {
            body: String::new(),
        }
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}"/>"#
        );
    }

    fn outline(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="black" stroke-width="0.5"/>"#
        );
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="black" stroke-width="0.5"/>"#
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn text(
        &mut self,
        x: f64,
        y: f64,
        size: f64,
        bold: bool,
        family: &str,
        fill: &str,
        anchor: Anchor,
        content: &str,
    ) {
        // sizes are given in points
        let size_mm = size * 0.3528;
        let weight = if bold { "bold" } else { "normal" };
        let anchor = match anchor {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
        };
        let _ = writeln!(
            self.body,
            r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{size_mm:.2}" font-weight="{weight}" fill="{fill}" text-anchor="{anchor}">{}</text>"#,
            escape_xml(content)
        );
    }

    fn finish(self) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                "\n",
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}mm" height="{h}mm" viewBox="0 0 {w} {h}">"#,
                "\n{body}</svg>\n"
            ),
            w = PAGE_WIDTH,
            h = PAGE_HEIGHT,
            body = self.body
        )
    }
}

fn draw_qr(svg: &mut Svg, data: &str, x: f64, y: f64, size: f64) -> Result<()> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| AppError::validation("trackingNumber", format!("Cannot encode QR code: {}", e)))?;
    let width = code.width();
    // one module of quiet zone on every side
    let module = size / (width + 2) as f64;

    svg.rect(x, y, size, size, "white");
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color == Color::Dark {
            let col = (i % width + 1) as f64;
            let row = (i / width + 1) as f64;
            svg.rect(x + col * module, y + row * module, module, module, "black");
        }
    }
    Ok(())
}

fn section_header(svg: &mut Svg, x: f64, y: f64, width: f64, title: &str) {
    svg.rect(x, y, width, 8.0, PRIMARY);
    svg.text(x + 5.0, y + 5.5, 11.0, true, SANS, "white", Anchor::Start, title);
}

fn party_block(svg: &mut Svg, x: f64, lines: [&str; 6]) {
    let mut y = 97.0;
    for (i, line) in lines.iter().enumerate() {
        let (size, bold) = if i == 0 { (10.0, true) } else { (9.0, false) };
        svg.text(x, y, size, bold, SANS, DARK_GRAY, Anchor::Start, line);
        y += 5.0;
    }
}

fn detail(svg: &mut Svg, x: f64, y: f64, label: &str, value: &str, highlight: bool) {
    svg.text(x, y, 9.0, true, SANS, DARK_GRAY, Anchor::Start, label);
    let (fill, bold) = if highlight {
        (PRIMARY, true)
    } else {
        (DARK_GRAY, false)
    };
    svg.text(x + 25.0, y, 9.0, bold, SANS, fill, Anchor::Start, value);
}

/// Wrap on whitespace to roughly `max_chars` per line.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn render_label(shipment: &Shipment, public_base_url: &str) -> Result<String> {
    let f = &shipment.fields;
    let tn = shipment.tracking_number.as_str();
    let center = PAGE_WIDTH / 2.0;
    let mut svg = Svg::new();

    svg.rect(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT, "white");

    // Header
    svg.outline(10.0, 10.0, PAGE_WIDTH - 20.0, 40.0);
    svg.text(center, 20.0, 24.0, true, SANS, PRIMARY, Anchor::Middle, "Reptile Global");
    svg.text(center, 27.0, 10.0, false, SANS, LIGHT_GRAY, Anchor::Middle, "Global Shipping Solutions");
    svg.text(
        center,
        35.0,
        16.0,
        true,
        SANS,
        DARK_GRAY,
        Anchor::Middle,
        &format!("TRACKING: {}", tn),
    );

    // Barcode panel
    let panel_y = 55.0;
    svg.rect(15.0, panel_y, PAGE_WIDTH - 30.0, 30.0, PANEL_GRAY);
    for bar in barcode_bars(tn) {
        svg.rect(bar.x, panel_y + 3.0, bar.width, BAR_HEIGHT, "black");
    }
    svg.text(center, panel_y + 26.0, 10.0, true, MONO, DARK_GRAY, Anchor::Middle, tn);

    // Parties
    let col_width = (PAGE_WIDTH - 25.0) / 2.0;
    let right_x = 10.0 + col_width + 5.0;
    section_header(&mut svg, 10.0, 85.0, col_width, "FROM");
    let sender_locality = format!("{}, {} {}", f.sender_city, f.sender_state, f.sender_zip);
    party_block(
        &mut svg,
        15.0,
        [
            &f.sender_name,
            &f.sender_email,
            &f.sender_phone,
            &f.sender_address,
            &sender_locality,
            &f.sender_country,
        ],
    );
    section_header(&mut svg, right_x, 85.0, col_width, "TO");
    let recipient_locality = format!(
        "{}, {} {}",
        f.recipient_city, f.recipient_state, f.recipient_zip
    );
    party_block(
        &mut svg,
        right_x + 5.0,
        [
            &f.recipient_name,
            &f.recipient_email,
            &f.recipient_phone,
            &f.recipient_address,
            &recipient_locality,
            &f.recipient_country,
        ],
    );

    // Package details
    let mut y = 140.0;
    section_header(&mut svg, 10.0, y, PAGE_WIDTH - 20.0, "PACKAGE DETAILS");
    let left = 15.0;
    let right = center + 5.0;
    y += 12.0;
    detail(&mut svg, left, y, "Type:", &f.package_type.to_uppercase(), false);
    detail(&mut svg, right, y, "Service:", &f.service_type.to_uppercase(), false);
    y += 6.0;
    detail(&mut svg, left, y, "Weight:", &f.weight, false);
    detail(&mut svg, right, y, "Priority:", &f.priority.to_uppercase(), true);
    y += 6.0;
    let dimensions = format!(
        "{} × {} × {}",
        f.dimensions.length, f.dimensions.width, f.dimensions.height
    );
    detail(&mut svg, left, y, "Dimensions:", &dimensions, false);
    detail(&mut svg, right, y, "Ship Date:", &f.shipping_date, false);
    y += 6.0;
    detail(&mut svg, left, y, "Value:", &format!("${}", f.value), false);
    detail(&mut svg, right, y, "Est. Delivery:", &f.estimated_delivery_date, false);

    for (label, text) in [
        ("Description:", &f.description),
        ("Special Instructions:", &f.special_instructions),
    ] {
        if text.trim().is_empty() {
            continue;
        }
        y += 8.0;
        svg.text(left, y, 9.0, true, SANS, DARK_GRAY, Anchor::Start, label);
        let lines = wrap(text, 70);
        for (i, line) in lines.iter().enumerate() {
            svg.text(
                left + 25.0,
                y + i as f64 * 5.0,
                9.0,
                false,
                SANS,
                DARK_GRAY,
                Anchor::Start,
                line,
            );
        }
        y += lines.len().saturating_sub(1) as f64 * 5.0;
    }

    // Additional services
    y += 8.0;
    section_header(&mut svg, 10.0, y, PAGE_WIDTH - 20.0, "ADDITIONAL SERVICES");
    y += 12.0;
    let mut services = Vec::new();
    if f.insurance {
        services.push("✓ Insurance Coverage");
    }
    if f.signature_required {
        services.push("✓ Signature Required");
    }
    let services = if services.is_empty() {
        "No additional services".to_string()
    } else {
        services.join("  |  ")
    };
    svg.text(left, y, 9.0, false, SANS, DARK_GRAY, Anchor::Start, &services);

    // QR code
    let qr_y = PAGE_HEIGHT - 45.0;
    draw_qr(&mut svg, &tracking_url(public_base_url, tn), 15.0, qr_y, QR_SIZE)?;
    svg.text(
        15.0 + QR_SIZE / 2.0,
        PAGE_HEIGHT - 12.0,
        8.0,
        false,
        SANS,
        LIGHT_GRAY,
        Anchor::Middle,
        "SCAN TO TRACK",
    );

    // Footer
    let footer_y = PAGE_HEIGHT - 25.0;
    svg.line(10.0, footer_y, PAGE_WIDTH - 10.0, footer_y);
    svg.text(center, footer_y + 5.0, 10.0, true, SANS, DARK_GRAY, Anchor::Middle, "Reptile Global");
    svg.text(
        center,
        footer_y + 10.0,
        8.0,
        false,
        SANS,
        LIGHT_GRAY,
        Anchor::Middle,
        "For support, contact us at support@reptileglobal.site",
    );
    svg.text(
        center,
        footer_y + 14.0,
        8.0,
        false,
        SANS,
        LIGHT_GRAY,
        Anchor::Middle,
        "This is an official shipping label. Please keep for your records.",
    );

    Ok(svg.finish())
}

/// Download name for a label. Anything that cannot sit inside a quoted
/// `Content-Disposition` filename becomes `_`.
pub fn label_file_name(tracking_number: &str) -> String {
    let safe: String = tracking_number
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("shipping-label-{}.svg", safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shipments::build_shipment;
    use crate::domain::model::ShipmentStatus;
    use crate::utils::validation::{tests::complete_fields, validate_shipment};
    use chrono::{TimeZone, Utc};

    fn shipment() -> Shipment {
        let now = Utc.timestamp_opt(1_760_000_000, 0).unwrap();
        build_shipment(
            "RW1TEST".into(),
            validate_shipment(&complete_fields()).unwrap(),
            ShipmentStatus::Pending,
            None,
            now,
        )
    }

    #[test]
    fn test_barcode_guards_and_patterns() {
        // 'A' = 65 -> pattern 1 (wide, narrow)
        let bars = barcode_bars("A");
        let widths: Vec<f64> = bars.iter().map(|b| b.width).collect();
        assert_eq!(widths, vec![1.0, 2.0, 1.0, 2.5, 1.0, 1.0, 2.0, 1.0]);
        assert_eq!(bars[0].x, 30.0);
        assert_eq!(bars[3].x, 38.0);
        assert_eq!(bars[4].x, 41.5);
        assert_eq!(bars[5].x, 170.0);
        assert_eq!(bars[7].x, 175.0);
    }

    #[test]
    fn test_barcode_stops_before_the_stop_guard() {
        let bars = barcode_bars(&"W".repeat(200));
        let body: Vec<&Bar> = bars[3..bars.len() - 3].iter().collect();
        assert!(body.iter().all(|b| b.x <= 160.0 + 3.5 * 3.0));
        assert!(body.iter().all(|b| b.x + b.width < 170.0));
    }

    #[test]
    fn test_barcode_is_deterministic() {
        assert_eq!(barcode_bars("RW1TEST"), barcode_bars("RW1TEST"));
        assert_ne!(barcode_bars("RW1TEST"), barcode_bars("RW2TEST"));
    }

    #[test]
    fn test_label_file_name() {
        assert_eq!(label_file_name("RW1TEST"), "shipping-label-RW1TEST.svg");
        assert_eq!(
            label_file_name("RW\"x\\y\r\nz\u{7f}é"),
            "shipping-label-RW_x_y__z__.svg"
        );
        let disposition = format!("inline; filename=\"{}\"", label_file_name("a\"b\n"));
        assert!(axum::http::HeaderValue::from_str(&disposition).is_ok());
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn test_label_contents() {
        let svg = render_label(&shipment(), "https://reptileglobal.site/").unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(r#"viewBox="0 0 210 297""#));
        assert!(svg.contains("TRACKING: RW1TEST"));
        assert!(svg.contains(">FROM<"));
        assert!(svg.contains("Marcus Reed"));
        assert!(svg.contains("Lena Vogel"));
        assert!(svg.contains("✓ Insurance Coverage  |  ✓ Signature Required"));
        assert!(svg.contains("SCAN TO TRACK"));
        assert!(svg.contains("$450"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_label_without_services_and_escaped_text() {
        let mut s = shipment();
        s.fields.insurance = false;
        s.fields.signature_required = false;
        s.fields.description = "Boa <juvenile> & eggs".into();
        let svg = render_label(&s, "http://localhost:5000").unwrap();
        assert!(svg.contains("No additional services"));
        assert!(svg.contains("Boa &lt;juvenile&gt; &amp; eggs"));
    }

    #[test]
    fn test_label_is_idempotent() {
        let s = shipment();
        assert_eq!(
            render_label(&s, "http://localhost:5000").unwrap(),
            render_label(&s, "http://localhost:5000").unwrap()
        );
    }

    #[test]
    fn test_tracking_url() {
        assert_eq!(
            tracking_url("http://localhost:5000/", "RW1"),
            "http://localhost:5000/track?tn=RW1"
        );
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("a bb ccc", 4), vec!["a bb", "ccc"]);
        assert!(wrap("   ", 10).is_empty());
    }
}
