// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Draws detection boxes and their labels onto a copy of the uploaded image

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, Rgb, RgbImage};

use super::classes::parse_hex_color;
use super::detector::BoundingBox;

/// Outline thickness in pixels
pub const BOX_THICKNESS: u32 = 2;

/// Height of the filled label tab drawn above each box
pub const LABEL_HEIGHT: u32 = 12;

/// Glyph cell of the bitmap font
const GLYPH_SIZE: u32 = 8;

/// Space between the tab edge and the text
const LABEL_PADDING: u32 = (LABEL_HEIGHT - GLYPH_SIZE) / 2;

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// What to draw for one detection
#[derive(Debug, Clone)]
pub struct BoxAnnotation {
    pub bbox: BoundingBox,
    /// `#RRGGBB`
    pub color: String,
    /// Text written in the tab, see [`label_text`]
    pub label: String,
}

/// `"<class>: <confidence>"` with two decimals
pub fn label_text(class_name: &str, confidence: f32) -> String {
    format!("{}: {:.2}", class_name, confidence)
}

/// Width of the tab needed for `label`
pub fn label_width(label: &str) -> u32 {
    label.chars().count() as u32 * GLYPH_SIZE + LABEL_PADDING * 2
}

/// Return an RGB copy of `image` with every annotation drawn on it
///
/// Each box gets an outline in its class colour and a filled tab holding
/// its label in white. The tab sits above the box, or just inside it when
/// the box touches the top edge. Anything past the image border is clipped.
pub fn draw_detections(image: &DynamicImage, annotations: &[BoxAnnotation]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return canvas;
    }

    for annotation in annotations {
        let color = Rgb(parse_hex_color(&annotation.color).unwrap_or([255, 255, 255]));

        let x1 = clamp_coord(annotation.bbox.x1, width);
        let y1 = clamp_coord(annotation.bbox.y1, height);
        let x2 = clamp_coord(annotation.bbox.x2, width);
        let y2 = clamp_coord(annotation.bbox.y2, height);
        if x2 < x1 || y2 < y1 {
            continue;
        }

        draw_outline(&mut canvas, (x1, y1, x2, y2), color);

        let tab_right = (x1 + label_width(&annotation.label)).min(width) - 1;
        let tab_top = if y1 >= LABEL_HEIGHT {
            y1 - LABEL_HEIGHT
        } else {
            y1
        };
        let tab_bottom = (tab_top + LABEL_HEIGHT).min(height - 1);
        fill_rect(&mut canvas, (x1, tab_top, tab_right, tab_bottom), color);
        draw_text(
            &mut canvas,
            x1 + LABEL_PADDING,
            tab_top + LABEL_PADDING,
            &annotation.label,
        );
    }

    canvas
}

fn clamp_coord(value: f32, limit: u32) -> u32 {
    if value.is_nan() {
        return 0;
    }
    (value.round().max(0.0) as u32).min(limit - 1)
}

fn draw_outline(canvas: &mut RgbImage, (x1, y1, x2, y2): (u32, u32, u32, u32), color: Rgb<u8>) {
    for t in 0..BOX_THICKNESS {
        let top = (y1 + t).min(y2);
        let bottom = y2.saturating_sub(t).max(y1);
        let left = (x1 + t).min(x2);
        let right = x2.saturating_sub(t).max(x1);

        for x in x1..=x2 {
            canvas.put_pixel(x, top, color);
            canvas.put_pixel(x, bottom, color);
        }
        for y in y1..=y2 {
            canvas.put_pixel(left, y, color);
            canvas.put_pixel(right, y, color);
        }
    }
}

fn fill_rect(canvas: &mut RgbImage, (x1, y1, x2, y2): (u32, u32, u32, u32), color: Rgb<u8>) {
    for y in y1..=y2 {
        for x in x1..=x2 {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Render `text` with the 8x8 bitmap font, top-left at (`x`, `y`)
fn draw_text(canvas: &mut RgbImage, x: u32, y: u32, text: &str) {
    let (width, height) = canvas.dimensions();

    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = x + i as u32 * GLYPH_SIZE;
        if origin_x >= width {
            break;
        }

        for (row, bits) in glyph.iter().enumerate() {
            let py = y + row as u32;
            if py >= height {
                break;
            }
            for col in 0..GLYPH_SIZE {
                let px = origin_x + col;
                if px < width && bits & (1 << col) != 0 {
                    canvas.put_pixel(px, py, TEXT_COLOR);
                }
            }
        }
    }
}
