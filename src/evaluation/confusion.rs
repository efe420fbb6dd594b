//! Confusion matrix and its heatmap rendering

use crate::dataset::LabelMap;
use crate::error::{KolosalError, Result};
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// C×C count matrix: rows are true labels, columns are predicted labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize], label_map: &LabelMap) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(KolosalError::shape(
                format!("{} predictions", y_true.len()),
                format!("{} predictions", y_pred.len()),
            ));
        }

        let n = label_map.len();
        let mut counts = vec![vec![0usize; n]; n];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t >= n || p >= n {
                return Err(KolosalError::shape(
                    format!("label index < {}", n),
                    format!("true {} / predicted {}", t, p),
                ));
            }
            counts[t][p] += 1;
        }

        Ok(Self {
            labels: label_map.names().to_vec(),
            counts,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Number of held-out rows per true class
    pub fn row_sums(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Number of predictions per class
    pub fn column_sums(&self) -> Vec<usize> {
        (0..self.n_classes())
            .map(|j| self.counts.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn diagonal(&self) -> Vec<usize> {
        (0..self.n_classes()).map(|i| self.counts[i][i]).collect()
    }

    /// Heatmap with cell counts, class names down the left and across the top
    pub fn to_image(&self) -> RgbImage {
        let n = self.n_classes() as u32;
        let longest = self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;

        let left = MARGIN + longest * GLYPH_ADVANCE;
        let top = MARGIN * 2 + GLYPH_HEIGHT;
        let width = left + n * CELL + MARGIN;
        let height = top + n * CELL + MARGIN;

        let mut img = RgbImage::from_pixel(width, height, WHITE);
        let max = self.counts.iter().flatten().copied().max().unwrap_or(0).max(1) as f64;

        for (i, row) in self.counts.iter().enumerate() {
            for (j, &count) in row.iter().enumerate() {
                let x0 = left + j as u32 * CELL;
                let y0 = top + i as u32 * CELL;
                let intensity = count as f64 / max;
                fill_rect(&mut img, x0, y0, CELL, CELL, heat(intensity));
                outline_rect(&mut img, x0, y0, CELL, CELL, GRID);

                let text = count.to_string();
                let ink = if intensity > 0.5 { WHITE } else { BLACK };
                let tx = x0 + CELL.saturating_sub(text_width(&text)) / 2;
                let ty = y0 + (CELL - GLYPH_HEIGHT) / 2;
                draw_text(&mut img, tx, ty, &text, ink);
            }
        }

        let max_chars = (CELL / GLYPH_ADVANCE) as usize;
        for (k, label) in self.labels.iter().enumerate() {
            let y = top + k as u32 * CELL + (CELL - GLYPH_HEIGHT) / 2;
            draw_text(&mut img, MARGIN / 2, y, label, BLACK);

            let short: String = label.chars().take(max_chars).collect();
            let x = left + k as u32 * CELL + CELL.saturating_sub(text_width(&short)) / 2;
            draw_text(&mut img, x, MARGIN, &short, BLACK);
        }

        img
    }

    /// PNG-encoded heatmap
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.to_image().write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

const CELL: u32 = 72;
const MARGIN: u32 = 12;
const SCALE: u32 = 2;
const GLYPH_HEIGHT: u32 = 5 * SCALE;
const GLYPH_ADVANCE: u32 = 4 * SCALE;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([200, 200, 200]);

/// White to dark blue
fn heat(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    Rgb([lerp(247.0, 8.0), lerp(251.0, 48.0), lerp(255.0, 107.0)])
}

fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

fn outline_rect(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    fill_rect(img, x0, y0, w, 1, color);
    fill_rect(img, x0, y0 + h - 1, w, 1, color);
    fill_rect(img, x0, y0, 1, h, color);
    fill_rect(img, x0 + w - 1, y0, 1, h, color);
}

fn text_width(text: &str) -> u32 {
    (text.chars().count() as u32 * GLYPH_ADVANCE).saturating_sub(SCALE)
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    for (k, c) in text.chars().enumerate() {
        let gx = x + k as u32 * GLYPH_ADVANCE;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..3u32 {
                if bits & (0b100 >> col) != 0 {
                    fill_rect(img, gx + col * SCALE, y + row as u32 * SCALE, SCALE, SCALE, color);
                }
            }
        }
    }
}

const PLACEHOLDER: [u8; 5] = [0b111, 0b001, 0b010, 0b000, 0b010];

/// 3×5 bitmap glyphs, one 3-bit row per entry. ASCII letters are drawn
/// lowercase; characters without a glyph (non-ASCII included) draw as `?`.
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_lowercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'b' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'd' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'f' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'g' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'h' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'k' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'n' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'o' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'p' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'r' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' => [0b011, 0b100, 0b010, 0b001, 0b110],
        't' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'w' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'x' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0; 5],
        _ => PLACEHOLDER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelMap {
        LabelMap::new(["setosa", "versicolor", "virginica"]).unwrap()
    }

    #[test]
    fn test_counts_and_sums() {
        let y_true = [0, 0, 1, 1, 2, 2];
        let y_pred = [0, 0, 1, 2, 2, 2];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred, &labels()).unwrap();

        assert_eq!(cm.counts[1][2], 1);
        assert_eq!(cm.row_sums(), vec![2, 2, 2]);
        assert_eq!(cm.column_sums(), vec![2, 1, 3]);
        assert_eq!(cm.diagonal(), vec![2, 1, 2]);
        assert_eq!(cm.total(), 6);
    }

    #[test]
    fn test_unknown_characters_stay_visible() {
        assert_eq!(glyph('é'), PLACEHOLDER);
        assert_eq!(glyph('#'), PLACEHOLDER);
        assert_ne!(glyph('('), [0; 5]);
        assert_eq!(glyph(' '), [0; 5]);
        assert_eq!(glyph('A'), glyph('a'));
    }

    #[test]
    fn test_out_of_range_label() {
        let err = ConfusionMatrix::from_predictions(&[0], &[3], &labels()).unwrap_err();
        assert!(matches!(err, KolosalError::DataShapeError { .. }));
    }

    #[test]
    fn test_image_dimensions() {
        let cm = ConfusionMatrix::from_predictions(&[0, 1, 2], &[0, 1, 2], &labels()).unwrap();
        let img = cm.to_image();
        assert!(img.width() > 3 * CELL);
        assert!(img.height() > 3 * CELL);
    }

    #[test]
    fn test_png_signature() {
        let cm = ConfusionMatrix::from_predictions(&[0, 1], &[0, 1], &labels()).unwrap();
        let png = cm.to_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
