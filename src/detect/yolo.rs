//! Decoding of raw YOLO output rows.
//!
//! Each row is `[cx, cy, w, h, objectness, score_0, score_1, ...]` with the box
//! normalized to the network input. Boxes are scaled to the frame size and are
//! not clamped. No non-max suppression is applied.

use anyhow::{anyhow, Result};

use crate::detect::classes::ClassVocabulary;
use crate::detect::result::Detection;
use crate::roi::Rect;

/// Box geometry plus objectness precede the class scores.
pub const ROW_HEADER_LEN: usize = 5;

/// Decode a flat buffer of `row_len`-wide rows into detections.
///
/// Rows whose best class score is not positive, or whose class id has no
/// entry in `vocabulary`, are dropped.
pub fn decode_rows(
    data: &[f32],
    row_len: usize,
    vocabulary: &ClassVocabulary,
    frame_width: u32,
    frame_height: u32,
) -> Result<Vec<Detection>> {
    if row_len <= ROW_HEADER_LEN {
        return Err(anyhow!(
            "YOLO rows must carry class scores (row length {})",
            row_len
        ));
    }
    if data.len() % row_len != 0 {
        return Err(anyhow!(
            "YOLO output length {} is not a multiple of row length {}",
            data.len(),
            row_len
        ));
    }

    let mut detections = Vec::new();
    for row in data.chunks_exact(row_len) {
        let Some((class_id, confidence)) = best_class(&row[ROW_HEADER_LEN..]) else {
            continue;
        };
        if confidence <= 0.0 {
            continue;
        }
        let Some(label) = vocabulary.get(class_id) else {
            continue;
        };
        detections.push(Detection::new(
            label,
            confidence,
            scale_box(&row[..4], frame_width, frame_height),
        ));
    }
    Ok(detections)
}

fn best_class(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Center-size box to corner box in frame pixels.
fn scale_box(geometry: &[f32], frame_width: u32, frame_height: u32) -> Rect {
    let (width, height) = (frame_width as f32, frame_height as f32);
    let center_x = (geometry[0] * width) as i32;
    let center_y = (geometry[1] * height) as i32;
    let box_w = (geometry[2] * width) as i32;
    let box_h = (geometry[3] * height) as i32;
    let x1 = (center_x as f32 - box_w as f32 / 2.0) as i32;
    let y1 = (center_y as f32 - box_h as f32 / 2.0) as i32;
    Rect::new(x1, y1, x1.saturating_add(box_w), y1.saturating_add(box_h))
}
