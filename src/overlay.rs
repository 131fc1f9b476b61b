//! Frame annotation.
//!
//! The ROI is outlined blue while empty and red while a person is inside it;
//! qualifying detections are outlined green.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;

use crate::detect::Detection;
use crate::frame::Frame;
use crate::roi::Rect;

pub const ROI_EMPTY_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const ROI_OCCUPIED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const DETECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const LINE_THICKNESS: i32 = 2;

/// A frame with overlays drawn, ready for display.
pub struct AnnotatedFrame {
    pub image: RgbImage,
    pub sequence: u64,
    pub person_in_roi: bool,
}

/// Draw the ROI and `detections` onto the frame's pixels.
pub fn annotate<'a, I>(
    frame: Frame,
    roi: &Rect,
    detections: I,
    person_in_roi: bool,
) -> Result<AnnotatedFrame>
where
    I: IntoIterator<Item = &'a Detection>,
{
    let (width, height, sequence) = (frame.width, frame.height, frame.sequence);
    let mut image = RgbImage::from_raw(width, height, frame.into_pixels())
        .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", width, height))?;

    for detection in detections {
        draw_box(&mut image, &detection.bbox, DETECTION_COLOR);
    }
    let roi_color = if person_in_roi {
        ROI_OCCUPIED_COLOR
    } else {
        ROI_EMPTY_COLOR
    };
    draw_box(&mut image, roi, roi_color);

    Ok(AnnotatedFrame {
        image,
        sequence,
        person_in_roi,
    })
}

/// Outline `rect`; parts outside the image are clipped.
fn draw_box(image: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    // Edges beyond the image stay beyond it, just not by more than the line width.
    let clip_x = |x: i32| x.clamp(-LINE_THICKNESS, image.width() as i32 + LINE_THICKNESS);
    let clip_y = |y: i32| y.clamp(-LINE_THICKNESS, image.height() as i32 + LINE_THICKNESS);
    let rect = Rect::new(
        clip_x(rect.x1),
        clip_y(rect.y1),
        clip_x(rect.x2),
        clip_y(rect.y2),
    );
    for inset in 0..LINE_THICKNESS {
        let w = rect.width() - 2 * inset;
        let h = rect.height() - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let outline = imageproc::rect::Rect::at(rect.x1 + inset, rect.y1 + inset)
            .of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, outline, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> Frame {
        Frame::from_rgb(vec![0; (width * height * 3) as usize], width, height, 7).unwrap()
    }

    #[test]
    fn roi_color_follows_presence() -> Result<()> {
        let roi = Rect::new(2, 2, 10, 10);
        let empty = annotate(blank(16, 16), &roi, std::iter::empty(), false)?;
        assert_eq!(*empty.image.get_pixel(2, 5), ROI_EMPTY_COLOR);
        assert_eq!(*empty.image.get_pixel(3, 5), ROI_EMPTY_COLOR);
        assert_eq!(*empty.image.get_pixel(5, 5), Rgb([0, 0, 0]));
        assert_eq!(empty.sequence, 7);

        let occupied = annotate(blank(16, 16), &roi, std::iter::empty(), true)?;
        assert_eq!(*occupied.image.get_pixel(9, 5), ROI_OCCUPIED_COLOR);
        assert!(occupied.person_in_roi);
        Ok(())
    }

    #[test]
    fn detections_are_outlined_and_clipped() -> Result<()> {
        let roi = Rect::new(10, 10, 14, 14);
        let detections = [
            Detection::new("person", 0.9, Rect::new(-5, -5, 4, 4)),
            Detection::new("person", 0.9, Rect::new(3, 3, 3, 8)),
        ];
        let annotated = annotate(blank(16, 16), &roi, &detections, false)?;
        assert_eq!(*annotated.image.get_pixel(3, 0), DETECTION_COLOR);
        assert_eq!(*annotated.image.get_pixel(0, 3), DETECTION_COLOR);
        assert_eq!(*annotated.image.get_pixel(1, 1), Rgb([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn roi_wider_than_any_frame_is_clipped() -> Result<()> {
        let roi = Rect::new(i32::MIN, 0, i32::MAX, 10);
        let annotated = annotate(blank(16, 16), &roi, std::iter::empty(), false)?;
        assert_eq!(*annotated.image.get_pixel(5, 0), ROI_EMPTY_COLOR);
        assert_eq!(*annotated.image.get_pixel(5, 9), ROI_EMPTY_COLOR);
        assert_eq!(*annotated.image.get_pixel(0, 5), Rgb([0, 0, 0]));
        Ok(())
    }
}
