//! OpenCV `Mat` conversions shared by the DNN backend and the window display.

use anyhow::Result;
use opencv::core::Mat;
use opencv::prelude::*;

/// Copy a packed RGB24 frame into a 3-channel `Mat` (still RGB ordered).
#[cfg(feature = "backend-opencv")]
pub(crate) fn rgb_mat(frame: &crate::frame::Frame) -> Result<Mat> {
    packed_mat(frame.pixels(), frame.height)
}

/// Copy a packed RGB24 buffer into a BGR `Mat` for `highgui`.
#[cfg(feature = "display-opencv")]
pub(crate) fn bgr_mat(pixels: &[u8], height: u32) -> Result<Mat> {
    use opencv::imgproc;

    let rgb = packed_mat(pixels, height)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

fn packed_mat(pixels: &[u8], height: u32) -> Result<Mat> {
    let flat = Mat::from_slice(pixels)?;
    let shaped = flat.reshape(3, height as i32)?;
    Ok(shaped.try_clone()?)
}
