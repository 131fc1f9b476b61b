use anyhow::{Context, Result};
use opencv::highgui;

use super::{Display, KeyAction};
use crate::overlay::AnnotatedFrame;

/// Milliseconds to wait for a key after each frame.
const KEY_POLL_MS: i32 = 1;

/// A single titled `highgui` window. Closing the window does not end the run;
/// only the quit key does.
pub struct OpenCvWindow {
    title: String,
    open: bool,
}

impl OpenCvWindow {
    pub fn open(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("failed to open window '{}'", title))?;
        log::info!("display window '{}' opened (press 'q' to quit)", title);
        Ok(Self {
            title: title.to_string(),
            open: true,
        })
    }
}

impl Display for OpenCvWindow {
    fn show(&mut self, frame: &AnnotatedFrame) -> Result<KeyAction> {
        let mat = crate::cv::bgr_mat(frame.image.as_raw(), frame.image.height())?;
        highgui::imshow(&self.title, &mat).context("imshow failed")?;
        let key = highgui::wait_key(KEY_POLL_MS)?;
        Ok(KeyAction::from_key_code(key))
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(err) = highgui::destroy_all_windows() {
            log::warn!("failed to close display window: {}", err);
        }
    }
}

impl Drop for OpenCvWindow {
    fn drop(&mut self) {
        self.close();
    }
}
