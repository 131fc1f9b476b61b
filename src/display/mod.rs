//! Where annotated frames go.
//!
//! A window is shown when built with `display-opencv`; otherwise frames are
//! dropped and the run is stopped with Ctrl-C.

#[cfg(feature = "display-opencv")]
mod window;

use anyhow::Result;

use crate::config::DisplaySettings;
use crate::overlay::AnnotatedFrame;

#[cfg(feature = "display-opencv")]
pub use window::OpenCvWindow;

/// Key that ends the run when pressed in the window.
pub const QUIT_KEY: char = 'q';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

impl KeyAction {
    /// Map a polled key code (low byte) to an action.
    pub fn from_key_code(code: i32) -> Self {
        if code >= 0 && (code & 0xFF) == QUIT_KEY as i32 {
            KeyAction::Quit
        } else {
            KeyAction::Continue
        }
    }
}

pub trait Display {
    /// False when frames would be discarded, so annotation can be skipped.
    fn wants_frames(&self) -> bool {
        true
    }

    /// Render one frame and poll the keyboard briefly.
    fn show(&mut self, frame: &AnnotatedFrame) -> Result<KeyAction>;

    fn close(&mut self) {}
}

/// Discards frames.
#[derive(Debug, Default)]
pub struct HeadlessDisplay;

impl Display for HeadlessDisplay {
    fn wants_frames(&self) -> bool {
        false
    }

    fn show(&mut self, _frame: &AnnotatedFrame) -> Result<KeyAction> {
        Ok(KeyAction::Continue)
    }
}

/// Open the configured display, falling back to headless when no window
/// support is compiled in.
pub fn open_display(settings: &DisplaySettings) -> Result<Box<dyn Display>> {
    if !settings.enabled {
        log::info!("display disabled; running headless");
        return Ok(Box::new(HeadlessDisplay));
    }
    #[cfg(feature = "display-opencv")]
    {
        Ok(Box::new(OpenCvWindow::open(&settings.window_title)?))
    }
    #[cfg(not(feature = "display-opencv"))]
    {
        log::warn!("built without display-opencv; running headless (Ctrl-C to stop)");
        Ok(Box::new(HeadlessDisplay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_q_quits() {
        assert_eq!(KeyAction::from_key_code('q' as i32), KeyAction::Quit);
        assert_eq!(KeyAction::from_key_code(0x100 | 'q' as i32), KeyAction::Quit);
        assert_eq!(KeyAction::from_key_code('Q' as i32), KeyAction::Continue);
        assert_eq!(KeyAction::from_key_code(27), KeyAction::Continue);
        assert_eq!(KeyAction::from_key_code(-1), KeyAction::Continue);
    }

    #[test]
    fn disabled_display_is_headless() -> Result<()> {
        let display = open_display(&DisplaySettings {
            enabled: false,
            window_title: "Camera Stream".to_string(),
        })?;
        assert!(!display.wants_frames());
        Ok(())
    }
}
