use crate::roi::Rect;

/// One candidate object found in a single frame.
///
/// Detections are produced fresh for every frame and are not retained.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_label: String,
    /// Class score in `[0, 1]`.
    pub confidence: f32,
    /// Box in frame pixels, not clamped to the frame.
    pub bbox: Rect,
}

impl Detection {
    pub fn new(class_label: impl Into<String>, confidence: f32, bbox: Rect) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            bbox,
        }
    }
}
