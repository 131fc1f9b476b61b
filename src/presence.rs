//! Per-frame person-in-ROI decision and throttled status reporting.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::detect::{ClassVocabulary, Detection};
use crate::roi::Rect;

pub const DEFAULT_STATUS_INTERVAL: u64 = 30;

/// Which class labels a detection may carry to be considered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassFilter {
    /// Every label matches.
    Any,
    Label(String),
}

impl ClassFilter {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            ClassFilter::Any => true,
            ClassFilter::Label(wanted) => wanted == label,
        }
    }
}

impl Default for ClassFilter {
    fn default() -> Self {
        ClassFilter::Label("person".to_string())
    }
}

impl From<&str> for ClassFilter {
    /// `*` or `any` select every label.
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == "*" || trimmed.eq_ignore_ascii_case("any") {
            ClassFilter::Any
        } else {
            ClassFilter::Label(trimmed.to_string())
        }
    }
}

/// False when `filter` names a label the model can never emit.
pub fn filter_is_reachable(filter: &ClassFilter, vocabulary: &ClassVocabulary) -> bool {
    match filter {
        ClassFilter::Any => true,
        ClassFilter::Label(label) => vocabulary.contains(label),
    }
}

impl fmt::Display for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassFilter::Any => f.write_str("*"),
            ClassFilter::Label(label) => f.write_str(label),
        }
    }
}

fn qualifies(detection: &Detection, class_filter: &ClassFilter, threshold: f32) -> bool {
    detection.confidence > threshold && class_filter.matches(&detection.class_label)
}

/// Decide whether any qualifying detection overlaps the ROI.
///
/// Detections at or below `confidence_threshold`, or whose label does not match
/// `class_filter`, are ignored. Returns on the first qualifying overlap without
/// pulling further items from `detections`.
pub fn evaluate<'a, I>(
    detections: I,
    roi: &Rect,
    class_filter: &ClassFilter,
    confidence_threshold: f32,
) -> bool
where
    I: IntoIterator<Item = &'a Detection>,
{
    for detection in detections {
        if !qualifies(detection, class_filter, confidence_threshold) {
            continue;
        }
        if detection.bbox.overlaps(roi) {
            return true;
        }
    }
    false
}

/// Detections that pass the class and confidence filters, for drawing.
pub fn evaluate_matches<'a>(
    detections: &'a [Detection],
    class_filter: &'a ClassFilter,
    confidence_threshold: f32,
) -> impl Iterator<Item = &'a Detection> + 'a {
    detections
        .iter()
        .filter(move |d| qualifies(d, class_filter, confidence_threshold))
}

/// Cross-frame state. Only the frame counter carries over; presence is
/// recomputed every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresenceState {
    pub frame_count: u64,
    pub person_in_roi: bool,
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the decision for the next processed frame.
    pub fn record(&mut self, person_in_roi: bool) {
        self.frame_count += 1;
        self.person_in_roi = person_in_roi;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusMode {
    /// Report the current state every `interval` frames, changed or not.
    #[default]
    Sampled,
    /// Report only when the state differs from the last report.
    Transitions,
}

impl FromStr for StatusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sampled" => Ok(StatusMode::Sampled),
            "transitions" => Ok(StatusMode::Transitions),
            other => Err(format!("unknown status mode '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceStatus {
    Present,
    Missing,
}

impl PresenceStatus {
    pub fn from_presence(person_in_roi: bool) -> Self {
        if person_in_roi {
            PresenceStatus::Present
        } else {
            PresenceStatus::Missing
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PresenceStatus::Present => "Person present in ROI",
            PresenceStatus::Missing => "Person missing in ROI",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Decides when a status line is due and writes it through `log`.
#[derive(Clone, Debug)]
pub struct StatusLogger {
    interval: u64,
    mode: StatusMode,
    last_reported: Option<bool>,
}

impl StatusLogger {
    /// `interval` must be non-zero; the config layer rejects zero.
    pub fn new(interval: u64, mode: StatusMode) -> Self {
        Self {
            interval: interval.max(1),
            mode,
            last_reported: None,
        }
    }

    /// Status due for `state`, if any, without logging it.
    pub fn status_for(&mut self, state: &PresenceState) -> Option<PresenceStatus> {
        let due = match self.mode {
            StatusMode::Sampled => state.frame_count % self.interval == 0,
            StatusMode::Transitions => self.last_reported != Some(state.person_in_roi),
        };
        if !due {
            return None;
        }
        self.last_reported = Some(state.person_in_roi);
        Some(PresenceStatus::from_presence(state.person_in_roi))
    }

    pub fn report(&mut self, state: &PresenceState) -> Option<PresenceStatus> {
        let status = self.status_for(state)?;
        log::info!("{}", status);
        Some(status)
    }
}

impl Default for StatusLogger {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_INTERVAL, StatusMode::Sampled)
    }
}
