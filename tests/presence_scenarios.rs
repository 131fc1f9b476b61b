use presence_monitor::presence::{evaluate, ClassFilter};
use presence_monitor::{Detection, Rect};

const ROI: Rect = Rect::new(118, 6, 218, 206);
const THRESHOLD: f32 = 0.5;

fn person_in_roi(detections: &[Detection]) -> bool {
    evaluate(detections, &ROI, &ClassFilter::default(), THRESHOLD)
}

#[test]
fn confident_person_inside_roi() {
    let detections = [Detection::new("person", 0.8, Rect::new(150, 50, 180, 90))];
    assert!(person_in_roi(&detections));
}

#[test]
fn confident_person_outside_roi() {
    let detections = [Detection::new("person", 0.9, Rect::new(0, 0, 50, 50))];
    assert!(!person_in_roi(&detections));
}

#[test]
fn other_class_inside_roi() {
    let detections = [Detection::new("car", 0.95, Rect::new(150, 50, 180, 90))];
    assert!(!person_in_roi(&detections));
}

#[test]
fn box_touching_roi_edge() {
    let right = [Detection::new("person", 0.9, Rect::new(218, 50, 260, 90))];
    assert!(!person_in_roi(&right));
    let left = [Detection::new("person", 0.9, Rect::new(80, 50, 118, 90))];
    assert!(!person_in_roi(&left));
    let above = [Detection::new("person", 0.9, Rect::new(150, 0, 180, 6))];
    assert!(!person_in_roi(&above));
    let below = [Detection::new("person", 0.9, Rect::new(150, 206, 180, 240))];
    assert!(!person_in_roi(&below));
}

#[test]
fn confidence_equal_to_threshold_is_excluded() {
    let detections = [Detection::new("person", 0.5, Rect::new(150, 50, 180, 90))];
    assert!(!person_in_roi(&detections));
    let detections = [Detection::new("person", 0.5001, Rect::new(150, 50, 180, 90))];
    assert!(person_in_roi(&detections));
}

#[test]
fn ignored_detections_never_change_the_answer() {
    let qualifying = Detection::new("person", 0.7, Rect::new(200, 100, 240, 150));
    let noise = [
        Detection::new("person", 0.3, Rect::new(150, 50, 180, 90)),
        Detection::new("dog", 0.99, Rect::new(150, 50, 180, 90)),
        Detection::new("person", 0.9, Rect::new(400, 300, 420, 330)),
    ];

    assert!(!person_in_roi(&noise));
    for position in 0..=noise.len() {
        let mut detections = noise.to_vec();
        detections.insert(position, qualifying.clone());
        assert!(person_in_roi(&detections), "qualifying box at {position}");
    }
}

#[test]
fn result_matches_strict_overlap_for_a_sweep() {
    // A 20x20 person box swept across the ROI's right edge.
    for x1 in 180..240 {
        let bbox = Rect::new(x1, 100, x1 + 20, 120);
        let expected = x1 < ROI.x2 && x1 + 20 > ROI.x1;
        let detections = [Detection::new("person", 0.9, bbox)];
        assert_eq!(person_in_roi(&detections), expected, "box {bbox}");
    }
}
