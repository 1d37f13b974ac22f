//! Feature extraction: one frame's landmarks to a 10-value feature vector
//!
//! Single-subject policy: when the tracker reports several faces, only the
//! first is used and the rest are ignored without signaling. A vector is
//! either complete or not produced at all.

use crate::domain::landmarks::FaceLandmark;
use crate::domain::types::{FaceLandmarks, FeatureVector, Landmark, FEATURE_COUNT};
use thiserror::Error;

/// Why a frame produced no feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("no face in frame")]
    NoFace,
    #[error("landmark {index} missing (face has {available} points)")]
    MissingLandmark { index: usize, available: usize },
    #[error("landmark {index} has non-finite coordinates")]
    NonFinite { index: usize },
}

/// Extract the feature vector from the first detected face
pub fn extract_features(faces: &[FaceLandmarks]) -> Result<FeatureVector, ExtractError> {
    let face = faces.first().ok_or(ExtractError::NoFace)?;
    extract_face_features(face)
}

/// Extract the feature vector from a single face's landmark list
pub fn extract_face_features(face: &FaceLandmarks) -> Result<FeatureVector, ExtractError> {
    if face.is_empty() {
        return Err(ExtractError::NoFace);
    }

    let lip_top = point(face, FaceLandmark::UpperLipCenter)?;
    let lip_bottom = point(face, FaceLandmark::LowerLipCenter)?;
    let corner_left = point(face, FaceLandmark::LeftMouthCorner)?;
    let corner_right = point(face, FaceLandmark::RightMouthCorner)?;
    let left_eye_top = point(face, FaceLandmark::LeftEyeTop)?;
    let left_eye_bottom = point(face, FaceLandmark::LeftEyeBottom)?;
    let right_eye_top = point(face, FaceLandmark::RightEyeTop)?;
    let right_eye_bottom = point(face, FaceLandmark::RightEyeBottom)?;
    let nose = point(face, FaceLandmark::NoseTip)?;
    let forehead = point(face, FaceLandmark::Forehead)?;

    let mouth_open = (lip_top.y - lip_bottom.y).abs();
    let smile_width = (corner_left.x - corner_right.x).abs();
    let left_eye_open = (left_eye_top.y - left_eye_bottom.y).abs();
    let right_eye_open = (right_eye_top.y - right_eye_bottom.y).abs();

    let values: [f64; FEATURE_COUNT] = [
        mouth_open,
        smile_width,
        left_eye_open,
        right_eye_open,
        corner_left.y,
        corner_right.y,
        eye_to_smile_ratio(left_eye_open, smile_width),
        eye_to_smile_ratio(right_eye_open, smile_width),
        nose.x,
        forehead.y,
    ];

    Ok(FeatureVector(values))
}

/// Landmark at `mark`, rejecting missing or non-finite points
fn point(face: &FaceLandmarks, mark: FaceLandmark) -> Result<&Landmark, ExtractError> {
    let p = mark
        .lookup(face)
        .ok_or(ExtractError::MissingLandmark { index: mark.index(), available: face.len() })?;
    if !p.x.is_finite() || !p.y.is_finite() {
        return Err(ExtractError::NonFinite { index: mark.index() });
    }
    Ok(p)
}

/// Eye openness relative to smile width; zero-width smiles yield 0
#[inline]
fn eye_to_smile_ratio(eye_open: f64, smile_width: f64) -> f64 {
    if smile_width > 0.0 {
        eye_open / smile_width
    } else {
        0.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Neutral face with every point at the center, then specific points moved
    pub(crate) fn face_with(points: &[(FaceLandmark, f64, f64)]) -> FaceLandmarks {
        let mut face = vec![Landmark::new(0.5, 0.5); 468];
        for (mark, x, y) in points {
            face[mark.index()] = Landmark::new(*x, *y);
        }
        face
    }

    fn typical_face() -> FaceLandmarks {
        face_with(&[
            (FaceLandmark::UpperLipCenter, 0.50, 0.70),
            (FaceLandmark::LowerLipCenter, 0.50, 0.75),
            (FaceLandmark::LeftMouthCorner, 0.40, 0.72),
            (FaceLandmark::RightMouthCorner, 0.60, 0.73),
            (FaceLandmark::LeftEyeTop, 0.38, 0.40),
            (FaceLandmark::LeftEyeBottom, 0.38, 0.42),
            (FaceLandmark::RightEyeTop, 0.62, 0.40),
            (FaceLandmark::RightEyeBottom, 0.62, 0.43),
            (FaceLandmark::NoseTip, 0.51, 0.55),
            (FaceLandmark::Forehead, 0.50, 0.15),
        ])
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_feature_positions() {
        let v = extract_features(&[typical_face()]).unwrap();
        let f = v.as_slice();
        assert_eq!(f.len(), 10);
        assert!(approx(f[0], 0.05));
        assert!(approx(f[1], 0.20));
        assert!(approx(f[2], 0.02));
        assert!(approx(f[3], 0.03));
        assert!(approx(f[4], 0.72));
        assert!(approx(f[5], 0.73));
        assert!(approx(f[6], 0.02 / 0.20));
        assert!(approx(f[7], 0.03 / 0.20));
        assert!(approx(f[8], 0.51));
        assert!(approx(f[9], 0.15));
    }

    #[test]
    fn test_zero_smile_width_gives_zero_ratios() {
        let face = face_with(&[
            (FaceLandmark::LeftMouthCorner, 0.5, 0.7),
            (FaceLandmark::RightMouthCorner, 0.5, 0.7),
            (FaceLandmark::LeftEyeTop, 0.4, 0.40),
            (FaceLandmark::LeftEyeBottom, 0.4, 0.45),
            (FaceLandmark::RightEyeTop, 0.6, 0.40),
            (FaceLandmark::RightEyeBottom, 0.6, 0.46),
        ]);
        let v = extract_features(&[face]).unwrap();
        assert_eq!(v.smile_width(), 0.0);
        assert_eq!(v.0[6], 0.0);
        assert_eq!(v.0[7], 0.0);
        assert!(v.0[2] > 0.0 && v.0[3] > 0.0);
    }

    #[test]
    fn test_no_faces() {
        assert_eq!(extract_features(&[]), Err(ExtractError::NoFace));
        assert_eq!(extract_features(&[Vec::new()]), Err(ExtractError::NoFace));
    }

    #[test]
    fn test_short_landmark_set() {
        let face = vec![Landmark::new(0.5, 0.5); 100];
        assert_eq!(
            extract_features(&[face]),
            Err(ExtractError::MissingLandmark { index: 291, available: 100 })
        );
    }

    #[test]
    fn test_non_finite_coordinates() {
        let face = face_with(&[(FaceLandmark::NoseTip, f64::NAN, 0.5)]);
        assert_eq!(extract_features(&[face]), Err(ExtractError::NonFinite { index: 1 }));
    }

    #[test]
    fn test_uses_first_face_only() {
        let first = typical_face();
        let second = face_with(&[(FaceLandmark::NoseTip, 0.9, 0.9)]);
        let v = extract_features(&[first.clone(), second]).unwrap();
        assert_eq!(v, extract_features(&[first]).unwrap());

        // A malformed second face does not matter either
        let v = extract_features(&[typical_face(), vec![Landmark::new(0.0, 0.0); 3]]);
        assert!(v.is_ok());
    }

    proptest! {
        #[test]
        fn prop_output_is_ten_values_or_nothing(
            len in 0usize..500,
            x in 0.0f64..1.0,
            y in 0.0f64..1.0,
        ) {
            let face = vec![Landmark::new(x, y); len];
            match extract_features(&[face]) {
                Ok(v) => {
                    prop_assert!(len >= FaceLandmark::required_len());
                    prop_assert_eq!(v.as_slice().len(), 10);
                    prop_assert!(v.as_slice().iter().all(|f| f.is_finite()));
                }
                Err(_) => prop_assert!(len < FaceLandmark::required_len()),
            }
        }

        #[test]
        fn prop_ratio_zero_iff_no_smile_width(
            corner_x in 0.0f64..1.0,
            other_x in 0.0f64..1.0,
            eye_gap in 0.0f64..0.2,
        ) {
            let face = face_with(&[
                (FaceLandmark::LeftMouthCorner, corner_x, 0.7),
                (FaceLandmark::RightMouthCorner, other_x, 0.7),
                (FaceLandmark::LeftEyeTop, 0.4, 0.4),
                (FaceLandmark::LeftEyeBottom, 0.4, 0.4 + eye_gap),
                (FaceLandmark::RightEyeTop, 0.6, 0.4),
                (FaceLandmark::RightEyeBottom, 0.6, 0.4 + eye_gap),
            ]);
            let v = extract_features(&[face]).unwrap();
            if v.smile_width() == 0.0 {
                prop_assert_eq!(v.0[6], 0.0);
                prop_assert_eq!(v.0[7], 0.0);
            } else {
                prop_assert!(v.0[6].is_finite() && v.0[7].is_finite());
            }
        }
    }
}
