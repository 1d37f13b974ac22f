//! Face-mesh landmark index contract
//!
//! The external tracker reports faces as ordered landmark lists (468 points,
//! 478 with iris refinement). Only the points below are consumed; if the
//! tracker's indexing changes, this is the only place to update.

use crate::domain::types::{FaceLandmarks, Landmark};

/// Anatomical points read by the feature extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FaceLandmark {
    NoseTip = 1,
    Forehead = 10,
    UpperLipCenter = 13,
    LowerLipCenter = 14,
    LeftMouthCorner = 61,
    LeftEyeBottom = 145,
    LeftEyeTop = 159,
    RightMouthCorner = 291,
    RightEyeBottom = 374,
    RightEyeTop = 386,
}

impl FaceLandmark {
    pub const ALL: [FaceLandmark; 10] = [
        FaceLandmark::NoseTip,
        FaceLandmark::Forehead,
        FaceLandmark::UpperLipCenter,
        FaceLandmark::LowerLipCenter,
        FaceLandmark::LeftMouthCorner,
        FaceLandmark::LeftEyeBottom,
        FaceLandmark::LeftEyeTop,
        FaceLandmark::RightMouthCorner,
        FaceLandmark::RightEyeBottom,
        FaceLandmark::RightEyeTop,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Smallest landmark list that contains every point we read
    pub fn required_len() -> usize {
        Self::ALL.iter().map(|l| l.index()).max().unwrap_or(0) + 1
    }

    #[inline]
    pub fn lookup(self, face: &FaceLandmarks) -> Option<&Landmark> {
        face.get(self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_face_mesh_contract() {
        assert_eq!(FaceLandmark::NoseTip.index(), 1);
        assert_eq!(FaceLandmark::Forehead.index(), 10);
        assert_eq!(FaceLandmark::LeftMouthCorner.index(), 61);
        assert_eq!(FaceLandmark::RightMouthCorner.index(), 291);
        assert_eq!(FaceLandmark::RightEyeTop.index(), 386);
    }

    #[test]
    fn test_required_len() {
        assert_eq!(FaceLandmark::required_len(), 387);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let face = vec![Landmark::new(0.5, 0.5); 20];
        assert!(FaceLandmark::Forehead.lookup(&face).is_some());
        assert!(FaceLandmark::LeftMouthCorner.lookup(&face).is_none());
    }
}
