//! Shared types for the collection pipeline

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Number of values in a feature vector. Consumed positionally by the trainer.
pub const FEATURE_COUNT: usize = 10;

/// Labeled facial-movement task. Catalog order is the recording order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exercise {
    #[serde(rename = "smile")]
    Smile,
    #[serde(rename = "blink_3_times")]
    Blink3Times,
    #[serde(rename = "head_rotation")]
    HeadRotation,
    #[serde(rename = "head_nod")]
    HeadNod,
    #[serde(rename = "show_tongue")]
    ShowTongue,
}

impl Exercise {
    pub const CATALOG: [Exercise; 5] = [
        Exercise::Smile,
        Exercise::Blink3Times,
        Exercise::HeadRotation,
        Exercise::HeadNod,
        Exercise::ShowTongue,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Exercise::Smile => "smile",
            Exercise::Blink3Times => "blink_3_times",
            Exercise::HeadRotation => "head_rotation",
            Exercise::HeadNod => "head_nod",
            Exercise::ShowTongue => "show_tongue",
        }
    }

    /// Human-readable title for prompts ("Blink 3 Times")
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Exercise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Exercise {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Exercise::CATALOG
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown exercise '{}'", s))
    }
}

/// A tracked facial point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Ordered landmark points of one detected face, in tracker index order
pub type FaceLandmarks = Vec<Landmark>;

/// Fixed-order 10-value summary of one frame's facial geometry.
///
/// Positions: mouth openness, smile width, left/right eye openness,
/// left/right lip-corner y, left/right eye-to-smile ratio, nose x, forehead y.
/// Serialized as a plain array; deserializing any other length fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn smile_width(&self) -> f64 {
        self.0[1]
    }
}

/// Participant metadata, captured once before recording starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub participant_id: String,
    pub age: String,
    pub gender: String,
    pub collection_date: DateTime<Local>,
}

impl ParticipantInfo {
    /// Build participant info, generating an id when none (or blank) is supplied
    pub fn new(participant_id: Option<&str>, age: &str, gender: &str) -> Self {
        let participant_id = match participant_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_participant_id(),
        };
        Self {
            participant_id,
            age: age.trim().to_string(),
            gender: gender.trim().to_string(),
            collection_date: Local::now(),
        }
    }
}

static GENERATED_IDS: AtomicU64 = AtomicU64::new(0);

/// Timestamp-based participant id: `participant_<YYYYmmdd_HHMMSS>_<seq><6 hex>`
pub fn generate_participant_id() -> String {
    let seq = GENERATED_IDS.fetch_add(1, Ordering::Relaxed);
    let uuid = Uuid::now_v7().simple().to_string();
    let tail = &uuid[uuid.len() - 6..];
    format!("participant_{}_{}{}", Local::now().format("%Y%m%d_%H%M%S"), seq, tail)
}

/// One successfully processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub exercise: Exercise,
    pub participant_id: String,
    pub features: FeatureVector,
    /// Sequence index within the exercise (0-based)
    pub frame_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exercise_catalog_order() {
        let labels: Vec<&str> = Exercise::CATALOG.iter().map(|e| e.as_str()).collect();
        assert_eq!(
            labels,
            vec!["smile", "blink_3_times", "head_rotation", "head_nod", "show_tongue"]
        );
    }

    #[test]
    fn test_exercise_serde_labels() {
        for exercise in Exercise::CATALOG {
            let json = serde_json::to_string(&exercise).unwrap();
            assert_eq!(json, format!("\"{}\"", exercise.as_str()));
            let back: Exercise = serde_json::from_str(&json).unwrap();
            assert_eq!(back, exercise);
        }
        assert!(serde_json::from_str::<Exercise>("\"frown\"").is_err());
    }

    #[test]
    fn test_exercise_from_str() {
        assert_eq!("head_nod".parse::<Exercise>().unwrap(), Exercise::HeadNod);
        assert!("HEAD_NOD".parse::<Exercise>().is_err());
    }

    #[test]
    fn test_exercise_title() {
        assert_eq!(Exercise::Blink3Times.title(), "Blink 3 Times");
        assert_eq!(Exercise::Smile.title(), "Smile");
    }

    #[test]
    fn test_feature_vector_rejects_wrong_length() {
        let nine = "[0,1,2,3,4,5,6,7,8]";
        assert!(serde_json::from_str::<FeatureVector>(nine).is_err());
        let ten = "[0,1,2,3,4,5,6,7,8,9]";
        let v: FeatureVector = serde_json::from_str(ten).unwrap();
        assert_eq!(v.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_generated_participant_ids_unique() {
        let ids: HashSet<String> = (0..100).map(|_| generate_participant_id()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| id.starts_with("participant_")));
    }

    #[test]
    fn test_participant_info_blank_id_is_generated() {
        let info = ParticipantInfo::new(Some("   "), "31", "F");
        assert!(info.participant_id.starts_with("participant_"));
        assert_eq!(info.age, "31");

        let info = ParticipantInfo::new(Some("p-007"), " 40 ", "O");
        assert_eq!(info.participant_id, "p-007");
        assert_eq!(info.age, "40");
    }
}
