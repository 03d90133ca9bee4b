use serde::{Deserialize, Serialize};

use super::track::Track;
use crate::error::RetargetError;
use crate::skeleton::{Pose, Skeleton};

/// A named, finite-duration collection of tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "AnimationClipJson", try_from = "AnimationClipJson")]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

/// JSON format for a track: `{ name: "<bone>.<property>", times, values }`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackJson {
    pub name: String,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

/// JSON format for animation clip
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimationClipJson {
    pub name: String,
    /// Negative means "derive from the tracks"
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default)]
    pub tracks: Vec<TrackJson>,
}

fn default_duration() -> f32 {
    -1.0
}

impl From<&Track> for TrackJson {
    fn from(track: &Track) -> Self {
        Self {
            name: track.property_path(),
            times: track.times().to_vec(),
            values: track.flat_values().to_vec(),
        }
    }
}

impl From<AnimationClip> for AnimationClipJson {
    fn from(clip: AnimationClip) -> Self {
        Self {
            name: clip.name,
            duration: clip.duration,
            tracks: clip.tracks.iter().map(TrackJson::from).collect(),
        }
    }
}

impl TryFrom<AnimationClipJson> for AnimationClip {
    type Error = RetargetError;

    fn try_from(json: AnimationClipJson) -> Result<Self, Self::Error> {
        let tracks = json
            .tracks
            .into_iter()
            .map(|t| Track::from_property_path(&t.name, t.times, &t.values))
            .collect::<Result<Vec<_>, _>>()?;

        let mut clip = AnimationClip {
            name: json.name,
            duration: json.duration,
            tracks,
        };
        if clip.duration < 0.0 {
            clip.reset_duration();
        }
        Ok(clip)
    }
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32, tracks: Vec<Track>) -> Self {
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, RetargetError> {
        let clip_json: AnimationClipJson = serde_json::from_str(json)?;
        Self::try_from(clip_json)
    }

    /// Convert to JSON string
    pub fn to_json_string(&self) -> Result<String, RetargetError> {
        Ok(serde_json::to_string(&AnimationClipJson::from(self.clone()))?)
    }

    /// Set the duration to the last keyframe time over all tracks.
    pub fn reset_duration(&mut self) {
        self.duration = self
            .tracks
            .iter()
            .map(Track::end_time)
            .fold(0.0, f32::max);
    }

    pub fn tracks_for<'a>(&'a self, bone_name: &'a str) -> impl Iterator<Item = &'a Track> + 'a {
        self.tracks.iter().filter(move |t| t.bone_name() == bone_name)
    }

    /// Check lengths, time ordering and finiteness of every track.
    pub fn validate(&self) -> Result<(), RetargetError> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(RetargetError::invalid(format!(
                "clip `{}` has invalid duration {}",
                self.name, self.duration
            )));
        }
        for track in &self.tracks {
            track.validate()?;
        }
        Ok(())
    }

    /// Sample every track at `time` onto the skeleton's bind pose.
    ///
    /// Tracks on bones the skeleton does not have are ignored.
    pub fn sample_pose<'a>(&self, skeleton: &'a Skeleton, time: f32) -> Pose<'a> {
        let mut pose = Pose::bind_pose(skeleton);

        for track in &self.tracks {
            let Some(bone) = skeleton.find_bone(track.bone_name()) else {
                continue;
            };
            match track {
                Track::Rotation(keys) => {
                    if let Some(q) = keys.sample(time) {
                        pose.set_rotation(bone, q);
                    }
                }
                Track::Position(keys) => {
                    if let Some(p) = keys.sample(time) {
                        pose.set_translation(bone, p);
                    }
                }
                Track::Scale(keys) => {
                    if let Some(s) = keys.sample(time) {
                        pose.set_scale(bone, s);
                    }
                }
            }
        }

        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{PositionTrack, RotationTrack};
    use crate::math::{Quat, Vec3};
    use crate::skeleton::tests::chain_specs;
    use crate::skeleton::BoneId;

    const THREE_JS_CLIP: &str = r#"{
        "name": "wave",
        "duration": -1,
        "tracks": [
            { "name": "Spine.quaternion", "times": [0, 1.5], "values": [0,0,0,1, 0,0.7071068,0,0.7071068] },
            { "name": ".bones[Root].position", "times": [0], "values": [1, 2, 3] }
        ]
    }"#;

    #[test]
    fn test_parse_three_js_clip() {
        let clip = AnimationClip::from_json(THREE_JS_CLIP).unwrap();
        assert_eq!(clip.name, "wave");
        assert_eq!(clip.duration, 1.5);
        assert_eq!(clip.tracks.len(), 2);

        match &clip.tracks[1] {
            Track::Position(t) => {
                assert_eq!(t.bone_name, "Root");
                assert_eq!(t.values, vec![Vec3::new(1.0, 2.0, 3.0)]);
            }
            other => panic!("expected position track, got {:?}", other),
        }
        assert!(clip.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let clip = AnimationClip::from_json(THREE_JS_CLIP).unwrap();
        let json = clip.to_json_string().unwrap();
        let back = AnimationClip::from_json(&json).unwrap();
        assert_eq!(clip, back);
        assert!(json.contains("\"Root.position\""));
    }

    #[test]
    fn test_unknown_property_fails() {
        let json = r#"{"name":"x","tracks":[{"name":"Head.morph","times":[0],"values":[1]}]}"#;
        assert!(matches!(
            AnimationClip::from_json(json),
            Err(RetargetError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_duration() {
        let clip = AnimationClip::new("bad", f32::NAN, Vec::new());
        assert!(clip.validate().is_err());
    }

    #[test]
    fn test_sample_pose_applies_tracks() {
        let skeleton = Skeleton::new(chain_specs(["Root", "Spine", "Head"], 1.0), None).unwrap();
        let clip = AnimationClip::new(
            "lean",
            1.0,
            vec![
                Track::Rotation(RotationTrack::new(
                    "Spine",
                    vec![0.0, 1.0],
                    vec![Quat::IDENTITY, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)],
                )),
                Track::Position(PositionTrack::new(
                    "Root",
                    vec![0.0],
                    vec![Vec3::new(0.0, 0.0, 2.0)],
                )),
                Track::Rotation(RotationTrack::new("Tail", vec![0.0], vec![Quat::IDENTITY])),
            ],
        );

        let pose = clip.sample_pose(&skeleton, 1.0);
        let head = pose.world_position(BoneId(2));
        assert!(
            head.abs_diff_eq(Vec3::new(-1.0, 1.0, 2.0), 1e-5),
            "head at {:?}",
            head
        );

        let start = clip.sample_pose(&skeleton, 0.0);
        assert!(start
            .world_position(BoneId(2))
            .abs_diff_eq(Vec3::new(0.0, 2.0, 2.0), 1e-5));
    }

    #[test]
    fn test_sample_pose_on_ragged_parsed_clip() {
        let json = r#"{
            "name": "ragged",
            "tracks": [
                { "name": "Spine.quaternion", "times": [0], "values": [0,0,0,1, 0,0.7071068,0,0.7071068] }
            ]
        }"#;
        let clip = AnimationClip::from_json(json).unwrap();
        assert!(clip.validate().is_err());

        let skeleton = Skeleton::new(chain_specs(["Root", "Spine", "Head"], 1.0), None).unwrap();
        let pose = clip.sample_pose(&skeleton, 5.0);
        assert!(pose
            .world_position(BoneId(2))
            .abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5));
    }
}
