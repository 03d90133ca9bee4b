use thiserror::Error;

/// Failure inside the math kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("cannot normalize or invert a zero-length quantity")]
    Degenerate,
}

/// Errors produced by the conversion, mapping and retargeting pipeline.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RetargetError {
    /// Malformed clip, NaN in transforms, broken hierarchy
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("degenerate bind pose at bone `{bone_name}`")]
    DegenerateBind { bone_name: String },

    #[error("unknown bone `{0}`")]
    UnknownBone(String),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error("malformed clip: track `{track}` keyframe {keyframe} has quaternion norm {norm}")]
    MalformedClip {
        track: String,
        keyframe: usize,
        norm: f32,
    },

    #[error("mapping is not injective: `{first}` and `{second}` both map to `{target}`")]
    NonInjectiveMapping {
        target: String,
        first: String,
        second: String,
    },

    #[error("cannot {operation} while the job is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("unsupported mapping document version {0}")]
    UnsupportedVersion(u32),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl RetargetError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
