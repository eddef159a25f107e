use std::fmt;

/// Failure reported by the batch buffer and its handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The backing store could not grow to hold another record.
    AllocationFailed { requested_bytes: usize },
    /// The identifier counter would pass `u32::MAX`.
    IdentifierExhausted,
    /// A vertex index outside `0..len` was passed to a triangle (len 3) or quad (len 4).
    VertexIndexOutOfRange { index: usize, len: usize },
    /// A quad was built from triangles carrying different material tags.
    MaterialMismatch { first: u8, second: u8 },
    /// A quad was built from the same triangle twice.
    SameTriangle,
    /// A quad was built from a triangle that has already been purged.
    PurgedTriangle,
    /// `BatchConfig` was rejected.
    InvalidConfig(&'static str),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { requested_bytes } => {
                write!(f, "batch buffer could not grow by {requested_bytes} bytes")
            }
            Self::IdentifierExhausted => write!(f, "primitive identifiers exhausted"),
            Self::VertexIndexOutOfRange { index, len } => {
                write!(f, "vertex index {index} out of range 0..{len}")
            }
            Self::MaterialMismatch { first, second } => {
                write!(f, "quad triangles use different materials ({first} vs {second})")
            }
            Self::SameTriangle => write!(f, "quad built from a single triangle twice"),
            Self::PurgedTriangle => write!(f, "quad built from a purged triangle"),
            Self::InvalidConfig(msg) => write!(f, "invalid batch config: {msg}"),
        }
    }
}

impl std::error::Error for BatchError {}
