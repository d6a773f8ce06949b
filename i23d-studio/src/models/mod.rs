//! Domain models for i23d-studio

mod session;

pub use session::{
    DisplayProgress, GenerationFlags, GenerationSession, GenerationState, ImageKind, SourceImage,
};
