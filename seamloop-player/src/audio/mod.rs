//! Audio sources, decoding and device output

pub mod decoder;
pub mod loop_window;
pub mod looping;
pub mod memory_source;
pub mod output;
pub mod source;
pub mod types;

pub use decoder::{decode_file, DecodedAudio};
pub use loop_window::{BlockPlan, LoopState, LoopWindow};
pub use looping::{LoopHandle, LoopingSource};
pub use memory_source::MemorySource;
pub use output::{AudioOutput, FrameRenderer};
pub use source::{InputSource, PositionableSource};
pub use types::{AudioBlock, AudioBuffer, AudioFrame};
