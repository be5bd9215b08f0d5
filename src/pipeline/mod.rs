//! Rolling-window transcript analysis pipeline

mod processor;

pub use processor::TranscriptProcessor;
