pub mod sampler;
pub mod source;

pub use sampler::{IntervalSampler, SampleReading, SampleSink, SignalSampler};
pub use source::{AccelSource, ScriptedSource};
