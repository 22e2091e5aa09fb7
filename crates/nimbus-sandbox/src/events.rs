//! Progress events the build driver emits as it runs (spec §4.1/§4.3
//! stage boundaries and interleaved `log` events). The job pipeline maps
//! these onto the SSE event taxonomy; this crate has no notion of SSE.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxEvent {
    Scaffolding,
    Writing,
    Installing,
    Building,
    Log { phase: String, message: String },
}
