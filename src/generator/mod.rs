pub mod config;
pub mod yaml;

// Re-export common types
pub use config::{
    apply_overrides, emitter_for, AssembleOptions, Assembly, DialectEmitter, EmitOptions,
    GroupAssembler, MergeOutcome, Target,
};
