pub mod emitter;
pub mod formats;
pub mod group;
pub mod overrides;
pub mod ruleconvert;

pub use emitter::DialectEmitter;
pub use formats::{emitter_for, EmitOptions, Target};
pub use group::{reserved_group_names, AssembleOptions, Assembly, GroupAssembler};
pub use overrides::{apply_overrides, MergeOutcome};
