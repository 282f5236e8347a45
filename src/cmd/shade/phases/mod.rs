pub mod analyze;
pub mod load_modules;
pub mod merge;
pub mod relocate;
pub mod write_archive;

/// Represents a phase in the shading process.
pub trait ShadingPhase: Sized {}

pub use {
    analyze::Analyze,
    load_modules::LoadModules,
    merge::Merge,
    relocate::Relocate,
    write_archive::WriteArchive,
};
