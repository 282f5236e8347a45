use {
    crate::cmd::shade::{
        config::ShadeConfig,
        model::{Archive, ModuleSet, RelocationMap, ShadedMember},
        report::Diagnostic,
    },
    std::{collections::BTreeSet, path::PathBuf},
};

/// Build-scoped state threaded through the pipeline phases. Each phase
/// reads what its predecessors produced and fills in its own slice.
#[derive(Debug)]
pub struct ShadeContext {
    /// Parsed build descriptor.
    pub config: ShadeConfig,

    /// Modules in deterministic load order; filled by the loader.
    pub modules: ModuleSet,

    /// Names of members surviving minimization; filled by the analyzer.
    /// Root module members are always present.
    pub retained: BTreeSet<String>,

    /// Original to relocated names for surviving dependency members;
    /// filled by the relocator.
    pub relocations: RelocationMap,

    /// Surviving members with rewritten names and content; filled by the
    /// relocator, consumed by the merger.
    pub shaded: Vec<ShadedMember>,

    /// Final entry list; filled by the merger.
    pub archive: Archive,

    /// Non-fatal findings, reported once after a successful run.
    pub diagnostics: Vec<Diagnostic>,

    /// Destination path of the artifact.
    pub dst: PathBuf,
}

impl ShadeContext {
    pub fn new(config: ShadeConfig) -> Self {
        let dst = config.artifact_path();
        Self {
            config,
            modules: ModuleSet::default(),
            retained: BTreeSet::new(),
            relocations: RelocationMap::default(),
            shaded: Vec::new(),
            archive: Archive::default(),
            diagnostics: Vec::new(),
            dst,
        }
    }
}
