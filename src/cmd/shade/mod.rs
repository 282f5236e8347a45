pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod phases;
pub mod report;

use {
    crate::cmd::SubCmd,
    anyhow::{Context, Result},
    argh::FromArgs,
    config::ShadeConfig,
    context::ShadeContext,
    phases::ShadingPhase,
    std::path::Path,
};

/// Shade, minimize and package the configured module set into a single
/// artifact.
#[derive(FromArgs)]
#[argh(subcommand, name = "shade")]
pub struct ShadeSubCmd {
    #[argh(option, short = 'c', default = "String::from(\"shade.toml\")")]
    /// path to the build descriptor
    config: String,
}

impl SubCmd for ShadeSubCmd {
    fn run(&self) -> Result<()> {
        let config = ShadeConfig::load(Path::new(&self.config)).context(format!(
            "failed to load build descriptor {}",
            self.config
        ))?;
        let project = config.project.name.clone();
        println!("Shading {} v{}", project, config.project.version);

        let mut ctx = ShadeContext::new(config);
        Pipeline::new(&mut ctx)
            .load_modules()?
            .analyze()?
            .relocate()?
            .merge()?
            .write_archive()
            .context(format!("failed to shade project {project}"))?;

        Ok(())
    }
}

/// The pipeline advances through its phases by consuming itself, so a
/// later stage can never run before an earlier one has completed.
#[derive(Debug)]
pub struct Pipeline<'a, P: ShadingPhase = phases::LoadModules> {
    ctx: &'a mut ShadeContext,
    state: P,
}

impl<'a> Pipeline<'a> {
    pub fn new(ctx: &'a mut ShadeContext) -> Self {
        Self {
            ctx,
            state: phases::LoadModules,
        }
    }
}
