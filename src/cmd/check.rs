use {
    crate::cmd::{
        SubCmd,
        shade::{
            Pipeline, config::ShadeConfig, context::ShadeContext, report::print_diagnostics,
        },
    },
    anyhow::{Context, Result},
    argh::FromArgs,
    std::{collections::HashSet, path::Path},
};

/// Load and analyze the module set without writing an artifact.
#[derive(FromArgs)]
#[argh(subcommand, name = "check")]
pub struct CheckSubCmd {
    #[argh(option, short = 'c', default = "String::from(\"shade.toml\")")]
    /// path to the build descriptor
    config: String,
}

impl SubCmd for CheckSubCmd {
    fn run(&self) -> Result<()> {
        let config = ShadeConfig::load(Path::new(&self.config)).context(format!(
            "failed to load build descriptor {}",
            self.config
        ))?;
        println!(
            "Checking {} v{}",
            config.project.name, config.project.version
        );

        let mut ctx = ShadeContext::new(config);
        Pipeline::new(&mut ctx).load_modules()?.analyze()?;

        // Retention summary per module; the first definition of a name
        // wins, matching what the relocator will keep.
        let mut seen = HashSet::new();
        for module in ctx.modules.modules() {
            let total = module.members.len();
            let kept = module
                .members
                .iter()
                .filter(|m| {
                    (module.root || ctx.retained.contains(&m.name))
                        && seen.insert(m.name.as_str())
                })
                .count();
            println!("{}: {kept} of {total} members retained", module.id);
        }
        print_diagnostics(&ctx.diagnostics);
        println!("Check complete; no artifact written.");

        Ok(())
    }
}
