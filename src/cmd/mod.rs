pub mod check;
pub mod shade;

use {
    anyhow::Result,
    argh::FromArgs,
    check::CheckSubCmd,
    shade::ShadeSubCmd,
};

pub trait SubCmd {
    fn run(&self) -> anyhow::Result<()>;
}

/// The shadepack CLI tool.
#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help", "help"))]
pub struct MainCmd {
    #[argh(subcommand)]
    nested: Cmd,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Cmd {
    Shade(ShadeSubCmd),
    Check(CheckSubCmd),
}

impl MainCmd {
    /// Run the nested command.
    pub fn run(&self) -> Result<()> {
        match &self.nested {
            Cmd::Shade(shade_cmd) => shade_cmd.run(),
            Cmd::Check(check_cmd) => check_cmd.run(),
        }
    }
}
