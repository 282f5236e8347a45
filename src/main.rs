#![doc = include_str!("../README.md")]

mod cmd;

use {
    crate::cmd::MainCmd,
    anyhow::{Context, Result},
};

fn main() -> Result<()> {
    let cmd: MainCmd = argh::from_env();
    cmd.run().context("failed to run subcommand")
}
