//! Build script rendering the harness man pages.
//!
//! `evstress.1` documents the load-run flags and `evstress-<subcommand>.1`
//! each subcommand, all taken from the `cli-defs` crate so the pages track
//! the flags the binary actually accepts.

use std::{
    env,
    fs,
    io,
    path::{Path, PathBuf},
};

use clap::{Command, CommandFactory};
use clap_mangen::Man;
use cli_defs::Cli;

fn render(cmd: Command, out_dir: &Path, page: &str) -> io::Result<()> {
    let mut file = fs::File::create(out_dir.join(format!("{page}.1")))?;
    Man::new(cmd).render(&mut file)
}

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=cli-defs");

    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        // Not set for IDE analysis runs.
        return Ok(());
    };

    let cmd = Cli::command().name(env!("CARGO_PKG_NAME"));
    let bin = cmd.get_name().to_owned();
    for sub in cmd.get_subcommands() {
        let page = format!("{bin}-{}", sub.get_name());
        render(sub.clone(), &out_dir, &page)?;
    }
    render(cmd, &out_dir, &bin)
}
