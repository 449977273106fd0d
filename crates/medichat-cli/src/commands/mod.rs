pub mod ask;
pub mod doctors;

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io::Write;

use crate::cli::Cli;

pub fn completions(shell: Shell, out: &mut dyn Write) {
    let mut command = Cli::command();
    let bin = command.get_name().to_string();
    generate(shell, &mut command, bin, out);
}
