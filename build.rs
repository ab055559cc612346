//! The building process.
//!
//! The only extra build step for `marrow` is compiling the shell completions
//! into `[output_dir]/completions/`.

#![allow(unused)]
#![allow(clippy::missing_docs_in_private_items)]

use std::env;
use std::fs;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate_to;
use clap_complete::shells::Bash;
use clap_complete::shells::Fish;
use clap_complete::shells::Zsh;

include!("src/marrow/cli/def.rs");

fn main() {
    println!("cargo:rerun-if-changed=src/marrow/cli/def.rs");

    let out_dir = match env::var_os("OUT_DIR") {
        Some(out) => out,
        None => return,
    };

    let completions = Path::new(&out_dir).join("completions");
    fs::create_dir_all(&completions).expect("could not create the completions directory");

    let mut command = Cli::command();

    generate_to(Bash, &mut command, "marrow", &completions).unwrap();
    generate_to(Zsh, &mut command, "marrow", &completions).unwrap();
    generate_to(Fish, &mut command, "marrow", &completions).unwrap();
}
