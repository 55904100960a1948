use std::path::PathBuf;

use treadle_compiler::{FsResolver, compile_with_options};
use treadle_core::Colors;

use super::load::load_root;

pub struct BuildArgs {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub raw: bool,
    pub color: bool,
}

pub fn run(args: BuildArgs) {
    let (mut map, root) = load_root(&args.file);
    let mut resolver = FsResolver;
    let out = compile_with_options(&mut map, root, &mut resolver, !args.raw);

    if !out.diagnostics.is_empty() {
        eprintln!(
            "{}",
            out.diagnostics
                .printer()
                .sources(&map)
                .colored(args.color)
                .render()
        );
    }

    let colors = Colors::new(args.color);
    if !out.is_success() {
        eprintln!(
            "{}error{}: compilation failed with {} error(s)",
            colors.red,
            colors.reset,
            out.error_count()
        );
        std::process::exit(1);
    }

    match &args.output {
        Some(path) => {
            if let Err(err) = std::fs::write(path, format!("{}\n", out.code)) {
                eprintln!("error: cannot write {}: {}", path.display(), err);
                std::process::exit(1);
            }
        }
        None => println!("{}", out.code),
    }
}
