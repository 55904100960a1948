use std::path::PathBuf;

use treadle_compiler::{FsResolver, compile};
use treadle_core::Colors;

use super::load::load_root;

pub struct CheckArgs {
    pub file: PathBuf,
    pub strict: bool,
    pub json: bool,
    pub color: bool,
}

pub fn run(args: CheckArgs) {
    let (mut map, root) = load_root(&args.file);
    let mut resolver = FsResolver;
    let out = compile(&mut map, root, &mut resolver);

    if args.json {
        let rendered = serde_json::to_string_pretty(&out.diagnostics)
            .expect("diagnostics serialize cleanly");
        println!("{}", rendered);
    } else if !out.diagnostics.is_empty() {
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
    let errors = out.error_count();
    let warnings = out.diagnostics.warning_count();
    let failed = errors > 0 || (args.strict && warnings > 0);

    if !args.json {
        if failed {
            eprintln!(
                "{}error{}: {} error(s), {} warning(s)",
                colors.red, colors.reset, errors, warnings
            );
        } else if warnings > 0 {
            eprintln!(
                "{}ok{} with {} warning(s)",
                colors.yellow, colors.reset, warnings
            );
        } else {
            eprintln!("{}ok{}", colors.green, colors.reset);
        }
    }

    if failed {
        std::process::exit(1);
    }
}
