//! Shared source loading for the command handlers.

use std::path::Path;

use treadle_compiler::{SourceId, SourceMap};

/// Read the root file into a fresh source map, exiting on I/O failure.
pub fn load_root(path: &Path) -> (SourceMap, SourceId) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: cannot read {}: {}", path.display(), err);
            std::process::exit(1);
        }
    };

    let mut map = SourceMap::new();
    let root = map.insert(path.to_string_lossy().into_owned(), text);
    (map, root)
}
