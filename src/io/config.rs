//! Import options loaded from JSON files

use crate::{ImportOptions, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read import options from a JSON file. Missing fields take their defaults.
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<ImportOptions> {
    let file = File::open(path.as_ref())?;
    let options: ImportOptions = serde_json::from_reader(BufReader::new(file))?;
    log::debug!("Loaded import options from {}", path.as_ref().display());
    Ok(options)
}

/// Write import options as pretty-printed JSON.
pub fn save_options<P: AsRef<Path>>(path: P, options: &ImportOptions) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(options)?;
    std::fs::write(path, json)?;
    Ok(())
}
