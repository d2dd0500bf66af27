use std::path::Path;

use log::{error, info};

use crate::commands::Context;

/// Opens (or creates) the image named on the command line and mounts it when
/// it is formatted.
pub fn handle_fs(fs_path: &Path, context: &mut Context) {
    if fs_path.is_dir() {
        error!("{} is a directory, cannot use it as an image", fs_path.display());
        return;
    }

    if let Some(parent) = fs_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!("cannot create directory '{}': {e}", parent.display());
                return;
            }
        }
    }

    let existed = fs_path.exists();
    match context.open_fs(fs_path) {
        Ok(true) => info!("mounted {}", fs_path.display()),
        Ok(false) if existed => info!("opened unformatted image {}", fs_path.display()),
        Ok(false) => info!("created new image {}, run `format`", fs_path.display()),
        Err(e) => error!("failed to open '{}': {e:#}", fs_path.display()),
    }
}
