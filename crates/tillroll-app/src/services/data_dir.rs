// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::{Path, PathBuf};

use tracing::warn;

const APP_DIR: &str = "tillroll";

/// Return the application data directory, creating it if needed.
///
/// `TILLROLL_DATA_DIR` overrides the conventional location.
pub fn data_dir() -> PathBuf {
    let dir = match std::env::var_os("TILLROLL_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => resolve(
            std::env::var_os("XDG_DATA_HOME").map(PathBuf::from).as_deref(),
            std::env::var_os("HOME").map(PathBuf::from).as_deref(),
        ),
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!(path = %dir.display(), error = %e, "could not create data directory");
    }
    dir
}

/// XDG data dir, then `~/.local/share`, then the temp dir.
fn resolve(xdg_data_home: Option<&Path>, home: Option<&Path>) -> PathBuf {
    let base = match (xdg_data_home, home) {
        (Some(xdg), _) if !xdg.as_os_str().is_empty() => xdg.to_path_buf(),
        (_, Some(home)) if !home.as_os_str().is_empty() => home.join(".local").join("share"),
        _ => std::env::temp_dir(),
    };
    base.join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let dir = resolve(Some(Path::new("/xdg")), Some(Path::new("/home/ann")));
        assert_eq!(dir, PathBuf::from("/xdg/tillroll"));
    }

    #[test]
    fn home_falls_back_to_local_share() {
        let dir = resolve(None, Some(Path::new("/home/ann")));
        assert_eq!(dir, PathBuf::from("/home/ann/.local/share/tillroll"));
    }

    #[test]
    fn empty_xdg_is_ignored() {
        let dir = resolve(Some(Path::new("")), Some(Path::new("/home/ann")));
        assert_eq!(dir, PathBuf::from("/home/ann/.local/share/tillroll"));
    }

    #[test]
    fn nothing_set_uses_temp_dir() {
        assert_eq!(resolve(None, None), std::env::temp_dir().join("tillroll"));
    }
}
