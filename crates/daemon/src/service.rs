// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Generic "install/uninstall a persistent service" interface (spec §1, §3).
//! Platform service supervision (`launchd`, `systemd`) is explicitly out of
//! scope; this just logs what a real installer would have done, so the CLI
//! surface exists without committing to a platform.

use std::path::PathBuf;

use tracing::info;

#[derive(Debug, Clone)]
pub struct ServiceInstaller {
    pub label: String,
    pub exec_path: PathBuf,
    pub args: Vec<String>,
    pub state_dir: PathBuf,
}

impl ServiceInstaller {
    pub fn install(&self) {
        info!(
            label = %self.label,
            exec_path = %self.exec_path.display(),
            args = ?self.args,
            state_dir = %self.state_dir.display(),
            "service install requested (no platform supervisor wired up)"
        );
    }

    pub fn uninstall(&self) {
        info!(label = %self.label, "service uninstall requested (no platform supervisor wired up)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_and_uninstall_do_not_panic_without_a_platform_backend() {
        let installer = ServiceInstaller {
            label: "dev.hack.hackd".to_string(),
            exec_path: PathBuf::from("/usr/local/bin/hackd"),
            args: vec!["start".to_string(), "--foreground".to_string()],
            state_dir: PathBuf::from("/tmp/hack-test"),
        };
        installer.install();
        installer.uninstall();
    }
}
