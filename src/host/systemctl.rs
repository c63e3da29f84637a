use crate::error::{Error, Result};
use crate::host::ServiceManager;
use std::collections::BTreeSet;
use std::process::Command;
use tracing::debug;

/// systemd via the `systemctl` CLI.
#[derive(Debug, Default)]
pub struct Systemctl;

impl ServiceManager for Systemctl {
    fn enable(&mut self, name: &str) -> Result<()> {
        // Unmask first in case something masked it
        let _ = Command::new("systemctl").args(["unmask", name]).status();

        let status = Command::new("systemctl")
            .args(["enable", name])
            .status()
            .map_err(|e| Error::collaborator(format!("systemctl enable {}", name), e))?;

        if !status.success() {
            return Err(Error::collaborator(
                format!("systemctl enable {}", name),
                format!("exited with {}", status),
            ));
        }

        Ok(())
    }

    fn is_enabled(&self, name: &str) -> bool {
        Command::new("systemctl")
            .args(["is-enabled", "--quiet", name])
            .status()
            .is_ok_and(|s| s.success())
    }

    fn list_unit_names(&self) -> Result<BTreeSet<String>> {
        let output = Command::new("systemctl")
            .args(["list-unit-files", "--no-legend", "--no-pager", "--plain"])
            .output()
            .map_err(|e| Error::collaborator("systemctl list-unit-files", e))?;

        if !output.status.success() {
            return Err(Error::collaborator(
                "systemctl list-unit-files",
                format!("exited with {}", output.status),
            ));
        }

        let units = parse_unit_files(&String::from_utf8_lossy(&output.stdout));
        debug!(count = units.len(), "listed unit files");
        Ok(units)
    }
}

/// First column of `systemctl list-unit-files --no-legend` output.
fn parse_unit_files(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(String::from)
        .collect()
}
