use crate::error::{Error, Result};
use crate::host::BootImageBuilder;
use std::process::Command;
use tracing::info;

/// Rebuilds the initramfs by running an external command (`dracut --force` by default).
#[derive(Debug, Clone)]
pub struct CommandBootImage {
    command: Vec<String>,
}

impl CommandBootImage {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl BootImageBuilder for CommandBootImage {
    fn regenerate(&mut self) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(Error::collaborator(
                "boot image regeneration",
                "no command configured",
            ));
        };

        info!(command = %self.command.join(" "), "regenerating boot image");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| Error::collaborator(program.clone(), e))?;

        if !status.success() {
            return Err(Error::collaborator(
                self.command.join(" "),
                format!("exited with {}", status),
            ));
        }
        Ok(())
    }
}
