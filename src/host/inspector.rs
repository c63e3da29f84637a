use crate::error::{Error, Result};
use crate::host::{HardwareInspector, RootFs};
use std::process::Command;

const DMI_DIR: &str = "sys/class/dmi/id";

/// PCI class names lspci prints for display devices.
const DISPLAY_CLASSES: &[&str] = &[
    "VGA compatible controller",
    "3D controller",
    "Display controller",
];

/// Reads DMI identification from sysfs and display devices from `lspci`.
#[derive(Debug, Clone, Default)]
pub struct SysfsInspector {
    root: RootFs,
}

impl SysfsInspector {
    pub fn new(root: RootFs) -> Self {
        Self { root }
    }
}

impl HardwareInspector for SysfsInspector {
    fn read_dmi_field(&self, name: &str) -> Option<String> {
        self.root
            .read_trimmed(format!("{}/{}", DMI_DIR, name))
            .filter(|v| !v.is_empty())
    }

    fn list_pci_devices(&self) -> Result<Vec<String>> {
        let output = Command::new("lspci")
            .output()
            .map_err(|e| Error::Detection(format!("failed to run lspci: {}", e)))?;
        if !output.status.success() {
            return Err(Error::Detection(format!(
                "lspci exited with {}",
                output.status
            )));
        }
        Ok(parse_display_devices(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

/// Extract device descriptors for display-class devices from `lspci` output.
///
/// `01:00.0 VGA compatible controller: NVIDIA Corporation TU116M [GeForce GTX 1660 Ti Mobile] (rev a1)`
/// yields `NVIDIA Corporation TU116M [GeForce GTX 1660 Ti Mobile] (rev a1)`.
fn parse_display_devices(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let (_address, rest) = line.split_once(' ')?;
            let (class, descriptor) = rest.split_once(": ")?;
            DISPLAY_CLASSES
                .contains(&class.trim())
                .then(|| descriptor.trim().to_string())
        })
        .collect()
}
