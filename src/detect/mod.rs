pub mod gpu;

use crate::error::Result;
use crate::host::{HardwareInspector, PackageManager};
use crate::resolve::DRIVER_PACKAGES;
use serde::Serialize;
use std::collections::BTreeSet;

/// Everything the classifier needs to know about the machine.
/// Captured once per run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HardwareFacts {
    pub vendor_string: String,
    pub product_name: String,
    /// NVIDIA display devices, one free-text descriptor each
    pub gpu_descriptors: Vec<String>,
    /// Which of the known driver packages are already installed
    pub installed_driver_packages: BTreeSet<String>,
}

impl HardwareFacts {
    /// Read the facts from the live machine. Pure read, no mutation.
    pub fn probe(
        inspector: &dyn HardwareInspector,
        packages: &dyn PackageManager,
    ) -> Result<Self> {
        let vendor_string = inspector
            .read_dmi_field("sys_vendor")
            .or_else(|| inspector.read_dmi_field("board_vendor"))
            .unwrap_or_default();
        let product_name = inspector.read_dmi_field("product_name").unwrap_or_default();

        let gpu_descriptors = gpu::nvidia_descriptors(inspector.list_pci_devices()?);

        let installed_driver_packages = DRIVER_PACKAGES
            .iter()
            .filter(|p| packages.is_installed(p))
            .map(|p| p.to_string())
            .collect();

        Ok(Self {
            vendor_string,
            product_name,
            gpu_descriptors,
            installed_driver_packages,
        })
    }
}
