pub mod boot;
pub mod dnf;
pub mod inspector;
pub mod rootfs;
pub mod systemctl;

use crate::error::Result;
use crate::resolve::Repository;
use std::collections::BTreeSet;
use std::path::Path;

pub use boot::CommandBootImage;
pub use dnf::Dnf;
pub use inspector::SysfsInspector;
pub use rootfs::RootFs;
pub use systemctl::Systemctl;

pub trait PackageManager {
    fn is_installed(&self, name: &str) -> bool;

    /// Install a batch of packages, reporting the outcome per name.
    fn install(&mut self, names: &[String]) -> Vec<(String, Result<()>)>;

    fn add_repository(&mut self, repo: &Repository) -> Result<()>;

    fn import_trust_key(&mut self, key: &str) -> Result<()>;
}

pub trait ServiceManager {
    fn enable(&mut self, name: &str) -> Result<()>;

    fn is_enabled(&self, name: &str) -> bool;

    /// Names of all unit files the service manager knows about.
    fn list_unit_names(&self) -> Result<BTreeSet<String>>;
}

pub trait FileSystem {
    /// Read a file, `None` if it does not exist.
    fn read_file(&self, path: &Path) -> Result<Option<String>>;

    fn write_file(&mut self, path: &Path, content: &str) -> Result<()>;

    fn remove(&mut self, path: &Path) -> Result<()>;
}

pub trait HardwareInspector {
    fn read_dmi_field(&self, name: &str) -> Option<String>;

    /// One free-text descriptor per display-class PCI device.
    fn list_pci_devices(&self) -> Result<Vec<String>>;
}

pub trait BootImageBuilder {
    fn regenerate(&mut self) -> Result<()>;
}

/// The mutable collaborators one reconcile run operates on.
pub struct Host<'a> {
    pub packages: &'a mut dyn PackageManager,
    pub services: &'a mut dyn ServiceManager,
    pub fs: &'a mut dyn FileSystem,
    pub boot: &'a mut dyn BootImageBuilder,
}
