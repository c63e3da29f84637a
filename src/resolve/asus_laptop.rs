use crate::classify::{GpuGeneration, HardwareClass};
use crate::resolve::generic_driver::{DRIVER_PACKAGES, MODPROBE_NVIDIA};
use crate::resolve::{
    ArtifactKind, ConfigDomain, DesiredState, FileContent, ModuleOptions, RepoSource,
    Repository, Resolution, Resolver, SkipReason,
};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const UDEV_NVIDIA_PM: &str = "/etc/udev/rules.d/80-nvidia-pm.rules";

const BASE_PACKAGES: &[&str] = &["asusctl", "supergfxctl", "asusctl-rog-gui"];
const BASE_SERVICES: &[&str] = &["supergfxd.service"];

/// Suspend/resume hooks shipped with the driver.
const SUSPEND_SERVICES: &[&str] = &[
    "nvidia-suspend.service",
    "nvidia-resume.service",
    "nvidia-hibernate.service",
];

/// Dynamic Boost is only supported from Ampere onward.
const MODERN_SERVICES: &[&str] = &["nvidia-powerd.service"];

/// Runtime D3 power management for Turing, which does not enable it on its own.
const UDEV_NVIDIA_PM_RULES: &str = r#"# Enable runtime PM for NVIDIA VGA/3D controller devices on driver bind
ACTION=="bind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x030000", TEST=="power/control", ATTR{power/control}="auto"
ACTION=="bind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x030200", TEST=="power/control", ATTR{power/control}="auto"

# Disable runtime PM for NVIDIA VGA/3D controller devices on driver unbind
ACTION=="unbind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x030000", TEST=="power/control", ATTR{power/control}="on"
ACTION=="unbind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x030200", TEST=="power/control", ATTR{power/control}="on"
"#;

fn asus_linux_copr() -> Repository {
    Repository {
        id: "copr:lukenukem/asus-linux".to_string(),
        repo_file: PathBuf::from(
            "/etc/yum.repos.d/_copr:copr.fedorainfracloud.org:lukenukem:asus-linux.repo",
        ),
        source: RepoSource::Copr("lukenukem/asus-linux".to_string()),
        trust_key: None,
    }
}

/// asus-linux tooling (asusctl, supergfxctl) and NVIDIA power management for
/// ASUS laptops.
#[derive(Debug, Clone, Default)]
pub struct AsusLaptop;

impl AsusLaptop {
    fn power_management(state: &mut DesiredState, gpu: GpuGeneration) {
        state.add_services(SUSPEND_SERVICES);

        match gpu {
            GpuGeneration::ModernGen => state.add_services(MODERN_SERVICES),
            GpuGeneration::LegacyGen => {
                // Overrides the generic nvidia.conf block rather than adding to it
                state.module_options.push(ModuleOptions::new(
                    MODPROBE_NVIDIA,
                    "nvidia",
                    &[("NVreg_DynamicPowerManagement", "0x02")],
                ));
                state.add_file(
                    UDEV_NVIDIA_PM,
                    ArtifactKind::UdevRule,
                    FileContent::Replace(UDEV_NVIDIA_PM_RULES.to_string()),
                );
            }
            GpuGeneration::None | GpuGeneration::UnknownGen => {}
        }
    }
}

impl Resolver for AsusLaptop {
    fn domain(&self) -> ConfigDomain {
        ConfigDomain::VendorSpecific
    }

    fn resolve(&self, class: &HardwareClass, installed: &BTreeSet<String>) -> Resolution {
        if !class.vendor_matched() {
            return Resolution::Skip(SkipReason::DetectionAbsent("ASUS laptop".to_string()));
        }

        let mut state = DesiredState::default();
        state.repositories.insert(asus_linux_copr());
        state.add_packages(BASE_PACKAGES);
        state.add_services(BASE_SERVICES);

        let driver_present = DRIVER_PACKAGES.iter().any(|p| installed.contains(*p));
        if driver_present {
            Self::power_management(&mut state, class.gpu);
        }

        Resolution::Desired(state)
    }
}
