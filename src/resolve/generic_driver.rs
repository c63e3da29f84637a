use crate::classify::{GpuGeneration, HardwareClass};
use crate::resolve::{
    ArtifactKind, ConfigDomain, DesiredState, FileArtifact, FileContent, ModuleOptions,
    RepoSource, Repository, Resolution, Resolver, SkipReason,
};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const MODPROBE_NVIDIA: &str = "/etc/modprobe.d/nvidia.conf";
pub const MODPROBE_NVIDIA_DRM: &str = "/etc/modprobe.d/nvidia-drm.conf";

pub const DEFAULT_ENVIRONMENT_FILE: &str = "/etc/environment";
pub const ENVIRONMENT_MARKER: &str = "# gfxprep: nvidia session environment";

/// Kernel module packages. Any one of these installed means a driver is present.
pub const DRIVER_PACKAGES: &[&str] = &["akmod-nvidia", "akmod-nvidia-open"];

const MODERN_PACKAGES: &[&str] = &[
    "akmod-nvidia-open",
    "xorg-x11-drv-nvidia-cuda-libs",
    "libva-nvidia-driver",
];

const LEGACY_PACKAGES: &[&str] = &["akmod-nvidia", "xorg-x11-drv-nvidia-cuda"];

const MODERN_ENVIRONMENT: &str = "LIBVA_DRIVER_NAME=nvidia\nNVD_BACKEND=direct\n";

fn rpmfusion(section: &str) -> Repository {
    Repository {
        id: format!("rpmfusion-{}", section),
        repo_file: PathBuf::from(format!("/etc/yum.repos.d/rpmfusion-{}.repo", section)),
        source: RepoSource::ReleasePackage(format!(
            "https://mirrors.rpmfusion.org/{0}/fedora/rpmfusion-{0}-release-{{fedora}}.noarch.rpm",
            section
        )),
        trust_key: Some(format!(
            "/usr/share/distribution-gpg-keys/rpmfusion/RPM-GPG-KEY-rpmfusion-{}-fedora-{{fedora}}",
            section
        )),
    }
}

/// NVIDIA driver stack from RPM Fusion, chosen by GPU generation.
#[derive(Debug, Clone)]
pub struct GenericDriver {
    /// Session environment file the VA-API block is appended to
    pub environment_file: PathBuf,
}

impl Default for GenericDriver {
    fn default() -> Self {
        Self {
            environment_file: PathBuf::from(DEFAULT_ENVIRONMENT_FILE),
        }
    }
}

impl GenericDriver {
    pub fn new(environment_file: impl Into<PathBuf>) -> Self {
        Self {
            environment_file: environment_file.into(),
        }
    }

    fn base_state() -> DesiredState {
        let mut state = DesiredState::default();
        state.repositories.insert(rpmfusion("free"));
        state.repositories.insert(rpmfusion("nonfree"));
        state
    }

    fn modern(&self) -> DesiredState {
        let mut state = Self::base_state();
        state.add_packages(MODERN_PACKAGES);
        state.module_options.push(ModuleOptions::new(
            MODPROBE_NVIDIA_DRM,
            "nvidia-drm",
            &[("modeset", "1"), ("fbdev", "1")],
        ));
        state.module_options.push(ModuleOptions::new(
            MODPROBE_NVIDIA,
            "nvidia",
            &[
                ("NVreg_PreserveVideoMemoryAllocations", "1"),
                ("NVreg_TemporaryFilePath", "/var/tmp"),
            ],
        ));
        state.files.insert(
            self.environment_file.clone(),
            FileArtifact {
                kind: ArtifactKind::Environment,
                content: FileContent::AppendBlock {
                    marker: ENVIRONMENT_MARKER.to_string(),
                    body: MODERN_ENVIRONMENT.to_string(),
                },
            },
        );
        state
    }

    fn legacy(&self) -> DesiredState {
        let mut state = Self::base_state();
        state.add_packages(LEGACY_PACKAGES);
        state.module_options.push(ModuleOptions::new(
            MODPROBE_NVIDIA_DRM,
            "nvidia-drm",
            &[("modeset", "1")],
        ));
        state.module_options.push(ModuleOptions::new(
            MODPROBE_NVIDIA,
            "nvidia",
            &[("NVreg_UsePageAttributeTable", "1")],
        ));
        state
    }
}

impl Resolver for GenericDriver {
    fn domain(&self) -> ConfigDomain {
        ConfigDomain::GenericDriver
    }

    fn resolve(&self, class: &HardwareClass, _installed: &BTreeSet<String>) -> Resolution {
        match class.gpu {
            GpuGeneration::ModernGen => Resolution::Desired(self.modern()),
            GpuGeneration::LegacyGen => Resolution::Desired(self.legacy()),
            GpuGeneration::None => {
                Resolution::Skip(SkipReason::DetectionAbsent("NVIDIA GPU".to_string()))
            }
            GpuGeneration::UnknownGen => Resolution::Skip(SkipReason::UnsupportedHardware(
                "NVIDIA GPU generation has no known driver mapping".to_string(),
            )),
        }
    }
}
