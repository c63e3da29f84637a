pub mod asus_laptop;
pub mod generic_driver;

use crate::classify::HardwareClass;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

pub use asus_laptop::AsusLaptop;
pub use generic_driver::{DRIVER_PACKAGES, GenericDriver};

/// An independent source of configuration decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigDomain {
    GenericDriver,
    VendorSpecific,
}

impl fmt::Display for ConfigDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigDomain::GenericDriver => write!(f, "generic-driver"),
            ConfigDomain::VendorSpecific => write!(f, "vendor-specific"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RepoSource {
    /// `dnf copr enable <project>`
    Copr(String),
    /// Release RPM URL; `{fedora}` is replaced by the running release
    ReleasePackage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Repository {
    pub id: String,
    /// Present once the repository is configured
    pub repo_file: PathBuf,
    pub source: RepoSource,
    pub trust_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// modprobe.d options; changing these requires a boot image rebuild
    ModuleOptions,
    UdevRule,
    Environment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileContent {
    /// The file must contain exactly this.
    Replace(String),
    /// A block appended to whatever the file already holds. The marker line
    /// records that the block was applied.
    AppendBlock { marker: String, body: String },
}

impl FileContent {
    /// New file content given the current content, or `None` when the file
    /// already satisfies this artifact.
    pub fn converge(&self, current: Option<&str>) -> Option<String> {
        match self {
            FileContent::Replace(content) => {
                (current != Some(content.as_str())).then(|| content.clone())
            }
            FileContent::AppendBlock { marker, body } => {
                let current = current.unwrap_or_default();
                if current.lines().any(|line| line.trim_end() == marker) {
                    return None;
                }
                let mut updated = current.to_string();
                if !updated.is_empty() && !updated.ends_with('\n') {
                    updated.push('\n');
                }
                updated.push_str(marker);
                updated.push('\n');
                updated.push_str(body);
                if !body.ends_with('\n') {
                    updated.push('\n');
                }
                Some(updated)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileArtifact {
    pub kind: ArtifactKind,
    pub content: FileContent,
}

/// One `options <module> k=v ...` line destined for a modprobe.d file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleOptions {
    pub path: PathBuf,
    pub module: String,
    pub options: Vec<(String, String)>,
}

impl ModuleOptions {
    pub fn new(path: &str, module: &str, options: &[(&str, &str)]) -> Self {
        Self {
            path: PathBuf::from(path),
            module: module.to_string(),
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn render_line(&self) -> String {
        let mut line = format!("options {}", self.module);
        for (key, value) in &self.options {
            line.push_str(&format!(" {}={}", key, value));
        }
        line
    }
}

/// The configuration one domain wants on the machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DesiredState {
    pub packages: BTreeSet<String>,
    pub module_options: Vec<ModuleOptions>,
    pub services: BTreeSet<String>,
    pub files: BTreeMap<PathBuf, FileArtifact>,
    pub repositories: BTreeSet<Repository>,
}

impl DesiredState {
    pub fn add_packages(&mut self, names: &[&str]) {
        self.packages.extend(names.iter().map(|n| n.to_string()));
    }

    pub fn add_services(&mut self, names: &[&str]) {
        self.services.extend(names.iter().map(|n| n.to_string()));
    }

    pub fn add_file(&mut self, path: &str, kind: ArtifactKind, content: FileContent) {
        self.files
            .insert(PathBuf::from(path), FileArtifact { kind, content });
    }

    /// Every file this domain writes, with module options rendered one line
    /// per module in declaration order. A path claimed by both `files` and
    /// `module_options` with different content is returned as the error.
    pub fn artifacts(&self) -> Result<BTreeMap<PathBuf, FileArtifact>, PathBuf> {
        let mut artifacts = self.files.clone();

        let mut rendered: BTreeMap<&PathBuf, String> = BTreeMap::new();
        for opts in &self.module_options {
            let content = rendered.entry(&opts.path).or_default();
            content.push_str(&opts.render_line());
            content.push('\n');
        }
        for (path, content) in rendered {
            let artifact = FileArtifact {
                kind: ArtifactKind::ModuleOptions,
                content: FileContent::Replace(content),
            };
            match artifacts.get(path) {
                Some(existing) if *existing != artifact => return Err(path.clone()),
                _ => {
                    artifacts.insert(path.clone(), artifact);
                }
            }
        }

        Ok(artifacts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The hardware this domain configures is not present. Normal exit.
    DetectionAbsent(String),
    /// Recognized hardware without a known mapping. Reported, not fatal.
    UnsupportedHardware(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DetectionAbsent(what) => write!(f, "not detected: {}", what),
            SkipReason::UnsupportedHardware(what) => write!(f, "unsupported: {}", what),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Resolution {
    Desired(DesiredState),
    Skip(SkipReason),
}

impl Resolution {
    pub fn desired(&self) -> Option<&DesiredState> {
        match self {
            Resolution::Desired(state) => Some(state),
            Resolution::Skip(_) => None,
        }
    }
}

/// A configuration domain.
pub trait Resolver: fmt::Debug {
    fn domain(&self) -> ConfigDomain;

    /// Compute the desired state. Must not perform I/O.
    fn resolve(&self, class: &HardwareClass, installed: &BTreeSet<String>) -> Resolution;
}
