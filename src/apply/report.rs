use crate::classify::HardwareClass;
use crate::detect::HardwareFacts;
use crate::error::Result;
use crate::merge::Suppression;
use crate::plan::DomainReport;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Action {
    AddRepository(String),
    InstallPackage(String),
    WriteFile(PathBuf),
    RemoveFile(PathBuf),
    EnableService(String),
    RegenerateBootImage,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AddRepository(id) => write!(f, "add repository {}", id),
            Action::InstallPackage(name) => write!(f, "install {}", name),
            Action::WriteFile(path) => write!(f, "write {}", path.display()),
            Action::RemoveFile(path) => write!(f, "remove {}", path.display()),
            Action::EnableService(name) => write!(f, "enable {}", name),
            Action::RegenerateBootImage => write!(f, "regenerate boot image"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    AlreadySatisfied,
    Failed(String),
}

impl Outcome {
    pub fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Applied,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub action: Action,
    pub outcome: Outcome,
}

/// Everything one run decided and did. Built fresh per run, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub timestamp: String,
    pub facts: HardwareFacts,
    pub class: HardwareClass,
    pub advisory: Option<String>,
    pub domains: Vec<DomainReport>,
    pub suppressed: Vec<Suppression>,
    pub actions: Vec<ActionRecord>,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.actions.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn applied_count(&self) -> usize {
        self.count(|o| *o == Outcome::Applied)
    }

    pub fn satisfied_count(&self) -> usize {
        self.count(|o| *o == Outcome::AlreadySatisfied)
    }

    pub fn failed(&self) -> Vec<&ActionRecord> {
        self.actions
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }

    pub fn boot_image_regenerated(&self) -> bool {
        self.actions.iter().any(|r| {
            r.action == Action::RegenerateBootImage && r.outcome == Outcome::Applied
        })
    }
}
