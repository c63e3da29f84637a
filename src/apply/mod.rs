pub mod report;

use crate::error::Error;
use crate::host::Host;
use crate::merge::MergedState;
use crate::resolve::ArtifactKind;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use report::{Action, ActionRecord, Outcome, RunReport};

/// What the machine looks like before a run, limited to what the merged
/// state touches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSnapshot {
    pub installed_packages: BTreeSet<String>,
    pub enabled_services: BTreeSet<String>,
    /// Current content of every written or removed path; `None` if absent
    pub files: BTreeMap<PathBuf, Option<String>>,
    /// Ids of repositories whose repo file already exists
    pub repositories_present: BTreeSet<String>,
    /// Paths whose current state could not be read, with the reason
    pub unreadable: BTreeMap<PathBuf, String>,
}

impl HostSnapshot {
    /// Read-only. A path that cannot be read is remembered with the reason so
    /// only the action touching it fails.
    pub fn capture(state: &MergedState, host: &Host<'_>) -> Self {
        let mut snapshot = Self::default();

        for name in &state.packages {
            if host.packages.is_installed(name) {
                snapshot.installed_packages.insert(name.clone());
            }
        }

        for name in &state.services {
            if host.services.is_enabled(name) {
                snapshot.enabled_services.insert(name.clone());
            }
        }

        for path in state.files.keys().chain(state.removals.keys()) {
            match host.fs.read_file(path) {
                Ok(content) => {
                    snapshot.files.insert(path.clone(), content);
                }
                Err(e) => snapshot.record_unreadable(path, e),
            }
        }

        for repo in &state.repositories {
            match host.fs.read_file(&repo.repo_file) {
                Ok(Some(_)) => {
                    snapshot.repositories_present.insert(repo.id.clone());
                }
                Ok(None) => {}
                Err(e) => snapshot.record_unreadable(&repo.repo_file, e),
            }
        }

        snapshot
    }

    fn record_unreadable(&mut self, path: &Path, error: Error) {
        warn!(path = %path.display(), %error, "cannot read current state");
        self.unreadable.insert(path.to_path_buf(), error.to_string());
    }

    fn file(&self, path: &Path) -> Option<&str> {
        self.files.get(path).and_then(|c| c.as_deref())
    }
}

fn record(records: &mut Vec<ActionRecord>, action: Action, outcome: Outcome) {
    match &outcome {
        Outcome::Applied => info!(%action, "applied"),
        Outcome::AlreadySatisfied => debug!(%action, "already satisfied"),
        Outcome::Failed(reason) => warn!(%action, %reason, "failed"),
    }
    records.push(ActionRecord { action, outcome });
}

/// Apply `state` against `current`, one action at a time.
///
/// Steps are independent: a failure is recorded and the run continues. The
/// boot image is regenerated if and only if a module-options file was
/// actually changed.
pub fn apply(
    state: &MergedState,
    current: &HostSnapshot,
    host: &mut Host<'_>,
) -> Vec<ActionRecord> {
    let mut records = Vec::new();

    // 1. Repositories and their trust material
    for repo in &state.repositories {
        let action = Action::AddRepository(repo.id.clone());
        if let Some(reason) = current.unreadable.get(&repo.repo_file) {
            record(&mut records, action, Outcome::Failed(reason.clone()));
            continue;
        }
        if current.repositories_present.contains(&repo.id) {
            record(&mut records, action, Outcome::AlreadySatisfied);
            continue;
        }
        let result = match &repo.trust_key {
            Some(key) => host.packages.import_trust_key(key),
            None => Ok(()),
        }
        .and_then(|()| host.packages.add_repository(repo));
        record(&mut records, action, Outcome::from_result(result));
    }

    // 2. Packages, one transaction for everything missing
    let missing: Vec<String> = state
        .packages
        .iter()
        .filter(|p| !current.installed_packages.contains(*p))
        .cloned()
        .collect();
    let present = state
        .packages
        .iter()
        .filter(|p| current.installed_packages.contains(*p));
    for name in present {
        record(
            &mut records,
            Action::InstallPackage(name.clone()),
            Outcome::AlreadySatisfied,
        );
    }
    if !missing.is_empty() {
        for (name, result) in host.packages.install(&missing) {
            record(
                &mut records,
                Action::InstallPackage(name),
                Outcome::from_result(result),
            );
        }
    }

    // 3. Files: winning artifacts, then obsolete paths
    let mut module_options_changed = false;
    for (path, file) in &state.files {
        let action = Action::WriteFile(path.clone());
        if let Some(reason) = current.unreadable.get(path) {
            record(&mut records, action, Outcome::Failed(reason.clone()));
            continue;
        }
        let Some(content) = file.artifact.content.converge(current.file(path)) else {
            record(&mut records, action, Outcome::AlreadySatisfied);
            continue;
        };
        let outcome = Outcome::from_result(host.fs.write_file(path, &content));
        if outcome == Outcome::Applied && file.artifact.kind == ArtifactKind::ModuleOptions {
            module_options_changed = true;
        }
        record(&mut records, action, outcome);
    }
    for (path, removal) in &state.removals {
        let action = Action::RemoveFile(path.clone());
        if let Some(reason) = current.unreadable.get(path) {
            record(&mut records, action, Outcome::Failed(reason.clone()));
            continue;
        }
        if current.file(path).is_none() {
            record(&mut records, action, Outcome::AlreadySatisfied);
            continue;
        }
        let outcome = Outcome::from_result(host.fs.remove(path));
        if outcome == Outcome::Applied && removal.kind == ArtifactKind::ModuleOptions {
            module_options_changed = true;
        }
        record(&mut records, action, outcome);
    }

    // 4. Services. Unit files may have arrived with step 2, so ask live.
    let pending: Vec<&String> = state
        .services
        .iter()
        .filter(|s| !current.enabled_services.contains(*s))
        .collect();
    let enabled = state
        .services
        .iter()
        .filter(|s| current.enabled_services.contains(*s));
    for name in enabled {
        record(
            &mut records,
            Action::EnableService(name.clone()),
            Outcome::AlreadySatisfied,
        );
    }
    if !pending.is_empty() {
        let known = host.services.list_unit_names();
        for name in pending {
            let action = Action::EnableService(name.clone());
            let outcome = match &known {
                Ok(units) if !units.contains(name) => {
                    Outcome::Failed(format!("unit {} is not installed", name))
                }
                Ok(_) => Outcome::from_result(host.services.enable(name)),
                Err(e) => Outcome::Failed(e.to_string()),
            };
            record(&mut records, action, outcome);
        }
    }

    // 5. Boot image, only after a module-options change
    if module_options_changed {
        let outcome = Outcome::from_result(host.boot.regenerate());
        record(&mut records, Action::RegenerateBootImage, outcome);
    }

    records
}
