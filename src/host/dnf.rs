use crate::error::{Error, Result};
use crate::host::PackageManager;
use crate::resolve::{RepoSource, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, warn};

/// Placeholder in release-package URLs, replaced by the Fedora release number.
const FEDORA_RELEASE_PLACEHOLDER: &str = "{fedora}";

/// Fedora packaging via `dnf` and `rpm`.
#[derive(Debug, Default)]
pub struct Dnf {
    /// Show a spinner while dnf runs.
    pub progress: bool,
}

impl Dnf {
    pub fn new(progress: bool) -> Self {
        Self { progress }
    }

    fn spinner(&self, message: String) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("  {spinner} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(120));
        Some(bar)
    }

    fn fedora_release() -> Result<String> {
        let output = Command::new("rpm")
            .args(["-E", "%fedora"])
            .output()
            .map_err(|e| Error::collaborator("rpm -E %fedora", e))?;
        let release = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || !release.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::collaborator(
                "rpm -E %fedora",
                format!("not a Fedora release: '{}'", release),
            ));
        }
        Ok(release)
    }

    /// Substitute the running Fedora release into `template`, querying rpm
    /// only when the placeholder is present.
    fn expand_release(template: &str) -> Result<String> {
        if !template.contains(FEDORA_RELEASE_PLACEHOLDER) {
            return Ok(template.to_string());
        }
        Ok(template.replace(FEDORA_RELEASE_PLACEHOLDER, &Self::fedora_release()?))
    }
}

fn run(program: &str, args: &[&str]) -> Result<()> {
    let operation = format!("{} {}", program, args.join(" "));
    debug!(%operation, "running");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::collaborator(operation.clone(), e))?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(Error::collaborator(
        operation,
        stderr.lines().last().unwrap_or("no output").trim().to_string(),
    ))
}

impl PackageManager for Dnf {
    fn is_installed(&self, name: &str) -> bool {
        Command::new("rpm")
            .args(["-q", "--quiet", name])
            .status()
            .is_ok_and(|s| s.success())
    }

    fn install(&mut self, names: &[String]) -> Vec<(String, Result<()>)> {
        if names.is_empty() {
            return Vec::new();
        }

        let spinner = self.spinner(format!("Installing {}", names.join(", ")));
        let mut args = vec!["install", "-y"];
        args.extend(names.iter().map(String::as_str));
        let batch = run("dnf", &args);
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }

        match batch {
            Ok(()) => names.iter().map(|n| (n.clone(), Ok(()))).collect(),
            Err(e) => {
                // A failed transaction may still have installed some of the set
                warn!(error = %e, "dnf transaction failed, checking packages individually");
                names
                    .iter()
                    .map(|n| {
                        let result = if self.is_installed(n) {
                            Ok(())
                        } else {
                            Err(Error::collaborator(format!("install {}", n), &e))
                        };
                        (n.clone(), result)
                    })
                    .collect()
            }
        }
    }

    fn add_repository(&mut self, repo: &Repository) -> Result<()> {
        match &repo.source {
            RepoSource::Copr(project) => run("dnf", &["copr", "enable", "-y", project]),
            RepoSource::ReleasePackage(url) => {
                let url = Self::expand_release(url)?;
                run("dnf", &["install", "-y", &url])
            }
        }
    }

    fn import_trust_key(&mut self, key: &str) -> Result<()> {
        let key = Self::expand_release(key)?;
        run("rpm", &["--import", &key])
    }
}
