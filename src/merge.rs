use crate::error::{Error, Result};
use crate::resolve::{ArtifactKind, ConfigDomain, DesiredState, FileArtifact, Repository};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A winning domain's artifact at a path makes these other paths obsolete.
#[derive(Debug, Clone, Copy)]
pub struct Obsoletion {
    pub domain: ConfigDomain,
    /// Kind of the obsolete files; module options trigger a boot image rebuild
    pub kind: ArtifactKind,
    pub path: &'static str,
    pub obsoletes: &'static [&'static str],
}

/// modprobe merges options across every file in modprobe.d, so a stale
/// power-management block would be combined with the Turing override.
pub const OBSOLETIONS: &[Obsoletion] = &[Obsoletion {
    domain: ConfigDomain::VendorSpecific,
    kind: ArtifactKind::ModuleOptions,
    path: "/etc/modprobe.d/nvidia.conf",
    obsoletes: &["/etc/modprobe.d/nvidia-pm.conf"],
}];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedFile {
    pub domain: ConfigDomain,
    pub artifact: FileArtifact,
}

/// A lower-priority writer that lost a path to a higher-priority one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suppression {
    pub path: PathBuf,
    pub domain: ConfigDomain,
    pub winner: ConfigDomain,
}

/// An obsolete file scheduled for removal, and which winning artifact made it so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub domain: ConfigDomain,
    pub kind: ArtifactKind,
    pub superseded_by: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedState {
    pub packages: BTreeSet<String>,
    pub services: BTreeSet<String>,
    pub repositories: BTreeSet<Repository>,
    pub files: BTreeMap<PathBuf, MergedFile>,
    pub removals: BTreeMap<PathBuf, Removal>,
    pub suppressed: Vec<Suppression>,
}

impl MergedState {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
            && self.services.is_empty()
            && self.repositories.is_empty()
            && self.files.is_empty()
            && self.removals.is_empty()
    }

    pub fn winner(&self, path: impl AsRef<Path>) -> Option<&MergedFile> {
        self.files.get(path.as_ref())
    }
}

/// Merge per-domain desired states. Sequence order is priority: earlier
/// entries win contested paths. Packages, services and repositories are
/// unioned. A domain listed twice that writes one path with two different
/// contents has no defined winner and aborts the merge.
pub fn merge(states: &[(ConfigDomain, DesiredState)]) -> Result<MergedState> {
    let mut merged = MergedState::default();

    for (domain, state) in states {
        merged.packages.extend(state.packages.iter().cloned());
        merged.services.extend(state.services.iter().cloned());
        merged.repositories.extend(state.repositories.iter().cloned());

        let artifacts = state
            .artifacts()
            .map_err(|path| Error::ConflictViolatesInvariant {
                path,
                domain: domain.to_string(),
            })?;
        for (path, artifact) in artifacts {
            match merged.files.get(&path) {
                None => {
                    merged.files.insert(
                        path,
                        MergedFile {
                            domain: *domain,
                            artifact,
                        },
                    );
                }
                Some(existing) if existing.domain == *domain => {
                    if existing.artifact != artifact {
                        return Err(Error::ConflictViolatesInvariant {
                            path,
                            domain: domain.to_string(),
                        });
                    }
                }
                Some(existing) => {
                    merged.suppressed.push(Suppression {
                        path,
                        domain: *domain,
                        winner: existing.domain,
                    });
                }
            }
        }
    }

    for rule in OBSOLETIONS {
        let wins = merged
            .winner(rule.path)
            .is_some_and(|file| file.domain == rule.domain);
        if !wins {
            continue;
        }
        for obsolete in rule.obsoletes {
            let obsolete = PathBuf::from(obsolete);
            if merged.files.contains_key(&obsolete) {
                // Still a live artifact of some domain; never remove what we write
                continue;
            }
            merged.removals.insert(
                obsolete,
                Removal {
                    domain: rule.domain,
                    kind: rule.kind,
                    superseded_by: PathBuf::from(rule.path),
                },
            );
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{FileContent, ModuleOptions};

    const NVIDIA_CONF: &str = "/etc/modprobe.d/nvidia.conf";

    fn with_options(module: &str, key: &str, value: &str) -> DesiredState {
        let mut state = DesiredState::default();
        state
            .module_options
            .push(ModuleOptions::new(NVIDIA_CONF, module, &[(key, value)]));
        state
    }

    #[test]
    fn test_higher_priority_domain_wins_same_path() {
        let vendor = with_options("nvidia", "NVreg_DynamicPowerManagement", "0x02");
        let generic = with_options("nvidia", "NVreg_UsePageAttributeTable", "1");

        let merged = merge(&[
            (ConfigDomain::VendorSpecific, vendor.clone()),
            (ConfigDomain::GenericDriver, generic),
        ])
        .unwrap();

        let winner = merged.winner(NVIDIA_CONF).unwrap();
        assert_eq!(winner.domain, ConfigDomain::VendorSpecific);
        let expected = vendor.artifacts().unwrap();
        assert_eq!(winner.artifact, expected[Path::new(NVIDIA_CONF)]);
        assert_eq!(
            merged.suppressed,
            vec![Suppression {
                path: PathBuf::from(NVIDIA_CONF),
                domain: ConfigDomain::GenericDriver,
                winner: ConfigDomain::VendorSpecific,
            }]
        );
    }

    #[test]
    fn test_override_is_order_dependent() {
        let vendor = with_options("nvidia", "A", "1");
        let generic = with_options("nvidia", "B", "2");

        let merged = merge(&[
            (ConfigDomain::GenericDriver, generic.clone()),
            (ConfigDomain::VendorSpecific, vendor),
        ])
        .unwrap();

        assert_eq!(
            merged.winner(NVIDIA_CONF).unwrap().domain,
            ConfigDomain::GenericDriver
        );
        // Obsoletion rules follow the winning domain only
        assert!(merged.removals.is_empty());
    }

    #[test]
    fn test_union_resources_are_order_independent() {
        let mut a = DesiredState::default();
        a.add_packages(&["asusctl", "shared"]);
        a.add_services(&["supergfxd.service"]);
        let mut b = DesiredState::default();
        b.add_packages(&["akmod-nvidia", "shared"]);
        b.add_services(&["nvidia-suspend.service"]);

        let ab = merge(&[
            (ConfigDomain::VendorSpecific, a.clone()),
            (ConfigDomain::GenericDriver, b.clone()),
        ])
        .unwrap();
        let ba = merge(&[
            (ConfigDomain::GenericDriver, b),
            (ConfigDomain::VendorSpecific, a),
        ])
        .unwrap();

        assert_eq!(ab.packages, ba.packages);
        assert_eq!(ab.services, ba.services);
        assert_eq!(ab.packages.len(), 3);
    }

    #[test]
    fn test_equal_priority_conflict_is_fatal() {
        let first = with_options("nvidia", "A", "1");
        let second = with_options("nvidia", "A", "2");

        let err = merge(&[
            (ConfigDomain::GenericDriver, first),
            (ConfigDomain::GenericDriver, second),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::ConflictViolatesInvariant { .. }));
    }

    #[test]
    fn test_file_and_module_options_on_one_path_is_fatal() {
        let mut state = with_options("nvidia", "Y", "1");
        state.add_file(
            NVIDIA_CONF,
            ArtifactKind::ModuleOptions,
            FileContent::Replace("options nvidia X=9\n".to_string()),
        );

        let err = merge(&[(ConfigDomain::VendorSpecific, state)]).unwrap_err();
        assert!(matches!(
            err,
            Error::ConflictViolatesInvariant { ref path, .. } if path == Path::new(NVIDIA_CONF)
        ));
    }

    #[test]
    fn test_module_obsoletions_are_module_option_files() {
        for rule in OBSOLETIONS {
            if rule.kind == ArtifactKind::ModuleOptions {
                assert!(
                    rule.obsoletes
                        .iter()
                        .all(|p| p.starts_with("/etc/modprobe.d/"))
                );
            }
        }
    }

    #[test]
    fn test_same_domain_identical_content_is_not_a_conflict() {
        let state = with_options("nvidia", "A", "1");
        let merged = merge(&[
            (ConfigDomain::GenericDriver, state.clone()),
            (ConfigDomain::GenericDriver, state),
        ])
        .unwrap();
        assert_eq!(merged.files.len(), 1);
        assert!(merged.suppressed.is_empty());
    }

    #[test]
    fn test_vendor_override_schedules_obsolete_removal() {
        let vendor = with_options("nvidia", "NVreg_DynamicPowerManagement", "0x02");
        let merged = merge(&[(ConfigDomain::VendorSpecific, vendor)]).unwrap();

        let removal = &merged.removals[Path::new("/etc/modprobe.d/nvidia-pm.conf")];
        assert_eq!(removal.domain, ConfigDomain::VendorSpecific);
        assert_eq!(removal.kind, ArtifactKind::ModuleOptions);
        assert_eq!(removal.superseded_by, PathBuf::from(NVIDIA_CONF));
    }

    #[test]
    fn test_obsolete_path_still_written_is_kept() {
        let mut vendor = with_options("nvidia", "NVreg_DynamicPowerManagement", "0x02");
        vendor.add_file(
            "/etc/modprobe.d/nvidia-pm.conf",
            ArtifactKind::ModuleOptions,
            FileContent::Replace("options nvidia X=1\n".to_string()),
        );
        let merged = merge(&[(ConfigDomain::VendorSpecific, vendor)]).unwrap();
        assert!(merged.removals.is_empty());
    }

    #[test]
    fn test_empty_merge() {
        let merged = merge(&[]).unwrap();
        assert!(merged.is_empty());
    }
}
