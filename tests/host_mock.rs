use gfxprep::apply::{self, Action, HostSnapshot, Outcome, RunReport};
use gfxprep::config::GfxprepConfig;
use gfxprep::detect::HardwareFacts;
use gfxprep::error::{Error, Result};
use gfxprep::host::{
    BootImageBuilder, FileSystem, HardwareInspector, Host, PackageManager, RootFs,
    ServiceManager, SysfsInspector,
};
use gfxprep::plan::{Plan, build_plan};
use gfxprep::resolve::{ConfigDomain, Repository, Resolution, SkipReason};
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

const TURING: &str = "NVIDIA Corporation TU116M [GeForce GTX 1660 Ti Mobile] (rev a1)";
const AMPERE: &str = "NVIDIA Corporation GA104M [GeForce RTX 3070 Mobile / Max-Q] (rev a1)";

/// DMI from a fixture tree, PCI listing from a fixed list.
struct FixtureInspector {
    sysfs: SysfsInspector,
    pci: Vec<String>,
}

impl HardwareInspector for FixtureInspector {
    fn read_dmi_field(&self, name: &str) -> Option<String> {
        self.sysfs.read_dmi_field(name)
    }

    fn list_pci_devices(&self) -> Result<Vec<String>> {
        Ok(self.pci.clone())
    }
}

/// Records installs; enabling a repository drops its repo file into the fixture tree.
struct FakePackages {
    fs: RootFs,
    installed: BTreeSet<String>,
    unavailable: BTreeSet<String>,
    keys_imported: Vec<String>,
    transactions: usize,
}

impl PackageManager for FakePackages {
    fn is_installed(&self, name: &str) -> bool {
        self.installed.contains(name)
    }

    fn install(&mut self, names: &[String]) -> Vec<(String, Result<()>)> {
        self.transactions += 1;
        names
            .iter()
            .map(|n| {
                if self.unavailable.contains(n) {
                    let err = Error::Collaborator {
                        operation: format!("install {}", n),
                        detail: "no match for argument".to_string(),
                    };
                    return (n.clone(), Err(err));
                }
                self.installed.insert(n.clone());
                (n.clone(), Ok(()))
            })
            .collect()
    }

    fn add_repository(&mut self, repo: &Repository) -> Result<()> {
        self.fs.write_file(&repo.repo_file, "[repo]\n")
    }

    fn import_trust_key(&mut self, key: &str) -> Result<()> {
        self.keys_imported.push(key.to_string());
        Ok(())
    }
}

struct FakeServices {
    units: BTreeSet<String>,
    enabled: BTreeSet<String>,
}

impl ServiceManager for FakeServices {
    fn enable(&mut self, name: &str) -> Result<()> {
        self.enabled.insert(name.to_string());
        Ok(())
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    fn list_unit_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.units.clone())
    }
}

#[derive(Default)]
struct FakeBoot {
    runs: usize,
}

impl BootImageBuilder for FakeBoot {
    fn regenerate(&mut self) -> Result<()> {
        self.runs += 1;
        Ok(())
    }
}

struct Machine {
    _tmp: TempDir,
    fs: RootFs,
    pci: Vec<String>,
    packages: FakePackages,
    services: FakeServices,
    boot: FakeBoot,
}

impl Machine {
    fn new(vendor: &str, product: &str, pci: &[&str]) -> Self {
        let tmp = TempDir::new().unwrap();
        let dmi = tmp.path().join("sys/class/dmi/id");
        fs::create_dir_all(&dmi).unwrap();
        fs::write(dmi.join("sys_vendor"), format!("{}\n", vendor)).unwrap();
        fs::write(dmi.join("product_name"), format!("{}\n", product)).unwrap();

        let fs = RootFs::new(tmp.path());
        let units = [
            "supergfxd.service",
            "nvidia-suspend.service",
            "nvidia-resume.service",
            "nvidia-hibernate.service",
            "nvidia-powerd.service",
        ];
        Self {
            packages: FakePackages {
                fs: fs.clone(),
                installed: BTreeSet::new(),
                unavailable: BTreeSet::new(),
                keys_imported: Vec::new(),
                transactions: 0,
            },
            services: FakeServices {
                units: units.iter().map(|u| u.to_string()).collect(),
                enabled: BTreeSet::new(),
            },
            boot: FakeBoot::default(),
            pci: pci.iter().map(|p| p.to_string()).collect(),
            fs,
            _tmp: tmp,
        }
    }

    fn file(&self, path: &str) -> Option<String> {
        fs::read_to_string(self.fs.path(path)).ok()
    }

    fn seed(&self, path: &str, content: &str) {
        let full = self.fs.path(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    fn plan(&self) -> Plan {
        let inspector = FixtureInspector {
            sysfs: SysfsInspector::new(self.fs.clone()),
            pci: self.pci.clone(),
        };
        let facts = HardwareFacts::probe(&inspector, &self.packages).unwrap();
        build_plan(facts, &GfxprepConfig::default()).unwrap()
    }

    fn reconcile(&mut self) -> RunReport {
        let plan = self.plan();
        let mut host = Host {
            packages: &mut self.packages,
            services: &mut self.services,
            fs: &mut self.fs,
            boot: &mut self.boot,
        };
        let snapshot = HostSnapshot::capture(&plan.merged, &host);
        let records = apply::apply(&plan.merged, &snapshot, &mut host);
        plan.into_report(records)
    }
}

fn strings(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_asus_turing_gets_power_management_override() {
    let mut machine =
        Machine::new("ASUSTeK COMPUTER INC.", "TUF Gaming FX505DT 2019", &[TURING]);
    // Left behind by an older power-management setup
    machine.seed(
        "/etc/modprobe.d/nvidia-pm.conf",
        "options nvidia NVreg_DynamicPowerManagement=0x01\n",
    );

    let report = machine.reconcile();
    assert!(report.is_success(), "failures: {:?}", report.failed());
    assert!(report.advisory.is_some());

    // Vendor override won the contested path
    assert_eq!(
        machine.file("/etc/modprobe.d/nvidia.conf").as_deref(),
        Some("options nvidia NVreg_DynamicPowerManagement=0x02\n")
    );
    assert_eq!(report.suppressed.len(), 1);
    assert_eq!(report.suppressed[0].domain, ConfigDomain::GenericDriver);
    assert_eq!(report.suppressed[0].winner, ConfigDomain::VendorSpecific);

    assert_eq!(
        machine.file("/etc/modprobe.d/nvidia-drm.conf").as_deref(),
        Some("options nvidia-drm modeset=1\n")
    );
    assert!(machine.file("/etc/udev/rules.d/80-nvidia-pm.rules").is_some());
    assert!(machine.file("/etc/modprobe.d/nvidia-pm.conf").is_none());

    assert!(machine.packages.installed.contains("akmod-nvidia"));
    assert!(machine.packages.installed.contains("asusctl"));
    assert!(machine.services.enabled.contains("nvidia-suspend.service"));
    assert!(!machine.services.enabled.contains("nvidia-powerd.service"));
    assert!(report.boot_image_regenerated());
    assert_eq!(machine.boot.runs, 1);
    assert_eq!(machine.packages.keys_imported.len(), 2);
}

#[test]
fn test_second_run_changes_nothing() {
    let mut machine = Machine::new("ASUSTeK COMPUTER INC.", "ROG Strix G513QM", &[AMPERE]);
    machine.seed("/etc/environment", "PATH=/usr/local/bin:/usr/bin\n");

    let first = machine.reconcile();
    assert!(first.applied_count() > 0);
    let environment = machine.file("/etc/environment").unwrap();

    let second = machine.reconcile();
    assert!(second.is_success());
    assert_eq!(second.applied_count(), 0);
    assert!(
        second
            .actions
            .iter()
            .all(|r| r.outcome == Outcome::AlreadySatisfied)
    );
    assert!(!second.boot_image_regenerated());
    assert_eq!(machine.boot.runs, 1);
    assert_eq!(machine.packages.transactions, 1);
    assert_eq!(machine.file("/etc/environment").unwrap(), environment);
}

#[test]
fn test_non_vendor_ampere_gets_generic_stack_only() {
    let mut machine = Machine::new("Dell Inc.", "XPS 15 9510", &[AMPERE]);
    machine.seed("/etc/environment", "PATH=/usr/local/bin:/usr/bin");

    let plan = machine.plan();
    assert!(matches!(
        plan.domains[1].resolution,
        Resolution::Skip(SkipReason::DetectionAbsent(_))
    ));
    assert_eq!(
        plan.merged.packages,
        strings(&[
            "akmod-nvidia-open",
            "libva-nvidia-driver",
            "xorg-x11-drv-nvidia-cuda-libs",
        ])
    );
    assert!(plan.merged.services.is_empty());

    let report = machine.reconcile();
    assert!(report.is_success());
    assert!(report.suppressed.is_empty());
    assert_eq!(
        machine.file("/etc/environment").as_deref(),
        Some(
            "PATH=/usr/local/bin:/usr/bin\n\
             # gfxprep: nvidia session environment\n\
             LIBVA_DRIVER_NAME=nvidia\n\
             NVD_BACKEND=direct\n"
        )
    );
    assert!(machine.file("/etc/udev/rules.d/80-nvidia-pm.rules").is_none());
}

#[test]
fn test_vendor_without_driver_installs_base_tooling_only() {
    let mut machine = Machine::new("ASUSTeK COMPUTER INC.", "Vivobook 15", &[]);

    let report = machine.reconcile();
    assert!(report.is_success());
    assert_eq!(
        machine.packages.installed,
        strings(&["asusctl", "asusctl-rog-gui", "supergfxctl"])
    );
    assert_eq!(machine.services.enabled, strings(&["supergfxd.service"]));
    assert!(!report.boot_image_regenerated());
    assert!(
        !report
            .actions
            .iter()
            .any(|r| matches!(r.action, Action::WriteFile(_)))
    );
}

#[test]
fn test_vendor_with_existing_driver_and_no_gpu_enables_suspend_hooks() {
    let mut machine = Machine::new("ASUSTeK COMPUTER INC.", "Vivobook 15", &[]);
    machine.packages.installed.insert("akmod-nvidia".to_string());

    machine.reconcile();
    assert!(machine.services.enabled.contains("nvidia-resume.service"));
    assert!(machine.file("/etc/modprobe.d/nvidia.conf").is_none());
}

#[test]
fn test_nothing_detected_is_a_clean_no_op() {
    let mut machine = Machine::new("LENOVO", "ThinkPad X1 Carbon", &[]);

    let plan = machine.plan();
    assert!(plan.is_empty());
    assert!(matches!(
        plan.domains[0].resolution,
        Resolution::Skip(SkipReason::DetectionAbsent(_))
    ));

    let report = machine.reconcile();
    assert!(report.actions.is_empty());
    assert_eq!(machine.packages.transactions, 0);
}

#[test]
fn test_failed_package_does_not_stop_the_run() {
    let mut machine = Machine::new("ASUSTeK COMPUTER INC.", "Vivobook 15", &[]);
    machine.packages.unavailable.insert("asusctl-rog-gui".to_string());
    machine.services.units.remove("supergfxd.service");

    let report = machine.reconcile();
    assert!(!report.is_success());
    let failed: Vec<Action> = report
        .failed()
        .into_iter()
        .map(|r| r.action.clone())
        .collect();
    assert_eq!(
        failed,
        vec![
            Action::InstallPackage("asusctl-rog-gui".to_string()),
            Action::EnableService("supergfxd.service".to_string()),
        ]
    );
    assert!(machine.packages.installed.contains("asusctl"));
    assert!(machine.packages.installed.contains("supergfxctl"));
}

#[test]
fn test_report_serializes_for_json_output() {
    let mut machine = Machine::new("ASUSTeK COMPUTER INC.", "ROG Zephyrus G14", &[TURING]);
    let report = machine.reconcile();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["class"]["gpu"], "LegacyGen");
    assert_eq!(json["domains"][0]["domain"], "generic-driver");
    assert_eq!(json["domains"][0]["resolution"]["outcome"], "desired");
    assert_eq!(json["suppressed"][0]["path"], "/etc/modprobe.d/nvidia.conf");
}
