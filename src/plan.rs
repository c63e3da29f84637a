use crate::apply::{ActionRecord, RunReport};
use crate::classify::{self, HardwareClass};
use crate::config::GfxprepConfig;
use crate::detect::HardwareFacts;
use crate::error::Result;
use crate::merge::{self, MergedState};
use crate::resolve::{
    AsusLaptop, ConfigDomain, DRIVER_PACKAGES, DesiredState, GenericDriver, Resolution,
    Resolver,
};
use serde::Serialize;
use std::collections::BTreeSet;

/// Merge priority, highest first: the more specific domain wins.
pub const PRIORITY: &[ConfigDomain] = &[
    ConfigDomain::VendorSpecific,
    ConfigDomain::GenericDriver,
];

#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub domain: ConfigDomain,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub facts: HardwareFacts,
    pub class: HardwareClass,
    pub advisory: Option<String>,
    pub domains: Vec<DomainReport>,
    pub merged: MergedState,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn into_report(self, actions: Vec<ActionRecord>) -> RunReport {
        RunReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            facts: self.facts,
            class: self.class,
            advisory: self.advisory,
            domains: self.domains,
            suppressed: self.merged.suppressed,
            actions,
        }
    }
}

/// Resolvers in evaluation order. The vendor domain runs after the generic
/// one because its power-management output depends on the driver outcome.
fn resolvers(config: &GfxprepConfig) -> Vec<Box<dyn Resolver>> {
    vec![
        Box::new(GenericDriver::new(&config.environment.file)),
        Box::new(AsusLaptop),
    ]
}

/// Installed driver packages plus those an already-resolved domain will install.
fn effective_drivers(
    installed: &BTreeSet<String>,
    state: Option<&DesiredState>,
) -> BTreeSet<String> {
    let mut drivers = installed.clone();
    if let Some(state) = state {
        drivers.extend(
            state
                .packages
                .iter()
                .filter(|p| DRIVER_PACKAGES.contains(&p.as_str()))
                .cloned(),
        );
    }
    drivers
}

/// Facts in, merged desired state out. No side effects.
pub fn build_plan(facts: HardwareFacts, config: &GfxprepConfig) -> Result<Plan> {
    let class = classify::classify(&facts, &config.vendor.token);

    let mut drivers = facts.installed_driver_packages.clone();
    let mut domains = Vec::new();
    for resolver in resolvers(config) {
        let resolution = resolver.resolve(&class, &drivers);
        drivers = effective_drivers(&drivers, resolution.desired());
        domains.push(DomainReport {
            domain: resolver.domain(),
            resolution,
        });
    }

    let ordered: Vec<(ConfigDomain, DesiredState)> = PRIORITY
        .iter()
        .flat_map(|domain| {
            domains
                .iter()
                .filter(move |d| d.domain == *domain)
                .filter_map(|d| d.resolution.desired().map(|s| (d.domain, s.clone())))
        })
        .collect();
    let merged = merge::merge(&ordered)?;

    Ok(Plan {
        advisory: class.advisory().map(String::from),
        facts,
        class,
        domains,
        merged,
    })
}
