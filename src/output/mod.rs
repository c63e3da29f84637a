use crate::apply::{Outcome, RunReport};
use crate::classify::{GpuGeneration, HardwareClass, VendorClass};
use crate::detect::HardwareFacts;
use crate::merge::Suppression;
use crate::plan::{DomainReport, Plan};
use crate::resolve::{FileContent, Resolution};
use colored::Colorize;
use serde::Serialize;

const LABEL_W: usize = 16;

fn generation_label(generation: GpuGeneration) -> &'static str {
    match generation {
        GpuGeneration::None => "none",
        GpuGeneration::LegacyGen => "Turing (legacy)",
        GpuGeneration::ModernGen => "Ampere or newer",
        GpuGeneration::UnknownGen => "unknown",
    }
}

pub fn print_hardware_summary(facts: &HardwareFacts, class: &HardwareClass) {
    let none = || "None".to_string();
    let mut rows: Vec<(&str, String)> = vec![
        ("Vendor", non_empty(&facts.vendor_string).unwrap_or_else(none)),
        ("Product", non_empty(&facts.product_name).unwrap_or_else(none)),
    ];
    if facts.gpu_descriptors.is_empty() {
        rows.push(("NVIDIA GPU", none()));
    }
    for gpu in &facts.gpu_descriptors {
        rows.push(("NVIDIA GPU", gpu.clone()));
    }
    rows.push(("Generation", generation_label(class.gpu).to_string()));
    rows.push((
        "Vendor Match",
        match class.vendor {
            VendorClass::Asus => "ASUS".to_string(),
            VendorClass::NoVendorMatch => "no".to_string(),
        },
    ));
    if let Some(year) = class.product_year {
        rows.push(("Model Year", year.to_string()));
    }
    if !facts.installed_driver_packages.is_empty() {
        rows.push((
            "Installed Driver",
            facts
                .installed_driver_packages
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        ));
    }

    // Box width from content
    let inner_w = rows
        .iter()
        .map(|(l, v)| l.len().max(LABEL_W) + 2 + v.len())
        .max()
        .unwrap_or(40);

    let title = "Hardware";
    let fill = inner_w.saturating_sub(1 + title.len());
    println!("╭─ {} {}╮", title.bold(), "─".repeat(fill));

    for (label, value) in &rows {
        let padded = format!("{:<w$}", label, w = LABEL_W);
        let pad = inner_w.saturating_sub(LABEL_W + 2 + value.len());
        println!("│ {}  {}{} │", padded.dimmed(), value, " ".repeat(pad));
    }

    println!("╰{}╯", "─".repeat(inner_w + 2));

    if let Some(advisory) = class.advisory() {
        println!("  {} {}", "Note:".yellow(), advisory);
    }
    println!();
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn print_domains(domains: &[DomainReport]) {
    for report in domains {
        match &report.resolution {
            Resolution::Desired(_) => {
                println!("  {} {}", "✓".green(), report.domain.to_string().bold());
            }
            Resolution::Skip(reason) => {
                println!(
                    "  {} {} {}",
                    "-".dimmed(),
                    report.domain.to_string().bold(),
                    format!("({})", reason).dimmed()
                );
            }
        }
    }
    println!();
}

fn print_suppressed(suppressed: &[Suppression]) {
    for s in suppressed {
        println!(
            "  {} {} from {} overridden by {}",
            "!".yellow(),
            s.path.display(),
            s.domain,
            s.winner
        );
    }
}

pub fn print_plan(plan: &Plan) {
    println!("{}", "Plan".bold().underline());
    println!();
    print_domains(&plan.domains);

    let merged = &plan.merged;
    if merged.is_empty() {
        println!("{}", "  Nothing to configure on this machine.".green());
        return;
    }

    if !merged.repositories.is_empty() {
        println!("  {} Repositories:", ">>".cyan());
        for repo in &merged.repositories {
            println!("     {}", repo.id);
        }
        println!();
    }

    if !merged.packages.is_empty() {
        println!("  {} Packages:", ">>".cyan());
        for pkg in &merged.packages {
            println!("     {}", pkg);
        }
        println!();
    }

    if !merged.files.is_empty() {
        println!("  {} Files:", ">>".cyan());
        for (path, file) in &merged.files {
            let mode = match file.artifact.content {
                FileContent::Replace(_) => "replace",
                FileContent::AppendBlock { .. } => "append",
            };
            println!(
                "     {} {}",
                path.display(),
                format!("({}, {})", file.domain, mode).dimmed()
            );
        }
        println!();
    }

    if !merged.removals.is_empty() {
        println!("  {} Obsolete files to remove:", ">>".cyan());
        for (path, removal) in &merged.removals {
            println!(
                "     {} {}",
                path.display(),
                format!("(superseded by {})", removal.superseded_by.display()).dimmed()
            );
        }
        println!();
    }

    if !merged.services.is_empty() {
        println!("  {} Services to enable:", ">>".cyan());
        for svc in &merged.services {
            println!("     {}", svc);
        }
        println!();
    }

    if !merged.suppressed.is_empty() {
        print_suppressed(&merged.suppressed);
        println!();
    }
}

pub fn print_report(report: &RunReport) {
    for record in &report.actions {
        match &record.outcome {
            Outcome::Applied => println!("  {} {}", "✓".green(), record.action),
            Outcome::AlreadySatisfied => {
                println!("  {} {}", "=".dimmed(), record.action.to_string().dimmed())
            }
            Outcome::Failed(reason) => {
                println!("  {} {}: {}", "✗".red(), record.action, reason.red())
            }
        }
    }
    println!();

    let summary = format!(
        "{} applied, {} already satisfied, {} failed",
        report.applied_count(),
        report.satisfied_count(),
        report.failed().len()
    );
    if report.is_success() {
        println!("  {}", summary.green().bold());
    } else {
        println!("  {}", summary.red().bold());
    }

    if report.boot_image_regenerated() {
        println!();
        println!(
            "{}",
            "  Boot image rebuilt. Reboot for the new module options to take effect.".yellow()
        );
    }
}

/// Pretty-print any serializable value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
