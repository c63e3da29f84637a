use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use gfxprep::apply::HostSnapshot;
use gfxprep::cli::{Cli, Command};
use gfxprep::config::GfxprepConfig;
use gfxprep::detect::HardwareFacts;
use gfxprep::error::Error;
use gfxprep::host::{CommandBootImage, Dnf, Host, RootFs, SysfsInspector, Systemctl};
use gfxprep::plan::{Plan, build_plan};

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("GFXPREP_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if let Command::Completions { shell } = cli.command {
        gfxprep::cli::print_completions(shell);
        return Ok(());
    }

    let config = gfxprep::config::load(cli.config.as_ref());

    match cli.command {
        Command::Detect => cmd_detect(&config, cli.json)?,
        Command::Plan => cmd_plan(&config, cli.json)?,
        Command::Apply { dry_run, yes } => cmd_apply(&config, cli.json, dry_run, yes)?,
        Command::Completions { .. } => {}
    }

    Ok(())
}

fn probe(packages: &Dnf) -> Result<HardwareFacts> {
    let inspector = SysfsInspector::new(RootFs::system());
    HardwareFacts::probe(&inspector, packages).context("hardware detection failed")
}

fn plan_for_this_machine(config: &GfxprepConfig, packages: &Dnf) -> Result<Plan> {
    let facts = probe(packages)?;
    tracing::debug!(?facts, "probed hardware");
    Ok(build_plan(facts, config)?)
}

fn cmd_detect(config: &GfxprepConfig, json: bool) -> Result<()> {
    let facts = probe(&Dnf::new(false))?;
    let class = gfxprep::classify::classify(&facts, &config.vendor.token);

    if json {
        gfxprep::output::print_json(&serde_json::json!({
            "facts": facts,
            "class": class,
            "advisory": class.advisory(),
        }))?;
        return Ok(());
    }

    gfxprep::output::print_hardware_summary(&facts, &class);
    Ok(())
}

fn cmd_plan(config: &GfxprepConfig, json: bool) -> Result<()> {
    let plan = plan_for_this_machine(config, &Dnf::new(false))?;

    if json {
        gfxprep::output::print_json(&plan)?;
        return Ok(());
    }

    gfxprep::output::print_hardware_summary(&plan.facts, &plan.class);
    gfxprep::output::print_plan(&plan);

    if !plan.is_empty() {
        println!(
            "  Run {} to see what would change, or {} to apply.",
            "gfxprep apply --dry-run".cyan(),
            "sudo gfxprep apply".cyan()
        );
    }
    Ok(())
}

fn confirm() -> Result<bool> {
    println!("{}", "This will apply the changes listed above.".bold());
    print!("Continue? [y/N] ");
    std::io::Write::flush(&mut std::io::stdout())?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn cmd_apply(config: &GfxprepConfig, json: bool, dry_run: bool, yes: bool) -> Result<()> {
    let mut packages = Dnf::new(!json);
    let plan = plan_for_this_machine(config, &packages)?;

    if json && dry_run {
        gfxprep::output::print_json(&plan)?;
        return Ok(());
    }
    if !json {
        gfxprep::output::print_hardware_summary(&plan.facts, &plan.class);
        gfxprep::output::print_plan(&plan);
    }

    if dry_run {
        println!("{}", "Dry run complete. No changes applied.".yellow());
        return Ok(());
    }

    if plan.is_empty() {
        if json {
            gfxprep::output::print_json(&plan.into_report(Vec::new()))?;
        }
        return Ok(());
    }

    if !nix::unistd::geteuid().is_root() {
        return Err(Error::NotRoot {
            operation: "apply".to_string(),
        }
        .into());
    }

    if !yes && !confirm()? {
        println!("Aborted.");
        return Ok(());
    }

    if !json {
        println!();
        println!("{}", "Applying configuration...".bold());
    }

    let mut fs = RootFs::system();
    let mut services = Systemctl;
    let mut boot = CommandBootImage::new(config.boot.command.clone());
    let mut host = Host {
        packages: &mut packages,
        services: &mut services,
        fs: &mut fs,
        boot: &mut boot,
    };

    let snapshot = HostSnapshot::capture(&plan.merged, &host);
    let records = gfxprep::apply::apply(&plan.merged, &snapshot, &mut host);
    let report = plan.into_report(records);

    if json {
        gfxprep::output::print_json(&report)?;
    } else {
        gfxprep::output::print_report(&report);
    }

    if !report.is_success() {
        anyhow::bail!("{} action(s) failed", report.failed().len());
    }
    Ok(())
}
