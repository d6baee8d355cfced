use clap::Parser;
use compliance_scanner::{
    analyzer::{
        coverage::parse_baseline, coverage_for_standard, display, fedramp_coverage, ComplianceAnalyzer,
        FsFileSource,
    },
    catalog::{build_registry, BaselineLevel, Control, ControlRegistry},
    cli::{Cli, Commands, LevelArg, OutputFormat},
    config::{self, Config},
};
use log::info;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// Exit status when `--fail-on` finds issues at or above the threshold.
const EXIT_THRESHOLD_EXCEEDED: i32 = 2;

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run() -> compliance_scanner::Result<i32> {
    let cli = Cli::parse();
    cli.init_logging();

    let config = config::load_config(cli.config.as_deref())?;
    let registry = load_registry(&cli, &config)?;

    match cli.command {
        Commands::Scan {
            paths,
            standards,
            level,
            include,
            exclude,
            max_file_size,
            threads,
            format,
            output,
            fail_on,
        } => {
            let mut config = config;
            if !standards.is_empty() {
                config.scan.standards = standards;
            }
            if let Some(level) = level {
                config.scan.fedramp_level = Some(level.into());
            }
            if !include.is_empty() {
                config.scan.include = include;
            }
            config.scan.exclude.extend(exclude);
            if let Some(size) = max_file_size {
                config.scan.max_file_size = size;
            }
            if let Some(threads) = threads {
                config.scan.worker_threads = threads;
            }
            if let Some(format) = format {
                config.output.format = format.into();
            }
            if let Some(threshold) = fail_on {
                config.output.fail_on = Some(threshold.into());
            }
            handle_scan(registry, &config, &paths, output)
        }
        Commands::Controls {
            standards,
            family,
            level,
            format,
        } => handle_controls(&registry, &standards, family.as_deref(), level, format),
        Commands::Standards { format } => handle_standards(&registry, format),
        Commands::Coverage {
            standard,
            level,
            baseline,
            format,
        } => handle_coverage(&registry, &standard, level, baseline.as_deref(), format),
    }
}

fn load_registry(cli: &Cli, config: &Config) -> compliance_scanner::Result<ControlRegistry> {
    let include_builtin = config.catalog.include_builtin && !cli.no_builtin;
    let strict = config.catalog.strict || cli.strict;

    let mut catalogs = config.catalog.extra_catalogs.clone();
    catalogs.extend(cli.catalogs.iter().cloned());

    // dropped checks are already logged by the loader
    let outcome = build_registry(include_builtin, &catalogs, strict)?;
    Ok(outcome.registry)
}

fn handle_scan(
    registry: ControlRegistry,
    config: &Config,
    paths: &[PathBuf],
    output: Option<PathBuf>,
) -> compliance_scanner::Result<i32> {
    let source = Arc::new(FsFileSource::new(config.scan.max_file_size));
    let analyzer = ComplianceAnalyzer::with_source(Arc::new(registry), source, config.scan.analyzer_config())?;

    let report = analyzer.scan_workspace(config.scan.standards.as_slice(), paths)?;

    let root = match paths {
        [single] if single.is_dir() => Some(single.as_path()),
        _ => None,
    };
    let output_string = match config.output.format {
        config::OutputFormat::Table => display::render_report(&report, root),
        config::OutputFormat::Json => report.to_json()?,
    };
    emit(&output_string, output.as_deref())?;

    if let Some(threshold) = config.output.fail_on {
        let failing = report.issues_at_or_above(threshold);
        if failing > 0 {
            info!("{} issues at or above {}", failing, threshold);
            return Ok(EXIT_THRESHOLD_EXCEEDED);
        }
    }
    Ok(0)
}

fn handle_controls(
    registry: &ControlRegistry,
    standards: &[String],
    family: Option<&str>,
    level: Option<LevelArg>,
    format: OutputFormat,
) -> compliance_scanner::Result<i32> {
    let controls: Vec<Arc<Control>> = if standards.is_empty() {
        registry.controls().to_vec()
    } else {
        registry.get_controls_for_standards(standards)
    };
    let controls: Vec<Arc<Control>> = controls
        .into_iter()
        .filter(|c| family.map_or(true, |f| c.family().eq_ignore_ascii_case(f)))
        .filter(|c| level.map_or(true, |l| c.in_baseline(BaselineLevel::from(l))))
        .collect();

    match format {
        OutputFormat::Table => {
            if controls.is_empty() {
                println!("No controls match the given filters.");
            } else {
                print!("{}", display::render_controls(&controls));
            }
        }
        OutputFormat::Json => {
            let plain: Vec<&Control> = controls.iter().map(|c| c.as_ref()).collect();
            println!("{}", serde_json::to_string_pretty(&plain)?);
        }
    }
    Ok(0)
}

fn handle_standards(registry: &ControlRegistry, format: OutputFormat) -> compliance_scanner::Result<i32> {
    let standards = registry.standards();
    match format {
        OutputFormat::Table => {
            let mut drawer = display::BoxDrawer::new("Standards");
            for standard in &standards {
                let count = registry.get_controls_for_standards(&[standard]).len();
                drawer.add_line(standard, &format!("{} controls", count));
            }
            println!("{}", drawer.draw());
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = standards
                .iter()
                .map(|standard| {
                    serde_json::json!({
                        "name": standard,
                        "controls": registry.control_ids(standard),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(0)
}

fn handle_coverage(
    registry: &ControlRegistry,
    standard: &str,
    level: LevelArg,
    baseline: Option<&Path>,
    format: OutputFormat,
) -> compliance_scanner::Result<i32> {
    let (title, coverage) = match baseline {
        Some(path) => {
            let required = parse_baseline(&std::fs::read_to_string(path)?);
            (
                format!("{} coverage of {}", standard, path.display()),
                coverage_for_standard(registry, standard, &required),
            )
        }
        None => {
            let level = BaselineLevel::from(level);
            (
                format!("FedRAMP {} baseline coverage", level.as_str()),
                fedramp_coverage(registry, level),
            )
        }
    };

    match format {
        OutputFormat::Table => println!("{}", display::render_coverage(&title, &coverage)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&coverage)?),
    }
    Ok(0)
}

fn emit(content: &str, output: Option<&Path>) -> compliance_scanner::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            println!("Report saved to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
