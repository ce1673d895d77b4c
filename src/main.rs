use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use git_versioner::calculator::{CalculatorOptions, VersionCalculator};
use git_versioner::config::{load_config, GitVersionConfig, VersioningMode};
use git_versioner::git::Git2Repository;
use git_versioner::logging::{self, LogFormat};
use git_versioner::ui::{self, OutputFormat};

#[derive(clap::Parser)]
#[command(
    name = "git-versioner",
    version,
    about = "Derive semantic versions from git history, tags and branch conventions"
)]
struct Args {
    #[arg(help = "Path inside the repository to version", default_value = ".")]
    path: PathBuf,

    #[arg(short, long, help = "Version this branch instead of the checked-out one")]
    branch: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Print only this variable")]
    show_variable: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, help = "Output format")]
    output: OutputFormat,

    #[arg(long, help = "Neither read nor write the version cache")]
    no_cache: bool,

    #[arg(long, value_name = "VERSION", help = "Override the next-version setting")]
    next_version: Option<String>,

    #[arg(long, value_enum, help = "Override the versioning mode")]
    mode: Option<VersioningMode>,

    #[arg(long, value_name = "PATTERN", help = "Override the tag prefix pattern")]
    tag_prefix: Option<String>,

    #[arg(short, long, help = "Log pipeline decisions to stderr")]
    verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, help = "Log format")]
    log_format: LogFormat,
}

impl Args {
    fn overrides(&self) -> GitVersionConfig {
        GitVersionConfig {
            next_version: self.next_version.clone(),
            mode: self.mode,
            tag_prefix: self.tag_prefix.clone(),
            ..GitVersionConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose, args.log_format);

    let repo = Git2Repository::open(&args.path)
        .with_context(|| format!("Failed to open git repository at {}", args.path.display()))?;

    let config = load_config(args.config.as_deref(), repo.workdir())
        .context("Failed to load configuration")?;

    let options = CalculatorOptions {
        branch: args.branch.clone(),
        no_cache: args.no_cache,
        overrides: args.overrides(),
    };
    let calculator = VersionCalculator::with_options(&repo, config, options)
        .context("Invalid configuration")?;

    let result = match calculator.calculate() {
        Ok(result) => result,
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    ui::display_diagnostics(&result.diagnostics);

    match ui::render(&result.variables, args.output, args.show_variable.as_deref())? {
        Ok(rendered) => {
            if args.output == OutputFormat::Text && args.show_variable.is_none() {
                ui::display_summary(&result);
            }
            println!("{}", rendered);
        }
        Err(diagnostic) => {
            ui::display_diagnostics(&[diagnostic]);
            std::process::exit(1);
        }
    }

    Ok(())
}
