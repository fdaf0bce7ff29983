use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use svbore::{EliminateConfig, PipeRegConfig, PipeRegEntry};

/// svbore - eliminate Cross-Module References from SystemVerilog
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input SystemVerilog files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for rewritten files
    #[arg(short, long, default_value = ".xmrEliminate")]
    output: PathBuf,

    /// Comma-separated source modules to process (default: all)
    #[arg(short, long)]
    modules: Option<String>,

    /// Top module (default: auto-detect)
    #[arg(short, long)]
    top: Option<String>,

    /// Pipeline register mode
    #[arg(long, value_enum, default_value = "none")]
    pipe_reg_mode: PipeRegModeArg,

    /// Stage count for global pipeline-register mode
    #[arg(long, default_value_t = 1)]
    pipe_reg_count: u32,

    /// Selective pipeline entries as module[:sig1,sig2]=count; repeatable
    #[arg(long)]
    pipe_reg_signals: Vec<String>,

    /// Clock signal name for pipeline registers
    #[arg(long, default_value = "clk")]
    clock: String,

    /// Reset signal name for pipeline registers
    #[arg(long, default_value = "rst_n")]
    reset: String,

    /// Treat the reset as active-high instead of active-low
    #[arg(long)]
    reset_active_high: bool,

    /// Re-compile the emitted files after the run
    #[arg(long)]
    check_output: bool,

    /// Include search directories
    #[arg(short = 'I', long = "include")]
    include_dirs: Vec<PathBuf>,

    /// System include search directories
    #[arg(long = "isystem")]
    system_include_dirs: Vec<PathBuf>,

    /// Preprocessor defines
    #[arg(short = 'D', long = "define")]
    defines: Vec<String>,

    /// Preprocessor undefines
    #[arg(short = 'U', long = "undef")]
    undefines: Vec<String>,

    /// Library search directories for missing modules
    #[arg(short = 'y', long = "libdir")]
    lib_dirs: Vec<PathBuf>,

    /// Library file extensions tried during search
    #[arg(long = "libext")]
    lib_exts: Vec<String>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PipeRegModeArg {
    None,
    Global,
    Permodule,
    Selective,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let modules: Vec<String> = cli
        .modules
        .as_deref()
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut config = EliminateConfig {
        modules: modules.clone(),
        top_module: cli.top.clone().unwrap_or_default(),
        clock_name: cli.clock.clone(),
        reset_name: cli.reset.clone(),
        reset_active_low: !cli.reset_active_high,
        check_output: cli.check_output,
        ..Default::default()
    };
    config.driver.include_dirs = cli.include_dirs.clone();
    config.driver.system_include_dirs = cli.system_include_dirs.clone();
    config.driver.defines = cli.defines.clone();
    config.driver.undefines = cli.undefines.clone();
    config.driver.lib_dirs = cli.lib_dirs.clone();
    config.driver.lib_exts = cli.lib_exts.clone();

    match cli.pipe_reg_mode {
        PipeRegModeArg::None => {}
        PipeRegModeArg::Global | PipeRegModeArg::Permodule => {
            if modules.is_empty() {
                bail!("pipeline registers need -m to name the source modules they apply to");
            }
            for module in &modules {
                let cfg = if cli.pipe_reg_mode == PipeRegModeArg::Global {
                    PipeRegConfig::global(cli.pipe_reg_count)
                } else {
                    PipeRegConfig::per_module()
                };
                config.pipe_regs.insert(module.clone(), cfg);
            }
        }
        PipeRegModeArg::Selective => {
            for spec in &cli.pipe_reg_signals {
                let (module, entry) = parse_selective_entry(spec)?;
                config
                    .pipe_regs
                    .entry(module)
                    .or_insert_with(|| PipeRegConfig::selective(Vec::new()))
                    .entries
                    .push(entry);
            }
            if config.pipe_regs.is_empty() {
                bail!("selective mode needs at least one --pipe-reg-signals entry");
            }
        }
    }

    let result = svbore::xmr_eliminate(&cli.inputs, &config, Some(&cli.output));
    print!("{}", result.summary());

    Ok(result.success())
}

/// Parse `module[:sig1,sig2]=count` into a selective pipeline entry
fn parse_selective_entry(spec: &str) -> Result<(String, PipeRegEntry)> {
    let Some((head, count)) = spec.rsplit_once('=') else {
        bail!("invalid --pipe-reg-signals entry '{}': missing '=count'", spec);
    };
    let reg_count: u32 = count
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid stage count in '{}'", spec))?;
    let (module, signals) = match head.split_once(':') {
        Some((module, list)) => (
            module.trim().to_string(),
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        None => (head.trim().to_string(), Vec::new()),
    };
    if module.is_empty() {
        bail!("invalid --pipe-reg-signals entry '{}': missing module", spec);
    }
    Ok((module, PipeRegEntry { reg_count, signals }))
}
