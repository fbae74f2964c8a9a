//! `toolchain` - build a GCC cross-compiler toolchain for one target.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use cross_toolchain::config::{BuildRequest, CROSS_PREFIX_ENV};
use cross_toolchain::hardware::detect_cpu_model;
use cross_toolchain::orchestrator::{CommandRunner, DryRunRunner, Orchestrator, ProcessRunner};
use cross_toolchain::{resolve_build_config, AppError, LogCollector};

#[derive(Parser)]
#[command(
    name = "toolchain",
    version,
    about = "Build a binutils + GCC + GDB cross-compiler toolchain",
    after_help = "The install root is taken from CROSS_PREFIX (default /usr/local/cross); \
                  the toolchain lands in <CROSS_PREFIX>/<arch>."
)]
struct Cli {
    /// Target architecture (aarch64, amd64, arm32, armhf, ia32, ia64, mips32,
    /// mips32eb, mips64, ppc32, ppc64, sparc32, sparc64, lm32)
    #[arg(short, long)]
    arch: String,

    /// Install into the live prefix (yes) or stage into <base>/PKG (no)
    #[arg(short, long, value_parser = ["yes", "no"])]
    install: String,

    /// Parallel make jobs (default: number of CPUs)
    #[arg(short, long)]
    cores: Option<usize>,

    /// Also build the C++ front end
    #[arg(long)]
    enable_cxx: bool,

    /// JSON manifest overriding source versions, checksums and mirror
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Directory for tarballs, work trees and staging (default: current dir)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Leave the work directory in place, also after a failure
    #[arg(long)]
    keep_work_dir: bool,

    /// Skip the GMP/MPFR/MPC/isl header probes
    #[arg(long)]
    skip_preflight: bool,

    /// Print every command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Where run logs go (default: <base>/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Show debug output, including compiler output, on the terminal
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn request(&self) -> BuildRequest {
        BuildRequest {
            arch: self.arch.clone(),
            install: self.install.clone(),
            cores: self.cores,
            enable_cxx: self.enable_cxx,
            manifest: self.manifest.clone(),
            base_dir: self.base_dir.clone(),
            keep_work_dir: self.keep_work_dir,
            skip_preflight: self.skip_preflight,
            dry_run: self.dry_run,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

/// Resolve, log and build. `Ok(false)` means the build failed and the
/// failure has already been logged.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = resolve_build_config(&cli.request())
        .map_err(|e| anyhow::anyhow!(AppError::from(e).user_message()))?;

    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| config.base_dir.join("logs"));
    let console_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = LogCollector::install(&log_dir, console_level)
        .map_err(anyhow::Error::msg)
        .context("cannot start logging")?;

    log::debug!(
        "[Main] {} = {}",
        CROSS_PREFIX_ENV,
        config.cross_prefix.display()
    );
    log::info!("[Main] Logging to {}", logger.log_path().display());
    log::info!(
        "[Main] Host CPU: {} ({} make jobs)",
        detect_cpu_model(),
        config.cores
    );

    let runner: Arc<dyn CommandRunner> = if config.dry_run {
        Arc::new(DryRunRunner)
    } else {
        Arc::new(ProcessRunner)
    };

    let orchestrator = Orchestrator::new(config, runner);
    let succeeded = match orchestrator.run().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("{}", e.user_message());
            log::info!("[Main] Full log: {}", logger.log_path().display());
            false
        }
    };
    let _ = logger.wait_for_empty();

    Ok(succeeded)
}
