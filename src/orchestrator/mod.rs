//! Build Orchestration: the staged toolchain pipeline
//! (Preflight -> Fetch -> Prepare -> Unpack -> Binutils -> GCC -> GDB -> Cleanup).
//!
//! Stages run strictly one after another and every external command is awaited
//! before the next is issued. The first failure aborts the run; the work
//! directory guard then removes partial build trees.

pub mod executor;
pub mod phases;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use executor::{CommandRunner, CommandSpec, DryRunRunner, ProcessRunner};
pub use state::{PipelineStage, PipelineState};

use crate::error::{BuildError, Result};
use crate::models::{BuildConfig, Component};
use crate::system::{cleanup_dir, create_dir, BuildPaths, WorkDirGuard};
use crate::toolchain::{ensure_tarball, unpack_tarball};

/// Drives one toolchain build for one architecture.
pub struct Orchestrator {
    config: Arc<BuildConfig>,

    paths: BuildPaths,

    /// Executes every external command of the pipeline
    runner: Arc<dyn CommandRunner>,

    /// Shared mutable state protected by RwLock
    state: Arc<RwLock<PipelineState>>,

    /// `PATH` of the invoking process, extended for child commands
    inherited_path: String,
}

impl Orchestrator {
    /// Create an orchestrator in the Preflight stage.
    pub fn new(config: BuildConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let paths = BuildPaths::new(&config);
        Orchestrator {
            config: Arc::new(config),
            paths,
            runner,
            state: Arc::new(RwLock::new(PipelineState::new())),
            inherited_path: std::env::var("PATH").unwrap_or_default(),
        }
    }

    /// Replace the inherited `PATH` handed to child commands.
    pub fn with_inherited_path(mut self, path: impl Into<String>) -> Self {
        self.inherited_path = path.into();
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    pub async fn current_stage(&self) -> PipelineStage {
        self.state.read().await.stage
    }

    pub async fn current_progress(&self) -> u32 {
        self.state.read().await.progress
    }

    pub async fn state_snapshot(&self) -> PipelineState {
        self.state.read().await.clone()
    }

    /// Move to `next`, logging the new stage.
    pub async fn transition(&self, next: PipelineStage) -> Result<()> {
        let mut state = self.state.write().await;
        state.transition_to(next)?;
        log::info!(
            "[Orchestrator] Stage: {} ({}%)",
            next.as_str(),
            state.progress
        );
        Ok(())
    }

    async fn record_error(&self, error: String) {
        self.state.write().await.record_error(error);
    }

    /// Filesystem and network side effects are only logged.
    fn is_dry(&self) -> bool {
        self.config.dry_run || !self.runner.executes()
    }

    fn tool_path(&self) -> String {
        self.paths.tool_path(&self.inherited_path)
    }

    /// Dependency notice, then the host header probes.
    pub async fn preflight(&self) -> Result<()> {
        phases::show_dependencies();

        if self.config.skip_preflight {
            log::warn!("[Preflight] Header probes skipped (--skip-preflight)");
            return Ok(());
        }
        if self.is_dry() {
            log::info!("[DRY-RUN] Would probe host headers for GMP, MPFR, MPC and isl");
            return Ok(());
        }

        let scratch = tempfile::Builder::new()
            .prefix("toolchain-probe")
            .tempdir()
            .map_err(|e| BuildError::PreflightFailed(format!("cannot create scratch dir: {}", e)))?;
        phases::check_headers(self.runner.as_ref(), scratch.path()).await?;
        Ok(())
    }

    /// Make sure every source tarball is present in the base directory.
    ///
    /// Returns the tarball paths in build order.
    pub async fn fetch(&self) -> Result<Vec<PathBuf>> {
        let mut tarballs = Vec::with_capacity(Component::ORDER.len());
        if !self.is_dry() {
            create_dir(&self.paths.base_dir)?;
        }
        for package in self.config.manifest.packages() {
            if self.is_dry() {
                log::info!("[DRY-RUN] Would fetch {} (md5 {})", package.url, package.md5);
                tarballs.push(self.paths.base_dir.join(package.tarball()));
                continue;
            }
            tarballs.push(ensure_tarball(&package, &self.paths.base_dir).await?);
        }
        Ok(tarballs)
    }

    /// Clear leftovers of a previous run and create fresh build directories.
    ///
    /// The live prefix is only touched when installing. The returned guard owns
    /// the work directory until [`Orchestrator::cleanup`] disarms it.
    pub async fn prepare(&self) -> Result<WorkDirGuard> {
        let live = self.config.install_mode.is_live();
        let mut guard = WorkDirGuard::new(self.paths.work_dir.clone(), self.config.keep_work_dir);

        if self.is_dry() {
            if live {
                log::info!("[DRY-RUN] rm -rf {}", self.paths.prefix.display());
                log::info!("[DRY-RUN] mkdir -p {}", self.paths.prefix.display());
            }
            log::info!("[DRY-RUN] rm -rf {}", self.paths.work_dir.display());
            log::info!("[DRY-RUN] mkdir -p {}", self.paths.obj_dir.display());
            guard.disarm();
            return Ok(guard);
        }

        let prepare_err = |what: &str, path: &std::path::Path, e: std::io::Error| {
            BuildError::PreparationFailed(format!("cannot {} {}: {}", what, path.display(), e))
        };

        if live {
            cleanup_dir(&self.paths.prefix)
                .map_err(|e| prepare_err("remove", &self.paths.prefix, e))?;
            create_dir(&self.paths.prefix)
                .map_err(|e| prepare_err("create", &self.paths.prefix, e))?;
        }

        cleanup_dir(&self.paths.work_dir)
            .map_err(|e| prepare_err("remove", &self.paths.work_dir, e))?;
        create_dir(&self.paths.work_dir)
            .map_err(|e| prepare_err("create", &self.paths.work_dir, e))?;
        create_dir(&self.paths.obj_dir)
            .map_err(|e| prepare_err("create", &self.paths.obj_dir, e))?;

        Ok(guard)
    }

    pub async fn unpack(&self, tarballs: &[PathBuf]) -> Result<()> {
        for tarball in tarballs {
            log::info!(">>> Extracting {}", tarball.display());
            unpack_tarball(self.runner.as_ref(), tarball, &self.paths.work_dir).await?;
        }
        Ok(())
    }

    /// Configure, compile and install one component.
    pub async fn build_component(&self, component: Component) -> Result<()> {
        let tool_path = self.tool_path();
        let steps = phases::component_steps(component, &self.config, &self.paths, &tool_path);

        for (step, spec) in steps {
            log::info!(target: "parsed", ">>> Starting {} {}", component, step);
            self.state.write().await.record_command();
            self.runner
                .run(&spec)
                .await
                .map_err(|reason| BuildError::StepFailed {
                    component,
                    step,
                    reason,
                })?;
        }
        Ok(())
    }

    /// Remove the work directory, unless it is kept for inspection.
    pub async fn cleanup(&self, guard: &mut WorkDirGuard) -> Result<()> {
        guard.disarm();

        if self.config.keep_work_dir {
            log::info!("[Cleanup] Keeping work directory {}", guard.path().display());
            return Ok(());
        }
        if self.is_dry() {
            log::info!("[DRY-RUN] rm -rf {}", guard.path().display());
            return Ok(());
        }

        log::info!(">>> Cleaning up {}", guard.path().display());
        cleanup_dir(guard.path()).map_err(|e| {
            BuildError::PreparationFailed(format!(
                "cannot remove {}: {}",
                guard.path().display(),
                e
            ))
        })?;
        Ok(())
    }

    /// Execute the full pipeline.
    pub async fn run(&self) -> Result<()> {
        log::info!(
            target: "parsed",
            "Building {} cross-compiler ({}) with {} jobs, languages {}",
            self.config.arch,
            self.config.arch.triple(),
            self.config.cores,
            self.config.languages()
        );
        log::info!("[Orchestrator] Install prefix: {}", self.paths.prefix.display());
        if !self.config.install_mode.is_live() {
            log::info!("[Orchestrator] Staging into: {}", self.paths.staging_dir.display());
        }

        let result = self.run_stages().await;
        if let Err(e) = &result {
            self.record_error(e.to_string()).await;
        }
        result
    }

    async fn run_stages(&self) -> Result<()> {
        self.preflight().await?;

        self.transition(PipelineStage::Fetch).await?;
        let tarballs = self.fetch().await?;

        self.transition(PipelineStage::Prepare).await?;
        let mut guard = self.prepare().await?;

        self.transition(PipelineStage::Unpack).await?;
        self.unpack(&tarballs).await?;

        for component in Component::ORDER {
            self.transition(PipelineStage::for_component(component)).await?;
            self.build_component(component).await?;
        }

        self.transition(PipelineStage::Cleanup).await?;
        self.cleanup(&mut guard).await?;

        self.transition(PipelineStage::Completed).await?;
        let elapsed = self
            .state
            .read()
            .await
            .start_time
            .elapsed()
            .unwrap_or_default();
        log::info!(
            target: "parsed",
            ">>> Cross-compiler for {} is now {} ({}s).",
            self.config.arch,
            self.config.install_mode,
            elapsed.as_secs()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Architecture, InstallMode};
    use crate::toolchain::sources::ToolchainManifest;
    use tempfile::TempDir;

    fn dry_config(base: &std::path::Path) -> BuildConfig {
        BuildConfig {
            arch: Architecture::Aarch64,
            install_mode: InstallMode::Live,
            cores: 2,
            enable_cxx: false,
            cross_prefix: base.join("cross"),
            base_dir: base.to_path_buf(),
            manifest: ToolchainManifest::default(),
            keep_work_dir: false,
            skip_preflight: false,
            dry_run: true,
        }
    }

    #[tokio::test]
    async fn test_new_orchestrator_starts_in_preflight() {
        let dir = TempDir::new().unwrap();
        let orch = Orchestrator::new(dry_config(dir.path()), Arc::new(DryRunRunner));
        assert_eq!(orch.current_stage().await, PipelineStage::Preflight);
        assert_eq!(orch.current_progress().await, 0);
        assert_eq!(orch.paths().prefix, dir.path().join("cross").join("aarch64"));
    }

    #[tokio::test]
    async fn test_dry_run_completes_without_touching_disk() {
        let dir = TempDir::new().unwrap();
        let orch = Orchestrator::new(dry_config(dir.path()), Arc::new(DryRunRunner));
        orch.run().await.unwrap();

        let snapshot = orch.state_snapshot().await;
        assert_eq!(snapshot.stage, PipelineStage::Completed);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.commands_run, 9);
        assert!(!dir.path().join("aarch64").exists());
        assert!(!dir.path().join("cross").exists());
    }

    #[tokio::test]
    async fn test_out_of_order_transition_is_rejected() {
        let dir = TempDir::new().unwrap();
        let orch = Orchestrator::new(dry_config(dir.path()), Arc::new(DryRunRunner));
        assert!(orch.transition(PipelineStage::Gcc).await.is_err());
        orch.transition(PipelineStage::Fetch).await.unwrap();
        assert_eq!(orch.current_stage().await, PipelineStage::Fetch);
    }
}
