//! Component build steps: configure, compile, install.
//!
//! Pure command construction. The orchestrator runs the returned specs in
//! order and stops at the first failure.

use crate::models::{BuildConfig, BuildStep, Component};
use crate::orchestrator::executor::CommandSpec;
use crate::system::BuildPaths;

/// Environment shared by every component step after binutils is configured.
const NO_WERROR_CFLAGS: &str = "-Wno-error";

fn common_configure_args(config: &BuildConfig, paths: &BuildPaths) -> Vec<String> {
    let triple = config.arch.triple();
    vec![
        format!("--target={}", triple),
        format!("--prefix={}", paths.prefix.display()),
        format!("--program-prefix={}-", triple),
    ]
}

fn configure_args(component: Component, config: &BuildConfig, paths: &BuildPaths) -> Vec<String> {
    let mut args = common_configure_args(config, paths);
    match component {
        Component::Binutils => {
            args.extend(["--disable-nls", "--disable-werror"].map(String::from));
        }
        Component::Gcc => {
            args.extend(
                [
                    "--with-gnu-as",
                    "--with-gnu-ld",
                    "--disable-nls",
                    "--disable-threads",
                ]
                .map(String::from),
            );
            args.push(format!("--enable-languages={}", config.languages()));
            args.extend(
                [
                    "--disable-multilib",
                    "--disable-libgcj",
                    "--without-headers",
                    "--disable-shared",
                    "--enable-lto",
                    "--disable-werror",
                ]
                .map(String::from),
            );
            args.extend(config.arch.extra_gcc_flags().iter().map(|f| f.to_string()));
        }
        Component::Gdb => {
            args.push("--enable-werror=no".to_string());
        }
    }
    args
}

/// `make` targets for the compile and install steps
fn make_targets(component: Component) -> (&'static str, &'static str) {
    match component {
        Component::Gcc => ("all-gcc", "install-gcc"),
        Component::Binutils | Component::Gdb => ("all", "install"),
    }
}

/// Ordered steps for one component.
///
/// `tool_path` is the `PATH` every step runs with.
pub fn component_steps(
    component: Component,
    config: &BuildConfig,
    paths: &BuildPaths,
    tool_path: &str,
) -> Vec<(BuildStep, CommandSpec)> {
    let source_dir = paths.source_dir(config, component);

    // GCC must be configured out of tree
    let (build_dir, configure_program) = match component {
        Component::Gcc => (
            paths.obj_dir.clone(),
            source_dir.join("configure").display().to_string(),
        ),
        Component::Binutils | Component::Gdb => (source_dir.clone(), "./configure".to_string()),
    };

    let with_env = |spec: CommandSpec, step: BuildStep| {
        let spec = spec.env("PATH", tool_path);
        if component == Component::Binutils && step == BuildStep::Configure {
            spec
        } else {
            spec.env("CFLAGS", NO_WERROR_CFLAGS)
        }
    };

    let configure = CommandSpec::new(configure_program, &build_dir)
        .args(configure_args(component, config, paths));

    let (all_target, install_target) = make_targets(component);
    let compile = CommandSpec::new("make", &build_dir)
        .arg("-j")
        .arg(config.cores.to_string())
        .arg(all_target);

    let mut install = CommandSpec::new("make", &build_dir).arg(install_target);
    if !config.install_mode.is_live() {
        install = install.arg(format!("DESTDIR={}", paths.staging_dir.display()));
    }

    vec![
        (BuildStep::Configure, with_env(configure, BuildStep::Configure)),
        (BuildStep::Compile, with_env(compile, BuildStep::Compile)),
        (BuildStep::Install, with_env(install, BuildStep::Install)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Architecture, InstallMode};
    use crate::toolchain::sources::ToolchainManifest;
    use std::path::PathBuf;

    fn config(arch: Architecture, install_mode: InstallMode, enable_cxx: bool) -> BuildConfig {
        BuildConfig {
            arch,
            install_mode,
            cores: 6,
            enable_cxx,
            cross_prefix: PathBuf::from("/usr/local/cross"),
            base_dir: PathBuf::from("/build"),
            manifest: ToolchainManifest::default(),
            keep_work_dir: false,
            skip_preflight: true,
            dry_run: false,
        }
    }

    fn steps(component: Component, cfg: &BuildConfig) -> Vec<(BuildStep, CommandSpec)> {
        component_steps(component, cfg, &BuildPaths::new(cfg), "/usr/bin")
    }

    #[test]
    fn test_binutils_steps() {
        let cfg = config(Architecture::Aarch64, InstallMode::Live, false);
        let steps = steps(Component::Binutils, &cfg);
        let kinds: Vec<_> = steps.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![BuildStep::Configure, BuildStep::Compile, BuildStep::Install]
        );

        let (_, configure) = &steps[0];
        assert_eq!(configure.program, "./configure");
        assert_eq!(configure.cwd, PathBuf::from("/build/aarch64/binutils-2.42"));
        assert_eq!(
            configure.args,
            vec![
                "--target=aarch64-linux-gnu",
                "--prefix=/usr/local/cross/aarch64",
                "--program-prefix=aarch64-linux-gnu-",
                "--disable-nls",
                "--disable-werror",
            ]
        );
        assert_eq!(configure.env_value("CFLAGS"), None);

        let (_, compile) = &steps[1];
        assert_eq!(compile.to_string(), "make -j 6 all");
        assert_eq!(compile.env_value("CFLAGS"), Some("-Wno-error"));

        let (_, install) = &steps[2];
        assert_eq!(install.to_string(), "make install");
    }

    #[test]
    fn test_gcc_configures_out_of_tree() {
        let cfg = config(Architecture::Ppc64, InstallMode::Live, false);
        let steps = steps(Component::Gcc, &cfg);
        let (_, configure) = &steps[0];
        assert_eq!(configure.program, "/build/ppc64/gcc-14.1.0/configure");
        assert_eq!(configure.cwd, PathBuf::from("/build/ppc64/gcc-obj"));
        assert!(configure.has_arg("--without-headers"));
        assert!(configure.has_arg("--enable-lto"));
        assert_eq!(steps[1].1.to_string(), "make -j 6 all-gcc");
        assert_eq!(steps[2].1.to_string(), "make install-gcc");
    }

    #[test]
    fn test_languages_follow_cxx_flag() {
        let c_only = config(Architecture::Amd64, InstallMode::Live, false);
        assert!(steps(Component::Gcc, &c_only)[0].1.has_arg("--enable-languages=c"));

        let with_cxx = config(Architecture::Amd64, InstallMode::Live, true);
        let gcc_steps = steps(Component::Gcc, &with_cxx);
        let configure = &gcc_steps[0].1;
        assert!(configure.has_arg("--enable-languages=c,c++"));
        assert!(!configure.has_arg("--enable-languages=c"));
    }

    #[test]
    fn test_staging_install_uses_destdir() {
        for component in Component::ORDER {
            let cfg = config(Architecture::Mips64, InstallMode::Staging, false);
            let (_, install) = steps(component, &cfg).pop().unwrap();
            assert!(install.has_arg("DESTDIR=/build/PKG"), "{}", install);
        }
    }

    #[test]
    fn test_live_install_has_no_destdir() {
        for component in Component::ORDER {
            let cfg = config(Architecture::Mips64, InstallMode::Live, false);
            let (_, install) = steps(component, &cfg).pop().unwrap();
            assert!(!install.args.iter().any(|a| a.starts_with("DESTDIR=")));
        }
    }

    #[test]
    fn test_armhf_gets_hard_float() {
        let cfg = config(Architecture::Armhf, InstallMode::Live, false);
        assert!(steps(Component::Gcc, &cfg)[0].1.has_arg("--with-float=hard"));
        let cfg = config(Architecture::Arm32, InstallMode::Live, false);
        assert!(!steps(Component::Gcc, &cfg)[0].1.has_arg("--with-float=hard"));
    }

    #[test]
    fn test_gdb_configure() {
        let cfg = config(Architecture::Sparc64, InstallMode::Live, false);
        let gdb_steps = steps(Component::Gdb, &cfg);
        let configure = &gdb_steps[0].1;
        assert_eq!(configure.cwd, PathBuf::from("/build/sparc64/gdb-14.2"));
        assert!(configure.has_arg("--enable-werror=no"));
        assert!(configure.has_arg("--program-prefix=sparc64-linux-gnu-"));
    }

    #[test]
    fn test_every_step_carries_tool_path() {
        let cfg = config(Architecture::Lm32, InstallMode::Staging, false);
        for component in Component::ORDER {
            for (_, spec) in steps(component, &cfg) {
                assert_eq!(spec.env_value("PATH"), Some("/usr/bin"));
            }
        }
    }
}
