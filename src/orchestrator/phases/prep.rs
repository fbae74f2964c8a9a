//! Preflight: host prerequisite notice and library header probes.
//!
//! GCC needs GMP, MPFR, MPC and isl on the build host. Each probe compiles a
//! tiny translation unit with the host `cc`; a missing or too old header
//! stops the run before anything is downloaded.

use std::path::Path;

use crate::error::BuildError;
use crate::orchestrator::executor::{CommandRunner, CommandSpec};

/// Host prerequisites printed before the build starts
pub const DEPENDENCY_NOTICE: &str = "IMPORTANT NOTICE:

    For a successful compilation and use of the cross-compiler
    toolchain you need at least the following dependencies.

    Please make sure that the dependencies are present in your
    system. Otherwise the compilation process might fail after
    a few seconds or minutes.

    - SED, AWK, Flex, Bison, gzip, bzip2, Bourne Shell
    - gettext, zlib, Texinfo, libelf, libgomp
    - GNU Make, Coreutils, Sharutils, tar
    - GNU Multiple Precision Library (GMP)
    - MPFR
    - MPC
    - integer point manipulation library (isl)
    - native C and C++ compiler, assembler and linker
    - native C and C++ standard library with headers";

/// One compile-only check for a host library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderProbe {
    pub dependency: &'static str,
    pub header: &'static str,
    pub body: &'static str,
}

pub const HEADER_PROBES: [HeaderProbe; 4] = [
    HeaderProbe {
        dependency: "GMP",
        header: "<gmp.h>",
        body: r#"
#define GCC_GMP_VERSION_NUM(a, b, c) \
        (((a) << 16L) | ((b) << 8) | (c))

#define GCC_GMP_VERSION \
        GCC_GMP_VERSION_NUM(__GNU_MP_VERSION, __GNU_MP_VERSION_MINOR, __GNU_MP_VERSION_PATCHLEVEL)

#if GCC_GMP_VERSION < GCC_GMP_VERSION_NUM(4, 3, 2)
        choke me
#endif
"#,
    },
    HeaderProbe {
        dependency: "MPFR",
        header: "<mpfr.h>",
        body: r#"
#if MPFR_VERSION < MPFR_VERSION_NUM(2, 4, 2)
        choke me
#endif
"#,
    },
    HeaderProbe {
        dependency: "MPC",
        header: "<mpc.h>",
        body: r#"
#if MPC_VERSION < MPC_VERSION_NUM(0, 8, 1)
        choke me
#endif
"#,
    },
    HeaderProbe {
        dependency: "isl",
        header: "<isl/ctx.h>",
        body: "\n        isl_ctx_get_max_operations (isl_ctx_alloc ());\n",
    },
];

impl HeaderProbe {
    /// C source compiled for this probe
    pub fn source(&self) -> String {
        format!(
            "#include {}\n\nint main()\n{{\n{}\n    return 0;\n}}\n",
            self.header, self.body
        )
    }

    /// File stem used inside the scratch directory
    pub fn stem(&self) -> String {
        format!("probe_{}", self.dependency.to_lowercase())
    }
}

/// Log the host prerequisite notice.
pub fn show_dependencies() {
    log::info!("{}", DEPENDENCY_NOTICE);
}

/// Compile every header probe in `scratch_dir`.
pub async fn check_headers(runner: &dyn CommandRunner, scratch_dir: &Path) -> Result<(), BuildError> {
    for probe in HEADER_PROBES.iter() {
        check_header(runner, scratch_dir, probe).await?;
    }
    log::info!(target: "parsed", "Host headers for GMP, MPFR, MPC and isl found");
    Ok(())
}

async fn check_header(
    runner: &dyn CommandRunner,
    scratch_dir: &Path,
    probe: &HeaderProbe,
) -> Result<(), BuildError> {
    let stem = probe.stem();
    let source = scratch_dir.join(format!("{}.c", stem));
    let object = scratch_dir.join(format!("{}.o", stem));

    std::fs::write(&source, probe.source()).map_err(|e| {
        BuildError::PreflightFailed(format!("cannot write {}: {}", source.display(), e))
    })?;

    let spec = CommandSpec::new("cc", scratch_dir)
        .arg("-c")
        .arg("-o")
        .arg(object.display().to_string())
        .arg(source.display().to_string());

    if let Err(reason) = runner.run(&spec).await {
        log::error!("{} of {} not found", probe.header, probe.dependency);
        log::debug!("[Preflight] {}", reason);
        return Err(BuildError::PreflightFailed(format!(
            "{} of {} not found",
            probe.header, probe.dependency
        )));
    }

    let _ = std::fs::remove_file(&object);
    log::debug!("[Preflight] {} of {} found", probe.header, probe.dependency);
    Ok(())
}
