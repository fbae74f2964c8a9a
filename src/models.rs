//! Core data types for the cross toolchain builder.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::toolchain::sources::ToolchainManifest;

/// Special handling a target needs beyond its triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformQuirk {
    None,
    /// ARM EABI with hardware floating point calling convention
    HardFloat,
    /// Bare-metal ELF target without an operating system
    BareMetal,
}

/// Read-only record describing one supported target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub id: &'static str,
    pub triple: &'static str,
    pub quirk: PlatformQuirk,
}

/// Supported target architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    Aarch64,
    Amd64,
    Arm32,
    Armhf,
    Ia32,
    Ia64,
    Mips32,
    Mips32eb,
    Mips64,
    Ppc32,
    Ppc64,
    Sparc32,
    Sparc64,
    Lm32,
}

impl Architecture {
    /// Every supported architecture, in the order shown to users.
    pub const ALL: [Architecture; 14] = [
        Architecture::Aarch64,
        Architecture::Amd64,
        Architecture::Arm32,
        Architecture::Armhf,
        Architecture::Ia32,
        Architecture::Ia64,
        Architecture::Mips32,
        Architecture::Mips32eb,
        Architecture::Mips64,
        Architecture::Ppc32,
        Architecture::Ppc64,
        Architecture::Sparc32,
        Architecture::Sparc64,
        Architecture::Lm32,
    ];

    pub const fn descriptor(&self) -> PlatformDescriptor {
        let (id, triple, quirk) = match self {
            Architecture::Aarch64 => ("aarch64", "aarch64-linux-gnu", PlatformQuirk::None),
            Architecture::Amd64 => ("amd64", "amd64-linux-gnu", PlatformQuirk::None),
            Architecture::Arm32 => ("arm32", "arm-linux-gnueabi", PlatformQuirk::None),
            Architecture::Armhf => ("armhf", "arm-linux-gnueabihf", PlatformQuirk::HardFloat),
            Architecture::Ia32 => ("ia32", "i686-pc-linux-gnu", PlatformQuirk::None),
            Architecture::Ia64 => ("ia64", "ia64-pc-linux-gnu", PlatformQuirk::None),
            Architecture::Mips32 => ("mips32", "mipsel-linux-gnu", PlatformQuirk::None),
            Architecture::Mips32eb => ("mips32eb", "mips-linux-gnu", PlatformQuirk::None),
            Architecture::Mips64 => ("mips64", "mips64el-linux-gnu", PlatformQuirk::None),
            Architecture::Ppc32 => ("ppc32", "ppc-linux-gnu", PlatformQuirk::None),
            Architecture::Ppc64 => ("ppc64", "ppc64-linux-gnu", PlatformQuirk::None),
            Architecture::Sparc32 => ("sparc32", "sparc-leon3-linux-gnu", PlatformQuirk::None),
            Architecture::Sparc64 => ("sparc64", "sparc64-linux-gnu", PlatformQuirk::None),
            Architecture::Lm32 => ("lm32", "lm32-elf", PlatformQuirk::BareMetal),
        };
        PlatformDescriptor { id, triple, quirk }
    }

    /// Short identifier accepted by `--arch`
    pub const fn id(&self) -> &'static str {
        self.descriptor().id
    }

    /// GNU target triple passed as `--target`
    pub const fn triple(&self) -> &'static str {
        self.descriptor().triple
    }

    pub const fn quirk(&self) -> PlatformQuirk {
        self.descriptor().quirk
    }

    /// Extra flags for GCC's configure step.
    pub fn extra_gcc_flags(&self) -> &'static [&'static str] {
        match self.quirk() {
            PlatformQuirk::HardFloat => &["--with-float=hard"],
            PlatformQuirk::BareMetal | PlatformQuirk::None => &[],
        }
    }

    /// Comma-separated list of identifiers for help and error text.
    pub fn supported_ids() -> String {
        Architecture::ALL
            .iter()
            .map(|a| a.id())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Architecture {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Architecture::ALL
            .iter()
            .copied()
            .find(|a| a.id() == wanted)
            .ok_or_else(|| {
                ConfigError::UnknownArchitecture(s.to_string(), Architecture::supported_ids())
            })
    }
}

/// Where `make install` puts the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Install straight into the live prefix (`--install yes`)
    Live,
    /// Copy into the staging directory via DESTDIR (`--install no`)
    Staging,
}

impl InstallMode {
    pub fn is_live(&self) -> bool {
        matches!(self, InstallMode::Live)
    }
}

impl FromStr for InstallMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" => Ok(InstallMode::Live),
            "no" => Ok(InstallMode::Staging),
            _ => Err(ConfigError::InvalidInstallMode(s.to_string())),
        }
    }
}

impl fmt::Display for InstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallMode::Live => write!(f, "installed"),
            InstallMode::Staging => write!(f, "built"),
        }
    }
}

/// Toolchain components, declared in build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Binutils,
    Gcc,
    Gdb,
}

impl Component {
    /// Fixed dependency order of the pipeline.
    pub const ORDER: [Component; 3] = [Component::Binutils, Component::Gcc, Component::Gdb];

    pub const fn name(&self) -> &'static str {
        match self {
            Component::Binutils => "binutils",
            Component::Gcc => "gcc",
            Component::Gdb => "gdb",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The three external steps every component goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Configure,
    Compile,
    Install,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Configure => write!(f, "configuration"),
            BuildStep::Compile => write!(f, "compilation"),
            BuildStep::Install => write!(f, "installation"),
        }
    }
}

/// Fully resolved build request.
///
/// Produced by `config::resolve_build_config` from CLI input and the
/// environment; read-only once the pipeline starts.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub arch: Architecture,
    pub install_mode: InstallMode,
    /// Parallel jobs handed to `make -j`
    pub cores: usize,
    /// Build the C++ front end alongside C
    pub enable_cxx: bool,
    /// Root under which `<arch>/` is installed (CROSS_PREFIX)
    pub cross_prefix: PathBuf,
    /// Directory holding tarballs, work directories and the staging tree
    pub base_dir: PathBuf,
    pub manifest: ToolchainManifest,
    pub keep_work_dir: bool,
    pub skip_preflight: bool,
    pub dry_run: bool,
}

impl BuildConfig {
    /// Value for GCC's `--enable-languages`
    pub fn languages(&self) -> &'static str {
        if self.enable_cxx {
            "c,c++"
        } else {
            "c"
        }
    }
}
