//! Tarball extraction through the host `tar`.
//!
//! GNU tar refuses members whose names contain `..` and strips leading `/`,
//! so archives cannot write outside the destination directory.

use std::path::Path;

use crate::error::BuildError;
use crate::orchestrator::executor::{CommandRunner, CommandSpec};

/// `tar -xf <tarball> -C <dest> --no-same-owner`
pub fn unpack_command(tarball: &Path, dest: &Path) -> CommandSpec {
    CommandSpec::new("tar", dest)
        .arg("-xf")
        .arg(tarball.display().to_string())
        .arg("-C")
        .arg(dest.display().to_string())
        .arg("--no-same-owner")
}

/// Extract `tarball` into `dest`.
pub async fn unpack_tarball(
    runner: &dyn CommandRunner,
    tarball: &Path,
    dest: &Path,
) -> Result<(), BuildError> {
    let spec = unpack_command(tarball, dest);
    runner
        .run(&spec)
        .await
        .map_err(|reason| BuildError::UnpackFailed {
            tarball: tarball.display().to_string(),
            reason,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::executor::ProcessRunner;
    use tempfile::TempDir;

    #[test]
    fn test_unpack_command_shape() {
        let spec = unpack_command(Path::new("/b/gcc-14.1.0.tar.xz"), Path::new("/b/armhf"));
        assert_eq!(spec.program, "tar");
        assert_eq!(
            spec.to_string(),
            "tar -xf /b/gcc-14.1.0.tar.xz -C /b/armhf --no-same-owner"
        );
        assert_eq!(spec.cwd, Path::new("/b/armhf"));
    }

    #[tokio::test]
    async fn test_unpack_real_tarball() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("gdb-14.2")).unwrap();
        std::fs::write(src.join("gdb-14.2/configure"), "#!/bin/sh\n").unwrap();

        let tarball = tmp.path().join("gdb-14.2.tar");
        let status = std::process::Command::new("tar")
            .arg("-cf")
            .arg(&tarball)
            .arg("-C")
            .arg(&src)
            .arg("gdb-14.2")
            .status()
            .unwrap();
        assert!(status.success());

        let dest = tmp.path().join("work");
        std::fs::create_dir_all(&dest).unwrap();
        unpack_tarball(&ProcessRunner, &tarball, &dest).await.unwrap();
        assert!(dest.join("gdb-14.2/configure").is_file());
    }

    #[tokio::test]
    async fn test_unpack_missing_tarball_fails() {
        let tmp = TempDir::new().unwrap();
        let err = unpack_tarball(&ProcessRunner, &tmp.path().join("absent.tar.xz"), tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::UnpackFailed { .. }));
    }
}
