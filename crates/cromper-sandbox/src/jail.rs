//! nsjail argument construction.

use std::path::{Path, PathBuf};

use cromper_core::config::{PathsConfig, SandboxConfig};

/// Host directories exposed read-only inside the jail (skipped when absent).
const SYSTEM_MOUNTS: &[&str] = &[
    "/bin",
    "/dev",
    "/etc/alternatives",
    "/etc/fonts",
    "/etc/passwd",
    "/lib",
    "/lib32",
    "/lib64",
    "/usr",
];

pub const JAIL_PATH: &str = "/usr/bin:/bin";

/// Soft rlimits keep the toolchain inside the nsjail defaults for file size
/// and descriptor count instead of the hard maximum.
const RLIMITS: &[(&str, &str)] = &[("--rlimit_fsize", "soft"), ("--rlimit_nofile", "soft")];

/// Everything needed to build one wrapped command line.
pub struct JailSpec<'a> {
    pub config: &'a SandboxConfig,
    pub paths: &'a PathsConfig,
    /// Host scratch dir, mounted read-write on /tmp
    pub scratch: &'a Path,
    /// Writable temp dir for the Windows-compatibility layer
    pub wine_scratch: &'a Path,
    pub uid: u32,
    pub extra_mounts: &'a [PathBuf],
    /// Variable names only; values come from the real environment
    pub env_names: &'a [String],
}

impl JailSpec<'_> {
    pub fn build(&self) -> Vec<String> {
        let cfg = self.config;
        let scratch = self.scratch.display();
        let mut args = vec![
            cfg.nsjail_bin.to_string_lossy().to_string(),
            "--mode".to_string(),
            "o".to_string(),
            "--chroot".to_string(),
            cfg.chroot_path.to_string_lossy().to_string(),
            "--bindmount".to_string(),
            format!("{}:/tmp", scratch),
            "--bindmount".to_string(),
            format!("{}:/run/user/{}", scratch, self.uid),
        ];

        for dir in SYSTEM_MOUNTS {
            if Path::new(dir).exists() {
                args.push("--bindmount_ro".to_string());
                args.push((*dir).to_string());
            }
        }

        for base in [&self.paths.compiler_base, &self.paths.library_base] {
            args.push("--bindmount_ro".to_string());
            args.push(base.to_string_lossy().to_string());
        }

        if cfg.disable_proc {
            args.push("--disable_proc".to_string());
        } else {
            args.push("--proc_rw".to_string());
        }

        args.push("--bindmount_ro".to_string());
        args.push(cfg.wine_prefix.to_string_lossy().to_string());
        args.push("--bindmount".to_string());
        args.push(format!(
            "{}:{}",
            self.wine_scratch.display(),
            cfg.wine_prefix.join("drive_c/windows/temp").display()
        ));

        args.push("--env".to_string());
        args.push(format!("PATH={}", JAIL_PATH));
        args.push("--env".to_string());
        args.push(format!("WINEPREFIX={}", cfg.wine_prefix.display()));
        args.push("--cwd".to_string());
        args.push("/tmp".to_string());

        for (flag, value) in RLIMITS {
            args.push((*flag).to_string());
            args.push((*value).to_string());
        }
        args.push("--quiet".to_string());

        for mount in self.extra_mounts {
            args.push("--bindmount_ro".to_string());
            args.push(mount.to_string_lossy().to_string());
        }
        for name in self.env_names {
            args.push("--env".to_string());
            args.push(name.clone());
        }

        args.push("--".to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jail_args_shape() {
        let config = SandboxConfig {
            use_jail: true,
            disable_proc: true,
            ..SandboxConfig::unjailed()
        };
        let paths = PathsConfig {
            compiler_base: PathBuf::from("/srv/compilers"),
            library_base: PathBuf::from("/srv/libraries"),
        };
        let env = vec!["INPUT".to_string()];
        let mounts = vec![PathBuf::from("/opt/extra")];
        let spec = JailSpec {
            config: &config,
            paths: &paths,
            scratch: Path::new("/sandbox/tmp/abc"),
            wine_scratch: Path::new("/sandbox/tmp/abc/.wine-tmp"),
            uid: 1000,
            extra_mounts: &mounts,
            env_names: &env,
        };
        let args = spec.build();
        assert_eq!(args[0], "/bin/nsjail");
        assert_eq!(args.last().map(String::as_str), Some("--"));
        let joined = args.join(" ");
        assert!(joined.contains("--mode o"));
        assert!(joined.contains("--chroot /sandbox/root"));
        assert!(joined.contains("--bindmount /sandbox/tmp/abc:/tmp"));
        assert!(joined.contains("/sandbox/tmp/abc:/run/user/1000"));
        assert!(joined.contains("--bindmount_ro /srv/compilers"));
        assert!(joined.contains("--bindmount_ro /opt/extra"));
        assert!(joined.contains("--disable_proc"));
        assert!(joined.contains("--env INPUT"));
        assert!(joined.contains("--rlimit_nofile soft"));
    }
}
