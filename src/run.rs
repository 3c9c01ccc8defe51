//! One instrumented process launch: privilege elevation, CPU pinning,
//! counter attachment, full capture of both streams.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

use thiserror::Error;

/// The five hardware events attached to every run, all under one domain.
pub const COUNTER_EVENTS: [&str; 5] = [
    "cache-references",
    "cache-misses",
    "cycles",
    "instructions",
    "branches",
];

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {status}")]
    Exit { command: String, status: ExitStatus },
}

/// Captured output of one run. perf writes its report to stderr, the
/// application writes its survey line to stdout. Both are bounded in size,
/// so full capture is fine.
#[derive(Debug)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Launches executables under `[sudo] taskset -c <cpus> perf stat`.
///
/// Counter readings are only meaningful with exclusive use of the pinned
/// cores, so there is exactly one child process alive at a time and no retry:
/// a failed trial is surfaced to the caller, which decides whether to go on.
#[derive(Debug, Clone)]
pub struct Executor {
    /// CPU list for `taskset -c`, e.g. `0-7`.
    pub cpu_list: String,
    /// perf event domain, e.g. `cpu_core` on hybrid CPUs.
    pub domain: String,
    /// Wrap the whole command in `sudo` (counter access usually needs it).
    pub sudo: bool,
}

impl Executor {
    pub fn new(cpu_list: &str, domain: &str, sudo: bool) -> Self {
        Self {
            cpu_list: cpu_list.to_owned(),
            domain: domain.to_owned(),
            sudo,
        }
    }

    /// `-e` argument: `cpu_core/cache-references/,cpu_core/cache-misses/,...`
    fn event_list(&self) -> String {
        COUNTER_EVENTS
            .iter()
            .map(|e| format!("{}/{}/", self.domain, e))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Run one trial to completion and capture both streams.
    pub fn run(&self, exe: &Path, args: &[String]) -> Result<RunOutput, RunError> {
        let command = exe.display().to_string();
        let events = self.event_list();

        let mut argv: Vec<&str> = Vec::with_capacity(9 + args.len());
        if self.sudo {
            argv.push("sudo");
        }
        argv.extend([
            "taskset",
            "-c",
            self.cpu_list.as_str(),
            "perf",
            "stat",
            "-e",
            events.as_str(),
        ]);
        argv.push(command.as_str());
        argv.extend(args.iter().map(String::as_str));

        let out = Command::new(argv[0])
            .args(&argv[1..])
            .output()
            .map_err(|source| RunError::Launch {
                command: command.clone(),
                source,
            })?;

        if !out.status.success() {
            return Err(RunError::Exit {
                command,
                status: out.status,
            });
        }

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_list_is_domain_qualified() {
        let ex = Executor::new("0-7", "cpu_core", true);
        assert_eq!(
            ex.event_list(),
            "cpu_core/cache-references/,cpu_core/cache-misses/,cpu_core/cycles/,\
             cpu_core/instructions/,cpu_core/branches/"
        );
    }

    #[test]
    fn launch_failure_is_surfaced_not_panicked() {
        let ex = Executor::new("0", "cpu_core", false);
        // taskset exists but the target executable does not, so taskset
        // itself exits non-zero.
        let err = ex
            .run(Path::new("/nonexistent/bench"), &["1".into()])
            .unwrap_err();
        match err {
            RunError::Exit { command, .. } | RunError::Launch { command, .. } => {
                assert_eq!(command, "/nonexistent/bench")
            }
        }
    }
}
