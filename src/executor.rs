use crate::error::CatalogError;
use crate::model::{AppRecord, LaunchSpec};
use crate::sources::Os;
use crate::sources::desktop::split_exec;
use log::{debug, info};
use std::process::{Command, Stdio};
use std::thread;

/// Starts a catalog record. Implementations must not wait for the child to exit.
pub trait Launcher: Send + Sync {
    fn launch(&self, record: &AppRecord) -> Result<(), CatalogError>;
}

/// Spawns real processes the way the host OS expects.
pub struct SystemLauncher {
    os: Os,
}

impl SystemLauncher {
    pub fn new(os: Os) -> Self {
        Self { os }
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, record: &AppRecord) -> Result<(), CatalogError> {
        let mut command = build_command(&self.os, record)?;
        let display = describe(&command);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);

        debug!("Executor: spawning {}", display);
        let mut child = command.spawn().map_err(|source| CatalogError::Spawn {
            command: display.clone(),
            source,
        })?;
        info!("Executor: launched {} ({}) as pid {}", record.id, display, child.id());

        // Reap the child so it does not linger as a zombie.
        thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Turns a record's launch spec into the command the host would run.
pub fn build_command(os: &Os, record: &AppRecord) -> Result<Command, CatalogError> {
    match &record.launch {
        LaunchSpec::Command { program, args } => {
            if program.is_empty() {
                return Err(CatalogError::EmptyCommand(record.id.clone()));
            }
            // Console programs get their own window instead of reading the null stdin.
            let mut command = match os {
                Os::Windows => {
                    let mut command = Command::new("cmd");
                    command.args(["/c", "start", "", program]);
                    command
                }
                _ => Command::new(program),
            };
            command.args(args);
            Ok(command)
        }
        LaunchSpec::Open(path) => {
            let mut command = match os {
                Os::Linux => Command::new("xdg-open"),
                Os::MacOs => Command::new("open"),
                Os::Windows => {
                    let mut command = Command::new("cmd");
                    command.args(["/c", "start", ""]);
                    command
                }
                Os::Other(name) => return Err(CatalogError::UnsupportedOs(name.clone())),
            };
            command.arg(path);
            Ok(command)
        }
    }
}

fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Moves the child into its own process group so signals sent to ours leave it running.
#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

/// Runs a command line to completion and returns stdout followed by stderr. Errors are
/// reported in the text, prefixed with `Error:`.
pub fn run_captured(command_line: &str) -> String {
    if command_line.trim().is_empty() {
        return "Error: Empty command".to_string();
    }
    let words = split_exec(command_line);
    let Some((program, args)) = words.split_first() else {
        return "Error: Invalid command".to_string();
    };

    debug!("Executor: running {:?}", command_line);
    let output = match Command::new(program).args(args).stdin(Stdio::null()).output() {
        Ok(output) => output,
        Err(e) => return format!("Error: {}\n", e),
    };
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    if output.status.success() {
        text
    } else {
        format!("Error: {}\n{}", output.status, text)
    }
}
