use crate::model::{AppRecord, LaunchSpec};
use crate::sources::Os;
use crate::sources::desktop::split_exec;
use log::{debug, info};
use std::env;
use std::ffi::OsString;
use std::path::Path;

/// One well-known utility offered when discovery finds nothing.
struct Utility {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    category: &'static str,
    keywords: &'static [&'static str],
    /// Linux candidates, tried in order on `PATH`.
    linux_candidates: &'static [&'static str],
    linux_default: &'static str,
    macos: &'static str,
    windows: &'static str,
}

const UTILITIES: [Utility; 4] = [
    Utility {
        id: "terminal",
        name: "Terminal",
        description: "Open system terminal",
        icon: "💻",
        category: "System",
        keywords: &["terminal", "console", "shell", "command"],
        linux_candidates: &["gnome-terminal", "konsole", "xfce4-terminal", "xterm"],
        linux_default: "xterm",
        macos: "open -a Terminal",
        windows: "cmd",
    },
    Utility {
        id: "file-manager",
        name: "File Manager",
        description: "Open file manager",
        icon: "📁",
        category: "System",
        keywords: &["files", "folder", "explorer", "finder"],
        linux_candidates: &["nautilus", "dolphin", "thunar", "pcmanfm"],
        linux_default: "nautilus",
        macos: "open -a Finder",
        windows: "explorer",
    },
    Utility {
        id: "calculator",
        name: "Calculator",
        description: "Open calculator",
        icon: "🧮",
        category: "Utilities",
        keywords: &["calculator", "calc", "math"],
        linux_candidates: &["gnome-calculator", "kcalc", "galculator", "qalculate-gtk"],
        linux_default: "gnome-calculator",
        macos: "open -a Calculator",
        windows: "calc",
    },
    Utility {
        id: "text-editor",
        name: "Text Editor",
        description: "Open text editor",
        icon: "📝",
        category: "Development",
        keywords: &["editor", "text", "notepad", "vim", "nano"],
        linux_candidates: &["gedit", "kate", "mousepad", "leafpad", "nano", "vim"],
        linux_default: "nano",
        macos: "open -a TextEdit",
        windows: "notepad",
    },
];

/// Synthesizes the default utilities for a host whose discovery came back empty.
pub struct Fallback {
    os: Os,
    search_path: Option<OsString>,
}

impl Fallback {
    pub fn new(os: Os, search_path: Option<OsString>) -> Self {
        Self { os, search_path }
    }

    /// Fallback for the running host, resolving commands against `$PATH`.
    pub fn for_host() -> Self {
        Self::new(Os::current(), env::var_os("PATH"))
    }

    pub fn provision(&self) -> Vec<AppRecord> {
        let records: Vec<AppRecord> = UTILITIES
            .iter()
            .filter_map(|utility| {
                let command = self.command_for(utility);
                if command.is_empty() {
                    debug!("Fallback: no command for {} on {}", utility.id, self.os);
                    return None;
                }
                let launch = LaunchSpec::from_words(split_exec(&command))?;

                let mut record = AppRecord::new(
                    utility.id.to_string(),
                    utility.name.to_string(),
                    command,
                    launch,
                );
                record.description = utility.description.to_string();
                record.icon = utility.icon.to_string();
                record.category = utility.category.to_string();
                record.keywords = utility.keywords.iter().map(|k| k.to_string()).collect();
                Some(record)
            })
            .collect();

        info!("Fallback: provisioned {} utilities", records.len());
        records
    }

    fn command_for(&self, utility: &Utility) -> String {
        match &self.os {
            Os::Linux => utility
                .linux_candidates
                .iter()
                .find(|candidate| self.resolves(candidate))
                .copied()
                .unwrap_or(utility.linux_default)
                .to_string(),
            Os::MacOs => utility.macos.to_string(),
            Os::Windows => utility.windows.to_string(),
            Os::Other(_) => String::new(),
        }
    }

    fn resolves(&self, command: &str) -> bool {
        self.search_path
            .as_ref()
            .map(|path| env::split_paths(path).any(|dir| is_executable(&dir.join(command))))
            .unwrap_or(false)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(records: &[AppRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[cfg(unix)]
    fn install(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn linux_prefers_first_resolvable_candidate() {
        let bin = tempfile::tempdir().unwrap();
        install(bin.path(), "konsole");
        install(bin.path(), "xterm");
        install(bin.path(), "vim");
        std::fs::write(bin.path().join("gedit"), "not executable").unwrap();

        let fallback = Fallback::new(Os::Linux, Some(bin.path().as_os_str().to_owned()));
        let records = fallback.provision();

        assert_eq!(ids(&records), vec!["terminal", "file-manager", "calculator", "text-editor"]);
        let commands: Vec<_> = records.iter().map(|r| r.launch_path.as_str()).collect();
        assert_eq!(commands, vec!["konsole", "nautilus", "gnome-calculator", "vim"]);
    }

    #[test]
    fn linux_without_path_uses_defaults() {
        let records = Fallback::new(Os::Linux, None).provision();
        let commands: Vec<_> = records.iter().map(|r| r.launch_path.as_str()).collect();
        assert_eq!(commands, vec!["xterm", "nautilus", "gnome-calculator", "nano"]);
    }

    #[test]
    fn macos_uses_open() {
        let records = Fallback::new(Os::MacOs, None).provision();
        assert_eq!(records[0].launch_path, "open -a Terminal");
        assert_eq!(
            records[0].launch,
            LaunchSpec::Command {
                program: "open".into(),
                args: vec!["-a".into(), "Terminal".into()],
            }
        );
        assert_eq!(records[3].keywords, vec!["editor", "text", "notepad", "vim", "nano"]);
    }

    #[test]
    fn unknown_os_omits_everything() {
        assert!(Fallback::new(Os::Other("haiku".into()), None).provision().is_empty());
    }
}
