//! Start-at-logon registration.
//!
//! Each platform gets a small adapter behind [`AutostartRegistrar`]:
//!
//! - Linux: an XDG autostart `.desktop` entry in `~/.config/autostart/`
//! - Windows: a value under `HKCU\Software\Microsoft\Windows\CurrentVersion\Run`,
//!   managed through `reg.exe`
//! - Anything else: unsupported
//!
//! A missing entry is always a normal "not registered" answer, never an error.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use crate::error::RegistrarError;

/// Identifier used for the autostart entry.
pub const APP_ID: &str = "cpupulse";

pub trait AutostartRegistrar {
    fn register(&self, app_id: &str, launch_command: &str) -> Result<(), RegistrarError>;

    fn is_registered(&self, app_id: &str) -> bool;

    /// Removes the entry. Succeeds if there was nothing to remove.
    fn unregister(&self, app_id: &str) -> Result<(), RegistrarError>;
}

/// Registers or unregisters so that the OS state matches `enabled`.
pub fn sync_autostart(
    registrar: &dyn AutostartRegistrar,
    app_id: &str,
    enabled: bool,
    launch_command: &str,
) -> Result<(), RegistrarError> {
    if enabled {
        registrar.register(app_id, launch_command)?;
        log::info!("Added to startup.");
    } else if registrar.is_registered(app_id) {
        registrar.unregister(app_id)?;
        log::info!("Removed from startup.");
    }
    Ok(())
}

/// The command line used to start monitoring at logon.
pub fn launch_command() -> Result<String, RegistrarError> {
    let exe = std::env::current_exe()?;
    let exe = exe.to_string_lossy();
    if exe.contains(' ') {
        Ok(format!("\"{}\" run", exe))
    } else {
        Ok(format!("{} run", exe))
    }
}

/// The registrar for the platform this binary was built for.
pub fn platform_registrar() -> Box<dyn AutostartRegistrar> {
    if cfg!(windows) {
        return Box::new(RegistryAutostart);
    }
    if cfg!(target_os = "linux") {
        if let Some(autostart) = XdgAutostart::new() {
            return Box::new(autostart);
        }
    }
    Box::new(UnsupportedAutostart)
}

fn access_error(e: io::Error) -> RegistrarError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        RegistrarError::AccessDenied(e.to_string())
    } else {
        RegistrarError::Io(e)
    }
}

// ============================================================================
// XDG autostart (Linux desktops)
// ============================================================================

/// XDG autostart entries, one `<app_id>.desktop` file per application.
#[derive(Debug, Clone)]
pub struct XdgAutostart {
    dir: PathBuf,
}

impl XdgAutostart {
    /// Uses `$XDG_CONFIG_HOME/autostart` (usually `~/.config/autostart`).
    pub fn new() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::at(dir.join("autostart")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, app_id: &str) -> PathBuf {
        self.dir.join(format!("{}.desktop", app_id))
    }
}

fn desktop_entry(app_id: &str, launch_command: &str) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={}\n\
         Comment=Periodically pulse the CPU affinity of a target process\n\
         Exec={}\n\
         Terminal=false\n\
         NoDisplay=true\n\
         X-GNOME-Autostart-enabled=true\n",
        app_id, launch_command
    )
}

impl AutostartRegistrar for XdgAutostart {
    fn register(&self, app_id: &str, launch_command: &str) -> Result<(), RegistrarError> {
        fs::create_dir_all(&self.dir).map_err(access_error)?;
        fs::write(self.entry_path(app_id), desktop_entry(app_id, launch_command))
            .map_err(access_error)
    }

    fn is_registered(&self, app_id: &str) -> bool {
        self.entry_path(app_id).is_file()
    }

    fn unregister(&self, app_id: &str) -> Result<(), RegistrarError> {
        match fs::remove_file(self.entry_path(app_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(access_error(e)),
        }
    }
}

// ============================================================================
// Windows Run key
// ============================================================================

const RUN_KEY_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

/// `Run` key entries, driven through `reg.exe`.
///
/// `is_registered` looks in both the per-user and the machine-wide key;
/// registration only ever touches the per-user one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryAutostart;

fn run_key(hive: &str) -> String {
    format!(r"{}\{}", hive, RUN_KEY_PATH)
}

fn reg_add_args(app_id: &str, launch_command: &str) -> Vec<String> {
    vec![
        "add".to_string(),
        run_key("HKCU"),
        "/v".to_string(),
        app_id.to_string(),
        "/t".to_string(),
        "REG_SZ".to_string(),
        "/d".to_string(),
        launch_command.to_string(),
        "/f".to_string(),
    ]
}

fn reg_query_args(hive: &str, app_id: &str) -> Vec<String> {
    vec![
        "query".to_string(),
        run_key(hive),
        "/v".to_string(),
        app_id.to_string(),
    ]
}

fn reg_delete_args(app_id: &str) -> Vec<String> {
    vec![
        "delete".to_string(),
        run_key("HKCU"),
        "/v".to_string(),
        app_id.to_string(),
        "/f".to_string(),
    ]
}

fn is_access_denied(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains("access is denied")
}

fn run_reg(args: &[String]) -> Result<(), RegistrarError> {
    let output = Command::new("reg").args(args).output()?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if is_access_denied(&stderr) {
        Err(RegistrarError::AccessDenied(stderr))
    } else {
        Err(RegistrarError::CommandFailed(stderr))
    }
}

/// Runs `delete` if `query` found the value.
///
/// A failed query (value missing) means nothing to remove; any other
/// error, such as access denied, is returned.
fn delete_if_present(
    query: Result<(), RegistrarError>,
    delete: impl FnOnce() -> Result<(), RegistrarError>,
) -> Result<(), RegistrarError> {
    match query {
        Ok(()) => delete(),
        Err(RegistrarError::CommandFailed(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

impl AutostartRegistrar for RegistryAutostart {
    fn register(&self, app_id: &str, launch_command: &str) -> Result<(), RegistrarError> {
        run_reg(&reg_add_args(app_id, launch_command))
    }

    fn is_registered(&self, app_id: &str) -> bool {
        for hive in ["HKCU", "HKLM"] {
            match run_reg(&reg_query_args(hive, app_id)) {
                Ok(()) => return true,
                Err(RegistrarError::AccessDenied(msg)) => {
                    log::warn!("Access denied reading {}: {}", run_key(hive), msg);
                }
                // A missing value makes `reg query` fail; that just means no
                Err(_) => {}
            }
        }
        false
    }

    fn unregister(&self, app_id: &str) -> Result<(), RegistrarError> {
        delete_if_present(run_reg(&reg_query_args("HKCU", app_id)), || {
            run_reg(&reg_delete_args(app_id))
        })
    }
}

// ============================================================================
// Unsupported platforms
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedAutostart;

impl AutostartRegistrar for UnsupportedAutostart {
    fn register(&self, _app_id: &str, _launch_command: &str) -> Result<(), RegistrarError> {
        Err(RegistrarError::Unsupported)
    }

    fn is_registered(&self, _app_id: &str) -> bool {
        false
    }

    fn unregister(&self, _app_id: &str) -> Result<(), RegistrarError> {
        Ok(())
    }
}
