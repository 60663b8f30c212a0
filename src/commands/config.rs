//! Config command handler.
//!
//! Displays, modifies, and resets cpupulse configuration. Every change goes
//! through [`apply_config`], which saves the new values and then brings the
//! autostart registration in line with the `autostart` flag.

use clap::Subcommand;

use crate::autostart::{launch_command, platform_registrar, sync_autostart, AutostartRegistrar, APP_ID};
use crate::config::{validate_config, Config, ConfigStore, FileConfigStore};
use crate::error::Result;
use crate::output::{print_config, print_success, print_warning};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigSubcommand {
    /// Set a configuration value
    #[command(after_help = "VALID KEYS:
    process_name    - Exact image name of the target process (string)
    interval_secs   - Seconds between mitigation cycles (1 to 604800)
    autostart       - Start cpupulse at logon (true/false)")]
    Set {
        /// The configuration key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Reset configuration to default values
    Reset,
}

/// Validate, save, then sync autostart.
///
/// The save happens first: if registration then fails, the stored config is
/// kept and the registrar error is returned so the caller can report it.
pub fn apply_config(
    store: &dyn ConfigStore,
    registrar: &dyn AutostartRegistrar,
    config: &Config,
    launch_command: &str,
) -> Result<()> {
    validate_config(config)?;
    store.save(config)?;
    log::info!(
        "Settings changed: process_name={} interval_secs={} autostart={}",
        config.process_name,
        config.interval_secs,
        config.autostart
    );
    sync_autostart(registrar, APP_ID, config.autostart, launch_command)?;
    Ok(())
}

/// Display the current configuration.
pub fn config_display_command() -> Result<()> {
    let store = FileConfigStore::new()?;
    print_config(&store.load(), Some(store.path()));
    Ok(())
}

/// Set a single configuration value.
pub fn config_set_command(key: &str, value: &str) -> Result<()> {
    let store = FileConfigStore::new()?;
    let mut config = store.load();
    config.set_value(key, value)?;

    apply_and_report(&store, &config)?;
    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Reset configuration to defaults.
pub fn config_reset_command() -> Result<()> {
    let store = FileConfigStore::new()?;
    apply_and_report(&store, &Config::default())?;
    print_success("Configuration reset to defaults");
    Ok(())
}

fn apply_and_report(store: &FileConfigStore, config: &Config) -> Result<()> {
    let registrar = platform_registrar();
    let command = match launch_command() {
        Ok(command) => command,
        Err(e) if !config.autostart => {
            // Only needed for registering
            log::debug!("Could not resolve launch command: {}", e);
            String::new()
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = apply_config(store, registrar.as_ref(), config, &command) {
        if matches!(e, crate::error::CpuPulseError::Registrar(_)) {
            print_warning("Settings were saved, but autostart could not be updated");
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autostart::XdgAutostart;
    use crate::config::MemoryConfigStore;
    use crate::error::{CpuPulseError, RegistrarError};
    use tempfile::TempDir;

    struct DenyingRegistrar;

    impl AutostartRegistrar for DenyingRegistrar {
        fn register(&self, _: &str, _: &str) -> std::result::Result<(), RegistrarError> {
            Err(RegistrarError::AccessDenied("Access is denied.".to_string()))
        }

        fn is_registered(&self, _: &str) -> bool {
            false
        }

        fn unregister(&self, _: &str) -> std::result::Result<(), RegistrarError> {
            Ok(())
        }
    }

    fn config(name: &str, interval_secs: u64, autostart: bool) -> Config {
        Config {
            process_name: name.to_string(),
            interval_secs,
            autostart,
        }
    }

    #[test]
    fn test_apply_config_saves_and_registers() {
        let temp_dir = TempDir::new().unwrap();
        let registrar = XdgAutostart::at(temp_dir.path());
        let store = MemoryConfigStore::new();
        let new_config = config("game.exe", 120, true);

        apply_config(&store, &registrar, &new_config, "cpupulse run").unwrap();

        assert_eq!(store.load(), new_config);
        assert!(registrar.is_registered(APP_ID));
    }

    #[test]
    fn test_apply_config_unregisters_when_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let registrar = XdgAutostart::at(temp_dir.path());
        registrar.register(APP_ID, "cpupulse run").unwrap();
        let store = MemoryConfigStore::new();

        apply_config(&store, &registrar, &config("game.exe", 60, false), "").unwrap();

        assert!(!registrar.is_registered(APP_ID));
    }

    #[test]
    fn test_apply_config_rejects_invalid_without_saving() {
        let temp_dir = TempDir::new().unwrap();
        let registrar = XdgAutostart::at(temp_dir.path());
        let store = MemoryConfigStore::new();

        let err = apply_config(&store, &registrar, &config("", 60, true), "x").unwrap_err();

        assert!(matches!(err, CpuPulseError::Config(_)));
        assert_eq!(store.load(), Config::default());
        assert!(!registrar.is_registered(APP_ID));
    }

    #[test]
    fn test_apply_config_keeps_saved_config_when_registration_fails() {
        let store = MemoryConfigStore::new();
        let new_config = config("game.exe", 60, true);

        let err = apply_config(&store, &DenyingRegistrar, &new_config, "x").unwrap_err();

        assert!(matches!(
            err,
            CpuPulseError::Registrar(RegistrarError::AccessDenied(_))
        ));
        assert_eq!(store.load(), new_config);
    }

    #[test]
    fn test_apply_config_with_file_store_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let registrar = XdgAutostart::at(temp_dir.path().join("autostart"));
        let store = FileConfigStore::at(temp_dir.path().join("config.toml"));
        let new_config = config("RainbowSix.exe", 600, false);

        apply_config(&store, &registrar, &new_config, "").unwrap();

        assert_eq!(FileConfigStore::at(store.path()).load(), new_config);
    }
}
