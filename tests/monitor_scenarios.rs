//! End-to-end monitor scenarios driven through the public API with fake
//! processes.

use cpupulse::config::{Config, ConfigStore, FileConfigStore, MemoryConfigStore};
use cpupulse::error::EnumerationError;
use cpupulse::test_utils::{FakeProcess, FakeSource};
use cpupulse::{AffinityMitigator, MonitorLoop, MonitorState, ShutdownToken};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fast_monitor(source: FakeSource, store: Arc<dyn ConfigStore>) -> MonitorLoop<FakeSource> {
    MonitorLoop::new(source, store)
        .with_mitigator(AffinityMitigator::new().with_dwell(Duration::from_millis(20)))
}

fn memory_store(name: &str, interval_secs: u64) -> Arc<MemoryConfigStore> {
    Arc::new(MemoryConfigStore::with_config(Config {
        process_name: name.to_string(),
        interval_secs,
        autostart: false,
    }))
}

#[test]
fn target_absent_then_started_is_picked_up_next_cycle() {
    let source = FakeSource::new(vec![]);
    let mut monitor = fast_monitor(source.clone(), memory_store("game.exe", 60));
    let token = ShutdownToken::new();

    let report = monitor.run_cycle(&token);
    assert_eq!(report.matched, 0);

    let game = FakeProcess::new(100, "game.exe", &[0, 1, 2, 3]);
    source.set_entries(vec![Ok(game.clone())]);
    let report = monitor.run_cycle(&token);

    assert_eq!(report.mitigated, 1);
    let history = game.history();
    assert_eq!(history[0].len(), 3);
    assert_eq!(history[1].units(), &[0, 1, 2, 3]);
}

#[test]
fn restarted_target_is_reacquired_by_pid() {
    let first = FakeProcess::new(100, "game.exe", &[0, 1]);
    let source = FakeSource::new(vec![Ok(first.clone())]);
    let mut monitor = fast_monitor(source.clone(), memory_store("game.exe", 60));
    let token = ShutdownToken::new();

    monitor.run_cycle(&token);

    let restarted = FakeProcess::new(200, "game.exe", &[0, 1]);
    source.set_entries(vec![Ok(restarted.clone())]);
    monitor.run_cycle(&token);

    assert_eq!(first.history().len(), 2);
    assert_eq!(restarted.history().len(), 2);
}

#[test]
fn exit_between_narrow_and_restore_does_not_stop_the_loop() {
    let dying = FakeProcess::new(1, "game.exe", &[0, 1, 2]).exit_after_sets(1);
    let source = FakeSource::new(vec![
        Err(EnumerationError::Unnamed { pid: 0 }),
        Ok(dying.clone()),
    ]);
    let monitor = fast_monitor(source.clone(), memory_store("game.exe", 1));
    let token = ShutdownToken::new();
    let loop_token = token.clone();

    let worker = std::thread::spawn(move || monitor.run(&loop_token));
    std::thread::sleep(Duration::from_millis(1400));
    token.cancel();
    let summary = worker.join().unwrap();

    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.failed, 2);
    assert!(dying.has_exited());
}

#[test]
fn shutdown_is_prompt_even_with_long_interval() {
    let monitor = fast_monitor(FakeSource::new(vec![]), memory_store("game.exe", 3600));
    let token = ShutdownToken::new();
    let loop_token = token.clone();

    let worker = std::thread::spawn(move || monitor.run(&loop_token));
    std::thread::sleep(Duration::from_millis(200));
    let cancelled_at = Instant::now();
    token.cancel();
    let summary = worker.join().unwrap();

    assert!(cancelled_at.elapsed() < Duration::from_millis(500));
    assert_eq!(summary.cycles, 1);
}

#[test]
fn file_store_edits_apply_without_restart() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(FileConfigStore::at(temp_dir.path().join("config.toml")));
    store
        .save(&Config {
            process_name: "a.exe".to_string(),
            interval_secs: 60,
            autostart: false,
        })
        .unwrap();

    let a = FakeProcess::new(1, "a.exe", &[0, 1]);
    let b = FakeProcess::new(2, "b.exe", &[0, 1]);
    let source = FakeSource::new(vec![Ok(a.clone()), Ok(b.clone())]);
    let mut monitor = fast_monitor(source, store.clone());
    let token = ShutdownToken::new();

    monitor.run_cycle(&token);
    store
        .save(&Config {
            process_name: "b.exe".to_string(),
            interval_secs: 60,
            autostart: false,
        })
        .unwrap();
    monitor.run_cycle(&token);

    assert_eq!(a.history().len(), 2);
    assert_eq!(b.history().len(), 2);
    assert_eq!(monitor.state(), MonitorState::Idle);
}

#[test]
fn corrupt_config_file_falls_back_to_defaults() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "\u{0}\u{1}garbage = = =").unwrap();
    let store = Arc::new(FileConfigStore::at(&path));

    let default_target = FakeProcess::new(1, cpupulse::config::DEFAULT_PROCESS_NAME, &[0, 1]);
    let source = FakeSource::new(vec![Ok(default_target.clone())]);
    let mut monitor = fast_monitor(source, store);

    let report = monitor.run_cycle(&ShutdownToken::new());

    assert_eq!(report.mitigated, 1);
    assert_eq!(default_target.current().units(), &[0, 1]);
}
