//! End-to-end tests for the ClipSwap service against an in-memory scene

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tempfile::{tempdir, TempDir};

use clipswap_core::{AudioClip, ClipHandle, ObjectGraph, SceneGraph};
use clipswap_services::{
    ClipSwap, ClipSwapConfig, GuardianState, LoadErrorKind, OverrideSpec, Service, ServiceState,
    DEFAULT_COORDINATOR_NAME,
};

fn clip(name: &str) -> ClipHandle {
    AudioClip::new(name, 1, 22050, vec![0.0; 16]).into_handle()
}

fn write_wav(path: &Path, samples: &[i16]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn setup_with(config: ClipSwapConfig) -> (Arc<Mutex<SceneGraph>>, ClipSwap) {
    let scene = Arc::new(Mutex::new(SceneGraph::new()));
    let clipswap = ClipSwap::new(config, scene.clone());
    (scene, clipswap)
}

/// Service with a data root that is removed when the `TempDir` drops
fn setup() -> (TempDir, Arc<Mutex<SceneGraph>>, ClipSwap) {
    let dir = tempdir().unwrap();
    let (scene, clipswap) = setup_with(ClipSwapConfig::default().with_data_root(dir.path()));
    (dir, scene, clipswap)
}

#[test]
fn test_override_round_trip() {
    let (_dir, _scene, clipswap) = setup();
    let creak = clip("creak");

    assert!(clipswap.add("doorOpen", Some(creak.clone())));
    let found = clipswap.lookup("doorOpen").unwrap();
    assert!(Arc::ptr_eq(&found, &creak));

    assert!(clipswap.remove("doorOpen"));
    assert!(clipswap.lookup("doorOpen").is_none());
    assert!(!clipswap.remove("doorOpen"));
}

#[test]
fn test_first_override_wins() {
    let (_dir, _scene, clipswap) = setup();
    let first = clip("first");

    assert!(clipswap.add("doorOpen", Some(first.clone())));
    assert!(!clipswap.add("doorOpen", Some(clip("second"))));

    let found = clipswap.lookup("doorOpen").unwrap();
    assert!(Arc::ptr_eq(&found, &first));
    assert_eq!(clipswap.overrides().len(), 1);
}

#[test]
fn test_rejected_calls_change_nothing() {
    let (_dir, _scene, clipswap) = setup();
    clipswap.add("kept", Some(clip("kept")));

    assert!(!clipswap.add("", Some(clip("x"))));
    assert!(!clipswap.add("noClip", None));
    assert!(!clipswap.remove(""));
    assert!(!clipswap.remove("neverAdded"));
    assert!(!clipswap.add_for_clip(None, Some(clip("x"))));
    assert!(!clipswap.remove_for_clip(None));

    assert_eq!(clipswap.overrides().names(), vec!["kept".to_string()]);
}

#[test]
fn test_clip_keyed_overloads() {
    let (_dir, _scene, clipswap) = setup();
    let original = clip("footstep");
    let replacement = clip("squeak");

    assert!(clipswap.add_for_clip(Some(&original), Some(replacement.clone())));
    assert!(Arc::ptr_eq(&clipswap.resolve(&original), &replacement));

    assert!(clipswap.remove_for_clip(Some(&original)));
    assert!(Arc::ptr_eq(&clipswap.resolve(&original), &original));
}

#[test]
fn test_hook_handle_never_brings_up_coordinator() {
    let (_dir, scene, clipswap) = setup();
    let hook = clipswap.overrides();

    // Reads through the hook leave the host untouched
    assert!(hook.lookup("doorOpen").is_none());
    assert!(!hook.contains("doorOpen"));
    assert_eq!(clipswap.guardian_state(), GuardianState::Absent);
    assert!(scene.lock().is_empty());

    // The only writes the hook ever sees come through the guarded service
    clipswap.add("doorOpen", Some(clip("creak")));
    assert_eq!(clipswap.guardian_state(), GuardianState::Present);
    assert_eq!(hook.names(), vec!["doorOpen".to_string()]);
}

#[test]
fn test_coordinator_survives_level_transitions() {
    let (_dir, scene, clipswap) = setup();
    let first = clipswap.tick().handle();

    for _ in 0..5 {
        assert_eq!(clipswap.tick().handle(), first);
    }

    scene.lock().unload_level();
    assert_eq!(clipswap.guardian_state(), GuardianState::Absent);

    let second = clipswap.tick();
    assert!(second.is_created());
    assert_ne!(second.handle().id, first.id);
    assert_eq!(scene.lock().find_all(DEFAULT_COORDINATOR_NAME).len(), 1);
    assert_eq!(clipswap.coordinator(), Some(second.handle()));
}

#[test]
fn test_persistent_coordinator_is_kept() {
    let (_dir, scene, clipswap) = setup();
    let handle = clipswap.tick().handle();

    scene.lock().set_persistent(handle.object, true);
    scene.lock().unload_level();

    assert!(!clipswap.tick().is_created());
    assert_eq!(clipswap.coordinator(), Some(handle));
}

#[test]
fn test_stray_coordinators_are_replaced() {
    let (_dir, scene, clipswap) = setup();
    let stray = scene.lock().create(DEFAULT_COORDINATOR_NAME);

    let handle = clipswap.tick().handle();
    let scene = scene.lock();
    assert!(!scene.is_alive(stray));
    assert_eq!(scene.find_all(DEFAULT_COORDINATOR_NAME), vec![handle.object]);
}

#[test]
fn test_overrides_outlive_coordinator() {
    let (_dir, scene, clipswap) = setup();
    clipswap.add("doorOpen", Some(clip("creak")));

    scene.lock().unload_level();
    clipswap.tick();

    assert!(clipswap.lookup("doorOpen").is_some());
}

#[tokio::test]
async fn test_load_missing_folder_then_file() {
    let (dir, _scene, clipswap) = setup();
    let root = dir.path();

    let err = clipswap.load("MyMod", "creak.wav").await.unwrap_err();
    assert_eq!(err.kind, LoadErrorKind::MissingDirectory);
    assert!(root.join("MyMod").is_dir());

    let err = clipswap.load("MyMod", "creak.wav").await.unwrap_err();
    assert_eq!(err.kind, LoadErrorKind::MissingFile);

    write_wav(&root.join("MyMod").join("creak.wav"), &[0, 1000, -1000, 0]);
    let loaded = clipswap.load("MyMod", "creak.wav").await.unwrap();
    assert_eq!(loaded.name(), "creak");
    assert_eq!(loaded.frames(), 4);

    assert!(clipswap.add("doorOpen", Some(loaded)));
    assert_eq!(clipswap.lookup("doorOpen").unwrap().name(), "creak");
}

#[tokio::test]
async fn test_load_brings_up_coordinator() {
    let (_dir, scene, clipswap) = setup();

    let _ = clipswap.load("MyMod", "creak.wav").await;
    assert_eq!(clipswap.guardian_state(), GuardianState::Present);
    assert_eq!(scene.lock().find_all(DEFAULT_COORDINATOR_NAME).len(), 1);
}

#[tokio::test]
async fn test_failed_load_registers_nothing() {
    let (_dir, _scene, clipswap) = setup();

    let result = clipswap.load("Nowhere", "nothing.wav").await;
    assert!(!clipswap.add("doorOpen", result.ok()));
    assert!(clipswap.overrides().is_empty());
}

#[tokio::test]
async fn test_apply_configured_overrides() {
    let dir = tempdir().unwrap();
    write_wav(&dir.path().join("MyMod").join("creak.wav"), &[0, 500, -500]);

    let mut config = ClipSwapConfig::default().with_data_root(dir.path());
    config.load_timeout_ms = Some(10_000);
    config.overrides = vec![
        OverrideSpec {
            name: "doorOpen".to_string(),
            folder: "MyMod".to_string(),
            file: "creak.wav".to_string(),
        },
        OverrideSpec {
            name: "doorClose".to_string(),
            folder: "MyMod".to_string(),
            file: "missing.wav".to_string(),
        },
    ];
    let (_scene, clipswap) = setup_with(config);

    assert_eq!(clipswap.apply_configured_overrides().await, 1);
    assert!(clipswap.lookup("doorOpen").is_some());
    assert!(clipswap.lookup("doorClose").is_none());

    let stats = clipswap.loader_stats();
    assert_eq!(stats.requested, 2);
    assert_eq!(stats.loaded, 1);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_load_timeout_through_service() {
    let (dir, _scene, clipswap) = setup();
    write_wav(&dir.path().join("MyMod").join("creak.wav"), &[0; 64]);

    let loaded = clipswap
        .load_with_timeout("MyMod", "creak.wav", Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(loaded.frames(), 64);
}

#[test]
fn test_service_lifecycle() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("plugins");
    let (scene, mut clipswap) = setup_with(ClipSwapConfig::default().with_data_root(&root));
    assert_eq!(clipswap.state(), ServiceState::Stopped);

    clipswap.start().unwrap();
    assert_eq!(clipswap.state(), ServiceState::Running);
    assert!(root.is_dir());
    assert!(scene.lock().find(DEFAULT_COORDINATOR_NAME).is_some());

    clipswap.add("doorOpen", Some(clip("creak")));
    let health = clipswap.health();
    assert_eq!(health.state, ServiceState::Running);
    assert_eq!(health.metrics.get("overrides"), Some(&1.0));
    assert_eq!(health.metrics.get("coordinators_created"), Some(&1.0));

    let json = serde_json::to_string(&health).unwrap();
    assert!(json.contains("coordinators_created"));

    clipswap.stop().unwrap();
    assert_eq!(clipswap.state(), ServiceState::Stopped);
    assert!(clipswap.stop().is_err());
}

#[test]
fn test_restart_reconciles_and_keeps_overrides() {
    let (_dir, scene, mut clipswap) = setup();
    clipswap.start().unwrap();
    let first = clipswap.coordinator().unwrap();
    clipswap.add("doorOpen", Some(clip("creak")));

    scene.lock().unload_level();
    clipswap.restart().unwrap();

    assert_eq!(clipswap.state(), ServiceState::Running);
    let current = clipswap.coordinator().unwrap();
    assert_ne!(current.id, first.id);
    assert_eq!(scene.lock().find_all(DEFAULT_COORDINATOR_NAME), vec![current.object]);
    assert!(clipswap.lookup("doorOpen").is_some());
}

#[test]
fn test_restart_requires_running() {
    let (_dir, scene, mut clipswap) = setup();
    assert!(clipswap.restart().is_err());
    assert_eq!(clipswap.state(), ServiceState::Stopped);
    assert!(scene.lock().is_empty());
}

#[tokio::test]
async fn test_health_degrades_after_failed_load() {
    let (dir, _scene, mut clipswap) = setup();
    clipswap.start().unwrap();

    let _ = clipswap.load("MyMod", "creak.wav").await;
    let health = clipswap.health();
    assert_eq!(health.state, ServiceState::Degraded);
    assert!(health.last_error.unwrap().contains("missing directory"));

    write_wav(&dir.path().join("MyMod").join("creak.wav"), &[0, 1, 2]);
    clipswap.load("MyMod", "creak.wav").await.unwrap();
    assert_eq!(clipswap.health().state, ServiceState::Running);
}

#[test]
fn test_concurrent_lookups_during_ticks() {
    let (_dir, scene, clipswap) = setup();
    let clipswap = Arc::new(clipswap);
    clipswap.add("doorOpen", Some(clip("creak")));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let overrides = clipswap.overrides();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    assert!(overrides.lookup("doorOpen").is_some());
                }
            })
        })
        .collect();

    for frame in 0..100 {
        if frame % 10 == 0 {
            scene.lock().unload_level();
        }
        clipswap.tick();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(scene.lock().find_all(DEFAULT_COORDINATOR_NAME).len(), 1);
}
