use billchain_analytics::{
    config::AnalyticsConfig,
    customer::{CustomerRecord, SampleCustomers},
    model_store::ModelStore,
    types::ModelKind,
    AnalyticsService,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
}

fn sample() -> Vec<CustomerRecord> {
    SampleCustomers::generate(as_of()).records().to_vec()
}

fn open(dir: &TempDir) -> AnalyticsService {
    AnalyticsService::open(AnalyticsConfig::default_test(dir.path()))
        .unwrap()
        .with_reference_time(as_of())
}

fn read_value(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

/// Rewrite the root split of the first tree that has one.
fn edit_first_split(path: &Path, edit: impl FnOnce(&mut Value)) {
    let mut artifact = read_value(path);
    let root = artifact["forest"]["trees"]
        .as_array_mut()
        .unwrap()
        .iter_mut()
        .map(|tree| &mut tree["nodes"][0])
        .find(|node| node["kind"] == "split")
        .expect("some tree splits at the root");
    edit(root);
    std::fs::write(path, serde_json::to_vec(&artifact).unwrap()).unwrap();
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// An empty (or not yet created) directory loads with every slot empty.
#[test]
fn missing_artifacts_are_not_an_error() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("not").join("yet").join("created");

    let store = ModelStore::load(&nested).unwrap();
    assert!(nested.is_dir(), "load creates the models directory");
    for kind in ModelKind::ALL {
        assert!(store.trained(kind).is_none());
        assert!(store.slot(kind).model.is_none());
        assert!(store.slot(kind).scaler.is_none());
    }
}

/// Saving an empty store writes nothing and succeeds.
#[test]
fn partial_save_of_empty_store() {
    let dir = TempDir::new().unwrap();
    ModelStore::empty(dir.path()).save().unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// Models trained by one service are restored by a fresh one on the same dir.
#[test]
fn artifacts_survive_restart() {
    let dir = TempDir::new().unwrap();
    let customers = sample();

    let first = open(&dir);
    assert!(first.train_churn_model(&customers).is_success());
    assert!(first.train_cltv_model(&customers).is_success());
    let churn_before = first.predict_churn(&customers[5]);
    let cltv_before = first.predict_cltv(&customers[5]);
    let ids_before = first.model_status();
    drop(first);

    let second = open(&dir);
    let status = second.model_status();
    assert!(status.churn_model && status.churn_scaler && status.cltv_model && status.cltv_scaler);
    assert_eq!(status.churn_model_id, ids_before.churn_model_id);
    assert_eq!(status.cltv_model_id, ids_before.cltv_model_id);

    assert_eq!(second.predict_churn(&customers[5]), churn_before);
    assert_eq!(second.predict_cltv(&customers[5]), cltv_before);
}

/// Only the churn half present on disk: churn restores, CLTV stays empty.
#[test]
fn partial_directory_restores_what_exists() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.train_churn_model(&sample()).is_success());
    service.save_models().unwrap();

    let store = ModelStore::load(dir.path()).unwrap();
    assert!(store.trained(ModelKind::Churn).is_some());
    assert!(store.trained(ModelKind::Cltv).is_none());
}

/// A model without its scaler does not count as trained.
#[test]
fn model_without_scaler_is_not_trained() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.train_churn_model(&sample()).is_success());
    std::fs::remove_file(dir.path().join(ModelKind::Churn.scaler_file())).unwrap();

    service.reload_models().unwrap();
    let status = service.model_status();
    assert!(status.churn_model);
    assert!(!status.churn_scaler);
    assert!(!service.predict_churn(&sample()[0]).is_success());
}

/// A corrupt artifact is logged and skipped; the rest still loads.
#[test]
fn corrupt_artifact_leaves_slot_empty() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.train_churn_model(&sample()).is_success());
    assert!(service.train_cltv_model(&sample()).is_success());
    std::fs::write(dir.path().join(ModelKind::Cltv.model_file()), b"{ not json").unwrap();

    let store = ModelStore::load(dir.path()).unwrap();
    assert!(store.trained(ModelKind::Churn).is_some());
    assert!(store.slot(ModelKind::Cltv).model.is_none());
    assert!(store.slot(ModelKind::Cltv).scaler.is_some());
}

/// Retraining replaces the artifact wholesale and leaves no temp files behind.
#[test]
fn retraining_replaces_artifact() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.train_churn_model(&sample()).is_success());
    let first_id = service.model_status().churn_model_id;
    assert!(service.train_churn_model(&sample()).is_success());
    let second_id = service.model_status().churn_model_id;

    assert_ne!(first_id, second_id);
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());

    let on_disk = ModelStore::load(dir.path()).unwrap();
    let (model, _) = on_disk.trained(ModelKind::Churn).unwrap();
    assert_eq!(Some(model.metadata.artifact_id), second_id);
}

/// A model write that fails after the scaler is staged leaves the previous
/// pair untouched on disk and still loadable.
#[test]
fn failed_model_write_keeps_previous_pair() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.train_churn_model(&sample()).is_success());
    let first_id = service.model_status().churn_model_id;

    // A directory squatting on the temp path makes the model write fail.
    let blocker = dir.path().join(format!("{}.tmp", ModelKind::Churn.model_file()));
    std::fs::create_dir(&blocker).unwrap();
    assert!(!service.train_churn_model(&sample()[..30]).is_success());
    assert_eq!(service.model_status().churn_model_id, first_id);

    let scaler = read_value(&dir.path().join(ModelKind::Churn.scaler_file()));
    assert_eq!(scaler["n_samples"], 80);
    assert_eq!(scaler["model_id"], serde_json::to_value(first_id).unwrap());
    assert!(!dir.path().join(format!("{}.tmp", ModelKind::Churn.scaler_file())).exists());

    std::fs::remove_dir(&blocker).unwrap();
    service.reload_models().unwrap();
    assert_eq!(service.model_status().churn_model_id, first_id);
    assert!(service.predict_churn(&sample()[0]).is_success());
}

/// A scaler left over from an earlier training does not pair with a newer model.
#[test]
fn mismatched_scaler_is_not_trained() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    let scaler_path = dir.path().join(ModelKind::Churn.scaler_file());
    let stale = dir.path().join("stale_scaler.json");

    assert!(service.train_churn_model(&sample()).is_success());
    std::fs::copy(&scaler_path, &stale).unwrap();
    assert!(service.train_churn_model(&sample()).is_success());
    std::fs::copy(&stale, &scaler_path).unwrap();

    service.reload_models().unwrap();
    let status = service.model_status();
    assert!(status.churn_model && status.churn_scaler);
    assert!(!service.predict_churn(&sample()[0]).is_success());

    let store = ModelStore::load(dir.path()).unwrap();
    assert!(store.trained(ModelKind::Churn).is_none());
}

/// A split pointing past the feature vector is rejected at load, not at predict.
#[test]
fn invalid_split_feature_leaves_slot_empty() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.train_churn_model(&sample()).is_success());
    edit_first_split(&dir.path().join(ModelKind::Churn.model_file()), |node| {
        node["feature"] = Value::from(99);
    });

    service.reload_models().unwrap();
    let status = service.model_status();
    assert!(!status.churn_model);
    assert!(status.churn_scaler);
    assert!(!service.predict_churn(&sample()[0]).is_success());
}

/// A child index that points back up the tree would never reach a leaf.
#[test]
fn backward_child_index_leaves_slot_empty() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.train_churn_model(&sample()).is_success());
    assert!(service.train_cltv_model(&sample()).is_success());
    edit_first_split(&dir.path().join(ModelKind::Cltv.model_file()), |node| {
        node["left"] = Value::from(0);
    });

    let store = ModelStore::load(dir.path()).unwrap();
    assert!(store.slot(ModelKind::Cltv).model.is_none());
    assert!(store.trained(ModelKind::Churn).is_some());
}

/// A churn artifact copied into the CLTV slot is refused.
#[test]
fn artifact_of_wrong_kind_is_refused() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.train_churn_model(&sample()).is_success());
    std::fs::copy(
        dir.path().join(ModelKind::Churn.model_file()),
        dir.path().join(ModelKind::Cltv.model_file()),
    )
    .unwrap();

    let store = ModelStore::load(dir.path()).unwrap();
    assert!(store.slot(ModelKind::Cltv).model.is_none());
    assert!(store.trained(ModelKind::Churn).is_some());
}
