mod common;

use std::sync::Arc;

use content_packs::engine::memory::{CatalogDef, MemoryEngine, Mesh, PrefabNode};
use content_packs::models::{BootstrapOutcome, PopulationReport, PopulationState};
use content_packs::transport;
use content_packs::{BootstrapConfig, BootstrapError, ContentBootstrap, Environment};

use common::{now, two_pack_manifest, ScriptedTransport};

fn room_catalog() -> CatalogDef {
    CatalogDef::new()
        .asset(
            "rooms/studio",
            PrefabNode::new("studio")
                .child(PrefabNode::new("floor").mesh(Mesh::Present))
                .child(PrefabNode::new("slot_chair_1"))
                .child(PrefabNode::new("slot_chair_2"))
                .child(PrefabNode::new("slot_lamp")),
        )
        .labeled_asset("furniture/chair_a", &["furniture:chair"], PrefabNode::new("chair_a"))
        .labeled_asset("furniture/chair_b", &["furniture:chair"], PrefabNode::new("chair_b"))
}

/// A local pack directory holding `packs.json` and the catalog files named.
fn pack_dir(manifest: &str, catalogs: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("packs.json"), manifest).expect("write manifest");
    for name in catalogs {
        std::fs::write(dir.path().join(name), b"compiled").expect("write catalog");
    }
    dir
}

fn base_of(dir: &tempfile::TempDir) -> String {
    dir.path().to_str().unwrap().to_string()
}

fn local_bootstrap(base: &str, engine: &MemoryEngine) -> ContentBootstrap<MemoryEngine> {
    let mut config = BootstrapConfig::new(base, Environment::Development);
    config.random_seed = Some(1);
    ContentBootstrap::new(
        config,
        Arc::new(engine.clone()),
        Arc::new(ScriptedTransport::new()),
    )
}

fn populated(outcome: BootstrapOutcome) -> PopulationReport {
    match outcome {
        BootstrapOutcome::Populated(report) => report,
        other => panic!("expected a populated scene, got {:?}", other),
    }
}

mod local_run {
    use super::*;

    #[tokio::test]
    async fn stages_released_packs_only_and_populates() {
        let dir = pack_dir(&two_pack_manifest(), &["catalog_core.bin", "catalog_winter.bin"]);
        let base = base_of(&dir);
        let engine = MemoryEngine::new();
        engine.define_catalog(transport::join(&base, "catalog_core.bin"), room_catalog());
        engine.define_catalog(transport::join(&base, "catalog_winter.bin"), room_catalog());

        let mut bootstrap = local_bootstrap(&base, &engine);
        let report = populated(bootstrap.run_at(now()).await.expect("run"));

        assert_eq!(
            engine.registered_locations(),
            vec![transport::join(&base, "catalog_core.bin")]
        );
        assert_eq!(
            engine.catalog_load_attempts(&transport::join(&base, "catalog_winter.bin")),
            0
        );
        assert_eq!(report.state, PopulationState::Done);
        assert_eq!(report.slots_scanned, 3);
        assert_eq!(report.slots_filled, 2);
        assert_eq!(report.unmatched_slots, vec!["slot_lamp"]);
        assert_eq!(bootstrap.lifecycle().catalogs().len(), 1);
        assert_eq!(bootstrap.lifecycle().instances().len(), 3);
    }

    #[tokio::test]
    async fn stages_in_manifest_order_not_release_order() {
        let manifest = r#"{"version": 1, "packs": [
            {"id": "newer", "title": "Newer", "releaseUtc": "2025-05-01", "catalogFile": "newer.json"},
            {"id": "older", "title": "Older", "releaseUtc": "2024-01-01", "catalogFile": "older.json"}
        ]}"#;
        let dir = pack_dir(manifest, &["newer.bin", "older.bin"]);
        let base = base_of(&dir);
        let engine = MemoryEngine::new();
        engine.define_catalog(transport::join(&base, "newer.bin"), room_catalog());
        engine.define_catalog(transport::join(&base, "older.bin"), CatalogDef::new());

        let mut bootstrap = local_bootstrap(&base, &engine);
        bootstrap.run_at(now()).await.expect("run");

        assert_eq!(
            engine.registered_locations(),
            vec![
                transport::join(&base, "newer.bin"),
                transport::join(&base, "older.bin"),
            ]
        );
    }

    #[tokio::test]
    async fn nothing_released_is_not_an_error() {
        let manifest = r#"{"version": 1, "packs": [
            {"id": "later", "title": "Later", "releaseUtc": "2099-01-01T00:00:00Z", "catalogFile": "later.json"}
        ]}"#;
        let dir = pack_dir(manifest, &["later.bin"]);
        let engine = MemoryEngine::new();

        let mut bootstrap = local_bootstrap(&base_of(&dir), &engine);
        let outcome = bootstrap.run_at(now()).await.expect("run");

        assert_eq!(outcome, BootstrapOutcome::NoEligiblePacks);
        assert!(bootstrap.lifecycle().is_empty());
    }

    #[tokio::test]
    async fn resolves_relative_base_against_project_root() {
        let dir = pack_dir(&two_pack_manifest(), &["catalog_core.bin"]);
        let parent = dir.path().parent().expect("parent").to_path_buf();
        let relative = dir.path().file_name().expect("name").to_str().unwrap().to_string();
        let engine = MemoryEngine::new();
        engine.define_catalog(transport::join(&base_of(&dir), "catalog_core.bin"), room_catalog());

        let mut config = BootstrapConfig::new(format!("./{}", relative), Environment::Development);
        config.project_root = Some(parent);
        let mut bootstrap =
            ContentBootstrap::new(config, Arc::new(engine.clone()), Arc::new(ScriptedTransport::new()));

        let report = populated(bootstrap.run_at(now()).await.expect("run"));
        assert_eq!(report.room.as_deref(), Some("rooms/studio"));
    }

    #[tokio::test]
    async fn injected_room_chooser_picks_the_room() {
        let dir = pack_dir(&two_pack_manifest(), &["catalog_core.bin"]);
        let base = base_of(&dir);
        let engine = MemoryEngine::new();
        engine.define_catalog(
            transport::join(&base, "catalog_core.bin"),
            room_catalog().asset("rooms/attic", PrefabNode::new("attic")),
        );

        let mut bootstrap = local_bootstrap(&base, &engine)
            .with_room_chooser(|rooms: &[String]| rooms.iter().position(|r| r == "rooms/studio"));
        let report = populated(bootstrap.run_at(now()).await.expect("run"));

        assert_eq!(report.room.as_deref(), Some("rooms/studio"));
        assert_eq!(report.slots_filled, 2);
    }

    #[tokio::test]
    async fn blank_base_is_rejected() {
        let engine = MemoryEngine::new();
        let mut bootstrap = local_bootstrap("  ", &engine);

        let result = bootstrap.run_at(now()).await;

        assert!(matches!(result, Err(BootstrapError::InvalidBase)));
    }
}

mod staging_failures {
    use super::*;

    #[tokio::test]
    async fn later_pack_failure_unregisters_earlier_catalogs() {
        let manifest = r#"{"version": 1, "packs": [
            {"id": "a", "title": "A", "releaseUtc": "2024-01-01", "catalogFile": "a.json"},
            {"id": "b", "title": "B", "releaseUtc": "2024-01-02", "catalogFile": "b.json"}
        ]}"#;
        let dir = pack_dir(manifest, &["a.bin"]);
        let base = base_of(&dir);
        let engine = MemoryEngine::new();
        engine.define_catalog(transport::join(&base, "a.bin"), room_catalog());
        engine.define_catalog(transport::join(&base, "b.bin"), room_catalog());

        let mut bootstrap = local_bootstrap(&base, &engine);
        let result = bootstrap.run_at(now()).await;

        match result {
            Err(BootstrapError::Catalog { pack_id, source }) => {
                assert_eq!(pack_id, "b");
                assert!(matches!(*source, BootstrapError::NotFound { .. }));
            }
            other => panic!("expected a catalog failure, got {:?}", other),
        }
        assert!(engine.registered_catalogs().is_empty());
        assert_eq!(engine.removed_catalogs().len(), 1);
        assert_eq!(engine.live_instances(), 0);
        assert!(bootstrap.lifecycle().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_manifest_stages_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail_first("https://cdn.example.com/packs/packs.json", 100);
        let engine = MemoryEngine::new();
        let config = BootstrapConfig::new("https://cdn.example.com/packs", Environment::Production);
        let mut bootstrap = ContentBootstrap::new(config, Arc::new(engine.clone()), transport.clone());

        let result = bootstrap.run_at(now()).await;

        assert!(matches!(result, Err(BootstrapError::Transport { .. })));
        assert_eq!(transport.network_calls(), 3);
        assert!(engine.registered_locations().is_empty());
        assert!(bootstrap.lifecycle().is_empty());
        assert!(bootstrap.shutdown().is_empty());
    }
}

mod remote_run {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fetches_manifest_and_catalog_over_https() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.serve("https://cdn.example.com/packs/packs.json", &two_pack_manifest());
        transport.fail_first("https://cdn.example.com/packs/packs.json", 1);
        let engine = MemoryEngine::new();
        engine.define_catalog("https://cdn.example.com/packs/catalog_core.bin", room_catalog());
        engine.fail_catalog_loads("https://cdn.example.com/packs/catalog_core.bin", 1);

        let config = BootstrapConfig::new("https://cdn.example.com/packs", Environment::Production);
        let mut bootstrap = ContentBootstrap::new(config, Arc::new(engine.clone()), transport.clone());

        let report = populated(bootstrap.run_at(now()).await.expect("run"));

        assert_eq!(transport.network_calls(), 2);
        assert_eq!(
            engine.catalog_load_attempts("https://cdn.example.com/packs/catalog_core.bin"),
            2
        );
        assert_eq!(report.slots_filled, 2);
    }
}

mod teardown {
    use super::*;

    async fn finished_run(engine: &MemoryEngine) -> (tempfile::TempDir, ContentBootstrap<MemoryEngine>) {
        let dir = pack_dir(&two_pack_manifest(), &["catalog_core.bin"]);
        engine.define_catalog(transport::join(&base_of(&dir), "catalog_core.bin"), room_catalog());
        let mut bootstrap = local_bootstrap(&base_of(&dir), engine);
        bootstrap.run_at(now()).await.expect("run");
        (dir, bootstrap)
    }

    #[tokio::test]
    async fn shutdown_releases_everything_once() {
        let engine = MemoryEngine::new();
        let (_dir, mut bootstrap) = finished_run(&engine).await;
        assert_eq!(engine.live_instances(), 3);

        let first = bootstrap.shutdown();
        let second = bootstrap.shutdown();

        assert_eq!(first.instances_released, 3);
        assert_eq!(first.catalogs_released, 1);
        assert_eq!(first.failures, 0);
        assert!(second.is_empty());
        assert_eq!(engine.live_instances(), 0);
        assert!(engine.registered_catalogs().is_empty());
        assert!(bootstrap.locator().catalogs().is_empty());
    }

    #[tokio::test]
    async fn drop_releases_what_shutdown_did_not() {
        let engine = MemoryEngine::new();
        {
            let (_dir, _bootstrap) = finished_run(&engine).await;
            assert_eq!(engine.live_instances(), 3);
        }

        assert_eq!(engine.live_instances(), 0);
        assert!(engine.registered_catalogs().is_empty());
        assert_eq!(engine.released_instances().len(), 3);
    }

    #[tokio::test]
    async fn a_stuck_instance_does_not_block_the_rest() {
        let engine = MemoryEngine::new();
        let (_dir, mut bootstrap) = finished_run(&engine).await;
        let chair = bootstrap.lifecycle().instances()[1];
        engine.fail_release_of(chair);

        let report = bootstrap.shutdown();

        assert_eq!(report.failures, 1);
        assert_eq!(report.instances_released, 2);
        assert_eq!(report.catalogs_released, 1);
        assert!(bootstrap.lifecycle().is_empty());
    }

    #[tokio::test]
    async fn rerun_starts_from_a_clean_slate() {
        let engine = MemoryEngine::new();
        let (_dir, mut bootstrap) = finished_run(&engine).await;

        bootstrap.run_at(now()).await.expect("second run");

        assert_eq!(engine.registered_catalogs().len(), 1);
        assert_eq!(engine.live_instances(), 3);
        assert_eq!(engine.removed_catalogs().len(), 1);
    }
}
