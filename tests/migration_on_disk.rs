use brandfix::{
    get_events_for_entity, run_migration, seed_store, BrandSchema, BrandStore, MigrationConfig,
    SeedOptions, SqliteBrandStore,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

fn doc(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_pass_survives_reopen_and_stays_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brands.db");
    let config = MigrationConfig {
        database: path.clone(),
        ..MigrationConfig::default()
    };

    let acme_id = {
        let store = SqliteBrandStore::open(&path).unwrap();
        seed_store(
            &store,
            &config.schema(),
            &SeedOptions { count: 20, drift: true, seed: Some(99) },
        )
        .unwrap();
        store
            .insert_raw(&doc(json!({
                "brand": {"name": "Acme"},
                "hqAddress": "Metropolis",
                "yearsFounded": "1923",
                "numberOfLocations": "0"
            })))
            .unwrap()
    };

    let first = {
        let store = SqliteBrandStore::open(&path).unwrap();
        run_migration(&store, config.schema(), config.policy(), false).unwrap()
    };
    assert_eq!(first.processed, 21);
    assert!(first.is_clean(), "{}", first.summary());

    let store = SqliteBrandStore::open(&path).unwrap();
    let snapshot = store.load_all().unwrap();

    let second = run_migration(&store, config.schema(), config.policy(), false).unwrap();
    assert_eq!(second.changed(), 0);
    assert_eq!(second.unchanged, 21);
    assert_eq!(second.fields_defaulted, 0);
    assert_eq!(store.load_all().unwrap(), snapshot);

    let acme = store.get_raw(&acme_id).unwrap();
    assert_eq!(
        Value::Object(acme.document),
        json!({
            "brandName": "Acme",
            "headquarters": "Metropolis",
            "yearFounded": 1923,
            "numberOfLocations": 1
        })
    );

    let expected: HashSet<&str> = ["brandName", "yearFounded", "headquarters", "numberOfLocations"]
        .into_iter()
        .collect();
    for record in &snapshot {
        let keys: HashSet<&str> = record.keys().into_iter().collect();
        assert_eq!(keys, expected);
    }

    // One write for the pass that changed it, none for the no-op pass
    let events = get_events_for_entity(store.connection(), "brand", &acme_id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "brand_updated");
}

#[test]
fn test_dry_run_from_config_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brands.db");
    let config = MigrationConfig::from_toml_str(&format!(
        "database = {:?}\ndry_run = true\n",
        path.display().to_string()
    ))
    .unwrap();

    let store = SqliteBrandStore::open(&config.database).unwrap();
    store
        .insert_raw(&doc(json!({"brand": {"name": "Acme"}, "hqAddress": "Metropolis"})))
        .unwrap();
    let before = store.load_all().unwrap();

    let report = run_migration(
        &store,
        BrandSchema::with_bounds(config.min_founding_year, 2024),
        config.policy(),
        config.dry_run,
    )
    .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.validated, 1);
    assert_eq!(store.load_all().unwrap(), before);
    assert_eq!(store.count_with_field("brand").unwrap(), 1);
}
