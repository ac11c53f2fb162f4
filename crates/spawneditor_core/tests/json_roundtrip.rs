use spawneditor_core::{
    load_document, save_document, Document, EditCommand, EditEngine, MetaValue, ParseError,
    Position, SchemaConfig, SpawnEntry,
};

const CANONICAL: &str = concat!(
    "[\n",
    "  {\n",
    "    \"id\": \"a\",\n",
    "    \"category\": \"goblin\",\n",
    "    \"tile\": {\n",
    "      \"x\": 1,\n",
    "      \"y\": 2,\n",
    "      \"z\": 3\n",
    "    },\n",
    "    \"metadata\": {\n",
    "      \"aggressive\": true,\n",
    "      \"direction\": \"NORTH\",\n",
    "      \"walk_radius\": 4\n",
    "    },\n",
    "    \"spawn_notes\": \"legacy importer output\",\n",
    "    \"weight\": 12\n",
    "  },\n",
    "  {\n",
    "    \"id\": \"b\",\n",
    "    \"category\": \"chest\",\n",
    "    \"tile\": {\n",
    "      \"x\": -4,\n",
    "      \"y\": 9,\n",
    "      \"z\": 0\n",
    "    }\n",
    "  }\n",
    "]\n",
);

fn persisted_fields(document: &Document) -> Vec<SpawnEntry> {
    document.entries().cloned().collect()
}

#[test]
fn canonical_input_round_trips_byte_identical() {
    let loaded = load_document("spawns.json", CANONICAL, &SchemaConfig::default()).unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(save_document(&loaded.document), CANONICAL);
}

#[test]
fn load_of_save_preserves_fields_and_order() {
    let engine = EditEngine::new(Document::new("spawns.json"), SchemaConfig::default());
    engine
        .execute(EditCommand::add_entry("goblin", Position::new(1, 2, 3)))
        .unwrap();
    let chest = engine
        .execute(EditCommand::add_entry("chest", Position::new(7, 7, 1)))
        .unwrap();
    engine
        .execute(EditCommand::set_metadata(chest, "locked", true))
        .unwrap();
    engine.undo().unwrap();

    let first = engine.save_to_string();
    let reloaded = load_document("spawns.json", &first, &SchemaConfig::default()).unwrap();
    let original = engine.read(|document| document.clone());

    assert_eq!(
        persisted_fields(&reloaded.document),
        persisted_fields(&original)
    );
    assert_eq!(save_document(&reloaded.document), first);
}

#[test]
fn save_is_deterministic_for_identical_state() {
    let loaded_a = load_document("spawns.json", CANONICAL, &SchemaConfig::default()).unwrap();
    let loaded_b = load_document("spawns.json", CANONICAL, &SchemaConfig::default()).unwrap();
    assert_eq!(
        save_document(&loaded_a.document),
        save_document(&loaded_b.document)
    );
    assert_eq!(
        save_document(&loaded_a.document),
        save_document(&loaded_a.document)
    );
}

#[test]
fn unknown_fields_are_preserved_and_canonicalized() {
    let scrambled = r#"[
  {
    "zeta": {"nested": [1, 2, {"deep": true}]},
    "id": "a",
    "alpha": null,
    "category": "goblin",
    "tile": {"x": 0, "y": 0, "z": 0}
  }
]"#;
    let loaded = load_document("spawns.json", scrambled, &SchemaConfig::default()).unwrap();
    let entry = loaded.document.entries().next().unwrap();
    let extra_keys: Vec<&str> = entry.extra.keys().map(String::as_str).collect();
    assert_eq!(extra_keys, ["alpha", "zeta"]);

    let saved = save_document(&loaded.document);
    let reloaded = load_document("spawns.json", &saved, &SchemaConfig::default()).unwrap();
    assert_eq!(
        persisted_fields(&reloaded.document),
        persisted_fields(&loaded.document)
    );
    assert_eq!(save_document(&reloaded.document), saved);
}

#[test]
fn metadata_scalars_survive_with_types_intact() {
    let loaded = load_document("spawns.json", CANONICAL, &SchemaConfig::default()).unwrap();
    let entry = loaded.document.entries().next().unwrap();
    assert_eq!(entry.metadata_value("aggressive"), Some(&MetaValue::Bool(true)));
    assert_eq!(entry.metadata_value("walk_radius"), Some(&MetaValue::Int(4)));
    assert_eq!(
        entry.metadata_value("direction"),
        Some(&MetaValue::Text("NORTH".to_string()))
    );
}

#[test]
fn non_array_root_is_rejected() {
    let err = load_document("spawns.json", "{}", &SchemaConfig::default()).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedRoot { found: "an object" }));
}

#[test]
fn structural_entry_problems_abort_the_load() {
    let missing_id = r#"[{"category": "goblin", "tile": {"x": 0, "y": 0, "z": 0}}]"#;
    let err = load_document("spawns.json", missing_id, &SchemaConfig::default()).unwrap_err();
    assert!(
        matches!(&err, ParseError::Entry { index: 0, reason } if reason.contains("`id`")),
        "unexpected: {err:?}"
    );

    let bad_tile = r#"[{"id": "a", "category": "goblin", "tile": {"x": "east", "y": 0, "z": 0}}]"#;
    let err = load_document("spawns.json", bad_tile, &SchemaConfig::default()).unwrap_err();
    assert!(
        matches!(&err, ParseError::Entry { index: 0, reason } if reason.contains("tile.x")),
        "unexpected: {err:?}"
    );

    let nested_metadata =
        r#"[{"id": "a", "category": "goblin", "tile": {"x": 0, "y": 0, "z": 0}, "metadata": {"inner": {}}}]"#;
    let err = load_document("spawns.json", nested_metadata, &SchemaConfig::default()).unwrap_err();
    assert!(
        matches!(&err, ParseError::Entry { index: 0, reason } if reason.contains("scalar")),
        "unexpected: {err:?}"
    );

    let non_object = r#"[42]"#;
    let err = load_document("spawns.json", non_object, &SchemaConfig::default()).unwrap_err();
    assert!(matches!(err, ParseError::Entry { index: 0, .. }));
}

#[test]
fn semantic_problems_load_with_warnings() {
    let duplicate_ids = r#"[
  {"id": "a", "category": "goblin", "tile": {"x": 0, "y": 0, "z": 0}},
  {"id": "a", "category": "orc", "tile": {"x": 1, "y": 1, "z": 0}}
]"#;
    let loaded = load_document("spawns.json", duplicate_ids, &SchemaConfig::default()).unwrap();
    assert_eq!(loaded.document.entry_count(), 2);
    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.warnings[0].reason, "duplicate entry id");
}
