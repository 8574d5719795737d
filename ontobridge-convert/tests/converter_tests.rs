use ontobridge_convert::{ConvertConfig, ConvertError, Converter, UnmappedKeyPolicy};
use ontobridge_model::{EntityCache, MappingSpec};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const SENSOR: &str = "http://example.org/Sensor";
const HAS_TEMPERATURE: &str = "http://example.org/hasTemperature";

fn sensor_mapping() -> Value {
    json!({
        "skeleton": { "sensors": [ { "_mapping_id": "sensor" } ] },
        "sensor": {
            "_id": { "static": "urn:sensor:", "param": "id" },
            "_class": { "field_dependent": false, "value": SENSOR },
            "temp": { "datatype_property_ori": HAS_TEMPERATURE, "type": "float" }
        }
    })
}

fn converter(mapping: Value) -> Converter {
    converter_with(mapping, ConvertConfig::default())
}

fn converter_with(mapping: Value, config: ConvertConfig) -> Converter {
    let spec = MappingSpec::from_value(&mapping).unwrap();
    Converter::new(spec, config)
}

fn identifiers(cache: &EntityCache) -> Vec<String> {
    cache.flatten().iter().map(|e| e.identifier.clone()).collect()
}

fn all_statements(cache: &EntityCache) -> String {
    cache.flatten().iter().map(|e| e.statements.as_str()).collect()
}

fn building_mapping() -> Value {
    json!({
        "skeleton": {
            "buildings": [ {
                "_mapping_id": "building",
                "rooms": [ { "_mapping_id": "room" } ]
            } ]
        },
        "building": {
            "_id": { "static": "urn:building:", "param": "code" },
            "_class": { "field_dependent": false, "value": "http://example.org/Building" },
            "name": { "datatype_property_ori": "http://example.org/name", "type": "string" }
        },
        "room": {
            "_id": { "static": "urn:room:", "param": "number" },
            "_class": { "field_dependent": false, "value": "http://example.org/Room" }
        }
    })
}

fn linked_list_mapping() -> Value {
    json!({
        "skeleton": {
            "head": { "_mapping_id": "node", "_recursive": true, "_recursive_field": "next" }
        },
        "node": {
            "_id": { "static": "urn:node:", "param": "id" },
            "_class": { "field_dependent": false, "value": "http://example.org/Node" }
        }
    })
}

fn linked_list(length: usize) -> Value {
    let mut node = json!({ "id": length });
    for id in (1..length).rev() {
        node = json!({ "id": id, "next": node });
    }
    json!({ "head": node })
}

// ── Sensor scenario ─────────────────────────────────────────────

#[test]
fn sensors_become_entities() {
    let mut converter = converter(sensor_mapping());
    let source = json!({ "sensors": [ { "id": "s1", "temp": 21.5 }, { "id": "s2", "temp": 19.0 } ] });

    let cache = converter.parse(&source).unwrap();

    assert_eq!(identifiers(cache), vec!["urn:sensor:s1", "urn:sensor:s2"]);
    assert_eq!(
        cache.get("urn:sensor:s1").unwrap().statements,
        format!(
            "<urn:sensor:s1>\ta\t<{SENSOR}> .\n<urn:sensor:s1>\t<{HAS_TEMPERATURE}>\t\"21.5\"^^xsd:float .\n\n"
        )
    );
    assert_eq!(
        cache.get("urn:sensor:s2").unwrap().statements,
        format!(
            "<urn:sensor:s2>\ta\t<{SENSOR}> .\n<urn:sensor:s2>\t<{HAS_TEMPERATURE}>\t\"19.0\"^^xsd:float .\n\n"
        )
    );
}

#[test]
fn removed_sensor_is_purged() {
    let mut converter = converter(sensor_mapping());
    converter
        .parse(&json!({ "sensors": [ { "id": "s1", "temp": 21.5 }, { "id": "s2", "temp": 19.0 } ] }))
        .unwrap();

    let cache = converter.parse(&json!({ "sensors": [ { "id": "s1", "temp": 22.0 } ] })).unwrap();

    assert_eq!(identifiers(cache), vec!["urn:sensor:s1"]);
    assert!(!cache.contains("urn:sensor:s2"));
    assert!(cache.get("urn:sensor:s1").unwrap().statements.contains("\"22.0\"^^xsd:float"));
}

#[test]
fn every_entity_is_alive_after_a_pass() {
    let mut converter = converter(building_mapping());
    let cache = converter
        .parse(&json!({ "buildings": [ { "code": "b1", "rooms": [ { "number": 1 } ] } ] }))
        .unwrap();
    assert!(cache.flatten().iter().all(|e| e.alive));
}

#[test]
fn identical_identifiers_keep_the_last_occurrence() {
    let mut converter = converter(sensor_mapping());
    let cache = converter
        .parse(&json!({ "sensors": [ { "id": "s1", "temp": 1.0 }, { "id": "s1", "temp": 2.0 } ] }))
        .unwrap();

    assert_eq!(cache.len(), 1);
    assert!(cache.get("urn:sensor:s1").unwrap().statements.contains("\"2.0\"^^xsd:float"));
}

// ── Encapsulated entities ───────────────────────────────────────

#[test]
fn nested_skeletons_fill_children() {
    let mut converter = converter(building_mapping());
    let cache = converter
        .parse(&json!({
            "buildings": [ { "code": "b1", "name": "HQ", "rooms": [ { "number": 1 }, { "number": 2 } ] } ]
        }))
        .unwrap();

    assert_eq!(cache.len(), 1);
    let building = cache.get("urn:building:b1").unwrap();
    assert_eq!(building.children.identifiers().collect::<Vec<_>>(), vec!["urn:room:1", "urn:room:2"]);
    assert_eq!(identifiers(cache), vec!["urn:room:1", "urn:room:2", "urn:building:b1"]);
}

#[test]
fn removed_parent_takes_its_descendants() {
    let mut converter = converter(building_mapping());
    converter
        .parse(&json!({
            "buildings": [
                { "code": "a", "rooms": [ { "number": 1 } ] },
                { "code": "b", "rooms": [ { "number": 2 }, { "number": 3 } ] }
            ]
        }))
        .unwrap();

    let cache = converter
        .parse(&json!({ "buildings": [ { "code": "a", "rooms": [ { "number": 1 } ] } ] }))
        .unwrap();

    assert_eq!(identifiers(cache), vec!["urn:room:1", "urn:building:a"]);
    assert_eq!(cache.total_len(), 2);
}

#[test]
fn removed_child_is_swept_from_surviving_parent() {
    let mut converter = converter(building_mapping());
    converter
        .parse(&json!({ "buildings": [ { "code": "a", "rooms": [ { "number": 1 }, { "number": 2 } ] } ] }))
        .unwrap();

    let cache = converter
        .parse(&json!({ "buildings": [ { "code": "a", "rooms": [ { "number": 2 } ] } ] }))
        .unwrap();

    let building = cache.get("urn:building:a").unwrap();
    assert_eq!(building.children.identifiers().collect::<Vec<_>>(), vec!["urn:room:2"]);
}

#[test]
fn absent_data_yields_no_entities() {
    let mut converter = converter(building_mapping());
    assert!(converter.parse(&json!({})).unwrap().is_empty());
    assert!(converter.parse(&json!({ "buildings": null })).unwrap().is_empty());

    let cache = converter
        .parse(&json!({ "buildings": [ { "code": "a", "rooms": null }, null ] }))
        .unwrap();
    assert_eq!(identifiers(cache), vec!["urn:building:a"]);
}

#[test]
fn list_skeleton_rejects_non_list_data() {
    let mut converter = converter(sensor_mapping());
    let err = converter.parse(&json!({ "sensors": { "id": "s1" } })).unwrap_err();
    assert!(matches!(err, ConvertError::UnexpectedShape { expected: "list", .. }));
}

// ── Recursive skeletons ─────────────────────────────────────────

#[test]
fn recursive_field_nests_the_same_mapping() {
    let mut converter = converter(linked_list_mapping());
    let cache = converter.parse(&linked_list(3)).unwrap();

    assert_eq!(cache.len(), 1);
    let first = cache.get("urn:node:1").unwrap();
    let second = first.children.get("urn:node:2").unwrap();
    assert!(second.children.contains("urn:node:3"));
    assert_eq!(identifiers(cache), vec!["urn:node:3", "urn:node:2", "urn:node:1"]);
}

#[test]
fn deep_recursion_within_default_limit() {
    let mut converter = converter(linked_list_mapping());
    let cache = converter.parse(&linked_list(1_000)).unwrap();
    assert_eq!(cache.total_len(), 1_000);
}

#[test]
fn deep_chain_survives_repeated_passes() {
    let mut converter = converter(linked_list_mapping());
    let source = linked_list(ConvertConfig::default().max_depth);

    converter.parse(&source).unwrap();
    let cache = converter.parse(&source).unwrap();
    assert_eq!(cache.total_len(), 1_024);

    let cache = converter.parse(&linked_list(10)).unwrap();
    assert_eq!(cache.total_len(), 10);
}

#[test]
fn failed_pass_over_deep_cache_keeps_it() {
    let mut converter = converter(linked_list_mapping());
    converter.parse(&linked_list(1_024)).unwrap();

    let err = converter.parse(&linked_list(1_025)).unwrap_err();

    assert!(matches!(err, ConvertError::RecursionLimitExceeded { limit: 1_024 }));
    assert_eq!(converter.cache().total_len(), 1_024);
}

#[test]
fn recursion_beyond_max_depth_is_an_error() {
    let config = ConvertConfig {
        max_depth: 2,
        ..ConvertConfig::default()
    };
    let mut converter = converter_with(linked_list_mapping(), config);
    let err = converter.parse(&linked_list(3)).unwrap_err();
    assert!(matches!(err, ConvertError::RecursionLimitExceeded { limit: 2 }));
}

#[test]
fn shortened_recursive_chain_is_swept() {
    let mut converter = converter(linked_list_mapping());
    converter.parse(&linked_list(4)).unwrap();
    let cache = converter.parse(&linked_list(2)).unwrap();
    assert_eq!(identifiers(cache), vec!["urn:node:2", "urn:node:1"]);
}

// ── Atomicity ───────────────────────────────────────────────────

#[test]
fn failed_pass_leaves_cache_untouched() {
    let mut converter = converter(sensor_mapping());
    converter
        .parse(&json!({ "sensors": [ { "id": "s1", "temp": 21.5 }, { "id": "s2", "temp": 19.0 } ] }))
        .unwrap();
    let before = converter.cache().clone();

    let err = converter
        .parse(&json!({ "sensors": [ { "id": "s3", "temp": 1.0 }, { "id": "s4", "temp": "hot" } ] }))
        .unwrap_err();

    assert!(matches!(err, ConvertError::InvalidLiteral { .. }));
    assert_eq!(converter.cache(), &before);
}

#[test]
fn reset_empties_the_cache() {
    let mut converter = converter(sensor_mapping());
    converter.parse(&json!({ "sensors": [ { "id": "s1" } ] })).unwrap();
    converter.reset();
    assert!(converter.cache().is_empty());
}

// ── Determinism ─────────────────────────────────────────────────

#[test]
fn same_tree_renders_identically_after_reset() {
    let mut converter = converter(building_mapping());
    let source = json!({
        "buildings": [
            { "code": "a", "name": "North", "rooms": [ { "number": 1 }, { "number": 2 } ] },
            { "code": "b", "name": "South" }
        ]
    });

    let first = all_statements(converter.parse(&source).unwrap());
    converter.reset();
    let second = all_statements(converter.parse(&source).unwrap());

    assert_eq!(first, second);
}

#[test]
fn unchanged_entity_keeps_its_statements() {
    let mut converter = converter(sensor_mapping());
    converter
        .parse(&json!({ "sensors": [ { "id": "s1", "temp": 21.5 }, { "id": "s2", "temp": 1.0 } ] }))
        .unwrap();
    let before = converter.cache().get("urn:sensor:s1").unwrap().statements.clone();

    let cache = converter
        .parse(&json!({ "sensors": [ { "id": "s1", "temp": 21.5 }, { "id": "s2", "temp": 2.0 } ] }))
        .unwrap();

    assert_eq!(cache.get("urn:sensor:s1").unwrap().statements, before);
}

#[test]
fn identifier_ignores_list_position() {
    let mut converter = converter(sensor_mapping());
    let first = converter
        .parse(&json!({ "sensors": [ { "id": "x", "temp": 1.0 }, { "id": "y" } ] }))
        .unwrap()
        .contains("urn:sensor:y");
    converter.reset();
    let second = converter
        .parse(&json!({ "sensors": [ { "id": "y" }, { "id": "x", "temp": 9.0 } ] }))
        .unwrap()
        .contains("urn:sensor:y");
    assert!(first && second);
}

// ── Statement emission ──────────────────────────────────────────

fn device_mapping() -> Value {
    json!({
        "skeleton": [ { "_mapping_id": "device" } ],
        "device": {
            "_id": { "static": "urn:device:", "param": "serial" },
            "_class": {
                "field_dependent": true,
                "field": "kind",
                "map": { "lamp": "http://example.org/Lamp", "plug": "http://example.org/Plug" }
            },
            "_object_properties": [
                { "field": "owner", "object_property_ori": "http://example.org/ownedBy",
                  "generate_id": "true", "_mapping_id": "person" },
                { "field": "state", "object_property_ori": "http://example.org/state",
                  "generate_id": "false", "map": { "on": "http://example.org/On", "off": "http://example.org/Off" } },
                { "field": "room", "object_property_ori": "http://example.org/locatedIn",
                  "generate_id": "custom" }
            ],
            "_location": { "longitude": "geo.lon", "latitude": "geo.lat" },
            "_hidden_values": {
                "meta.vendor": { "datatype_property_ori": "http://example.org/vendor", "type": "string" }
            },
            "active": { "datatype_property_ori": "http://example.org/active", "type": "boolean" },
            "watts": { "datatype_property_ori": "http://example.org/watts", "type": "integer" },
            "installed": { "datatype_property_ori": "http://example.org/installed", "type": "date" },
            "tags": { "datatype_property_ori": "http://example.org/tag", "type": "string" }
        },
        "person": {
            "_id": { "static": "urn:person:", "param": "name" },
            "_class": { "field_dependent": false, "value": "http://example.org/Person" }
        }
    })
}

fn device(overrides: Value) -> Value {
    let mut base = json!({
        "serial": "d1",
        "kind": "lamp",
        "geo": { "lon": 2.35, "lat": 48.85 },
        "meta": { "vendor": "Acme" },
        "active": true,
        "watts": 40,
        "installed": "2021-03-04 05:06:07",
        "tags": [ "a", "b" ],
        "owner": { "name": "bob" },
        "state": "on",
        "room": "kitchen",
        "_rev": 7
    });
    if let (Some(base), Some(overrides)) = (base.as_object_mut(), overrides.as_object()) {
        for (key, value) in overrides {
            base.insert(key.clone(), value.clone());
        }
    }
    json!([ base ])
}

#[test]
fn emits_statements_in_fixed_order() {
    let mut converter = converter(device_mapping())
        .with_identifier_fn(|value: &str, _predicate: &str| format!("urn:room:{value}"));
    let cache = converter.parse(&device(json!({}))).unwrap();

    let expected = [
        "<urn:device:d1>\ta\t<http://example.org/Lamp> .\n",
        "<urn:device:d1>\t<http://www.opengis.net/gml/pos>\t\"{\\\"type\\\": \\\"Point\\\", \\\"coordinates\\\": [2.35, 48.85]}\"^^xsd:string .\n",
        "<urn:device:d1>\t<http://example.org/vendor>\t\"Acme\"^^xsd:string .\n",
        "<urn:device:d1>\t<http://example.org/active>\t\"true\"^^xsd:boolean .\n",
        "<urn:device:d1>\t<http://example.org/watts>\t\"40\"^^xsd:integer .\n",
        "<urn:device:d1>\t<http://example.org/installed>\t\"2021-03-04T05:06:07.000Z\"^^xsd:date .\n",
        "<urn:device:d1>\t<http://example.org/tag>\t\"a\"^^xsd:string .\n",
        "<urn:device:d1>\t<http://example.org/tag>\t\"b\"^^xsd:string .\n",
        "<urn:device:d1>\t<http://example.org/ownedBy>\t<urn:person:bob> .\n",
        "<urn:device:d1>\t<http://example.org/state>\t<http://example.org/On> .\n",
        "<urn:device:d1>\t<http://example.org/locatedIn>\t<urn:room:kitchen> .\n",
        "\n",
    ]
    .concat();
    assert_eq!(cache.get("urn:device:d1").unwrap().statements, expected);
}

#[test]
fn field_dependent_class_follows_discriminator() {
    let mut converter = converter(device_mapping());
    let cache = converter.parse(&device(json!({ "kind": "plug" }))).unwrap();
    assert!(cache
        .get("urn:device:d1")
        .unwrap()
        .statements
        .starts_with("<urn:device:d1>\ta\t<http://example.org/Plug> .\n"));
}

#[test]
fn unknown_discriminator_is_unresolved_class() {
    let mut converter = converter(device_mapping());
    let err = converter.parse(&device(json!({ "kind": "fan" }))).unwrap_err();
    match err {
        ConvertError::UnresolvedClass { identifier, value, .. } => {
            assert_eq!(identifier, "urn:device:d1");
            assert_eq!(value, "fan");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn generated_targets_accept_lists() {
    let mut converter = converter(device_mapping());
    let cache = converter
        .parse(&device(json!({ "owner": [ { "name": "ann" }, null, { "name": "bob" } ] })))
        .unwrap();
    let statements = &cache.get("urn:device:d1").unwrap().statements;
    assert!(statements.contains("<http://example.org/ownedBy>\t<urn:person:ann> .\n"));
    assert!(statements.contains("<http://example.org/ownedBy>\t<urn:person:bob> .\n"));
}

#[test]
fn generated_target_from_scalar_is_type_mismatch() {
    let mut converter = converter(device_mapping());
    let err = converter.parse(&device(json!({ "owner": "bob" }))).unwrap_err();
    match err {
        ConvertError::PropertyTypeMismatch {
            identifier,
            predicate,
            found,
            ..
        } => {
            assert_eq!(identifier, "urn:device:d1");
            assert_eq!(predicate, "http://example.org/ownedBy");
            assert_eq!(found, "string");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn looked_up_value_missing_from_map_is_fatal() {
    let mut converter = converter(device_mapping());
    let err = converter.parse(&device(json!({ "state": "dimmed" }))).unwrap_err();
    assert!(matches!(err, ConvertError::UnknownMappedValue { value, .. } if value == "dimmed"));
}

#[test]
fn looked_up_lists_map_every_element() {
    let mut converter = converter(device_mapping());
    let cache = converter.parse(&device(json!({ "state": [ "on", "off" ] }))).unwrap();
    let statements = &cache.get("urn:device:d1").unwrap().statements;
    assert!(statements.contains("<http://example.org/state>\t<http://example.org/On> .\n"));
    assert!(statements.contains("<http://example.org/state>\t<http://example.org/Off> .\n"));
}

#[test]
fn custom_identifier_defaults_to_raw_value() {
    let mut converter = converter(device_mapping());
    let cache = converter.parse(&device(json!({}))).unwrap();
    assert!(cache
        .get("urn:device:d1")
        .unwrap()
        .statements
        .contains("<http://example.org/locatedIn>\t<kitchen> .\n"));
}

#[test]
fn custom_identifier_receives_predicate() {
    let mut converter = converter(device_mapping())
        .with_identifier_fn(|value: &str, predicate: &str| format!("{predicate}/{value}"));
    let cache = converter.parse(&device(json!({}))).unwrap();
    assert!(cache
        .get("urn:device:d1")
        .unwrap()
        .statements
        .contains("<http://example.org/locatedIn/kitchen>"));
}

#[test]
fn null_custom_value_is_missing() {
    let mut converter = converter(device_mapping());
    let err = converter.parse(&device(json!({ "room": null }))).unwrap_err();
    assert!(matches!(err, ConvertError::MissingCustomValue { .. }));
}

#[test]
fn missing_identifier_field_is_reported() {
    let mut converter = converter(sensor_mapping());
    let err = converter.parse(&json!({ "sensors": [ { "temp": 1.0 } ] })).unwrap_err();
    assert!(matches!(err, ConvertError::MissingField { segment, .. } if segment == "id"));
}

#[test]
fn structured_identifier_value_is_rejected() {
    let mut converter = converter(sensor_mapping());
    let err = converter.parse(&json!({ "sensors": [ { "id": { "x": 1 } } ] })).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidIdentifierValue { found: "object", .. }));
}

#[test]
fn null_data_values_emit_nothing() {
    let mut converter = converter(sensor_mapping());
    let cache = converter.parse(&json!({ "sensors": [ { "id": "s1", "temp": null } ] })).unwrap();
    assert_eq!(
        cache.get("urn:sensor:s1").unwrap().statements,
        format!("<urn:sensor:s1>\ta\t<{SENSOR}> .\n\n")
    );
}

// ── Unmapped keys ───────────────────────────────────────────────

#[test]
fn unmapped_keys_are_ignored_by_default() {
    let mut converter = converter(sensor_mapping());
    let cache = converter
        .parse(&json!({ "sensors": [ { "id": "s1", "colour": "red" } ] }))
        .unwrap();
    assert!(!cache.get("urn:sensor:s1").unwrap().statements.contains("red"));
}

#[test]
fn warn_policy_output_matches_ignore() {
    let source = json!({ "sensors": [ { "id": "s1", "temp": 2.5, "colour": "red" } ] });
    let render = |policy| {
        let config = ConvertConfig {
            unmapped_keys: policy,
            ..ConvertConfig::default()
        };
        let mut converter = converter_with(sensor_mapping(), config);
        all_statements(converter.parse(&source).unwrap())
    };

    let warned = render(UnmappedKeyPolicy::Warn);

    assert_eq!(warned, render(UnmappedKeyPolicy::Ignore));
    assert!(!warned.contains("red"));
}

#[test]
fn fail_policy_rejects_unmapped_keys() {
    let config = ConvertConfig {
        unmapped_keys: UnmappedKeyPolicy::Fail,
        ..ConvertConfig::default()
    };
    let mut converter = converter_with(sensor_mapping(), config);
    let err = converter
        .parse(&json!({ "sensors": [ { "id": "s1", "temp": 1.0, "colour": "red" } ] }))
        .unwrap_err();
    match err {
        ConvertError::UnmappedKey { identifier, key } => {
            assert_eq!(identifier, "urn:sensor:s1");
            assert_eq!(key, "colour");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reserved_keys_never_count_as_unmapped() {
    let config = ConvertConfig {
        unmapped_keys: UnmappedKeyPolicy::Fail,
        ..ConvertConfig::default()
    };
    let mapping = json!({
        "skeleton": { "sensors": [ { "_mapping_id": "sensor" } ] },
        "sensor": {
            "_id": { "static": "urn:sensor:", "param": "id" },
            "_class": { "field_dependent": false, "value": SENSOR },
            "id": { "datatype_property_ori": "http://example.org/id", "type": "string" }
        }
    });
    let mut converter = converter_with(mapping, config);
    assert!(converter.parse(&json!({ "sensors": [ { "id": "s1", "_rev": 3 } ] })).is_ok());
}

#[test]
fn structural_keys_never_count_as_unmapped() {
    let strict = || ConvertConfig {
        unmapped_keys: UnmappedKeyPolicy::Fail,
        ..ConvertConfig::default()
    };

    let mut buildings = converter_with(building_mapping(), strict());
    let source = json!({
        "buildings": [ { "code": "B1", "name": "Main", "rooms": [ { "number": 101 } ] } ]
    });
    assert!(buildings.parse(&source).is_ok());

    let mut nodes = converter_with(linked_list_mapping(), strict());
    assert!(nodes.parse(&linked_list(3)).is_ok());
}

#[test]
fn custom_separator_applies_to_paths() {
    let mapping = json!({
        "skeleton": [ { "_mapping_id": "thing" } ],
        "thing": {
            "_id": { "static": "urn:thing:", "param": "ids/0" },
            "_class": { "field_dependent": false, "value": "http://example.org/Thing" }
        }
    });
    let config = ConvertConfig {
        separator: "/".to_string(),
        ..ConvertConfig::default()
    };
    let mut converter = converter_with(mapping, config);
    let cache = converter.parse(&json!([ { "ids": [ "t9" ] } ])).unwrap();
    assert!(cache.contains("urn:thing:t9"));
}
