use ontobridge_model::{
    ClassRule, IdResolution, MappingError, MappingSpec, ScalarKind, Skeleton,
};
use serde_json::json;

fn sensor_mapping() -> serde_json::Value {
    json!({
        "skeleton": { "sensors": [ { "_mapping_id": "sensor" } ] },
        "sensor": {
            "_id": { "static": "urn:sensor:", "param": "id" },
            "_class": { "field_dependent": false, "value": "http://example.org/Sensor" },
            "temp": { "datatype_property_ori": "http://example.org/hasTemperature", "type": "float" }
        }
    })
}

// ── Document shape ───────────────────────────────────────────────

#[test]
fn parses_minimal_document() {
    let spec = MappingSpec::from_value(&sensor_mapping()).unwrap();
    let sensor = spec.mapping("sensor").unwrap();

    assert_eq!(sensor.id.prefix, "urn:sensor:");
    assert_eq!(sensor.id.param, "id");
    assert_eq!(sensor.class, ClassRule::Fixed("http://example.org/Sensor".into()));
    assert_eq!(sensor.data_properties.len(), 1);
    assert_eq!(sensor.data_properties["temp"].kind, ScalarKind::Float);
    assert!(sensor.object_properties.is_empty());
    assert!(sensor.location.is_none());
}

#[test]
fn parses_from_json_text() {
    let text = sensor_mapping().to_string();
    let spec = MappingSpec::from_json_str(&text).unwrap();
    assert_eq!(spec.mappings().count(), 1);
}

#[test]
fn invalid_json_text_is_rejected() {
    let err = MappingSpec::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, MappingError::Json(_)));
}

#[test]
fn missing_skeleton_is_rejected() {
    let err = MappingSpec::from_value(&json!({ "sensor": {} })).unwrap_err();
    assert!(matches!(err, MappingError::MissingSkeleton));
}

#[test]
fn missing_id_template_names_mapping() {
    let mut doc = sensor_mapping();
    doc["sensor"].as_object_mut().unwrap().remove("_id");

    let err = MappingSpec::from_value(&doc).unwrap_err();
    match err {
        MappingError::MissingIdTemplate { mapping } => assert_eq!(mapping, "sensor"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_static_prefix_defaults_to_empty() {
    let mut doc = sensor_mapping();
    doc["sensor"]["_id"] = json!({ "param": "id" });

    let spec = MappingSpec::from_value(&doc).unwrap();
    assert_eq!(spec.mapping("sensor").unwrap().id.prefix, "");
}

#[test]
fn unknown_scalar_kind_is_rejected() {
    let mut doc = sensor_mapping();
    doc["sensor"]["temp"]["type"] = json!("decimal");

    let err = MappingSpec::from_value(&doc).unwrap_err();
    assert!(matches!(err, MappingError::UnknownScalarKind { kind, .. } if kind == "decimal"));
}

#[test]
fn skeleton_referencing_unknown_mapping_is_rejected() {
    let doc = json!({
        "skeleton": [ { "_mapping_id": "ghost" } ],
    });
    let err = MappingSpec::from_value(&doc).unwrap_err();
    assert!(matches!(err, MappingError::UnknownMapping { mapping_id, .. } if mapping_id == "ghost"));
}

// ── Class rules ──────────────────────────────────────────────────

#[test]
fn parses_field_dependent_class() {
    let mut doc = sensor_mapping();
    doc["sensor"]["_class"] = json!({
        "field_dependent": true,
        "field": "kind",
        "map": { "thermo": "http://example.org/Thermometer" }
    });

    let spec = MappingSpec::from_value(&doc).unwrap();
    match &spec.mapping("sensor").unwrap().class {
        ClassRule::FieldDependent { field, map } => {
            assert_eq!(field, "kind");
            assert_eq!(map["thermo"], "http://example.org/Thermometer");
        }
        other => panic!("expected field dependent class, got {other:?}"),
    }
}

#[test]
fn fixed_class_without_value_is_rejected() {
    let mut doc = sensor_mapping();
    doc["sensor"]["_class"] = json!({ "field_dependent": false });
    let err = MappingSpec::from_value(&doc).unwrap_err();
    assert!(matches!(err, MappingError::InvalidClassRule { .. }));
}

// ── Object property rules ────────────────────────────────────────

#[test]
fn parses_all_three_resolution_modes() {
    let doc = json!({
        "skeleton": [ { "_mapping_id": "room" } ],
        "room": {
            "_id": { "static": "urn:room:", "param": "id" },
            "_class": { "field_dependent": false, "value": "urn:Room" },
            "_object_properties": [
                { "field": "building", "object_property_ori": "urn:inBuilding",
                  "generate_id": "true", "_mapping_id": "building" },
                { "field": "floor", "object_property_ori": "urn:onFloor",
                  "generate_id": "false", "map": { "1": "urn:floor:one" } },
                { "field": "owner", "object_property_ori": "urn:ownedBy",
                  "generate_id": "custom" }
            ]
        },
        "building": {
            "_id": { "static": "urn:building:", "param": "code" },
            "_class": { "field_dependent": false, "value": "urn:Building" }
        }
    });

    let spec = MappingSpec::from_value(&doc).unwrap();
    let rules = &spec.mapping("room").unwrap().object_properties;
    assert_eq!(rules.len(), 3);
    assert_eq!(
        rules[0].resolution,
        IdResolution::Generated { mapping_id: "building".into() }
    );
    assert!(matches!(&rules[1].resolution, IdResolution::LookedUp { map } if map["1"] == "urn:floor:one"));
    assert_eq!(rules[2].resolution, IdResolution::Custom);
    assert_eq!(rules[2].predicate, "urn:ownedBy");
}

#[test]
fn generated_mode_accepts_json_boolean() {
    let doc = json!({
        "skeleton": [ { "_mapping_id": "a" } ],
        "a": {
            "_id": { "param": "id" },
            "_class": { "field_dependent": "false", "value": "urn:A" },
            "_object_properties": [
                { "field": "peer", "object_property_ori": "urn:p", "generate_id": true, "_mapping_id": "a" }
            ]
        }
    });
    let spec = MappingSpec::from_value(&doc).unwrap();
    assert!(matches!(
        spec.mapping("a").unwrap().object_properties[0].resolution,
        IdResolution::Generated { .. }
    ));
}

#[test]
fn generated_mode_with_unknown_target_is_rejected() {
    let doc = json!({
        "skeleton": [ { "_mapping_id": "a" } ],
        "a": {
            "_id": { "param": "id" },
            "_class": { "field_dependent": false, "value": "urn:A" },
            "_object_properties": [
                { "field": "peer", "object_property_ori": "urn:p", "generate_id": "true", "_mapping_id": "nope" }
            ]
        }
    });
    let err = MappingSpec::from_value(&doc).unwrap_err();
    match err {
        MappingError::UnknownMapping { mapping_id, referenced_from } => {
            assert_eq!(mapping_id, "nope");
            assert_eq!(referenced_from, "a.peer");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn looked_up_mode_without_map_is_rejected() {
    let doc = json!({
        "skeleton": [ { "_mapping_id": "a" } ],
        "a": {
            "_id": { "param": "id" },
            "_class": { "field_dependent": false, "value": "urn:A" },
            "_object_properties": [
                { "field": "peer", "object_property_ori": "urn:p", "generate_id": "false" }
            ]
        }
    });
    let err = MappingSpec::from_value(&doc).unwrap_err();
    assert!(matches!(err, MappingError::InvalidObjectProperty { field, .. } if field == "peer"));
}

// ── Location and hidden values ───────────────────────────────────

#[test]
fn parses_location_and_hidden_values() {
    let mut doc = sensor_mapping();
    doc["sensor"]["_location"] = json!({ "longitude": "geo.lon", "latitude": "geo.lat" });
    doc["sensor"]["_hidden_values"] = json!({
        "meta.serial": { "datatype_property_ori": "urn:serial", "type": "string" }
    });

    let spec = MappingSpec::from_value(&doc).unwrap();
    let sensor = spec.mapping("sensor").unwrap();
    let location = sensor.location.as_ref().unwrap();
    assert_eq!(location.longitude, "geo.lon");
    assert_eq!(location.latitude, "geo.lat");
    assert_eq!(sensor.hidden_values["meta.serial"].kind, ScalarKind::String);
    // "_"-prefixed keys never become data properties
    assert!(!sensor.data_properties.contains_key("_hidden_values"));
}

// ── Skeletons ────────────────────────────────────────────────────

#[test]
fn container_skeleton_descends_into_keys() {
    let spec = MappingSpec::from_value(&sensor_mapping()).unwrap();
    match spec.skeleton() {
        Skeleton::Container(children) => match &children["sensors"] {
            Skeleton::List(inner) => {
                assert!(matches!(inner.as_ref(), Skeleton::Entity(e) if e.mapping_id == "sensor"));
            }
            other => panic!("expected list, got {other:?}"),
        },
        other => panic!("expected container, got {other:?}"),
    }
}

#[test]
fn recursive_skeleton_keeps_field() {
    let skeleton = Skeleton::from_value(&json!({
        "_mapping_id": "node",
        "_recursive": true,
        "_recursive_field": "next"
    }))
    .unwrap();
    match skeleton {
        Skeleton::Entity(e) => {
            assert_eq!(e.recursive_field.as_deref(), Some("next"));
            assert!(e.children.is_empty());
        }
        other => panic!("expected entity, got {other:?}"),
    }
}

#[test]
fn recursive_without_field_disables_recursion() {
    let skeleton = Skeleton::from_value(&json!({ "_mapping_id": "node", "_recursive": true })).unwrap();
    assert!(matches!(skeleton, Skeleton::Entity(e) if e.recursive_field.is_none()));
}

#[test]
fn list_skeleton_needs_exactly_one_element() {
    let err = Skeleton::from_value(&json!([{ "_mapping_id": "a" }, { "_mapping_id": "b" }])).unwrap_err();
    assert!(matches!(err, MappingError::MalformedSkeleton { .. }));
}

#[test]
fn mapping_ids_walks_whole_tree() {
    let skeleton = Skeleton::from_value(&json!({
        "_mapping_id": "site",
        "rooms": [ { "_mapping_id": "room", "sensors": [ { "_mapping_id": "sensor" } ] } ]
    }))
    .unwrap();
    let mut ids = skeleton.mapping_ids();
    ids.sort();
    assert_eq!(ids, vec!["room", "sensor", "site"]);
}
