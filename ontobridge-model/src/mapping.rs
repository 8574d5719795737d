//! The declarative mapping document.
//!
//! A mapping document is a JSON object with one required `skeleton` key; every
//! other top-level key names an entity mapping:
//!
//! ```json
//! {
//!   "skeleton": { "sensors": [ { "_mapping_id": "sensor" } ] },
//!   "sensor": {
//!     "_id": { "static": "urn:sensor:", "param": "id" },
//!     "_class": { "field_dependent": false, "value": "http://example.org/Sensor" },
//!     "temp": { "datatype_property_ori": "http://example.org/hasTemperature", "type": "float" }
//!   }
//! }
//! ```

use crate::error::{MappingError, MappingResult};
use crate::scalar::ScalarKind;
use crate::skeleton::Skeleton;
use indexmap::IndexMap;
use serde_json::{Map, Value};

const ID_KEY: &str = "_id";
const CLASS_KEY: &str = "_class";
const OBJECT_PROPERTIES_KEY: &str = "_object_properties";
const LOCATION_KEY: &str = "_location";
const HIDDEN_VALUES_KEY: &str = "_hidden_values";

/// A parsed, validated mapping document.
#[derive(Debug, Clone)]
pub struct MappingSpec {
    skeleton: Skeleton,
    mappings: IndexMap<String, EntityMapping>,
}

impl MappingSpec {
    /// Parses a mapping document from JSON text.
    pub fn from_json_str(text: &str) -> MappingResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Parses a mapping document from an already decoded JSON value.
    pub fn from_value(value: &Value) -> MappingResult<Self> {
        let document = value.as_object().ok_or(MappingError::MissingSkeleton)?;
        let skeleton_value = document.get("skeleton").ok_or(MappingError::MissingSkeleton)?;
        let skeleton = Skeleton::from_value(skeleton_value)?;

        let mut mappings = IndexMap::new();
        for (name, body) in document {
            if name == "skeleton" || name.starts_with('_') {
                continue;
            }
            mappings.insert(name.clone(), EntityMapping::from_value(name, body)?);
        }

        let spec = Self { skeleton, mappings };
        spec.validate_references()?;
        Ok(spec)
    }

    /// Creates a spec from already built parts, validating cross references.
    pub fn new(skeleton: Skeleton, mappings: IndexMap<String, EntityMapping>) -> MappingResult<Self> {
        let spec = Self { skeleton, mappings };
        spec.validate_references()?;
        Ok(spec)
    }

    /// The root skeleton.
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Looks up an entity mapping by id.
    pub fn mapping(&self, id: &str) -> Option<&EntityMapping> {
        self.mappings.get(id)
    }

    /// All entity mappings, in document order.
    pub fn mappings(&self) -> impl Iterator<Item = (&str, &EntityMapping)> {
        self.mappings.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn validate_references(&self) -> MappingResult<()> {
        for mapping_id in self.skeleton.mapping_ids() {
            if !self.mappings.contains_key(mapping_id) {
                return Err(MappingError::UnknownMapping {
                    mapping_id: mapping_id.to_string(),
                    referenced_from: "skeleton".to_string(),
                });
            }
        }

        for (name, mapping) in &self.mappings {
            for rule in &mapping.object_properties {
                if let IdResolution::Generated { mapping_id } = &rule.resolution {
                    if !self.mappings.contains_key(mapping_id) {
                        return Err(MappingError::UnknownMapping {
                            mapping_id: mapping_id.clone(),
                            referenced_from: format!("{name}.{}", rule.field),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// How one entity type is identified, classified, and turned into statements.
#[derive(Debug, Clone)]
pub struct EntityMapping {
    pub id: IdTemplate,
    pub class: ClassRule,
    pub object_properties: Vec<ObjectPropertyRule>,
    /// Data property rules keyed by top-level data key.
    pub data_properties: IndexMap<String, DataPropertyRule>,
    pub location: Option<LocationRule>,
    /// Data property rules keyed by value path, for values that are not direct keys.
    pub hidden_values: IndexMap<String, DataPropertyRule>,
}

impl EntityMapping {
    fn from_value(name: &str, value: &Value) -> MappingResult<Self> {
        let body = value
            .as_object()
            .ok_or_else(|| MappingError::MissingIdTemplate {
                mapping: name.to_string(),
            })?;

        let id = IdTemplate::from_object(name, body)?;
        let class = ClassRule::from_object(name, body)?;

        let object_properties = match body.get(OBJECT_PROPERTIES_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(rules)) => rules
                .iter()
                .map(|rule| ObjectPropertyRule::from_value(name, rule))
                .collect::<MappingResult<_>>()?,
            Some(_) => {
                return Err(MappingError::InvalidObjectProperty {
                    mapping: name.to_string(),
                    field: OBJECT_PROPERTIES_KEY.to_string(),
                    reason: "expected a list of rules".to_string(),
                });
            }
        };

        let location = match body.get(LOCATION_KEY) {
            Some(Value::Object(rule)) => Some(LocationRule::from_object(name, rule)?),
            _ => None,
        };

        let mut hidden_values = IndexMap::new();
        if let Some(Value::Object(hidden)) = body.get(HIDDEN_VALUES_KEY) {
            for (path, rule) in hidden {
                hidden_values.insert(path.clone(), DataPropertyRule::from_value(name, path, rule)?);
            }
        }

        let mut data_properties = IndexMap::new();
        for (key, rule) in body {
            if key.starts_with('_') {
                continue;
            }
            data_properties.insert(key.clone(), DataPropertyRule::from_value(name, key, rule)?);
        }

        Ok(Self {
            id,
            class,
            object_properties,
            data_properties,
            location,
            hidden_values,
        })
    }
}

/// Identifier template: `prefix + string(value at param)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTemplate {
    pub prefix: String,
    /// Value path of the identifying value inside the entity's data node.
    pub param: String,
}

impl IdTemplate {
    pub fn new(prefix: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            param: param.into(),
        }
    }

    /// Renders the identifier for an already stringified id value.
    pub fn render(&self, value: &str) -> String {
        format!("{}{}", self.prefix, value)
    }

    fn from_object(mapping: &str, body: &Map<String, Value>) -> MappingResult<Self> {
        let missing = || MappingError::MissingIdTemplate {
            mapping: mapping.to_string(),
        };
        let template = body.get(ID_KEY).and_then(Value::as_object).ok_or_else(missing)?;
        let param = template.get("param").and_then(Value::as_str).ok_or_else(missing)?;
        let prefix = template.get("static").and_then(Value::as_str).unwrap_or_default();
        Ok(Self::new(prefix, param))
    }
}

/// How an entity's class is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRule {
    /// Every entity of this mapping gets the same class.
    Fixed(String),
    /// The class depends on the value of a discriminator field.
    FieldDependent {
        field: String,
        map: IndexMap<String, String>,
    },
}

impl ClassRule {
    fn from_object(mapping: &str, body: &Map<String, Value>) -> MappingResult<Self> {
        let invalid = |reason: &str| MappingError::InvalidClassRule {
            mapping: mapping.to_string(),
            reason: reason.to_string(),
        };
        let rule = body
            .get(CLASS_KEY)
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("missing class rule"))?;

        if flag(rule.get("field_dependent")).unwrap_or(false) {
            let field = rule
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("field dependent class requires \"field\""))?;
            let map = string_map(rule.get("map"))
                .ok_or_else(|| invalid("field dependent class requires a string \"map\""))?;
            Ok(Self::FieldDependent {
                field: field.to_string(),
                map,
            })
        } else {
            let value = rule
                .get("value")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("fixed class requires \"value\""))?;
            Ok(Self::Fixed(value.to_string()))
        }
    }
}

/// Binds a data field to an object property predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPropertyRule {
    /// The data key this rule binds to.
    pub field: String,
    pub predicate: String,
    pub resolution: IdResolution,
}

impl ObjectPropertyRule {
    fn from_value(mapping: &str, value: &Value) -> MappingResult<Self> {
        let rule = value.as_object();
        let field = rule
            .and_then(|r| r.get("field"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let invalid = |reason: &str| MappingError::InvalidObjectProperty {
            mapping: mapping.to_string(),
            field: field.clone(),
            reason: reason.to_string(),
        };

        let rule = rule.ok_or_else(|| invalid("expected an object"))?;
        if field.is_empty() {
            return Err(invalid("missing \"field\""));
        }
        let predicate = rule
            .get("object_property_ori")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing \"object_property_ori\""))?
            .to_string();

        let resolution = match rule.get("generate_id") {
            None | Some(Value::Null) => return Err(invalid("missing \"generate_id\"")),
            Some(mode) => match flag(Some(mode)) {
                Some(true) => {
                    let mapping_id = rule
                        .get("_mapping_id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("generated identifiers require \"_mapping_id\""))?;
                    IdResolution::Generated {
                        mapping_id: mapping_id.to_string(),
                    }
                }
                Some(false) => {
                    let map = string_map(rule.get("map"))
                        .ok_or_else(|| invalid("looked-up identifiers require a string \"map\""))?;
                    IdResolution::LookedUp { map }
                }
                None => IdResolution::Custom,
            },
        };

        Ok(Self {
            field,
            predicate,
            resolution,
        })
    }
}

/// How the target identifier of an object property is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdResolution {
    /// Built from the named mapping's id template applied to the property value.
    Generated { mapping_id: String },
    /// Looked up in an explicit value → identifier map.
    LookedUp { map: IndexMap<String, String> },
    /// Delegated to the injected identifier function.
    Custom,
}

/// Data property rule: predicate and literal type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPropertyRule {
    pub predicate: String,
    pub kind: ScalarKind,
}

impl DataPropertyRule {
    pub fn new(predicate: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            predicate: predicate.into(),
            kind,
        }
    }

    fn from_value(mapping: &str, key: &str, value: &Value) -> MappingResult<Self> {
        let invalid = |reason: &str| MappingError::InvalidDataProperty {
            mapping: mapping.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let rule = value.as_object().ok_or_else(|| invalid("expected an object"))?;
        let predicate = rule
            .get("datatype_property_ori")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing \"datatype_property_ori\""))?;
        let kind = rule
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing \"type\""))?;
        let kind = kind
            .parse::<ScalarKind>()
            .map_err(|kind| MappingError::UnknownScalarKind {
                mapping: mapping.to_string(),
                key: key.to_string(),
                kind,
            })?;
        Ok(Self::new(predicate, kind))
    }
}

/// Longitude/latitude value paths for the geolocation statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRule {
    pub longitude: String,
    pub latitude: String,
}

impl LocationRule {
    fn from_object(mapping: &str, rule: &Map<String, Value>) -> MappingResult<Self> {
        let path = |axis: &str| {
            rule.get(axis)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| MappingError::InvalidDataProperty {
                    mapping: mapping.to_string(),
                    key: LOCATION_KEY.to_string(),
                    reason: format!("missing \"{axis}\""),
                })
        };
        Ok(Self {
            longitude: path("longitude")?,
            latitude: path("latitude")?,
        })
    }
}

/// Reads a boolean flag that may be written as a JSON boolean or as "true"/"false".
fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn string_map(value: Option<&Value>) -> Option<IndexMap<String, String>> {
    value?
        .as_object()?
        .iter()
        .map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
        .collect()
}
