//! Renders one entity's statements.

use crate::config::UnmappedKeyPolicy;
use crate::error::{json_type_name, ConvertError, ConvertResult};
use crate::identifier::IdentifierFn;
use crate::literal::{lexical_form, scalar_text};
use crate::resolver::ValueResolver;
use ontobridge_model::wire;
use ontobridge_model::{
    ClassRule, DataPropertyRule, EntityMapping, EntitySkeleton, IdResolution, MappingError,
    MappingSpec, ObjectPropertyRule, ScalarKind,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Produces the statement text of an entity from its mapping and data node.
///
/// Output order: class declaration, geolocation, hidden values, then one or
/// more statements per top-level data key in data order.
pub struct StatementEmitter<'a> {
    spec: &'a MappingSpec,
    resolver: &'a ValueResolver,
    identifiers: &'a dyn IdentifierFn,
    unmapped_keys: UnmappedKeyPolicy,
}

impl<'a> StatementEmitter<'a> {
    pub fn new(
        spec: &'a MappingSpec,
        resolver: &'a ValueResolver,
        identifiers: &'a dyn IdentifierFn,
        unmapped_keys: UnmappedKeyPolicy,
    ) -> Self {
        Self {
            spec,
            resolver,
            identifiers,
            unmapped_keys,
        }
    }

    /// Renders the full statement block for `identifier`.
    ///
    /// `skeleton` is the node that bound the entity; keys it descends into are
    /// structure, not data, and never count as unmapped.
    pub fn emit(
        &self,
        identifier: &str,
        mapping: &EntityMapping,
        skeleton: &EntitySkeleton,
        data: &Value,
    ) -> ConvertResult<String> {
        let mut out = self.class_declaration(identifier, mapping, data)?;

        if let Some(location) = &mapping.location {
            let longitude = self.coordinate(identifier, &location.longitude, data)?;
            let latitude = self.coordinate(identifier, &location.latitude, data)?;
            let point = format!("{{\"type\": \"Point\", \"coordinates\": [{longitude}, {latitude}]}}");
            out.push_str(&wire::data_statement(
                identifier,
                wire::GEO_POSITION_PREDICATE,
                &wire::literal(&point, ScalarKind::String.xsd_type()),
            ));
        }

        for (path, rule) in &mapping.hidden_values {
            let value = self.resolver.resolve(path, data)?;
            self.data_property(identifier, rule, value, &mut out)?;
        }

        if let Some(fields) = data.as_object() {
            for (key, value) in fields {
                if key.starts_with('_') {
                    warn!(
                        "Detected key {} while processing individual {}: fields starting with \"_\" are ignored",
                        key, identifier
                    );
                    continue;
                }

                let mut is_object_property = false;
                for rule in mapping.object_properties.iter().filter(|r| r.field == *key) {
                    is_object_property = true;
                    self.object_property(identifier, rule, value, &mut out)?;
                }
                if is_object_property {
                    continue;
                }

                match mapping.data_properties.get(key) {
                    Some(rule) => self.data_property(identifier, rule, value, &mut out)?,
                    None if self.is_structural(key, mapping, skeleton) => {}
                    None => self.unmapped(identifier, key)?,
                }
            }
        }

        out.push_str(wire::ENTITY_TERMINATOR);
        Ok(out)
    }

    fn class_declaration(&self, identifier: &str, mapping: &EntityMapping, data: &Value) -> ConvertResult<String> {
        let class = match &mapping.class {
            ClassRule::Fixed(class) => class,
            ClassRule::FieldDependent { field, map } => {
                let raw = self.resolver.resolve(field, data)?;
                let value = scalar_text(raw).unwrap_or_else(|| raw.to_string());
                map.get(&value).ok_or_else(|| ConvertError::UnresolvedClass {
                    identifier: identifier.to_string(),
                    field: field.clone(),
                    value,
                })?
            }
        };
        Ok(wire::class_statement(identifier, class))
    }

    fn coordinate(&self, identifier: &str, path: &str, data: &Value) -> ConvertResult<String> {
        let value = self.resolver.resolve(path, data)?;
        match value {
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) if s.trim().parse::<f64>().is_ok() => Ok(s.trim().to_string()),
            other => Err(ConvertError::InvalidLiteral {
                identifier: identifier.to_string(),
                predicate: wire::GEO_POSITION_PREDICATE.to_string(),
                kind: ScalarKind::Double,
                value: other.to_string(),
            }),
        }
    }

    fn data_property(
        &self,
        identifier: &str,
        rule: &DataPropertyRule,
        value: &Value,
        out: &mut String,
    ) -> ConvertResult<()> {
        let values = match value {
            Value::Null => return Ok(()),
            Value::Array(items) => items.iter().collect(),
            scalar => vec![scalar],
        };

        for value in values.into_iter().filter(|v| !v.is_null()) {
            let lexical = lexical_form(rule.kind, value).ok_or_else(|| ConvertError::InvalidLiteral {
                identifier: identifier.to_string(),
                predicate: rule.predicate.clone(),
                kind: rule.kind,
                value: value.to_string(),
            })?;
            out.push_str(&wire::data_statement(
                identifier,
                &rule.predicate,
                &wire::literal(&lexical, rule.kind.xsd_type()),
            ));
        }
        Ok(())
    }

    fn object_property(
        &self,
        identifier: &str,
        rule: &ObjectPropertyRule,
        value: &Value,
        out: &mut String,
    ) -> ConvertResult<()> {
        let targets = match &rule.resolution {
            IdResolution::Generated { mapping_id } => self.generated_targets(identifier, rule, mapping_id, value)?,
            IdResolution::LookedUp { map } => {
                let lookup = |raw: &Value| -> ConvertResult<String> {
                    let key = raw.as_str().ok_or_else(|| mismatch(identifier, rule, "string", raw))?;
                    map.get(key).cloned().ok_or_else(|| ConvertError::UnknownMappedValue {
                        identifier: identifier.to_string(),
                        predicate: rule.predicate.clone(),
                        value: key.to_string(),
                    })
                };
                match value {
                    Value::Array(items) => items.iter().map(lookup).collect::<ConvertResult<_>>()?,
                    Value::String(_) => vec![lookup(value)?],
                    other => return Err(mismatch(identifier, rule, "string or list of strings", other)),
                }
            }
            IdResolution::Custom => {
                let custom = |raw: &Value| -> ConvertResult<String> {
                    match raw {
                        Value::Null => Err(ConvertError::MissingCustomValue {
                            identifier: identifier.to_string(),
                            predicate: rule.predicate.clone(),
                        }),
                        Value::String(s) => Ok(self.identifiers.identifier(s, &rule.predicate)),
                        other => Err(mismatch(identifier, rule, "string", other)),
                    }
                };
                match value {
                    Value::Array(items) => items.iter().map(custom).collect::<ConvertResult<_>>()?,
                    single => vec![custom(single)?],
                }
            }
        };

        for target in targets {
            debug!("{} --{}--> {}", identifier, rule.predicate, target);
            out.push_str(&wire::object_statement(identifier, &rule.predicate, &target));
        }
        Ok(())
    }

    fn generated_targets(
        &self,
        identifier: &str,
        rule: &ObjectPropertyRule,
        mapping_id: &str,
        value: &Value,
    ) -> ConvertResult<Vec<String>> {
        let target = self.spec.mapping(mapping_id).ok_or_else(|| MappingError::UnknownMapping {
            mapping_id: mapping_id.to_string(),
            referenced_from: rule.field.clone(),
        })?;

        let generate = |raw: &Value| -> ConvertResult<String> {
            if !raw.is_object() {
                return Err(mismatch(identifier, rule, "object", raw));
            }
            let id_value = self.resolver.resolve(&target.id.param, raw)?;
            let text = scalar_text(id_value).ok_or_else(|| ConvertError::InvalidIdentifierValue {
                mapping: mapping_id.to_string(),
                path: target.id.param.clone(),
                found: json_type_name(id_value),
            })?;
            Ok(target.id.render(&text))
        };

        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.iter().filter(|v| !v.is_null()).map(generate).collect(),
            Value::Object(_) => Ok(vec![generate(value)?]),
            other => Err(mismatch(identifier, rule, "object or list of objects", other)),
        }
    }

    /// Keys read by the identifier template, class discriminator, location,
    /// hidden values, child skeletons or the recursive field.
    fn is_structural(&self, key: &str, mapping: &EntityMapping, skeleton: &EntitySkeleton) -> bool {
        if skeleton.children.contains_key(key) || skeleton.recursive_field.as_deref() == Some(key) {
            return true;
        }
        let head = |path: &str| path.split(self.resolver.separator()).next() == Some(key);
        let class_field = match &mapping.class {
            ClassRule::FieldDependent { field, .. } => head(field),
            ClassRule::Fixed(_) => false,
        };
        head(&mapping.id.param)
            || class_field
            || mapping
                .location
                .as_ref()
                .is_some_and(|l| head(&l.longitude) || head(&l.latitude))
            || mapping.hidden_values.keys().any(|path| head(path))
    }

    fn unmapped(&self, identifier: &str, key: &str) -> ConvertResult<()> {
        match self.unmapped_keys {
            UnmappedKeyPolicy::Ignore => Ok(()),
            UnmappedKeyPolicy::Warn => {
                warn!("No mapping rule for key {} of individual {}, skipping", key, identifier);
                Ok(())
            }
            UnmappedKeyPolicy::Fail => Err(ConvertError::UnmappedKey {
                identifier: identifier.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

fn mismatch(identifier: &str, rule: &ObjectPropertyRule, expected: &'static str, found: &Value) -> ConvertError {
    ConvertError::PropertyTypeMismatch {
        identifier: identifier.to_string(),
        predicate: rule.predicate.clone(),
        expected,
        found: json_type_name(found),
    }
}
