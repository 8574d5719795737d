//! The transformation walk over the skeleton tree.
//!
//! The walk uses an explicit work stack so that deeply self-nested source data
//! (recursive skeletons) is bounded by [`ConvertConfig::max_depth`] instead of
//! the native call stack.

use crate::config::ConvertConfig;
use crate::emitter::StatementEmitter;
use crate::error::{json_type_name, ConvertError, ConvertResult};
use crate::identifier::{IdentifierFn, IdentityFn};
use crate::literal::scalar_text;
use crate::resolver::ValueResolver;
use ontobridge_model::{Entity, EntityCache, EntityMapping, EntitySkeleton, MappingError, MappingSpec, Skeleton};
use serde_json::Value;
use std::mem;
use tracing::{debug, info};

/// Transforms complete source trees into a durable [`EntityCache`].
///
/// Every call to [`parse`](Self::parse) is a full reconciliation: entities
/// that no longer appear in the source are swept from the cache.
pub struct Converter {
    spec: MappingSpec,
    config: ConvertConfig,
    resolver: ValueResolver,
    identifiers: Box<dyn IdentifierFn>,
    cache: EntityCache,
}

/// Where a finished entity is inserted.
#[derive(Debug, Clone, Copy)]
enum Target {
    Root,
    /// The children of the pending entity at this index.
    Pending(usize),
}

enum Frame<'s, 'v> {
    Visit {
        skeleton: &'s Skeleton,
        data: &'v Value,
        target: Target,
        depth: usize,
    },
    Finish {
        mapping: &'s EntityMapping,
        skeleton: &'s EntitySkeleton,
        data: &'v Value,
        target: Target,
    },
}

/// An entity whose sub-skeletons are still being processed.
struct Pending {
    identifier: String,
    children: EntityCache,
}

impl Converter {
    /// Creates a converter with an empty cache and the identity custom
    /// identifier function.
    pub fn new(spec: MappingSpec, config: ConvertConfig) -> Self {
        let resolver = ValueResolver::new(config.separator.clone());
        Self {
            spec,
            config,
            resolver,
            identifiers: Box::new(IdentityFn),
            cache: EntityCache::new(),
        }
    }

    /// Replaces the identifier function used by custom-mode object properties.
    pub fn with_identifier_fn(mut self, identifiers: impl IdentifierFn + 'static) -> Self {
        self.identifiers = Box::new(identifiers);
        self
    }

    pub fn spec(&self) -> &MappingSpec {
        &self.spec
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// The cache as of the last successful pass.
    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn into_cache(self) -> EntityCache {
        self.cache
    }

    /// Drops every cached entity.
    pub fn reset(&mut self) {
        self.cache.clear();
    }

    /// Reconciles the cache against a complete source tree.
    ///
    /// Runs mark, build, and sweep on a working copy; the cache is replaced
    /// only if the whole pass succeeds.
    pub fn parse(&mut self, data: &Value) -> ConvertResult<&EntityCache> {
        let mut working = self.cache.clone();
        working.mark_all_dead();
        self.build(&mut working, data)?;
        let removed = working.sweep();

        info!(
            "Converted source tree: {} top-level entities, {} total, {} removed",
            working.len(),
            working.total_len(),
            removed
        );
        self.cache = working;
        Ok(&self.cache)
    }

    fn build(&self, root: &mut EntityCache, data: &Value) -> ConvertResult<()> {
        let emitter = StatementEmitter::new(
            &self.spec,
            &self.resolver,
            &*self.identifiers,
            self.config.unmapped_keys,
        );

        let mut pending: Vec<Pending> = Vec::new();
        let mut stack = vec![Frame::Visit {
            skeleton: self.spec.skeleton(),
            data,
            target: Target::Root,
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit {
                    skeleton,
                    data,
                    target,
                    depth,
                } => {
                    if data.is_null() {
                        continue;
                    }
                    match skeleton {
                        Skeleton::List(inner) => {
                            let items = data.as_array().ok_or_else(|| ConvertError::UnexpectedShape {
                                mapping: skeleton_label(inner),
                                expected: "list",
                                found: json_type_name(data),
                            })?;
                            for item in items.iter().rev() {
                                stack.push(Frame::Visit {
                                    skeleton: inner.as_ref(),
                                    data: item,
                                    target,
                                    depth,
                                });
                            }
                        }
                        Skeleton::Container(children) => {
                            let fields = data.as_object().ok_or_else(|| ConvertError::UnexpectedShape {
                                mapping: skeleton_label(skeleton),
                                expected: "object",
                                found: json_type_name(data),
                            })?;
                            for (key, child) in children.iter().rev() {
                                if let Some(value) = fields.get(key) {
                                    stack.push(Frame::Visit {
                                        skeleton: child,
                                        data: value,
                                        target,
                                        depth,
                                    });
                                }
                            }
                        }
                        Skeleton::Entity(entity) => {
                            if depth >= self.config.max_depth {
                                return Err(ConvertError::RecursionLimitExceeded {
                                    limit: self.config.max_depth,
                                });
                            }
                            let mapping = self.entity_mapping(entity)?;
                            let fields = data.as_object().ok_or_else(|| ConvertError::UnexpectedShape {
                                mapping: entity.mapping_id.clone(),
                                expected: "object",
                                found: json_type_name(data),
                            })?;
                            let identifier = self.identifier(entity, mapping, data)?;

                            // Reuse the sub-cache of a previously known entity so
                            // its descendants get their own mark-and-sweep scope.
                            let children = target_cache(root, &mut pending, target)
                                .get_mut(&identifier)
                                .map(|existing| mem::take(&mut existing.children))
                                .unwrap_or_default();

                            let slot = Target::Pending(pending.len());
                            pending.push(Pending { identifier, children });
                            stack.push(Frame::Finish {
                                mapping,
                                skeleton: entity,
                                data,
                                target,
                            });

                            for (key, child) in entity.children.iter().rev() {
                                if let Some(value) = fields.get(key) {
                                    stack.push(Frame::Visit {
                                        skeleton: child,
                                        data: value,
                                        target: slot,
                                        depth: depth + 1,
                                    });
                                }
                            }
                            if let Some(value) = entity.recursive_field.as_ref().and_then(|f| fields.get(f)) {
                                stack.push(Frame::Visit {
                                    skeleton,
                                    data: value,
                                    target: slot,
                                    depth: depth + 1,
                                });
                            }
                        }
                    }
                }
                Frame::Finish {
                    mapping,
                    skeleton,
                    data,
                    target,
                } => {
                    let Some(done) = pending.pop() else {
                        continue;
                    };
                    let statements = emitter.emit(&done.identifier, mapping, skeleton, data)?;
                    debug!("Individual {} rendered", done.identifier);
                    target_cache(root, &mut pending, target).insert(Entity {
                        identifier: done.identifier,
                        statements,
                        children: done.children,
                        alive: true,
                    });
                }
            }
        }
        Ok(())
    }

    fn entity_mapping(&self, entity: &EntitySkeleton) -> ConvertResult<&EntityMapping> {
        self.spec.mapping(&entity.mapping_id).ok_or_else(|| {
            ConvertError::Mapping(MappingError::UnknownMapping {
                mapping_id: entity.mapping_id.clone(),
                referenced_from: "skeleton".to_string(),
            })
        })
    }

    fn identifier(&self, entity: &EntitySkeleton, mapping: &EntityMapping, data: &Value) -> ConvertResult<String> {
        let value = self.resolver.resolve(&mapping.id.param, data)?;
        let text = scalar_text(value).ok_or_else(|| ConvertError::InvalidIdentifierValue {
            mapping: entity.mapping_id.clone(),
            path: mapping.id.param.clone(),
            found: json_type_name(value),
        })?;
        Ok(mapping.id.render(&text))
    }
}

fn target_cache<'c>(root: &'c mut EntityCache, pending: &'c mut [Pending], target: Target) -> &'c mut EntityCache {
    match target {
        Target::Root => root,
        Target::Pending(index) => match pending.get_mut(index) {
            Some(parent) => &mut parent.children,
            None => root,
        },
    }
}

fn skeleton_label(skeleton: &Skeleton) -> String {
    match skeleton {
        Skeleton::Entity(entity) => entity.mapping_id.clone(),
        Skeleton::List(inner) => format!("{}[]", skeleton_label(inner)),
        Skeleton::Container(_) => "container".to_string(),
    }
}
