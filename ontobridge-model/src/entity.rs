use indexmap::IndexMap;
use std::mem;

/// One transformed entity held in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub identifier: String,
    /// Rendered statement text (class declaration + property statements).
    pub statements: String,
    /// Entities produced by the skeleton below this node in the source tree.
    pub children: EntityCache,
    /// Liveness flag, only meaningful during one reconciliation pass.
    pub alive: bool,
}

impl Entity {
    pub fn new(identifier: impl Into<String>, statements: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            statements: statements.into(),
            children: EntityCache::new(),
            alive: true,
        }
    }
}

/// Identifier-keyed, insertion-ordered, nested entity cache.
///
/// Nesting mirrors the skeleton, not any domain relationship; each level is an
/// independent mark-and-sweep scope. Cloning, comparing and dropping walk the
/// levels with an explicit stack, so nesting depth is bounded by memory only.
#[derive(Debug, Default)]
pub struct EntityCache {
    entries: IndexMap<String, Entity>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&Entity> {
        self.entries.get(identifier)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut Entity> {
        self.entries.get_mut(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Inserts or replaces an entity. A replaced entity keeps its position.
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entries.insert(entity.identifier.clone(), entity)
    }

    pub fn remove(&mut self, identifier: &str) -> Option<Entity> {
        self.entries.shift_remove(identifier)
    }

    /// Number of top-level entities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Top-level entities in source order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.values()
    }

    /// Top-level identifiers in source order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entities at every nesting level.
    pub fn total_len(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(cache) = stack.pop() {
            total += cache.len();
            stack.extend(cache.iter().map(|e| &e.children));
        }
        total
    }

    /// Mark phase: sets `alive = false` on every entity, nested ones included.
    pub fn mark_all_dead(&mut self) {
        let mut stack = vec![self];
        while let Some(cache) = stack.pop() {
            for entity in cache.entries.values_mut() {
                entity.alive = false;
                stack.push(&mut entity.children);
            }
        }
    }

    /// Sweep phase: drops every entity still marked dead, then prunes the
    /// children of the survivors. Returns the number of entities removed,
    /// descendants of removed entities included.
    pub fn sweep(&mut self) -> usize {
        let mut removed = 0;
        let mut stack = vec![self];
        while let Some(cache) = stack.pop() {
            cache.entries.retain(|_, entity| {
                if !entity.alive {
                    removed += 1 + entity.children.total_len();
                }
                entity.alive
            });
            for entity in cache.entries.values_mut() {
                stack.push(&mut entity.children);
            }
        }
        removed
    }

    /// Depth-first flattening of `entity` and its descendants: children before
    /// the entity that encapsulates them.
    pub fn flatten_entity(entity: &Entity) -> Vec<&Entity> {
        let mut out = Vec::new();
        // (entity, children already expanded)
        let mut stack = vec![(entity, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded || current.children.is_empty() {
                out.push(current);
                continue;
            }
            stack.push((current, true));
            for child in current.children.entries.values().rev() {
                stack.push((child, false));
            }
        }
        out
    }

    /// Every entity in the cache in sync order.
    pub fn flatten(&self) -> Vec<&Entity> {
        self.iter().flat_map(Self::flatten_entity).collect()
    }
}

impl<'a> IntoIterator for &'a EntityCache {
    type Item = &'a Entity;
    type IntoIter = indexmap::map::Values<'a, String, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl Clone for EntityCache {
    fn clone(&self) -> Self {
        // One level per cache being copied; `owner` holds the copied level's children.
        struct Level<'a> {
            owner: Option<(&'a String, &'a Entity)>,
            source: indexmap::map::Iter<'a, String, Entity>,
            copy: EntityCache,
        }

        let mut levels = vec![Level {
            owner: None,
            source: self.entries.iter(),
            copy: EntityCache::new(),
        }];
        while let Some(level) = levels.last_mut() {
            if let Some((key, entity)) = level.source.next() {
                levels.push(Level {
                    owner: Some((key, entity)),
                    source: entity.children.entries.iter(),
                    copy: EntityCache::new(),
                });
                continue;
            }

            let Some(done) = levels.pop() else { break };
            match (done.owner, levels.last_mut()) {
                (Some((key, entity)), Some(parent)) => {
                    parent.copy.entries.insert(
                        key.clone(),
                        Entity {
                            identifier: entity.identifier.clone(),
                            statements: entity.statements.clone(),
                            children: done.copy,
                            alive: entity.alive,
                        },
                    );
                }
                _ => return done.copy,
            }
        }
        EntityCache::new()
    }
}

impl PartialEq for EntityCache {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((left, right)) = stack.pop() {
            if left.len() != right.len() {
                return false;
            }
            for (key, a) in &left.entries {
                let Some(b) = right.entries.get(key) else {
                    return false;
                };
                if a.identifier != b.identifier || a.statements != b.statements || a.alive != b.alive {
                    return false;
                }
                stack.push((&a.children, &b.children));
            }
        }
        true
    }
}

impl Eq for EntityCache {}

impl Drop for EntityCache {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        // Detach every nested level before it is dropped, leaving only empty children behind.
        let mut pending = vec![mem::take(&mut self.entries)];
        while let Some(mut entries) = pending.pop() {
            for entity in entries.values_mut() {
                if !entity.children.is_empty() {
                    pending.push(mem::take(&mut entity.children.entries));
                }
            }
        }
    }
}
