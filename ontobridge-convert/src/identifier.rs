/// Builds target identifiers for object properties in custom mode.
///
/// Receives the raw property value and the object property predicate.
pub trait IdentifierFn: Send + Sync {
    fn identifier(&self, value: &str, predicate: &str) -> String;
}

/// Uses the property value itself as the identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFn;

impl IdentifierFn for IdentityFn {
    fn identifier(&self, value: &str, _predicate: &str) -> String {
        value.to_string()
    }
}

impl<F> IdentifierFn for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn identifier(&self, value: &str, predicate: &str) -> String {
        self(value, predicate)
    }
}
