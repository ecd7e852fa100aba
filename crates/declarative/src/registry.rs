//! Schema registry - the set of resource kinds an engine can manage

use crate::codec::{self, NativeObject};
use crate::error::{Error, Result};
use crate::schema::ResourceSchema;
use crate::value::Attributes;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A managed resource kind: its schema plus the mapping to the remote's
/// native representation.
///
/// The default `encode`/`decode` are schema-driven; a kind only overrides
/// them when its native shape cannot be described by field renames.
pub trait ResourceKind: Send + Sync {
    /// Kind name as used in addresses and remote calls (e.g., "vault_cluster")
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    fn schema(&self) -> &ResourceSchema;

    /// Convert attributes to the native document sent to the remote
    fn encode(&self, attrs: &Attributes) -> Result<NativeObject> {
        codec::to_native(self.schema(), attrs)
    }

    /// Convert a native document returned by the remote to attributes
    fn decode(&self, document: &NativeObject) -> Result<Attributes> {
        codec::from_native(self.schema(), document)
    }
}

/// Registered resource kinds, keyed by name.
///
/// Populated once at startup; lookups take `&self` so a registry can be
/// shared across threads without locking.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    kinds: BTreeMap<&'static str, Arc<dyn ResourceKind>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind after validating its schema.
    pub fn register<K: ResourceKind + 'static>(&mut self, kind: K) -> Result<()> {
        let name = kind.name();
        if self.kinds.contains_key(name) {
            return Err(Error::InvalidSchema {
                kind: name.to_string(),
                reason: "kind is registered twice".to_string(),
            });
        }
        kind.schema().validate(name)?;
        log::debug!("Registered resource kind {name}");
        self.kinds.insert(name, Arc::new(kind));
        Ok(())
    }

    /// Get the kind registered under `name`.
    pub fn kind(&self, name: &str) -> Result<&dyn ResourceKind> {
        self.kinds
            .get(name)
            .map(|kind| kind.as_ref())
            .ok_or_else(|| Error::UnknownResourceKind {
                kind: name.to_string(),
            })
    }

    /// Get the schema of the kind registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<&ResourceSchema> {
        self.kind(name).map(|kind| kind.schema())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Registered kinds in name order.
    pub fn kinds(&self) -> impl Iterator<Item = &dyn ResourceKind> {
        self.kinds.values().map(|kind| kind.as_ref())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.kinds.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, ValueType};

    struct Widget {
        schema: ResourceSchema,
    }

    impl Widget {
        fn new() -> Self {
            Self {
                schema: ResourceSchema::new()
                    .attribute(AttributeSpec::required("name", ValueType::String)),
            }
        }
    }

    impl ResourceKind for Widget {
        fn name(&self) -> &'static str {
            "widget"
        }

        fn description(&self) -> &'static str {
            "A test widget"
        }

        fn schema(&self) -> &ResourceSchema {
            &self.schema
        }
    }

    struct Broken;

    impl ResourceKind for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn description(&self) -> &'static str {
            "Declares the reserved id attribute"
        }

        fn schema(&self) -> &ResourceSchema {
            static SCHEMA: std::sync::LazyLock<ResourceSchema> = std::sync::LazyLock::new(|| {
                ResourceSchema::new().attribute(AttributeSpec::optional("id", ValueType::String))
            });
            &SCHEMA
        }
    }

    #[test]
    fn test_lookup() {
        let mut registry = SchemaRegistry::new();
        registry.register(Widget::new()).unwrap();

        assert!(registry.lookup("widget").is_ok());
        assert!(registry.contains("widget"));
        assert_eq!(registry.len(), 1);

        let err = registry.lookup("gadget").unwrap_err();
        assert!(matches!(err, Error::UnknownResourceKind { kind } if kind == "gadget"));
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = SchemaRegistry::new();
        registry.register(Widget::new()).unwrap();
        assert!(registry.register(Widget::new()).is_err());
    }

    #[test]
    fn test_register_validates_schema() {
        let mut registry = SchemaRegistry::new();
        assert!(matches!(
            registry.register(Broken),
            Err(Error::InvalidSchema { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_codec() {
        let mut registry = SchemaRegistry::new();
        registry.register(Widget::new()).unwrap();
        let kind = registry.kind("widget").unwrap();

        let attrs = Attributes::from([("name".to_string(), "w".into())]);
        let doc = kind.encode(&attrs).unwrap();
        assert_eq!(kind.decode(&doc).unwrap(), attrs);
    }
}
