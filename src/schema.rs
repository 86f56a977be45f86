//! The schema behaviour (`spec.md` §6): an entity owner may attach a
//! `schema` reference to a node or edge; if a schema of that name is
//! registered, it validates the entity's `data` map before commit.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::value::DataMap;

/// Validates a candidate `data` map before it is committed.
pub trait Schema: Send + Sync {
    /// Returns `Err` if `data` does not conform to this schema.
    fn validate(&self, data: &DataMap) -> Result<()>;
}

/// A schema that accepts everything, used for entities with no registered schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSchema;

impl Schema for NoopSchema {
    fn validate(&self, _data: &DataMap) -> Result<()> {
        Ok(())
    }
}

/// The set of schemas a [`crate::store::Store`] knows about, keyed by the
/// name entities reference in their `schema` field.
#[derive(Default, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<dyn Schema>>,
}

impl SchemaRegistry {
    /// An empty registry; every `schema` reference resolves to [`NoopSchema`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema` under `name`, replacing any prior registration.
    pub fn register(&mut self, name: impl Into<String>, schema: Arc<dyn Schema>) {
        self.schemas.insert(name.into(), schema);
    }

    /// Validates `data` against the schema named `name`, falling back to
    /// [`NoopSchema`] if no schema is registered under that name.
    pub fn validate(&self, name: &str, data: &DataMap) -> Result<()> {
        match self.schemas.get(name) {
            Some(schema) => schema.validate(data),
            None => NoopSchema.validate(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::value::Value;

    struct RequiresName;

    impl Schema for RequiresName {
        fn validate(&self, data: &DataMap) -> Result<()> {
            if data.contains_key("name") {
                Ok(())
            } else {
                Err(Error::SchemaValidation("missing required field `name`".into()))
            }
        }
    }

    #[test]
    fn unregistered_schema_name_is_permissive() {
        let registry = SchemaRegistry::new();
        assert!(registry.validate("anything", &DataMap::new()).is_ok());
    }

    #[test]
    fn registered_schema_is_enforced() {
        let mut registry = SchemaRegistry::new();
        registry.register("person", Arc::new(RequiresName));

        assert!(registry.validate("person", &DataMap::new()).is_err());

        let mut data = DataMap::new();
        data.insert("name".into(), Value::String("alice".into()));
        assert!(registry.validate("person", &data).is_ok());
    }
}
