pub(crate) mod anonymous;
pub(crate) mod cram_md5;
pub(crate) mod digest_md5;
pub(crate) mod plain;
pub(crate) mod scram;

use std::collections::HashMap;

use crate::callback::Callback;
use crate::types::{Error, Property, Result};

/// Property view for one step. Values set on the session itself take
/// precedence over the caller's callback.
pub(crate) struct Props<'a> {
    pub local: &'a HashMap<Property, String>,
    pub callback: &'a dyn Callback,
}

impl Props<'_> {
    pub fn get(&self, property: Property) -> Option<String> {
        let value = self
            .local
            .get(&property)
            .cloned()
            .or_else(|| self.callback.property(property));
        tracing::trace!(property = ?property, found = value.is_some(), "property lookup");
        value
    }

    pub fn require(&self, property: Property) -> Result<String> {
        self.get(property).ok_or(Error::MissingProperty(property))
    }
}
