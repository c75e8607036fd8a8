use fxhash::FxHashMap;

use super::record::{RecordKey, RecordSnapshot, TypeName};

/// The role a record type plays for navigation and configuration resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordCategory {
    Partition,
    Alias,
    EvrConfig,
    EvrIoConfig,
    EvrData,
    ControlData,
    EpicsConfig,
    L3t,
}

/// Static schema: (module, type name prefix, category).
///
/// Matching is by type name prefix within the module; the version suffix changes with
/// DAQ releases.
const SCHEMA: [(&str, &str, RecordCategory); 8] = [
    ("Partition", "Config", RecordCategory::Partition),
    ("Alias", "Config", RecordCategory::Alias),
    ("EvrData", "IOConfig", RecordCategory::EvrIoConfig),
    ("EvrData", "Config", RecordCategory::EvrConfig),
    ("EvrData", "Data", RecordCategory::EvrData),
    ("ControlData", "Config", RecordCategory::ControlData),
    ("Epics", "Config", RecordCategory::EpicsConfig),
    ("L3T", "Data", RecordCategory::L3t),
];

/// TypeRegistry maps external record type names to the categories the resolver and
/// cursors understand.
///
/// Built once (usually at DataSource construction) and handed to everything that
/// needs to classify keys. Exact registrations take precedence over the schema
/// prefixes, which allows a site to map an unusual type onto a known category.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    exact: FxHashMap<TypeName, RecordCategory>,
    prefixes: Vec<(String, String, RecordCategory)>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            exact: FxHashMap::default(),
            prefixes: SCHEMA
                .iter()
                .map(|(module, prefix, category)| {
                    (module.to_string(), prefix.to_string(), *category)
                })
                .collect(),
        }
    }

    /// Register an exact type name for a category
    pub fn register(&mut self, type_name: TypeName, category: RecordCategory) {
        self.exact.insert(type_name, category);
    }

    pub fn classify(&self, type_name: &TypeName) -> Option<RecordCategory> {
        if let Some(category) = self.exact.get(type_name) {
            return Some(*category);
        }
        self.prefixes
            .iter()
            .find(|(module, prefix, _)| {
                *module == type_name.module && type_name.name.starts_with(prefix.as_str())
            })
            .map(|(_, _, category)| *category)
    }

    /// Keys of a snapshot belonging to a category, in snapshot order
    pub fn keys_of<'a>(
        &'a self,
        snapshot: &'a RecordSnapshot,
        category: RecordCategory,
    ) -> impl Iterator<Item = &'a RecordKey> {
        snapshot
            .keys()
            .iter()
            .filter(move |key| self.classify(&key.type_name) == Some(category))
    }

    /// Distinct type names of a category present in a snapshot
    pub fn type_names_of(
        &self,
        snapshot: &RecordSnapshot,
        category: RecordCategory,
    ) -> Vec<TypeName> {
        let mut names: Vec<TypeName> = Vec::new();
        for key in self.keys_of(snapshot, category) {
            if !names.contains(&key.type_name) {
                names.push(key.type_name.clone());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_classification() {
        let registry = TypeRegistry::new();
        let classify = |module: &str, name: &str| registry.classify(&TypeName::new(module, name));
        assert_eq!(classify("Partition", "ConfigV1"), Some(RecordCategory::Partition));
        assert_eq!(classify("EvrData", "IOConfigV2"), Some(RecordCategory::EvrIoConfig));
        assert_eq!(classify("EvrData", "ConfigV7"), Some(RecordCategory::EvrConfig));
        assert_eq!(classify("EvrData", "DataV4"), Some(RecordCategory::EvrData));
        assert_eq!(classify("CsPad", "DataV2"), None);
    }

    #[test]
    fn test_exact_registration() {
        let mut registry = TypeRegistry::new();
        let custom = TypeName::new("Timing", "EvrLikeV1");
        assert_eq!(registry.classify(&custom), None);
        registry.register(custom.clone(), RecordCategory::EvrData);
        assert_eq!(registry.classify(&custom), Some(RecordCategory::EvrData));
    }
}
