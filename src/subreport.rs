//! Loading the subreports referenced by a top-level definition.
//!
//! Only direct subreports of the top-level report are loaded; subreports
//! referenced from inside a subreport are not followed.

use crate::definition::ReportDefinition;
use crate::error::GenerateError;
use crate::store::DefinitionStore;

/// A subreport definition registered under the name it is referenced by.
#[derive(Clone, Debug)]
pub struct LoadedSubreport {
    /// Reference name used in the parent layout.
    pub name: String,
    /// The parsed subreport definition.
    pub definition: ReportDefinition,
}

/// Namespace prefix of a storage key: everything before its last `.`.
///
/// Keys without a separator have an empty namespace.
pub fn key_namespace(key: &str) -> &str {
    key.rfind('.').map_or("", |index| &key[..index])
}

/// Storage key of a subreport referenced from the report stored under `parent_key`.
pub fn subreport_key(parent_key: &str, name: &str) -> String {
    match key_namespace(parent_key) {
        "" => name.to_string(),
        namespace => format!("{namespace}.{name}"),
    }
}

/// Appends the storage extension to a definition key.
pub fn storage_key(key: &str, extension: &str) -> String {
    if extension.is_empty() {
        key.to_string()
    } else {
        format!("{key}.{extension}")
    }
}

/// Reads and parses the definition stored under `key`.
pub fn load_definition(
    store: &dyn DefinitionStore,
    key: &str,
    extension: &str,
) -> Result<ReportDefinition, GenerateError> {
    let storage_key = storage_key(key, extension);
    log::debug!("loading report definition {storage_key}");
    let bytes = store
        .read(&storage_key)
        .map_err(|source| GenerateError::DefinitionLoad {
            key: storage_key.clone(),
            source,
        })?;
    ReportDefinition::parse(key, &bytes)
}

/// Loads every distinct subreport referenced by `parent`, in order of first reference.
pub fn load_subreports(
    store: &dyn DefinitionStore,
    parent: &ReportDefinition,
    extension: &str,
) -> Result<Vec<LoadedSubreport>, GenerateError> {
    parent
        .subreport_names()
        .into_iter()
        .map(|name| {
            let key = subreport_key(parent.key(), name);
            let definition = load_definition(store, &key, extension)?;
            Ok(LoadedSubreport {
                name: name.to_string(),
                definition,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::Mutex;

    use super::*;
    use crate::store::{MemoryStore, StoreError};

    const NS: &str = "http://schemas.microsoft.com/sqlserver/reporting/2016/01/reportdefinition";

    struct CountingStore {
        inner: MemoryStore,
        opened: Mutex<Vec<String>>,
    }

    impl DefinitionStore for CountingStore {
        fn open(&self, key: &str) -> Result<Box<dyn Read + '_>, StoreError> {
            self.opened.lock().unwrap().push(key.to_string());
            self.inner.open(key)
        }
    }

    fn subreport_xml(names: &[&str]) -> String {
        let items: String = names
            .iter()
            .map(|name| {
                format!("<Subreport Name=\"s\"><ReportName>{name}</ReportName></Subreport>")
            })
            .collect();
        format!("<Report xmlns=\"{NS}\"><Body><ReportItems>{items}</ReportItems></Body></Report>")
    }

    #[test]
    fn namespace_is_everything_before_last_separator() {
        assert_eq!(key_namespace("Company.Reports.Invoice"), "Company.Reports");
        assert_eq!(key_namespace("Invoice"), "");
        assert_eq!(
            subreport_key("Company.Reports.Invoice", "Detail"),
            "Company.Reports.Detail"
        );
        assert_eq!(subreport_key("Invoice", "Detail"), "Detail");
        assert_eq!(storage_key("Reports.Detail", "rdlc"), "Reports.Detail.rdlc");
    }

    #[test]
    fn repeated_references_load_once() {
        let store = CountingStore {
            inner: MemoryStore::new()
                .with("Reports.Invoice.rdlc", subreport_xml(&["Detail", "Detail", "Detail"]))
                .with("Reports.Detail.rdlc", subreport_xml(&[])),
            opened: Mutex::new(Vec::new()),
        };

        let parent = load_definition(&store, "Reports.Invoice", "rdlc").unwrap();
        let loaded = load_subreports(&store, &parent, "rdlc").unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Detail");
        assert_eq!(loaded[0].definition.key(), "Reports.Detail");
        assert_eq!(
            *store.opened.lock().unwrap(),
            ["Reports.Invoice.rdlc", "Reports.Detail.rdlc"]
        );
    }

    #[test]
    fn nested_subreports_are_not_followed() {
        let store = MemoryStore::new()
            .with("R.Top.rdlc", subreport_xml(&["Middle"]))
            .with("R.Middle.rdlc", subreport_xml(&["Bottom"]));

        let parent = load_definition(&store, "R.Top", "rdlc").unwrap();
        let loaded = load_subreports(&store, &parent, "rdlc").unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn missing_subreport_fails_with_its_key() {
        let store = MemoryStore::new().with("R.Top.rdlc", subreport_xml(&["Ghost"]));
        let parent = load_definition(&store, "R.Top", "rdlc").unwrap();
        let err = load_subreports(&store, &parent, "rdlc").unwrap_err();
        match err {
            GenerateError::DefinitionLoad { key, .. } => assert_eq!(key, "R.Ghost.rdlc"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
