//! RDLC report definitions and the metadata extracted from them.
//!
//! A definition is parsed once into a small namespace-aware element tree.
//! The tree is then queried for the object datasets declared under
//! `Report/DataSets`, the subreports referenced anywhere in the layout and
//! the report-level parameters.

use std::collections::HashSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::GenerateError;

/// Namespace of the report designer extension elements (`rd:`).
pub const REPORT_DESIGNER_NS: &str =
    "http://schemas.microsoft.com/SQLServer/reporting/reportdesigner";

const ROOT_ELEMENT: &str = "Report";

/// An element of a parsed definition document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    /// Namespace URI the element name is bound to.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concatenated, trimmed text content of this element.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the value of an unqualified attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements in document order.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First child with the given namespace and local name.
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.is(namespace, name))
    }

    /// All children with the given namespace and local name.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |child| child.is(namespace, name))
    }

    fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }
}

/// Object dataset declared by a definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataSetDescriptor {
    /// Dataset name, unique within its definition.
    pub name: String,
    /// Name of the provider type supplying rows.
    pub provider_type: String,
    /// Canonical signature of the provider method.
    pub method_signature: String,
}

/// A subreport occurrence in a definition's layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubreportReference {
    /// Name of the referenced definition.
    pub name: String,
    /// Parameter name and value expression pairs passed to the subreport.
    pub parameters: Vec<(String, String)>,
    /// Dataset of the enclosing data region, when the subreport repeats per row.
    pub scope_dataset: Option<String>,
}

/// A report-level parameter declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportParameterDecl {
    /// Parameter name.
    pub name: String,
    /// Declared data type, for example `String` or `Integer`.
    pub data_type: Option<String>,
}

/// A parsed report definition.
#[derive(Clone, Debug)]
pub struct ReportDefinition {
    key: String,
    namespace: String,
    root: Element,
    datasets: Vec<DataSetDescriptor>,
    subreports: Vec<SubreportReference>,
    parameters: Vec<ReportParameterDecl>,
}

impl ReportDefinition {
    /// Parses a definition document read from storage under `key`.
    pub fn parse(key: impl Into<String>, bytes: &[u8]) -> Result<Self, GenerateError> {
        let key = key.into();
        let text = std::str::from_utf8(strip_bom(bytes))
            .map_err(|err| GenerateError::malformed(&key, format!("not valid UTF-8: {err}")))?;
        let root = parse_tree(text).map_err(|reason| GenerateError::malformed(&key, reason))?;

        let namespace = root
            .namespace()
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                GenerateError::malformed(&key, "root element has no default namespace")
            })?;

        if root.name() != ROOT_ELEMENT {
            return Err(GenerateError::malformed(
                &key,
                format!("root element is <{}>, expected <{ROOT_ELEMENT}>", root.name()),
            ));
        }

        let datasets = extract_datasets(&key, &root, &namespace)?;
        let subreports = extract_subreports(&root, &namespace);
        let parameters = extract_parameters(&root, &namespace);

        Ok(Self {
            key,
            namespace,
            root,
            datasets,
            subreports,
            parameters,
        })
    }

    /// Storage key the definition was loaded from.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Default namespace of the document.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Root `Report` element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Object datasets in declaration order.
    pub fn datasets(&self) -> &[DataSetDescriptor] {
        &self.datasets
    }

    /// Looks up a dataset by name.
    pub fn dataset(&self, name: &str) -> Option<&DataSetDescriptor> {
        self.datasets.iter().find(|dataset| dataset.name == name)
    }

    /// Every subreport occurrence in document order, including repeats.
    pub fn subreports(&self) -> &[SubreportReference] {
        &self.subreports
    }

    /// Distinct subreport names in order of first appearance.
    pub fn subreport_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.subreports
            .iter()
            .map(|reference| reference.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Report-level parameter declarations.
    pub fn parameters(&self) -> &[ReportParameterDecl] {
        &self.parameters
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

fn parse_tree(text: &str) -> Result<Element, String> {
    let mut reader = NsReader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|err| format!("XML error: {err}"))?;

        match event {
            Event::Start(start) => {
                stack.push(open_element(resolved, &start)?);
            }
            Event::Empty(start) => {
                let element = open_element(resolved, &start)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag".to_string())?;
                element.text = element.text.trim().to_string();
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .map_err(|err| format!("invalid text content: {err}"))?;
                    current.text.push_str(&value);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(format!("unclosed element <{}>", stack[stack.len() - 1].name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn open_element(resolved: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Element, String> {
    let namespace = match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(format!(
                "undeclared namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            ))
        }
    };

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| format!("invalid attribute: {err}"))?;
        let key = attribute.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let value = attribute
            .unescape_value()
            .map_err(|err| format!("invalid attribute value: {err}"))?;
        attributes.push((
            String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned(),
            value.into_owned(),
        ));
    }

    Ok(Element {
        namespace,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err("document has more than one root element".to_string()),
    }
    Ok(())
}

fn extract_datasets(
    key: &str,
    root: &Element,
    namespace: &str,
) -> Result<Vec<DataSetDescriptor>, GenerateError> {
    let Some(section) = root.child(namespace, "DataSets") else {
        return Ok(Vec::new());
    };

    let mut datasets: Vec<DataSetDescriptor> = Vec::new();
    for element in section.children_named(namespace, "DataSet") {
        let name = element
            .attribute("Name")
            .ok_or_else(|| GenerateError::malformed(key, "DataSet without a Name attribute"))?;

        let info = element
            .child(REPORT_DESIGNER_NS, "DataSetInfo")
            .ok_or_else(|| {
                GenerateError::malformed(key, format!("dataset '{name}' has no rd:DataSetInfo"))
            })?;
        let designer_value = |field: &str| {
            info.child(REPORT_DESIGNER_NS, field)
                .map(|value| value.text().to_string())
                .ok_or_else(|| {
                    GenerateError::malformed(key, format!("dataset '{name}' has no rd:{field}"))
                })
        };

        let descriptor = DataSetDescriptor {
            name: name.to_string(),
            provider_type: designer_value("ObjectDataSourceType")?,
            method_signature: designer_value("ObjectDataSourceSelectMethodSignature")?,
        };

        if datasets.iter().any(|existing| existing.name == descriptor.name) {
            return Err(GenerateError::malformed(
                key,
                format!("dataset '{name}' is declared more than once"),
            ));
        }
        datasets.push(descriptor);
    }

    Ok(datasets)
}

fn extract_subreports(root: &Element, namespace: &str) -> Vec<SubreportReference> {
    let mut references = Vec::new();
    collect_subreports(root, namespace, None, &mut references);
    references
}

fn collect_subreports<'a>(
    element: &'a Element,
    namespace: &str,
    scope: Option<&'a str>,
    references: &mut Vec<SubreportReference>,
) {
    let scope = element
        .child(namespace, "DataSetName")
        .map(|dataset| dataset.text())
        .or(scope);

    for child in element.children() {
        if child.is(namespace, "ReportName") {
            references.push(SubreportReference {
                name: child.text().to_string(),
                parameters: subreport_parameters(element, namespace),
                scope_dataset: scope.map(str::to_string),
            });
        } else {
            collect_subreports(child, namespace, scope, references);
        }
    }
}

fn subreport_parameters(subreport: &Element, namespace: &str) -> Vec<(String, String)> {
    subreport
        .child(namespace, "Parameters")
        .into_iter()
        .flat_map(|parameters| parameters.children_named(namespace, "Parameter"))
        .filter_map(|parameter| {
            let name = parameter.attribute("Name")?;
            let value = parameter
                .child(namespace, "Value")
                .map(|value| value.text().to_string())
                .unwrap_or_default();
            Some((name.to_string(), value))
        })
        .collect()
}

fn extract_parameters(root: &Element, namespace: &str) -> Vec<ReportParameterDecl> {
    root.child(namespace, "ReportParameters")
        .into_iter()
        .flat_map(|section| section.children_named(namespace, "ReportParameter"))
        .filter_map(|parameter| {
            Some(ReportParameterDecl {
                name: parameter.attribute("Name")?.to_string(),
                data_type: parameter
                    .child(namespace, "DataType")
                    .map(|value| value.text().to_string()),
            })
        })
        .collect()
}
