//! Evaluation of the simple value expressions used for subreport parameters.
//!
//! Supported forms are `=Fields!Column.Value`, `=Parameters!Name.Value`,
//! quoted string literals (`="text"`) and plain literals. Anything else is
//! returned verbatim without the leading `=`.

use crate::binder::ReportParameter;
use crate::params::names_match;
use crate::provider::DataRow;

/// Evaluates `expression` against the current row and report parameters.
///
/// Missing fields and parameters evaluate to an empty string.
pub fn evaluate(expression: &str, row: Option<&DataRow>, parameters: &[ReportParameter]) -> String {
    let Some(body) = expression.trim().strip_prefix('=') else {
        return expression.to_string();
    };
    let body = body.trim();

    if let Some(field) = reference(body, "Fields!") {
        return row
            .and_then(|row| row.get(field))
            .map(ToString::to_string)
            .unwrap_or_default();
    }

    if let Some(name) = reference(body, "Parameters!") {
        return parameters
            .iter()
            .find(|parameter| names_match(&parameter.name, name))
            .and_then(|parameter| parameter.values.first())
            .cloned()
            .unwrap_or_default();
    }

    if let Some(literal) = body
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return literal.replace("\"\"", "\"");
    }

    body.to_string()
}

fn reference<'a>(body: &'a str, collection: &str) -> Option<&'a str> {
    body.strip_prefix(collection)?.strip_suffix(".Value")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_from_current_row() {
        let row = DataRow::new().with("Id", 100).with("Name", "Acme");
        assert_eq!(evaluate("=Fields!Id.Value", Some(&row), &[]), "100");
        assert_eq!(evaluate("= Fields!Name.Value ", Some(&row), &[]), "Acme");
        assert_eq!(evaluate("=Fields!Missing.Value", Some(&row), &[]), "");
        assert_eq!(evaluate("=Fields!Id.Value", None, &[]), "");
    }

    #[test]
    fn reads_report_parameters_case_insensitively() {
        let parameters = [ReportParameter::new("Year", vec!["2024".into()])];
        assert_eq!(evaluate("=Parameters!year.Value", None, &parameters), "2024");
    }

    #[test]
    fn literals_pass_through() {
        assert_eq!(evaluate("42", None, &[]), "42");
        assert_eq!(evaluate("=\"say \"\"hi\"\"\"", None, &[]), "say \"hi\"");
        assert_eq!(evaluate("=Now()", None, &[]), "Now()");
    }
}
