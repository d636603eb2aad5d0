//! Mapping caller parameters onto provider arguments and report parameters.

use crate::error::GenerateError;
use crate::params::ParameterBag;
use crate::provider::ParamSpec;
use crate::value::Value;

/// Provider arguments in declaration order.
pub type BoundArguments = Vec<Value>;

/// A report-level parameter passed to the rendering engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportParameter {
    /// Name as declared by the definition.
    pub name: String,
    /// Raw values; the rendering engine applies its own typing.
    pub values: Vec<String>,
}

impl ReportParameter {
    /// Creates a report parameter.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Binds `bag` to a provider method's declared parameters.
///
/// Each parameter takes the first value of the case-insensitively matching
/// bag entry, coerced to its declared kind. Parameters without an entry are
/// bound to [`Value::Null`].
pub fn bind_arguments(
    params: &[ParamSpec],
    bag: &ParameterBag,
) -> Result<BoundArguments, GenerateError> {
    params
        .iter()
        .map(|param| {
            let Some(raw) = bag.first(&param.name) else {
                log::trace!("parameter {} not supplied, binding null", param.name);
                return Ok(Value::Null);
            };
            param
                .kind
                .coerce(raw)
                .ok_or_else(|| GenerateError::ParameterCoercion {
                    parameter: param.name.clone(),
                    value: raw.to_string(),
                    kind: param.kind,
                })
        })
        .collect()
}

/// Binds report-level parameters by name, leaving values as raw strings.
///
/// Only parameters with a matching bag entry are returned.
pub fn bind_report_parameters<'a, I>(names: I, bag: &ParameterBag) -> Vec<ReportParameter>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let values = bag.values(name)?;
            Some(ReportParameter::new(name, values.to_vec()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParamKind;

    fn params() -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("orderId", ParamKind::Int32),
            ParamSpec::new("city", ParamKind::Text),
            ParamSpec::new("paid", ParamKind::Bool),
        ]
    }

    #[test]
    fn binds_in_declaration_order() {
        let bag = ParameterBag::new()
            .with("paid", "true")
            .with("ORDERID", "42")
            .with("City", "NY");
        let args = bind_arguments(&params(), &bag).unwrap();
        assert_eq!(
            args,
            [
                Value::Int32(42),
                Value::Text("NY".into()),
                Value::Bool(true)
            ]
        );
    }

    #[test]
    fn key_case_does_not_change_binding() {
        let upper = bind_arguments(&params(), &ParameterBag::new().with("City", "NY")).unwrap();
        let lower = bind_arguments(&params(), &ParameterBag::new().with("city", "NY")).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn missing_parameters_bind_null() {
        let args = bind_arguments(&params(), &ParameterBag::new()).unwrap();
        assert!(args.iter().all(Value::is_null));
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn first_value_wins() {
        let bag = ParameterBag::new().with_values("orderId", ["7", "8"]);
        let args = bind_arguments(&params(), &bag).unwrap();
        assert_eq!(args[0], Value::Int32(7));
    }

    #[test]
    fn coercion_failure_names_parameter() {
        let bag = ParameterBag::new().with("orderId", "forty-two");
        let err = bind_arguments(&params(), &bag).unwrap_err();
        match err {
            GenerateError::ParameterCoercion {
                parameter,
                value,
                kind,
            } => {
                assert_eq!(parameter, "orderId");
                assert_eq!(value, "forty-two");
                assert_eq!(kind, ParamKind::Int32);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn report_parameters_keep_raw_values() {
        let bag = ParameterBag::new()
            .with_values("Regions", ["EU", "US"])
            .with("unused", "x");
        let bound = bind_report_parameters(["regions", "Title"], &bag);
        assert_eq!(
            bound,
            [ReportParameter::new(
                "regions",
                vec!["EU".to_string(), "US".to_string()]
            )]
        );
    }
}
