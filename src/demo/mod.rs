//! A small invoicing sample: three providers and the report definitions that
//! use them.
//!
//! `Demo.Sales.Invoice` lists the invoices of a year. Inside its invoice table
//! it embeds the `InvoiceLines` subreport once per invoice and the
//! `CustomerCard` subreport once per invoice customer.

use chrono::NaiveDate;

use crate::provider::{DataRow, ParamSpec, ProviderError, ProviderRegistry, ProviderType, Rows};
use crate::store::MemoryStore;
use crate::subreport::storage_key;
use crate::value::{ParamKind, Value};

/// Key of the top-level invoice report.
pub const INVOICE_REPORT: &str = "Demo.Sales.Invoice";
/// Key of the invoice lines subreport.
pub const LINES_REPORT: &str = "Demo.Sales.InvoiceLines";
/// Key of the customer card subreport.
pub const CUSTOMER_REPORT: &str = "Demo.Sales.CustomerCard";

const DEFINITION_EXTENSION: &str = "rdlc";

struct Invoice {
    id: i32,
    number: &'static str,
    customer: &'static str,
    issued: (i32, u32, u32),
}

struct Line {
    invoice_id: i32,
    product: &'static str,
    quantity: i32,
    unit_price: f64,
}

struct Customer {
    code: &'static str,
    name: &'static str,
    city: &'static str,
    vip: bool,
}

const INVOICES: &[Invoice] = &[
    Invoice {
        id: 100,
        number: "INV-2023-100",
        customer: "ACME",
        issued: (2023, 11, 30),
    },
    Invoice {
        id: 101,
        number: "INV-2024-101",
        customer: "ACME",
        issued: (2024, 1, 15),
    },
    Invoice {
        id: 102,
        number: "INV-2024-102",
        customer: "GLOBEX",
        issued: (2024, 2, 3),
    },
    Invoice {
        id: 103,
        number: "INV-2024-103",
        customer: "INITECH",
        issued: (2024, 3, 21),
    },
];

const LINES: &[Line] = &[
    Line {
        invoice_id: 100,
        product: "Anvil",
        quantity: 2,
        unit_price: 120.0,
    },
    Line {
        invoice_id: 101,
        product: "Rocket skates",
        quantity: 1,
        unit_price: 349.5,
    },
    Line {
        invoice_id: 101,
        product: "Bird seed",
        quantity: 12,
        unit_price: 4.25,
    },
    Line {
        invoice_id: 102,
        product: "Flux capacitor",
        quantity: 1,
        unit_price: 1210.0,
    },
    Line {
        invoice_id: 103,
        product: "Stapler",
        quantity: 3,
        unit_price: 18.9,
    },
    Line {
        invoice_id: 103,
        product: "TPS cover sheets",
        quantity: 500,
        unit_price: 0.05,
    },
];

const CUSTOMERS: &[Customer] = &[
    Customer {
        code: "ACME",
        name: "Acme Corporation",
        city: "Phoenix",
        vip: true,
    },
    Customer {
        code: "GLOBEX",
        name: "Globex Corporation",
        city: "Cypress Creek",
        vip: false,
    },
    Customer {
        code: "INITECH",
        name: "Initech",
        city: "Austin",
        vip: false,
    },
];

/// Provider of invoice headers.
#[derive(Debug, Default)]
pub struct InvoiceProvider;

impl InvoiceProvider {
    /// Invoices issued in `year`, or every invoice when no year is given.
    pub fn invoices(&self, year: Option<i32>) -> Rows {
        INVOICES
            .iter()
            .filter(|invoice| year.map_or(true, |year| invoice.issued.0 == year))
            .map(|invoice| {
                let (y, m, d) = invoice.issued;
                DataRow::new()
                    .with("Id", invoice.id)
                    .with("Number", invoice.number)
                    .with("Customer", invoice.customer)
                    .with("Issued", NaiveDate::from_ymd_opt(y, m, d))
                    .with("Total", invoice_total(invoice.id))
            })
            .collect()
    }
}

/// Provider of invoice lines.
#[derive(Debug, Default)]
pub struct LineProvider;

impl LineProvider {
    /// Lines of the invoice with id `invoice_id`.
    pub fn lines(&self, invoice_id: i32) -> Rows {
        LINES
            .iter()
            .filter(|line| line.invoice_id == invoice_id)
            .map(|line| {
                DataRow::new()
                    .with("Product", line.product)
                    .with("Quantity", line.quantity)
                    .with("UnitPrice", line.unit_price)
                    .with("Amount", line_amount(line))
            })
            .collect()
    }
}

/// Provider of customer master data.
#[derive(Debug, Default)]
pub struct CustomerProvider;

impl CustomerProvider {
    /// The customer with the given code, if any.
    pub fn customer(&self, code: &str) -> Rows {
        CUSTOMERS
            .iter()
            .filter(|customer| customer.code.eq_ignore_ascii_case(code))
            .map(|customer| {
                DataRow::new()
                    .with("Code", customer.code)
                    .with("Name", customer.name)
                    .with("City", customer.city)
                    .with("Vip", customer.vip)
            })
            .collect()
    }
}

fn line_amount(line: &Line) -> f64 {
    f64::from(line.quantity) * line.unit_price
}

fn invoice_total(invoice_id: i32) -> f64 {
    LINES
        .iter()
        .filter(|line| line.invoice_id == invoice_id)
        .map(line_amount)
        .sum()
}

fn required_i32(args: &[Value], name: &str) -> Result<i32, ProviderError> {
    args.first()
        .and_then(Value::as_i32)
        .ok_or_else(|| format!("argument '{name}' is required").into())
}

/// Registry with the three sample providers.
pub fn registry() -> ProviderRegistry {
    ProviderRegistry::new()
        .with_provider(
            ProviderType::builder::<InvoiceProvider>("Demo.Sales.InvoiceProvider")
                .method(
                    "GetInvoices",
                    "Vec<Invoice>",
                    [ParamSpec::new("year", ParamKind::Int32)],
                    |provider: &InvoiceProvider, args: &[Value]| -> Result<Rows, ProviderError> {
                        Ok(provider.invoices(args.first().and_then(Value::as_i32)))
                    },
                )
                .build(),
        )
        .with_provider(
            ProviderType::builder::<LineProvider>("Demo.Sales.LineProvider")
                .method(
                    "GetLines",
                    "Vec<InvoiceLine>",
                    [ParamSpec::new("orderId", ParamKind::Int32)],
                    |provider: &LineProvider, args: &[Value]| -> Result<Rows, ProviderError> {
                        Ok(provider.lines(required_i32(args, "orderId")?))
                    },
                )
                .build(),
        )
        .with_provider(
            ProviderType::builder::<CustomerProvider>("Demo.Sales.CustomerProvider")
                .method(
                    "GetCustomer",
                    "Vec<Customer>",
                    [ParamSpec::new("customerCode", ParamKind::Text)],
                    |provider: &CustomerProvider, args: &[Value]| -> Result<Rows, ProviderError> {
                        let code = args.first().and_then(Value::as_str).unwrap_or_default();
                        Ok(provider.customer(code))
                    },
                )
                .build(),
        )
}

/// In-memory store holding the three sample definitions.
pub fn store() -> MemoryStore {
    MemoryStore::new()
        .with(storage_key(INVOICE_REPORT, DEFINITION_EXTENSION), INVOICE_RDLC)
        .with(storage_key(LINES_REPORT, DEFINITION_EXTENSION), LINES_RDLC)
        .with(storage_key(CUSTOMER_REPORT, DEFINITION_EXTENSION), CUSTOMER_RDLC)
}

/// The sample definitions as `(key, document)` pairs.
pub fn definitions() -> [(&'static str, &'static str); 3] {
    [
        (INVOICE_REPORT, INVOICE_RDLC),
        (LINES_REPORT, LINES_RDLC),
        (CUSTOMER_REPORT, CUSTOMER_RDLC),
    ]
}

const INVOICE_RDLC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Report xmlns="http://schemas.microsoft.com/sqlserver/reporting/2008/01/reportdefinition"
        xmlns:rd="http://schemas.microsoft.com/SQLServer/reporting/reportdesigner">
  <DataSources>
    <DataSource Name="Sales">
      <ConnectionProperties><DataProvider>System.Data.DataSet</DataProvider></ConnectionProperties>
    </DataSource>
  </DataSources>
  <DataSets>
    <DataSet Name="Invoices">
      <Query><DataSourceName>Sales</DataSourceName><CommandText>/* Local Query */</CommandText></Query>
      <rd:DataSetInfo>
        <rd:DataSetName>Sales</rd:DataSetName>
        <rd:TableName>InvoiceProvider</rd:TableName>
        <rd:ObjectDataSourceSelectMethod>GetInvoices</rd:ObjectDataSourceSelectMethod>
        <rd:ObjectDataSourceSelectMethodSignature>Vec&lt;Invoice&gt; GetInvoices(i32)</rd:ObjectDataSourceSelectMethodSignature>
        <rd:ObjectDataSourceType>Demo.Sales.InvoiceProvider, Demo.Sales</rd:ObjectDataSourceType>
      </rd:DataSetInfo>
    </DataSet>
  </DataSets>
  <ReportParameters>
    <ReportParameter Name="Year">
      <DataType>Integer</DataType>
      <Prompt>Year</Prompt>
    </ReportParameter>
  </ReportParameters>
  <Body>
    <ReportItems>
      <Tablix Name="InvoiceTable">
        <DataSetName>Invoices</DataSetName>
        <TablixBody>
          <TablixRows>
            <TablixRow>
              <TablixCells>
                <TablixCell>
                  <CellContents>
                    <Subreport Name="Lines">
                      <ReportName>InvoiceLines</ReportName>
                      <Parameters>
                        <Parameter Name="orderId"><Value>=Fields!Id.Value</Value></Parameter>
                      </Parameters>
                    </Subreport>
                  </CellContents>
                </TablixCell>
                <TablixCell>
                  <CellContents>
                    <Subreport Name="Customer">
                      <ReportName>CustomerCard</ReportName>
                      <Parameters>
                        <Parameter Name="customerCode"><Value>=Fields!Customer.Value</Value></Parameter>
                      </Parameters>
                    </Subreport>
                  </CellContents>
                </TablixCell>
              </TablixCells>
            </TablixRow>
          </TablixRows>
        </TablixBody>
      </Tablix>
    </ReportItems>
  </Body>
</Report>
"#;

const LINES_RDLC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Report xmlns="http://schemas.microsoft.com/sqlserver/reporting/2008/01/reportdefinition"
        xmlns:rd="http://schemas.microsoft.com/SQLServer/reporting/reportdesigner">
  <DataSets>
    <DataSet Name="Lines">
      <Query><DataSourceName>Sales</DataSourceName><CommandText>/* Local Query */</CommandText></Query>
      <rd:DataSetInfo>
        <rd:ObjectDataSourceSelectMethodSignature>Vec&lt;InvoiceLine&gt; GetLines(i32)</rd:ObjectDataSourceSelectMethodSignature>
        <rd:ObjectDataSourceType>Demo.Sales.LineProvider</rd:ObjectDataSourceType>
      </rd:DataSetInfo>
    </DataSet>
  </DataSets>
  <ReportParameters>
    <ReportParameter Name="orderId"><DataType>Integer</DataType></ReportParameter>
  </ReportParameters>
  <Body><ReportItems/></Body>
</Report>
"#;

const CUSTOMER_RDLC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Report xmlns="http://schemas.microsoft.com/sqlserver/reporting/2008/01/reportdefinition"
        xmlns:rd="http://schemas.microsoft.com/SQLServer/reporting/reportdesigner">
  <DataSets>
    <DataSet Name="Customer">
      <Query><DataSourceName>Sales</DataSourceName><CommandText>/* Local Query */</CommandText></Query>
      <rd:DataSetInfo>
        <rd:ObjectDataSourceSelectMethodSignature>Vec&lt;Customer&gt; GetCustomer(String)</rd:ObjectDataSourceSelectMethodSignature>
        <rd:ObjectDataSourceType>Demo.Sales.CustomerProvider</rd:ObjectDataSourceType>
      </rd:DataSetInfo>
    </DataSet>
  </DataSets>
  <ReportParameters>
    <ReportParameter Name="customerCode"><DataType>String</DataType></ReportParameter>
  </ReportParameters>
  <Body><ReportItems/></Body>
</Report>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ReportDefinition;
    use crate::resolver::{ProviderResolver, SignatureResolver};

    #[test]
    fn every_demo_dataset_resolves() {
        let registry = registry();
        for (key, document) in definitions() {
            let definition = ReportDefinition::parse(key, document.as_bytes()).expect("parse");
            for dataset in definition.datasets() {
                SignatureResolver
                    .resolve(&registry, dataset)
                    .unwrap_or_else(|err| panic!("{key}/{}: {err}", dataset.name));
            }
        }
    }

    #[test]
    fn invoice_report_embeds_both_subreports_per_invoice() {
        let definition =
            ReportDefinition::parse(INVOICE_REPORT, INVOICE_RDLC.as_bytes()).expect("parse");
        assert_eq!(definition.subreport_names(), vec!["InvoiceLines", "CustomerCard"]);
        assert!(definition
            .subreports()
            .iter()
            .all(|reference| reference.scope_dataset.as_deref() == Some("Invoices")));
    }

    #[test]
    fn providers_filter_their_rows() {
        assert_eq!(InvoiceProvider.invoices(Some(2024)).len(), 3);
        assert_eq!(InvoiceProvider.invoices(None).len(), 4);
        assert_eq!(LineProvider.lines(101).len(), 2);
        assert_eq!(CustomerProvider.customer("acme").len(), 1);

        let total = InvoiceProvider.invoices(Some(2023))[0]
            .get("Total")
            .and_then(Value::as_f64);
        assert_eq!(total, Some(240.0));
    }
}
