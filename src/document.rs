// Invoice documents handed to the persistence side once pricing is final
use crate::pricing::{format_amount, InvoiceBreakdown};
use crate::stay::DATE_FORMAT;
use chrono::NaiveDate;
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("XML parse error: {0}")]
    XmlParseError(String),

    #[error("XML serialization error: {0}")]
    XmlSerializeError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid amount in {field}: {value}")]
    InvalidAmount { field: &'static str, value: String },
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
#[serde(rename = "Invoice")]
pub struct InvoiceDocument {
    #[serde(rename = "@number")]
    pub number: String,
    #[serde(rename = "@currency")]
    pub currency: String,
    #[serde(rename = "@issued")]
    pub issued: String,
    pub customer: String,
    pub stay: XmlStay,
    pub lines: XmlLines,
    pub totals: XmlTotals,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlStay {
    #[serde(rename = "@checkIn")]
    pub check_in: String,
    #[serde(rename = "@checkOut")]
    pub check_out: String,
    #[serde(rename = "@nights")]
    pub nights: u32,
    #[serde(rename = "@adults")]
    pub adults: u32,
    #[serde(rename = "@children")]
    pub children: u32,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlLines {
    #[serde(rename = "Line")]
    pub lines: Vec<XmlLine>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlLine {
    #[serde(rename = "@room")]
    pub room: String,
    #[serde(rename = "@roomType")]
    pub room_type: String,
    #[serde(rename = "@nightlyRate")]
    pub nightly_rate: String,
    #[serde(rename = "@roomCost")]
    pub room_cost: String,
    // Empty when no meal plan is attached
    #[serde(rename = "@mealPlan")]
    pub meal_plan: String,
    #[serde(rename = "@mealCost")]
    pub meal_cost: String,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlTotals {
    pub room_cost: String,
    pub meal_cost: String,
    pub subtotal: String,
    pub tax_rate: String,
    pub tax: String,
    pub discount: String,
    pub total: String,
}

impl InvoiceDocument {
    // Amounts are rounded to cents here and nowhere earlier
    pub fn from_breakdown(
        number: impl Into<String>,
        customer: impl Into<String>,
        currency: impl Into<String>,
        issued: NaiveDate,
        breakdown: &InvoiceBreakdown,
    ) -> Self {
        let lines = breakdown
            .line_items
            .iter()
            .map(|item| XmlLine {
                room: item.room_number.clone(),
                room_type: item.room_type.clone(),
                nightly_rate: format_amount(item.nightly_rate),
                room_cost: format_amount(item.room_cost),
                meal_plan: item.meal_plan.clone().unwrap_or_default(),
                meal_cost: format_amount(item.meal_cost),
            })
            .collect();

        InvoiceDocument {
            number: number.into(),
            currency: currency.into(),
            issued: issued.format(DATE_FORMAT).to_string(),
            customer: customer.into(),
            stay: XmlStay {
                check_in: breakdown.check_in.format(DATE_FORMAT).to_string(),
                check_out: breakdown.check_out.format(DATE_FORMAT).to_string(),
                nights: breakdown.nights,
                adults: breakdown.guests.adults,
                children: breakdown.guests.children,
            },
            lines: XmlLines { lines },
            totals: XmlTotals {
                room_cost: format_amount(breakdown.room_cost),
                meal_cost: format_amount(breakdown.meal_cost),
                subtotal: format_amount(breakdown.subtotal),
                tax_rate: breakdown.tax_rate.to_string(),
                tax: format_amount(breakdown.tax),
                discount: format_amount(breakdown.discount),
                total: format_amount(breakdown.total),
            },
        }
    }

    pub fn to_xml(&self) -> Result<String, DocumentError> {
        quick_xml::se::to_string(self).map_err(|e| DocumentError::XmlSerializeError(e.to_string()))
    }

    pub fn from_xml(xml: &str) -> Result<Self, DocumentError> {
        from_str(xml).map_err(|e| DocumentError::XmlParseError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn total(&self) -> Result<f64, DocumentError> {
        self.totals
            .total
            .parse()
            .map_err(|_| DocumentError::InvalidAmount {
                field: "Total",
                value: self.totals.total.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::fixtures::date;
    use crate::pricing::fixtures::tables;
    use crate::pricing::{compute_invoice, Adjustments, RoomSelection};

    fn sample() -> InvoiceDocument {
        let t = tables();
        let breakdown = compute_invoice(
            &[
                RoomSelection::new("101").unwrap(),
                RoomSelection::new("201").unwrap().with_meal_plan("bb"),
            ],
            2,
            1,
            date("2024-01-01"),
            date("2024-01-04"),
            &t.ctx(),
            Adjustments::new(0.1, 25.0).unwrap(),
        )
        .unwrap();
        InvoiceDocument::from_breakdown(
            "INV-0001",
            "Ada Traveller",
            "USD",
            date("2024-01-04"),
            &breakdown,
        )
    }

    #[test]
    fn test_invoice_xml_layout() {
        let xml = sample().to_xml().unwrap();

        assert!(xml.starts_with(
            "<Invoice number=\"INV-0001\" currency=\"USD\" issued=\"2024-01-04\">"
        ));
        assert!(xml.contains("<Customer>Ada Traveller</Customer>"));
        assert!(xml.contains(concat!(
            "<Stay checkIn=\"2024-01-01\" checkOut=\"2024-01-04\" ",
            "nights=\"3\" adults=\"2\" children=\"1\"/>"
        )));
        assert!(xml.contains(concat!(
            "<Line room=\"101\" roomType=\"Standard\" nightlyRate=\"100.00\" ",
            "roomCost=\"300.00\" mealPlan=\"\" mealCost=\"0.00\"/>"
        )));
        assert!(xml.contains("mealPlan=\"Bed &amp; Breakfast\" mealCost=\"75.00\""));
        // 300 + 736.5 + 75 = 1111.5, tax 111.15, minus 25
        assert!(xml.contains("<Subtotal>1111.50</Subtotal>"));
        assert!(xml.contains("<Total>1197.65</Total>"));
    }

    #[test]
    fn test_invoice_xml_parses_back() {
        let doc = sample();
        let parsed = InvoiceDocument::from_xml(&doc.to_xml().unwrap()).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.lines.lines.len(), 2);
        assert!((parsed.total().unwrap() - 1197.65).abs() < 1e-9);
    }

    #[test]
    fn test_invoice_json() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Totals"]["Tax"], "111.15");
        assert_eq!(value["@number"], "INV-0001");
    }

    #[test]
    fn test_bad_documents() {
        assert!(matches!(
            InvoiceDocument::from_xml("<Invoice><Stay nights=\"many\"/></Invoice>"),
            Err(DocumentError::XmlParseError(_))
        ));
        let mut doc = sample();
        doc.totals.total = "n/a".to_string();
        assert!(matches!(doc.total(), Err(DocumentError::InvalidAmount { .. })));
    }
}
