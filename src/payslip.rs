use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de};

use crate::error::Error;

/// One employee's pay for one period, as entered by an administrator.
///
/// The renderer trusts these values: totals are displayed as supplied and never
/// recomputed. Absent values render as empty strings.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PayslipRecord {
    pub employee_name: String,
    pub employee_id: String,
    /// Free-text range, e.g. "1-Oct-2025 to 30-Oct-2025".
    pub pay_period: String,
    pub payment_date: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub paid_days: Option<u32>,
    #[serde(deserialize_with = "blank_as_none")]
    pub loss_of_pay_days: Option<u32>,
    #[serde(deserialize_with = "blank_as_none")]
    pub basic_salary: Option<Decimal>,
    #[serde(deserialize_with = "blank_as_none")]
    pub incentive: Option<Decimal>,
    #[serde(deserialize_with = "blank_as_none")]
    pub gross_earnings: Option<Decimal>,
    #[serde(deserialize_with = "blank_as_none")]
    pub income_tax: Option<Decimal>,
    #[serde(deserialize_with = "blank_as_none")]
    pub total_deduction: Option<Decimal>,
    #[serde(deserialize_with = "blank_as_none")]
    pub net_payable: Option<Decimal>,
    pub amount_in_words: String,
}

impl PayslipRecord {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Totals that disagree with their components. Only checked when every
    /// participating value is present.
    pub fn consistency_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if let (Some(basic), Some(incentive), Some(gross)) =
            (self.basic_salary, self.incentive, self.gross_earnings)
            && basic + incentive != gross
        {
            issues.push(format!(
                "gross earnings {gross} != basic {basic} + incentive {incentive}"
            ));
        }
        if let (Some(tax), Some(total)) = (self.income_tax, self.total_deduction)
            && tax != total
        {
            issues.push(format!("total deduction {total} != income tax {tax}"));
        }
        if let (Some(gross), Some(total), Some(net)) =
            (self.gross_earnings, self.total_deduction, self.net_payable)
            && gross - total != net
        {
            issues.push(format!(
                "net payable {net} != gross earnings {gross} - total deduction {total}"
            ));
        }
        issues
    }
}

/// Accepts a JSON number, a numeric string, a blank string or null.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    let text = match Option::<Raw>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Raw::Text(s)) => s,
        Some(Raw::Number(n)) => n.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|e| de::Error::custom(format!("{trimmed:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn decodes_strings_numbers_and_blanks() {
        let record = PayslipRecord::from_json(
            r#"{
                "employee_name": "Asha Rao",
                "employee_id": "E100",
                "paid_days": "30",
                "loss_of_pay_days": 0,
                "basic_salary": "50000.00",
                "incentive": 5000,
                "income_tax": "",
                "net_payable": null
            }"#,
        )
        .unwrap();
        assert_eq!(record.employee_name, "Asha Rao");
        assert_eq!(record.paid_days, Some(30));
        assert_eq!(record.loss_of_pay_days, Some(0));
        assert_eq!(record.basic_salary, Some(dec("50000.00")));
        assert_eq!(record.incentive, Some(dec("5000")));
        assert_eq!(record.income_tax, None);
        assert_eq!(record.net_payable, None);
        assert_eq!(record.gross_earnings, None);
        assert_eq!(record.pay_period, "");
    }

    #[test]
    fn rejects_non_numeric_amount() {
        let err = PayslipRecord::from_json(r#"{"basic_salary": "fifty"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)), "{err}");
    }

    #[test]
    fn rejects_negative_attendance() {
        let err = PayslipRecord::from_json(r#"{"paid_days": -1}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)), "{err}");
    }

    #[test]
    fn reports_inconsistent_totals() {
        let record = PayslipRecord {
            basic_salary: Some(dec("100.00")),
            incentive: Some(dec("10.00")),
            gross_earnings: Some(dec("120.00")),
            income_tax: Some(dec("5.00")),
            total_deduction: Some(dec("5.00")),
            net_payable: Some(dec("115.00")),
            ..Default::default()
        };
        let issues = record.consistency_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("gross earnings"));
    }

    #[test]
    fn consistent_record_has_no_issues() {
        let record = PayslipRecord {
            basic_salary: Some(dec("50000.00")),
            incentive: Some(dec("5000.00")),
            gross_earnings: Some(dec("55000.00")),
            income_tax: Some(dec("5000.00")),
            total_deduction: Some(dec("5000.00")),
            net_payable: Some(dec("50000.00")),
            ..Default::default()
        };
        assert!(record.consistency_issues().is_empty());
    }
}
