// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt content model and money arithmetic.
//
// Amounts are `rust_decimal::Decimal` so that totals are exact and always
// rendered as `1234.50` (dot separator, no grouping) whatever the device locale.

use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TillrollError};

/// Timestamp format printed under the receipt title.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(name: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Build an item from raw form input.
    ///
    /// Name and price are required and the price must be a non-negative
    /// decimal such as `9.99`. A missing, unparsable, or zero quantity
    /// becomes 1.
    pub fn parse(name: &str, price: &str, quantity: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TillrollError::InvalidReceipt("item name is required".into()));
        }

        let price_text = price.trim();
        if price_text.is_empty() {
            return Err(TillrollError::InvalidReceipt(format!("price is required for '{name}'")));
        }
        let price = Decimal::from_str(price_text).map_err(|e| {
            TillrollError::InvalidReceipt(format!("invalid price '{price_text}': {e}"))
        })?;
        if price.is_sign_negative() {
            return Err(TillrollError::InvalidReceipt(format!(
                "price must not be negative: {price_text}"
            )));
        }

        let quantity = quantity
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|q| *q > 0)
            .unwrap_or(1);

        Ok(Self::new(name, price, quantity))
    }

    /// `price × quantity`, or `InvalidReceipt` when the product does not
    /// fit in a `Decimal`.
    pub fn line_total(&self) -> Result<Decimal> {
        self.price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| {
                TillrollError::InvalidReceipt(format!("amount too large for '{}'", self.name))
            })
    }
}

/// A receipt ready to be laid out for a thermal printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub title: String,
    pub issued_at: NaiveDateTime,
    /// Lines printed under the timestamp (store address, phone, ...).
    pub header_lines: Vec<String>,
    pub items: Vec<LineItem>,
    pub footer_lines: Vec<String>,
}

impl Receipt {
    /// An empty receipt stamped with the current local time.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            issued_at: Local::now().naive_local(),
            header_lines: Vec::new(),
            items: Vec::new(),
            footer_lines: Vec::new(),
        }
    }

    /// The sample receipt the print screen starts with.
    pub fn sample(title: impl Into<String>) -> Self {
        let mut receipt = Self::new(title);
        receipt.items = vec![
            LineItem::new("Product 1", Decimal::new(999, 2), 1),
            LineItem::new("Product 2", Decimal::new(1550, 2), 2),
        ];
        receipt
    }

    pub fn add_item(&mut self, item: LineItem) {
        self.items.push(item);
    }

    /// Remove the item at `index`, returning it if it existed.
    pub fn remove_item(&mut self, index: usize) -> Option<LineItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Sum of `price × quantity` over all items.
    pub fn total(&self) -> Result<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |sum, item| {
            sum.checked_add(item.line_total()?)
                .ok_or_else(|| TillrollError::InvalidReceipt("receipt total is too large".into()))
        })
    }

    /// Total rendered with exactly two decimals, e.g. `40.99`.
    pub fn formatted_total(&self) -> Result<String> {
        self.total().map(format_amount)
    }

    pub fn formatted_timestamp(&self) -> String {
        self.issued_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Render an amount with exactly two decimals, `.` separator, no grouping.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_total_is_exact() {
        let receipt = Receipt::sample("My Store");
        assert_eq!(receipt.formatted_total().unwrap(), "40.99");
    }

    #[test]
    fn total_from_parsed_items() {
        let mut receipt = Receipt::new("My Store");
        receipt.add_item(LineItem::parse("Product 1", "9.99", "1").unwrap());
        receipt.add_item(LineItem::parse("Product 2", "15.50", "2").unwrap());
        assert_eq!(receipt.formatted_total().unwrap(), "40.99");
    }

    #[test]
    fn amounts_always_have_two_decimals() {
        assert_eq!(format_amount(Decimal::from(5)), "5.00");
        assert_eq!(format_amount(Decimal::new(15, 1)), "1.50");
        assert_eq!(format_amount(Decimal::new(12345678, 2)), "123456.78");
        assert_eq!(format_amount(Decimal::new(1005, 3)), "1.01");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
    }

    #[test]
    fn empty_receipt_totals_zero() {
        assert_eq!(Receipt::new("Empty").formatted_total().unwrap(), "0.00");
    }

    #[test]
    fn parse_rejects_missing_fields() {
        assert!(LineItem::parse("", "1.00", "1").is_err());
        assert!(LineItem::parse("Tea", "  ", "1").is_err());
        assert!(LineItem::parse("Tea", "1,50", "1").is_err());
        assert!(LineItem::parse("Tea", "-2", "1").is_err());
    }

    #[test]
    fn parse_defaults_quantity_to_one() {
        assert_eq!(LineItem::parse("Tea", "2.00", "").unwrap().quantity, 1);
        assert_eq!(LineItem::parse("Tea", "2.00", "abc").unwrap().quantity, 1);
        assert_eq!(LineItem::parse("Tea", "2.00", "0").unwrap().quantity, 1);
        assert_eq!(LineItem::parse("Tea", "2.00", " 3 ").unwrap().quantity, 3);
    }

    #[test]
    fn remove_item_by_index() {
        let mut receipt = Receipt::sample("My Store");
        let removed = receipt.remove_item(0).unwrap();
        assert_eq!(removed.name, "Product 1");
        assert_eq!(receipt.items.len(), 1);
        assert!(receipt.remove_item(5).is_none());
        assert_eq!(receipt.formatted_total().unwrap(), "31.00");
    }

    #[test]
    fn oversized_line_is_rejected_not_panicking() {
        let mut receipt = Receipt::new("Big");
        receipt.add_item(LineItem::parse("Big", "79228162514264337593543950335", "2").unwrap());
        let err = receipt.formatted_total().unwrap_err();
        assert!(matches!(err, TillrollError::InvalidReceipt(_)));
    }

    #[test]
    fn oversized_sum_is_rejected() {
        let mut receipt = Receipt::new("Big");
        let max = Decimal::MAX;
        receipt.add_item(LineItem::new("A", max, 1));
        receipt.add_item(LineItem::new("B", max, 1));
        assert!(matches!(receipt.total(), Err(TillrollError::InvalidReceipt(_))));
    }

    #[test]
    fn prices_serialize_as_strings() {
        let item = LineItem::new("Tea", Decimal::new(250, 2), 1);
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"2.50\""));
        let back: LineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
