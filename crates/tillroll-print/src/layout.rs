// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt layout: turns a `Receipt` into the ordered command queue sent to
// the printer.
//
// Every `Text` command carries exactly one line including its trailing
// newline, matching how the printer SDKs buffer text.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use tillroll_core::config::ReceiptConfig;
use tillroll_core::error::Result;
use tillroll_core::receipt::{Receipt, format_amount};
use tillroll_core::types::{Alignment, PrintCommand, PrinterDescriptor};

/// Narrowest layout we will produce, regardless of configuration.
const MIN_COLUMNS: usize = 16;

/// Column-aware receipt formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLayout {
    columns: usize,
    currency_symbol: String,
}

impl ReceiptLayout {
    pub fn new(columns: usize, currency_symbol: impl Into<String>) -> Self {
        Self {
            columns: columns.max(MIN_COLUMNS),
            currency_symbol: currency_symbol.into(),
        }
    }

    pub fn from_config(config: &ReceiptConfig) -> Self {
        Self::new(config.paper_columns, config.currency_symbol.clone())
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Command queue for `receipt`, ending with a cut. Fails when the total
    /// cannot be computed.
    pub fn render(&self, receipt: &Receipt) -> Result<Vec<PrintCommand>> {
        let total = receipt.total()?;
        let mut out = vec![
            PrintCommand::TextSmoothing(true),
            PrintCommand::Align(Alignment::Left),
            PrintCommand::TextStyle { emphasis: true },
            PrintCommand::TextSize {
                width: 2,
                height: 2,
            },
            line(&receipt.title),
            PrintCommand::FeedLines(1),
            PrintCommand::TextStyle { emphasis: false },
            PrintCommand::TextSize {
                width: 1,
                height: 1,
            },
            line(&receipt.formatted_timestamp()),
        ];
        out.extend(receipt.header_lines.iter().map(|l| line(l)));
        out.push(PrintCommand::FeedLines(2));

        out.push(PrintCommand::TextStyle { emphasis: true });
        for item in &receipt.items {
            let left = format!("{} x{}", item.name, item.quantity);
            let right = self.money(item.price);
            out.extend(self.justify(&left, &right).iter().map(|l| line(l)));
        }
        out.push(PrintCommand::TextStyle { emphasis: false });
        out.push(PrintCommand::FeedLines(2));

        out.push(PrintCommand::Align(Alignment::Center));
        out.push(PrintCommand::TextSize {
            width: 1,
            height: 1,
        });
        out.push(line(&format!("Total: {}", self.money(total))));
        out.push(PrintCommand::FeedLines(2));

        if !receipt.footer_lines.is_empty() {
            out.extend(receipt.footer_lines.iter().map(|l| line(l)));
            out.push(PrintCommand::FeedLines(2));
        }

        out.push(PrintCommand::Cut);
        Ok(out)
    }

    /// Short self-test slip identifying the printer and how we reached it.
    pub fn diagnostic_page(
        &self,
        printer: &PrinterDescriptor,
        at: NaiveDateTime,
    ) -> Vec<PrintCommand> {
        vec![
            PrintCommand::Align(Alignment::Center),
            PrintCommand::TextSize {
                width: 1,
                height: 1,
            },
            PrintCommand::TextStyle { emphasis: true },
            line("PRINTER TEST"),
            PrintCommand::TextStyle { emphasis: false },
            line(&printer.display_name),
            line(&printer.target),
            line(&format!("Connection: {}", printer.connection_kind())),
            line(&at.format("%Y-%m-%d %H:%M").to_string()),
            PrintCommand::FeedLines(2),
            PrintCommand::Cut,
        ]
    }

    /// Left and right text on one line padded to the column width, or on two
    /// lines (right text right-aligned on the second) when they don't fit.
    pub fn justify(&self, left: &str, right: &str) -> Vec<String> {
        let left_len = left.chars().count();
        let right_len = right.chars().count();

        if left_len + 1 + right_len <= self.columns {
            let gap = self.columns - left_len - right_len;
            vec![format!("{left}{}{right}", " ".repeat(gap))]
        } else {
            let pad = self.columns.saturating_sub(right_len);
            vec![left.to_owned(), format!("{}{right}", " ".repeat(pad))]
        }
    }

    fn money(&self, amount: Decimal) -> String {
        format!("{}{}", self.currency_symbol, format_amount(amount))
    }
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self::from_config(&ReceiptConfig::default())
    }
}

fn line(text: &str) -> PrintCommand {
    PrintCommand::Text(format!("{text}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_receipt() -> Receipt {
        let mut receipt = Receipt::sample("My Store");
        receipt.issued_at = NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap();
        receipt.footer_lines = vec!["Thank you!".into()];
        receipt
    }

    fn texts(commands: &[PrintCommand]) -> Vec<&str> {
        commands
            .iter()
            .filter_map(|c| match c {
                PrintCommand::Text(t) => Some(t.trim_end_matches('\n')),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn receipt_lines_in_order() {
        let layout = ReceiptLayout::new(32, "$");
        let commands = layout.render(&fixed_receipt()).unwrap();
        assert_eq!(
            texts(&commands),
            [
                "My Store",
                "2026-03-14 09:30",
                "Product 1 x1               $9.99",
                "Product 2 x2              $15.50",
                "Total: $40.99",
                "Thank you!",
            ]
        );
        assert_eq!(commands.first(), Some(&PrintCommand::TextSmoothing(true)));
        assert_eq!(commands.last(), Some(&PrintCommand::Cut));
        assert_eq!(commands.iter().filter(|c| **c == PrintCommand::Cut).count(), 1);
    }

    #[test]
    fn justified_lines_fill_the_width() {
        let layout = ReceiptLayout::new(48, "$");
        let lines = layout.justify("Tea x2", "$5.00");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].chars().count(), 48);
        assert!(lines[0].starts_with("Tea x2 "));
        assert!(lines[0].ends_with(" $5.00"));
    }

    #[test]
    fn long_item_wraps_price_to_next_line() {
        let layout = ReceiptLayout::new(16, "$");
        let lines = layout.justify("Extra large oat latte x1", "$5.00");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Extra large oat latte x1");
        assert_eq!(lines[1], "           $5.00");
    }

    #[test]
    fn header_lines_follow_timestamp() {
        let mut receipt = fixed_receipt();
        receipt.header_lines = vec!["1 High Street".into()];
        let commands = ReceiptLayout::default().render(&receipt).unwrap();
        let lines = texts(&commands);
        assert_eq!(lines[2], "1 High Street");
    }

    #[test]
    fn diagnostic_page_names_the_printer() {
        let printer = PrinterDescriptor::new("TM-m30", "BT:00:11:22:33:44:55");
        let at = NaiveDate::from_ymd_opt(2026, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 0))
            .unwrap();
        let commands = ReceiptLayout::default().diagnostic_page(&printer, at);
        let lines = texts(&commands);
        assert!(lines.contains(&"TM-m30"));
        assert!(lines.contains(&"BT:00:11:22:33:44:55"));
        assert!(lines.contains(&"Connection: bluetooth"));
        assert_eq!(commands.last(), Some(&PrintCommand::Cut));
    }
}
