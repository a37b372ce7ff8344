use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    client::error::{ClientError, ClientResult},
    dto::invoices::{InvoiceItemInput, InvoicePayload, InvoiceWithItems},
    pricing::{invoice_total, line_sum},
};

/// Rows a blank form starts with.
pub const INITIAL_ROWS: usize = 10;

/// One editable table row, kept as the raw text the operator typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftRow {
    pub name: String,
    pub quantity: String,
    pub price: String,
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim().replace(',', ".");
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text).ok()
}

impl DraftRow {
    pub fn new(name: &str, quantity: &str, price: &str) -> Self {
        Self {
            name: name.to_string(),
            quantity: quantity.to_string(),
            price: price.to_string(),
        }
    }

    /// Rows without both a quantity and a price are skipped on save.
    pub fn is_filled(&self) -> bool {
        !self.quantity.trim().is_empty() && !self.price.trim().is_empty()
    }

    /// Live sum shown next to the row; zero while the input does not parse
    /// or the product is out of range.
    pub fn sum(&self) -> Decimal {
        match (parse_decimal(&self.quantity), parse_decimal(&self.price)) {
            (Some(quantity), Some(price)) => line_sum(quantity, price).unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }
}

/// State behind the invoice form, for both new invoices and edits.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    editing: Option<i32>,
    pub contact: String,
    pub additional_info: String,
    pub date: NaiveDate,
    is_paid: bool,
    rows: Vec<DraftRow>,
}

impl InvoiceDraft {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            editing: None,
            contact: String::new(),
            additional_info: String::new(),
            date,
            is_paid: false,
            rows: vec![DraftRow::default(); INITIAL_ROWS],
        }
    }

    /// Id of the invoice being edited, `None` for a new one.
    pub fn editing(&self) -> Option<i32> {
        self.editing
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn rows(&self) -> &[DraftRow] {
        &self.rows
    }

    /// Rows paired with their 1-based display number.
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &DraftRow)> {
        self.rows.iter().enumerate().map(|(i, row)| (i + 1, row))
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut DraftRow> {
        self.rows.get_mut(index)
    }

    pub fn add_row(&mut self) {
        self.rows.push(DraftRow::default());
    }

    pub fn remove_last_row(&mut self) -> Option<DraftRow> {
        self.rows.pop()
    }

    /// Zero once the total no longer fits a money column.
    pub fn total(&self) -> Decimal {
        invoice_total(self.rows.iter().map(DraftRow::sum)).unwrap_or(Decimal::ZERO)
    }

    pub fn toggle_paid(&mut self) -> bool {
        self.is_paid = !self.is_paid;
        self.is_paid
    }

    pub fn predicted_number(last_invoice_id: Option<i32>) -> i32 {
        last_invoice_id.map_or(1, |last| last + 1)
    }

    /// Build the request body. Sums and the total are left to the server.
    pub fn collect(&self, shop_id: Option<i32>) -> ClientResult<InvoicePayload> {
        let shop_id = shop_id.ok_or_else(|| {
            ClientError::Validation("no shop available; log in again or create a shop".into())
        })?;

        let contact = self.contact.trim();
        if contact.is_empty() {
            return Err(ClientError::Validation("contact is required".into()));
        }

        let mut items = Vec::new();
        for (number, row) in self.numbered_rows().filter(|(_, row)| row.is_filled()) {
            let invalid = |what: &str| ClientError::Validation(format!("row {number}: invalid {what}"));
            let quantity = parse_decimal(&row.quantity).ok_or_else(|| invalid("quantity"))?;
            let price = parse_decimal(&row.price).ok_or_else(|| invalid("price"))?;
            if row.name.trim().is_empty() {
                return Err(invalid("name"));
            }
            if line_sum(quantity, price).is_none() {
                return Err(invalid("amount"));
            }
            items.push(InvoiceItemInput {
                name: row.name.trim().to_string(),
                quantity,
                price,
            });
        }

        if items.is_empty() {
            return Err(ClientError::Validation(
                "add at least one item to the invoice".into(),
            ));
        }

        let additional_info = self.additional_info.trim();
        Ok(InvoicePayload {
            shop_id: Some(shop_id),
            contact_info: contact.to_string(),
            additional_info: (!additional_info.is_empty()).then(|| additional_info.to_string()),
            is_paid: self.is_paid,
            created_at: Some(self.date),
            items,
        })
    }

    /// Fill the form from a saved invoice, padding the table to the initial size.
    pub fn load(&mut self, saved: &InvoiceWithItems) {
        let invoice = &saved.invoice;
        self.editing = Some(invoice.id);
        self.contact = invoice.contact_info.clone();
        self.additional_info = invoice.additional_info.clone().unwrap_or_default();
        self.date = invoice.created_at.date_naive();
        self.is_paid = invoice.is_paid;

        self.rows = saved
            .items
            .iter()
            .map(|item| DraftRow {
                name: item.name.clone(),
                quantity: item.quantity.normalize().to_string(),
                price: item.price.to_string(),
            })
            .collect();
        if self.rows.len() < INITIAL_ROWS {
            self.rows.resize(INITIAL_ROWS, DraftRow::default());
        }
    }

    pub fn clear(&mut self, date: NaiveDate) {
        *self = Self::new(date);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{Invoice, InvoiceItem};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn starts_with_blank_rows_and_zero_total() {
        let draft = InvoiceDraft::new(today());
        assert_eq!(draft.rows().len(), INITIAL_ROWS);
        assert_eq!(draft.total(), Decimal::ZERO);
        assert_eq!(draft.numbered_rows().last().map(|(n, _)| n), Some(INITIAL_ROWS));
    }

    #[test]
    fn total_follows_rows() {
        let mut draft = InvoiceDraft::new(today());
        *draft.row_mut(0).unwrap() = DraftRow::new("Tea", "2", "3,50");
        *draft.row_mut(1).unwrap() = DraftRow::new("Sugar", "0.5", "1.99");
        *draft.row_mut(2).unwrap() = DraftRow::new("Junk", "abc", "1");
        assert_eq!(draft.row_mut(0).unwrap().sum(), d("7.00"));
        assert_eq!(draft.total(), d("8.00"));

        draft.add_row();
        assert_eq!(draft.rows().len(), INITIAL_ROWS + 1);
        draft.remove_last_row();
        draft.remove_last_row();
        assert_eq!(draft.rows().len(), INITIAL_ROWS - 1);
    }

    #[test]
    fn oversized_rows_sum_to_zero_and_do_not_save() {
        let mut draft = InvoiceDraft::new(today());
        draft.contact = "Bulk buyer".into();
        *draft.row_mut(0).unwrap() = DraftRow::new("Tea", "2", "1");
        *draft.row_mut(1).unwrap() = DraftRow::new("x", "79228162514264337593543950335", "2");
        assert_eq!(draft.rows()[1].sum(), Decimal::ZERO);
        assert_eq!(draft.total(), d("2"));

        let err = draft.collect(Some(1)).unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref msg) if msg == "row 2: invalid amount"));
    }

    #[test]
    fn collect_validates_form() {
        let mut draft = InvoiceDraft::new(today());
        assert!(draft.collect(Some(1)).is_err());

        draft.contact = "Shop next door".into();
        assert!(draft.collect(None).is_err());
        assert!(draft.collect(Some(1)).is_err());

        *draft.row_mut(3).unwrap() = DraftRow::new("Nails", "x", "1");
        assert!(draft.collect(Some(1)).is_err());

        *draft.row_mut(3).unwrap() = DraftRow::new("Nails", "100", "0.05");
        draft.toggle_paid();
        let payload = draft.collect(Some(1)).unwrap();
        assert_eq!(payload.shop_id, Some(1));
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].quantity, d("100"));
        assert!(payload.is_paid);
        assert_eq!(payload.created_at, Some(today()));
        assert_eq!(payload.additional_info, None);
    }

    #[test]
    fn predicted_number_follows_last_invoice() {
        assert_eq!(InvoiceDraft::predicted_number(None), 1);
        assert_eq!(InvoiceDraft::predicted_number(Some(41)), 42);
    }

    #[test]
    fn load_and_clear() {
        let at = Utc.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap();
        let saved = InvoiceWithItems {
            invoice: Invoice {
                id: 9,
                shop_id: 1,
                user_id: 1,
                contact_info: "Bob".into(),
                additional_info: Some("deliver friday".into()),
                total_amount: d("5.00"),
                is_paid: true,
                created_at: at,
                updated_at: at,
            },
            items: vec![InvoiceItem {
                id: 1,
                invoice_id: 9,
                position: 0,
                name: "Soap".into(),
                quantity: d("2.000"),
                price: d("2.50"),
                sum: d("5.00"),
            }],
        };

        let mut draft = InvoiceDraft::new(today());
        draft.load(&saved);
        assert_eq!(draft.editing(), Some(9));
        assert_eq!(draft.rows().len(), INITIAL_ROWS);
        assert_eq!(draft.rows()[0].quantity, "2");
        assert_eq!(draft.total(), d("5.00"));
        assert!(draft.is_paid());
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2025, 4, 2).unwrap());

        draft.clear(today());
        assert_eq!(draft.editing(), None);
        assert!(draft.contact.is_empty());
        assert!(!draft.is_paid());
    }
}
