use std::cmp::Ordering;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::{
    client::error::{ClientError, ClientResult},
    models::Invoice,
    routes::params::SortOrder,
};

/// Longest date range the history screen accepts.
pub const MAX_RANGE_DAYS: i64 = 365;

/// One line of the invoice history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRow {
    pub number: i32,
    pub date: NaiveDate,
    pub contact: String,
    pub total: Decimal,
    pub is_paid: bool,
    pub shop_id: i32,
}

impl From<&Invoice> for InvoiceRow {
    fn from(invoice: &Invoice) -> Self {
        Self {
            number: invoice.id,
            date: invoice.created_at.date_naive(),
            contact: invoice.contact_info.clone(),
            total: invoice.total_amount,
            is_paid: invoice.is_paid,
            shop_id: invoice.shop_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Number,
    Date,
    Contact,
    Total,
    Paid,
}

impl SortField {
    fn compare(self, a: &InvoiceRow, b: &InvoiceRow) -> Ordering {
        match self {
            SortField::Number => a.number.cmp(&b.number),
            SortField::Date => a.date.cmp(&b.date),
            SortField::Contact => a.contact.to_lowercase().cmp(&b.contact.to_lowercase()),
            SortField::Total => a.total.cmp(&b.total),
            SortField::Paid => a.is_paid.cmp(&b.is_paid),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentFilter {
    #[default]
    All,
    Paid,
    Unpaid,
}

/// Criteria of the search panel. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub number: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub contact: Option<String>,
    pub amount_from: Option<Decimal>,
    pub amount_to: Option<Decimal>,
    pub payment: PaymentFilter,
}

impl HistoryFilter {
    pub fn validate(&self) -> ClientResult<()> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ClientError::Validation(
                    "start date must not be after end date".into(),
                ));
            }
            if to - from > Duration::days(MAX_RANGE_DAYS) {
                return Err(ClientError::Validation(
                    "date range must not exceed one year".into(),
                ));
            }
        }
        Ok(())
    }

    fn matches(&self, row: &InvoiceRow) -> bool {
        let needle = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase)
        };

        if let Some(number) = needle(&self.number) {
            if !row.number.to_string().contains(&number) {
                return false;
            }
        }
        if let Some(contact) = needle(&self.contact) {
            if !row.contact.to_lowercase().contains(&contact) {
                return false;
            }
        }
        if self.date_from.is_some_and(|from| row.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| row.date > to) {
            return false;
        }
        if self.amount_from.is_some_and(|min| row.total < min) {
            return false;
        }
        if self.amount_to.is_some_and(|max| row.total > max) {
            return false;
        }
        match self.payment {
            PaymentFilter::All => true,
            PaymentFilter::Paid => row.is_paid,
            PaymentFilter::Unpaid => !row.is_paid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Paid,
    Date,
    Contact,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Paid(bool),
    Date(NaiveDate),
    Contact(String),
}

impl GroupKey {
    fn of(field: GroupField, row: &InvoiceRow) -> Self {
        match field {
            GroupField::Paid => GroupKey::Paid(row.is_paid),
            GroupField::Date => GroupKey::Date(row.date),
            GroupField::Contact => GroupKey::Contact(row.contact.trim().to_string()),
        }
    }

    fn label(&self) -> String {
        match self {
            GroupKey::Paid(true) => "Paid".to_string(),
            GroupKey::Paid(false) => "Unpaid".to_string(),
            GroupKey::Date(date) => date.format("%Y-%m-%d").to_string(),
            GroupKey::Contact(contact) if contact.is_empty() => "Not specified".to_string(),
            GroupKey::Contact(contact) => contact.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub label: String,
    pub count: usize,
    pub total: Decimal,
    pub all_paid: bool,
    pub rows: Vec<InvoiceRow>,
}

/// State behind the history screen: everything loaded from the server and the
/// filtered, sorted view currently shown.
#[derive(Debug, Clone)]
pub struct InvoiceHistory {
    original: Vec<InvoiceRow>,
    current: Vec<InvoiceRow>,
    sort_field: SortField,
    sort_order: SortOrder,
    current_shop_id: Option<i32>,
    last_invoice_id: Option<i32>,
}

impl InvoiceHistory {
    pub fn new(current_shop_id: Option<i32>, last_invoice_id: Option<i32>) -> Self {
        Self {
            original: Vec::new(),
            current: Vec::new(),
            sort_field: SortField::Date,
            sort_order: SortOrder::Desc,
            current_shop_id,
            last_invoice_id,
        }
    }

    pub fn rows(&self) -> &[InvoiceRow] {
        &self.current
    }

    pub fn all_rows(&self) -> &[InvoiceRow] {
        &self.original
    }

    pub fn sort_state(&self) -> (SortField, SortOrder) {
        (self.sort_field, self.sort_order)
    }

    pub fn last_invoice_id(&self) -> Option<i32> {
        self.last_invoice_id
    }

    pub fn load(&mut self, invoices: &[Invoice]) {
        self.original = invoices.iter().map(InvoiceRow::from).collect();
        if let Some(latest) = self.original.iter().map(|row| row.number).max() {
            self.last_invoice_id = Some(latest);
        }
        self.current = self.original.clone();
        self.apply_sort();
    }

    /// Filter everything loaded for the current shop. An invalid filter leaves
    /// the view untouched.
    pub fn search(&mut self, filter: &HistoryFilter) -> ClientResult<usize> {
        filter.validate()?;
        let shop = self.current_shop_id;
        self.current = self
            .original
            .iter()
            .filter(|row| shop.is_none_or(|id| row.shop_id == id))
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        self.apply_sort();
        Ok(self.current.len())
    }

    pub fn reset_filters(&mut self) {
        self.current = self.original.clone();
        self.apply_sort();
    }

    /// Stable sort: rows with equal keys keep their relative order, and
    /// repeating the same sort changes nothing.
    pub fn sort(&mut self, field: SortField, order: SortOrder) {
        self.sort_field = field;
        self.sort_order = order;
        self.apply_sort();
    }

    /// Column-header behavior: the active column flips direction, a new one
    /// starts ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        let order = if self.sort_field == field {
            match self.sort_order {
                SortOrder::Asc => SortOrder::Desc,
                SortOrder::Desc => SortOrder::Asc,
            }
        } else {
            SortOrder::Asc
        };
        self.sort(field, order);
    }

    fn apply_sort(&mut self) {
        let field = self.sort_field;
        match self.sort_order {
            SortOrder::Asc => self.current.sort_by(|a, b| field.compare(a, b)),
            SortOrder::Desc => self.current.sort_by(|a, b| field.compare(b, a)),
        }
    }

    pub fn group_by(&self, field: GroupField) -> Vec<Group> {
        let mut keyed: Vec<(GroupKey, Vec<InvoiceRow>)> = Vec::new();
        for row in &self.current {
            let key = GroupKey::of(field, row);
            match keyed.iter_mut().find(|(k, _)| *k == key) {
                Some((_, rows)) => rows.push(row.clone()),
                None => keyed.push((key, vec![row.clone()])),
            }
        }
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

        keyed
            .into_iter()
            .map(|(key, rows)| Group {
                label: key.label(),
                count: rows.len(),
                total: rows.iter().map(|row| row.total).sum(),
                all_paid: rows.iter().all(|row| row.is_paid),
                rows,
            })
            .collect()
    }

    /// A freshly saved invoice goes on top of both lists.
    pub fn add(&mut self, invoice: &Invoice) {
        let row = InvoiceRow::from(invoice);
        self.last_invoice_id = Some(row.number);
        self.original.insert(0, row.clone());
        self.current.insert(0, row);
    }

    pub fn update(&mut self, invoice: &Invoice) {
        let row = InvoiceRow::from(invoice);
        for list in [&mut self.original, &mut self.current] {
            if let Some(slot) = list.iter_mut().find(|r| r.number == row.number) {
                *slot = row.clone();
            }
        }
    }

    pub fn remove(&mut self, id: i32) {
        if self.last_invoice_id == Some(id) {
            self.last_invoice_id = None;
        }
        self.original.retain(|row| row.number != id);
        self.current.retain(|row| row.number != id);
    }
}
