use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

pub type RecordId = i64;

/// A REST collection of records with create/update payloads.
pub trait Resource: for<'de> Deserialize<'de> + Send {
    /// Collection path relative to the API base, with trailing slash.
    const COLLECTION: &'static str;

    type New: Serialize + Validate + Sync;
    type Update: Serialize + Validate + Sync;

    fn id(&self) -> RecordId;
}

fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut error = ValidationError::new("positive");
        error.message = Some("must be greater than zero".into());
        Err(error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: RecordId,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub owner: Option<RecordId>,
    #[serde(default)]
    pub owner_username: Option<String>,
    #[serde(default)]
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewStore {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct StoreUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,
    /// `Some(None)` clears the owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Option<RecordId>>,
}

impl Resource for Store {
    const COLLECTION: &'static str = "/store/";
    type New = NewStore;
    type Update = StoreUpdate;

    fn id(&self) -> RecordId {
        self.id
    }
}

/// A medicine sale. `total` is computed by the server from quantity and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: RecordId,
    pub store: RecordId,
    pub medicine: String,
    pub quantity: u32,
    pub price: Decimal,
    pub total: Decimal,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewSale {
    pub store: RecordId,
    #[validate(length(min = 1, max = 255))]
    pub medicine: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[validate(custom(function = "positive_amount"))]
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[validate(schema(function = "validate_sale_update"))]
pub struct SaleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    pub medicine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

fn validate_sale_update(update: &SaleUpdate) -> Result<(), ValidationError> {
    update.price.as_ref().map_or(Ok(()), positive_amount)
}

impl Resource for Sale {
    const COLLECTION: &'static str = "/sales/";
    type New = NewSale;
    type Update = SaleUpdate;

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(format!(
                "unknown payment method '{other}', expected cash, card or transfer"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: RecordId,
    pub sale: RecordId,
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewPayment {
    pub sale: RecordId,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[validate(schema(function = "validate_payment_update"))]
pub struct PaymentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
}

fn validate_payment_update(update: &PaymentUpdate) -> Result<(), ValidationError> {
    update.amount.as_ref().map_or(Ok(()), positive_amount)
}

impl Resource for Payment {
    const COLLECTION: &'static str = "/payment/";
    type New = NewPayment;
    type Update = PaymentUpdate;

    fn id(&self) -> RecordId {
        self.id
    }
}

/// One successful login, recorded by the server. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginActivity {
    pub id: RecordId,
    pub user: RecordId,
    pub username: String,
    pub logged_in_at: DateTime<Utc>,
}

/// Number of logins shown in the admin overview.
pub const RECENT_LOGINS: usize = 5;

/// Admin overview totals. `pending` is what has been sold but not yet paid.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSummary {
    pub stores: usize,
    pub sales: usize,
    pub payments: usize,
    pub total_sales: Decimal,
    pub total_payments: Decimal,
    pub pending: Decimal,
    /// First entries of the audit log, in the order the server returned them.
    pub recent_logins: Vec<LoginActivity>,
}

impl AdminSummary {
    pub fn from_records(
        stores: &[Store],
        sales: &[Sale],
        payments: &[Payment],
        mut logins: Vec<LoginActivity>,
    ) -> Self {
        let total_sales: Decimal = sales.iter().map(|sale| sale.total).sum();
        let total_payments: Decimal = payments.iter().map(|payment| payment.amount).sum();
        logins.truncate(RECENT_LOGINS);

        Self {
            stores: stores.len(),
            sales: sales.len(),
            payments: payments.len(),
            total_sales,
            total_payments,
            pending: total_sales - total_payments,
            recent_logins: logins,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ApprovalUpdate {
    pub approved: bool,
}
