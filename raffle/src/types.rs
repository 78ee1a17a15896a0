//! Domain types for the raffle desk.
//!
//! A raffle is a fixed range of numbered tickets. Each ticket is AVAILABLE,
//! SELECTED by the current visitor, or SOLD to a buyer. Only SOLD tickets
//! carry buyer data, and only SOLD tickets are ever persisted.

use crate::error::{BuyerField, RaffleError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::RangeInclusive;

// ============================================================================
// Value Objects
// ============================================================================

/// A ticket number, `1..=total_numbers`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(u32);

impl TicketNumber {
    /// Creates a `TicketNumber`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw number
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for TicketNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Grid label: zero-padded to three digits (`007`, `042`, `200`)
impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// An amount of money in cents
///
/// Serialized as a decimal number (`10` or `10.5`) to match stored records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates an amount from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates an amount from a decimal value, rounding to the nearest cent
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::InvalidPrice`] for negative or non-finite values.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked above
    pub fn from_decimal(value: f64) -> Result<Self, RaffleError> {
        if !value.is_finite() || value < 0.0 {
            return Err(RaffleError::InvalidPrice(value.to_string()));
        }
        Ok(Self((value * 100.0).round() as u64))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Returns the amount as a decimal value
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // ticket prices are far below 2^52 cents
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiplies by a ticket count, saturating on overflow
    #[must_use]
    pub fn times(self, count: usize) -> Self {
        Self(self.0.saturating_mul(u64::try_from(count).unwrap_or(u64::MAX)))
    }

    /// Formats with a currency symbol and decimal comma: `R$ 20,00`
    #[must_use]
    pub fn display_with(self, currency_symbol: &str) -> String {
        format!("{currency_symbol} {},{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_u64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_decimal())
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Buyer data stamped on a ticket when it is sold
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Purchase {
    /// Buyer's full name
    pub buyer_name: String,
    /// Buyer's phone
    pub buyer_phone: String,
    /// Buyer's email
    pub buyer_email: String,
    /// When the reservation was confirmed
    pub purchase_date: DateTime<Utc>,
    /// Price charged for this ticket
    pub amount_paid: Money,
}

impl Purchase {
    /// Stamps `buyer` with the purchase time and amount
    #[must_use]
    pub fn new(buyer: &BuyerInfo, purchase_date: DateTime<Utc>, amount_paid: Money) -> Self {
        Self {
            buyer_name: buyer.full_name.clone(),
            buyer_phone: buyer.phone.clone(),
            buyer_email: buyer.email.clone(),
            purchase_date,
            amount_paid,
        }
    }
}

/// Ticket status; buyer data exists only on `Sold`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TicketStatus {
    /// Free to pick
    Available,
    /// Picked by the current visitor, not saved anywhere
    Selected,
    /// Paid for; never changes again
    Sold(Purchase),
}

/// One raffle entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    /// Ticket number
    pub number: TicketNumber,
    /// Current status
    pub status: TicketStatus,
}

impl Ticket {
    /// Creates an AVAILABLE ticket
    #[must_use]
    pub const fn available(number: TicketNumber) -> Self {
        Self {
            number,
            status: TicketStatus::Available,
        }
    }

    /// Creates a SOLD ticket
    #[must_use]
    pub const fn sold(number: TicketNumber, purchase: Purchase) -> Self {
        Self {
            number,
            status: TicketStatus::Sold(purchase),
        }
    }

    /// Whether the ticket can still be picked
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.status, TicketStatus::Available)
    }

    /// Whether the current visitor picked the ticket
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        matches!(self.status, TicketStatus::Selected)
    }

    /// Whether the ticket was sold
    #[must_use]
    pub const fn is_sold(&self) -> bool {
        matches!(self.status, TicketStatus::Sold(_))
    }

    /// Buyer data, if sold
    #[must_use]
    pub const fn purchase(&self) -> Option<&Purchase> {
        match &self.status {
            TicketStatus::Sold(purchase) => Some(purchase),
            TicketStatus::Available | TicketStatus::Selected => None,
        }
    }
}

// ============================================================================
// Checkout input
// ============================================================================

/// Contact details collected by the checkout form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerInfo {
    /// Buyer's full name
    pub full_name: String,
    /// Contact phone
    pub phone: String,
    /// Contact email
    pub email: String,
}

impl BuyerInfo {
    /// Creates buyer info
    #[must_use]
    pub fn new(
        full_name: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            phone: phone.into(),
            email: email.into(),
        }
    }

    /// Checks that every field is filled in
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::MissingBuyerField`] naming the first blank field.
    pub fn validate(&self) -> Result<(), RaffleError> {
        let fields = [
            (BuyerField::FullName, &self.full_name),
            (BuyerField::Phone, &self.phone),
            (BuyerField::Email, &self.email),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(RaffleError::MissingBuyerField(field));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Fixed parameters of one raffle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    ticket_price: Money,
    total_numbers: u32,
    currency_symbol: String,
}

impl RaffleConfig {
    /// Creates a raffle configuration
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NoTickets`] when `total_numbers` is zero.
    pub fn new(
        ticket_price: Money,
        total_numbers: u32,
        currency_symbol: impl Into<String>,
    ) -> Result<Self, RaffleError> {
        if total_numbers == 0 {
            return Err(RaffleError::NoTickets);
        }
        Ok(Self {
            ticket_price,
            total_numbers,
            currency_symbol: currency_symbol.into(),
        })
    }

    /// Price of a single ticket
    #[must_use]
    pub const fn ticket_price(&self) -> Money {
        self.ticket_price
    }

    /// Number of tickets in the raffle
    #[must_use]
    pub const fn total_numbers(&self) -> u32 {
        self.total_numbers
    }

    /// Display symbol for prices
    #[must_use]
    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    /// Every ticket number of the raffle, in order
    pub fn numbers(&self) -> impl Iterator<Item = TicketNumber> {
        self.range().map(TicketNumber::new)
    }

    /// Whether `number` belongs to the raffle
    #[must_use]
    pub fn contains(&self, number: TicketNumber) -> bool {
        self.range().contains(&number.value())
    }

    /// Formats an amount with this raffle's currency
    #[must_use]
    pub fn format_price(&self, amount: Money) -> String {
        amount.display_with(&self.currency_symbol)
    }

    fn range(&self) -> RangeInclusive<u32> {
        1..=self.total_numbers
    }
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            ticket_price: Money::from_cents(1_000),
            total_numbers: 200,
            currency_symbol: "R$".to_string(),
        }
    }
}

// ============================================================================
// Persisted records
// ============================================================================

/// Status marker of a persisted record; only SOLD tickets are stored
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Sold ticket
    #[serde(rename = "SOLD")]
    Sold,
}

/// One row of the sold-ticket sheet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoldTicketRecord {
    /// Ticket number
    pub number: TicketNumber,
    /// Always `"SOLD"`
    pub status: RecordStatus,
    /// Buyer's full name
    pub buyer_name: String,
    /// Buyer's phone
    pub buyer_phone: String,
    /// Buyer's email
    pub buyer_email: String,
    /// Purchase time (RFC 3339)
    pub purchase_date: DateTime<Utc>,
    /// Price charged
    pub amount_paid: Money,
}

impl SoldTicketRecord {
    /// Builds a record from a ticket; `None` unless the ticket is SOLD
    #[must_use]
    pub fn from_ticket(ticket: &Ticket) -> Option<Self> {
        let purchase = ticket.purchase()?;
        Some(Self {
            number: ticket.number,
            status: RecordStatus::Sold,
            buyer_name: purchase.buyer_name.clone(),
            buyer_phone: purchase.buyer_phone.clone(),
            buyer_email: purchase.buyer_email.clone(),
            purchase_date: purchase.purchase_date,
            amount_paid: purchase.amount_paid,
        })
    }

    /// Converts the record back into a SOLD ticket
    #[must_use]
    pub fn into_ticket(self) -> Ticket {
        Ticket::sold(
            self.number,
            Purchase {
                buyer_name: self.buyer_name,
                buyer_phone: self.buyer_phone,
                buyer_email: self.buyer_email,
                purchase_date: self.purchase_date,
                amount_paid: self.amount_paid,
            },
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use raffle_core::environment::Clock;
    use raffle_testing::test_clock;

    #[test]
    fn ticket_number_is_zero_padded() {
        assert_eq!(TicketNumber::new(7).to_string(), "007");
        assert_eq!(TicketNumber::new(42).to_string(), "042");
        assert_eq!(TicketNumber::new(200).to_string(), "200");
        assert_eq!(TicketNumber::new(1234).to_string(), "1234");
    }

    #[test]
    fn money_formats_both_ways() {
        let total = Money::from_cents(1_000).times(2);
        assert_eq!(total.to_string(), "20.00");
        assert_eq!(total.display_with("R$"), "R$ 20,00");
        assert_eq!(Money::from_cents(1_005).display_with("R$"), "R$ 10,05");
    }

    #[test]
    fn money_rejects_negative_and_nan() {
        assert!(Money::from_decimal(-1.0).is_err());
        assert!(Money::from_decimal(f64::NAN).is_err());
        assert_eq!(Money::from_decimal(10.0).unwrap(), Money::from_cents(1_000));
        assert_eq!(Money::from_decimal(0.1 + 0.2).unwrap(), Money::from_cents(30));
    }

    #[test]
    fn whole_amounts_serialize_without_fraction() {
        assert_eq!(serde_json::to_string(&Money::from_cents(1_000)).unwrap(), "10");
        assert_eq!(serde_json::to_string(&Money::from_cents(1_050)).unwrap(), "10.5");
        assert_eq!(serde_json::to_string(&Money::ZERO).unwrap(), "0");
    }

    #[test]
    fn buyer_validation_names_first_blank_field() {
        assert!(BuyerInfo::new("Maria Silva", "11999998888", "maria@x.com").validate().is_ok());

        let err = BuyerInfo::new("  ", "11999998888", "").validate().unwrap_err();
        assert!(matches!(err, RaffleError::MissingBuyerField(BuyerField::FullName)));

        let err = BuyerInfo::new("Maria", "11999998888", " ").validate().unwrap_err();
        assert_eq!(err.to_string(), "email is required");
    }

    #[test]
    fn config_rejects_empty_raffle() {
        assert!(matches!(
            RaffleConfig::new(Money::ZERO, 0, "R$"),
            Err(RaffleError::NoTickets)
        ));
        let config = RaffleConfig::new(Money::ZERO, 3, "$").unwrap();
        let numbers: Vec<u32> = config.numbers().map(TicketNumber::value).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(config.contains(TicketNumber::new(3)));
        assert!(!config.contains(TicketNumber::new(0)));
        assert!(!config.contains(TicketNumber::new(4)));
    }

    #[test]
    fn only_sold_tickets_become_records() {
        assert!(SoldTicketRecord::from_ticket(&Ticket::available(TicketNumber::new(1))).is_none());

        let buyer = BuyerInfo::new("Ana Souza", "(11) 99999-9999", "ana@exemplo.com");
        let purchase = Purchase::new(&buyer, test_clock().now(), Money::from_cents(1_000));
        let ticket = Ticket::sold(TicketNumber::new(9), purchase);

        let record = SoldTicketRecord::from_ticket(&ticket).unwrap();
        assert_eq!(record.status, RecordStatus::Sold);
        assert_eq!(record.into_ticket(), ticket);
    }

    #[test]
    fn record_uses_sheet_field_names() {
        let json = r#"{
            "number": 12,
            "status": "SOLD",
            "buyerName": "Julia Lima",
            "buyerPhone": "(11) 99999-9999",
            "buyerEmail": "comprador@exemplo.com",
            "purchaseDate": "2024-06-01T12:00:00.000Z",
            "amountPaid": 10
        }"#;
        let record: SoldTicketRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.number, TicketNumber::new(12));
        assert_eq!(record.amount_paid, Money::from_cents(1_000));
        assert_eq!(record.purchase_date, test_clock().now());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "SOLD");
        assert_eq!(value["buyerName"], "Julia Lima");
        assert_eq!(value["amountPaid"], 10);
        assert!(serde_json::to_string(&record).unwrap().contains("\"amountPaid\":10}"));
    }

    #[test]
    fn record_with_other_status_is_rejected() {
        let json = r#"{"number":1,"status":"AVAILABLE","buyerName":"x","buyerPhone":"x",
            "buyerEmail":"x","purchaseDate":"2024-06-01T12:00:00Z","amountPaid":10}"#;
        assert!(serde_json::from_str::<SoldTicketRecord>(json).is_err());
    }
}
