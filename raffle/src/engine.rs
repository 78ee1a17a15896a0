//! Raffle engine: ticket materialization, selection and reservation.
//!
//! Tickets are plain values. `initialize` builds the collection from the
//! store, the free functions derive new collections or views from an
//! existing one, and `reserve` is the only operation that writes.

use crate::error::Result;
use crate::metrics;
use crate::storage::TicketStore;
use crate::types::{
    BuyerInfo, Money, Purchase, RaffleConfig, SoldTicketRecord, Ticket, TicketNumber,
    TicketStatus,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use raffle_core::environment::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Buyer names used for demo seeding
pub const MOCK_BUYERS: [&str; 8] = [
    "Carlos Silva",
    "Ana Souza",
    "Marcos Oliveira",
    "Julia Lima",
    "Roberto Santos",
    "Fernanda Costa",
    "Lucas Pereira",
    "Beatriz Almeida",
];

/// Contact phone stamped on seeded tickets
pub const DEMO_PHONE: &str = "(11) 99999-9999";

/// Contact email stamped on seeded tickets
pub const DEMO_EMAIL: &str = "comprador@exemplo.com";

/// Simulated round trip of a reservation
pub const DEFAULT_RESERVATION_LATENCY: Duration = Duration::from_millis(800);

/// Whether an empty store is filled with pre-sold demo tickets
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DemoSeeding {
    /// Start with every ticket available
    #[default]
    Disabled,
    /// Mark roughly `ratio` of the tickets as sold
    Enabled {
        /// Share of tickets to sell, `0.0..=1.0`
        ratio: f64,
        /// RNG seed; `None` draws from OS entropy
        seed: Option<u64>,
    },
}

/// Owns the ticket lifecycle of one raffle
pub struct RaffleEngine {
    config: RaffleConfig,
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    seeding: DemoSeeding,
    reservation_latency: Duration,
}

impl RaffleEngine {
    /// Creates an engine with seeding disabled and the default latency
    #[must_use]
    pub fn new(config: RaffleConfig, store: Arc<dyn TicketStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
            seeding: DemoSeeding::Disabled,
            reservation_latency: DEFAULT_RESERVATION_LATENCY,
        }
    }

    /// Sets the demo seeding mode
    #[must_use]
    pub const fn with_seeding(mut self, seeding: DemoSeeding) -> Self {
        self.seeding = seeding;
        self
    }

    /// Sets the simulated reservation latency
    #[must_use]
    pub const fn with_reservation_latency(mut self, latency: Duration) -> Self {
        self.reservation_latency = latency;
        self
    }

    /// Raffle parameters
    #[must_use]
    pub const fn config(&self) -> &RaffleConfig {
        &self.config
    }

    /// Builds the full ticket collection.
    ///
    /// Every number starts AVAILABLE; stored SOLD records are laid over it.
    /// When the store holds nothing usable and seeding is enabled, a random
    /// share of tickets is sold to mock buyers and that set is persisted.
    /// Storage failures are logged and never returned.
    #[tracing::instrument(skip(self), fields(total = self.config.total_numbers()))]
    pub async fn initialize(&self) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.config.numbers().map(Ticket::available).collect();

        match self.store.load_sold().await {
            Ok(Some(records)) => {
                overlay_records(&mut tickets, records);
                metrics::record_available(available_count(&tickets));
                return tickets;
            },
            Ok(None) => debug!("No sold tickets stored yet"),
            Err(e) => warn!(error = %e, "Stored tickets unreadable, starting from an empty sheet"),
        }

        if let DemoSeeding::Enabled { ratio, seed } = self.seeding {
            self.seed(&mut tickets, ratio, seed).await;
        }

        metrics::record_available(available_count(&tickets));
        tickets
    }

    async fn seed(&self, tickets: &mut [Ticket], ratio: f64, seed: Option<u64>) {
        let ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let now = self.clock.now();

        for ticket in tickets.iter_mut() {
            if rng.gen_bool(ratio) {
                let name = MOCK_BUYERS[rng.gen_range(0..MOCK_BUYERS.len())];
                let buyer = BuyerInfo::new(name, DEMO_PHONE, DEMO_EMAIL);
                *ticket = Ticket::sold(
                    ticket.number,
                    Purchase::new(&buyer, now, self.config.ticket_price()),
                );
            }
        }

        let records: Vec<SoldTicketRecord> =
            tickets.iter().filter_map(SoldTicketRecord::from_ticket).collect();
        info!(seeded = records.len(), "Seeded demo sales");
        if let Err(e) = self.store.replace_sold(records).await {
            warn!(error = %e, "Failed to persist seeded tickets");
        }
    }

    /// Sells every non-SOLD ticket in `selected` to `buyer`.
    ///
    /// Waits the simulated latency, stamps each ticket with the buyer, the
    /// current time and the ticket price, then replaces the stored SOLD set.
    /// Tickets already SOLD are left as they are. There is no locking: the
    /// last writer to the store wins.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Storage`](crate::error::RaffleError::Storage)
    /// if the store rejects the write. The caller keeps its original tickets.
    #[tracing::instrument(skip(self, tickets, buyer), fields(count = selected.len()))]
    pub async fn reserve(
        &self,
        tickets: Vec<Ticket>,
        selected: &[TicketNumber],
        buyer: &BuyerInfo,
    ) -> Result<Vec<Ticket>> {
        tokio::time::sleep(self.reservation_latency).await;

        let purchase = Purchase::new(buyer, self.clock.now(), self.config.ticket_price());
        let mut sold_now = 0_usize;
        let tickets: Vec<Ticket> = tickets
            .into_iter()
            .map(|ticket| {
                if !ticket.is_sold() && selected.contains(&ticket.number) {
                    sold_now += 1;
                    Ticket::sold(ticket.number, purchase.clone())
                } else {
                    ticket
                }
            })
            .collect();

        let records: Vec<SoldTicketRecord> =
            tickets.iter().filter_map(SoldTicketRecord::from_ticket).collect();
        if let Err(e) = self.store.replace_sold(records).await {
            warn!(error = %e, "Reservation could not be saved");
            metrics::record_reservation(false, 0);
            return Err(e.into());
        }

        info!(sold = sold_now, "Reservation confirmed");
        metrics::record_reservation(true, sold_now);
        metrics::record_available(available_count(&tickets));
        Ok(tickets)
    }
}

impl std::fmt::Debug for RaffleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaffleEngine")
            .field("config", &self.config)
            .field("seeding", &self.seeding)
            .field("reservation_latency", &self.reservation_latency)
            .finish_non_exhaustive()
    }
}

/// Lays stored records over a freshly generated range; first record per number wins
fn overlay_records(tickets: &mut [Ticket], records: Vec<SoldTicketRecord>) {
    for record in records {
        let number = record.number;
        match tickets.iter_mut().find(|t| t.number == number) {
            Some(ticket) if ticket.is_sold() => {
                warn!(%number, "Duplicate stored record ignored");
            },
            Some(ticket) => *ticket = record.into_ticket(),
            None => warn!(%number, "Stored record outside the raffle range ignored"),
        }
    }
}

// ============================================================================
// Selection and derived views
// ============================================================================

/// Flips `number` between AVAILABLE and SELECTED.
///
/// SOLD or unknown numbers leave the collection as it was.
#[must_use]
pub fn toggle_selection(mut tickets: Vec<Ticket>, number: TicketNumber) -> Vec<Ticket> {
    if let Some(ticket) = tickets.iter_mut().find(|t| t.number == number) {
        match ticket.status {
            TicketStatus::Available => ticket.status = TicketStatus::Selected,
            TicketStatus::Selected => ticket.status = TicketStatus::Available,
            TicketStatus::Sold(_) => {},
        }
    }
    tickets
}

/// Tickets the visitor picked, in number order
#[must_use]
pub fn selected_tickets(tickets: &[Ticket]) -> Vec<&Ticket> {
    tickets.iter().filter(|t| t.is_selected()).collect()
}

/// Numbers of the selected tickets
#[must_use]
pub fn selected_numbers(tickets: &[Ticket]) -> Vec<TicketNumber> {
    tickets
        .iter()
        .filter(|t| t.is_selected())
        .map(|t| t.number)
        .collect()
}

/// Number of SOLD tickets
#[must_use]
pub fn sold_count(tickets: &[Ticket]) -> usize {
    tickets.iter().filter(|t| t.is_sold()).count()
}

/// Number of AVAILABLE tickets
#[must_use]
pub fn available_count(tickets: &[Ticket]) -> usize {
    tickets.iter().filter(|t| t.is_available()).count()
}

/// Share of the raffle sold, `0.0..=100.0`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_percent(tickets: &[Ticket], config: &RaffleConfig) -> f64 {
    sold_count(tickets) as f64 / f64::from(config.total_numbers()) * 100.0
}

/// Price of the current selection
#[must_use]
pub fn selection_total(tickets: &[Ticket], config: &RaffleConfig) -> Money {
    config
        .ticket_price()
        .times(tickets.iter().filter(|t| t.is_selected()).count())
}
