//! # Raffle
//!
//! A raffle ticket desk: a fixed range of numbered tickets, a visitor who
//! picks some of them, and a checkout that marks them sold in a local store.
//!
//! - [`engine`] builds the ticket collection and reserves tickets
//! - [`storage`] persists the sold set ([`TicketStore`])
//! - [`content`] produces optional themed page copy ([`ContentProvider`])
//! - [`session`] is the reducer driving one visitor's page and checkout
//! - [`display`] renders the page as text for the terminal front-end
//!
//! ## Example
//!
//! ```no_run
//! use raffle::{
//!     BuyerInfo, InMemoryTicketStore, RaffleConfig, RaffleEngine, TicketNumber,
//!     engine::toggle_selection,
//! };
//! use raffle_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn demo() -> raffle::error::Result<()> {
//! let engine = RaffleEngine::new(
//!     RaffleConfig::default(),
//!     Arc::new(InMemoryTicketStore::new()),
//!     Arc::new(SystemClock),
//! );
//! let tickets = toggle_selection(engine.initialize().await, TicketNumber::new(7));
//! let buyer = BuyerInfo::new("Maria Silva", "11999998888", "maria@x.com");
//! let tickets = engine.reserve(tickets, &[TicketNumber::new(7)], &buyer).await?;
//! assert!(tickets[6].is_sold());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod display;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod session;
pub mod storage;
pub mod types;

pub use config::Config;
pub use content::{
    AnthropicContentProvider, ContentProvider, PageCopy, StaticContentProvider, ThemeContent,
    ThemeResult,
};
pub use engine::{DemoSeeding, RaffleEngine};
pub use error::{ContentError, RaffleError, StorageError};
pub use session::{
    CheckoutPhase, CheckoutState, RaffleAction, RaffleEnvironment, RaffleReducer, RaffleState,
};
pub use storage::{InMemoryTicketStore, JsonFileTicketStore, TicketStore};
pub use types::{
    BuyerInfo, Money, Purchase, RaffleConfig, SoldTicketRecord, Ticket, TicketNumber,
    TicketStatus,
};
