//! Checkout session: the state one visitor sees and the actions that move it.
//!
//! The session holds the ticket collection, the optional themed copy and the
//! checkout form. Engine work (loading, reserving) and copy generation run
//! as effects whose results come back as event actions.

mod reducer;

pub use reducer::RaffleReducer;

use crate::content::{ContentProvider, PageCopy, ThemeContent, ThemeResult};
use crate::engine::{self, RaffleEngine};
use crate::types::{BuyerInfo, Money, Ticket, TicketNumber};
use std::sync::Arc;
use std::time::Duration;

/// How long the success message stays up before the form resets
pub const DEFAULT_SUCCESS_DISPLAY: Duration = Duration::from_millis(2_500);

// ============================================================================
// State
// ============================================================================

/// Where the checkout form is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckoutPhase {
    /// Form accepts input
    #[default]
    Editing,
    /// A reservation is in flight; the form is locked
    Submitting,
    /// Reservation confirmed; waiting for the auto-reset
    Succeeded,
}

/// The checkout form
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckoutState {
    /// Whether the form is shown
    pub is_open: bool,
    /// Lifecycle phase
    pub phase: CheckoutPhase,
    /// Message of the last rejected or failed submission
    pub last_error: Option<String>,
    /// Counts accepted submissions; a reset only applies to the one it was scheduled for
    pub attempt: u64,
}

impl CheckoutState {
    /// Whether a reservation is in flight
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.phase == CheckoutPhase::Submitting
    }
}

/// Everything the page shows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaffleState {
    /// Full ticket collection, in number order
    pub tickets: Vec<Ticket>,
    /// Whether `tickets` came back from the engine yet
    pub tickets_loaded: bool,
    /// Themed copy, if any was generated
    pub theme: Option<ThemeContent>,
    /// Whether a copy request is outstanding
    pub loading_content: bool,
    /// Checkout form
    pub checkout: CheckoutState,
}

impl RaffleState {
    /// Empty session waiting for tickets and copy
    #[must_use]
    pub fn new() -> Self {
        Self {
            tickets: Vec::new(),
            tickets_loaded: false,
            theme: None,
            loading_content: true,
            checkout: CheckoutState::default(),
        }
    }

    /// Session over an already loaded collection
    #[must_use]
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets,
            tickets_loaded: true,
            ..Self::new()
        }
    }

    /// Numbers the visitor picked
    #[must_use]
    pub fn selected_numbers(&self) -> Vec<TicketNumber> {
        engine::selected_numbers(&self.tickets)
    }

    /// Number of tickets the visitor picked
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.tickets.iter().filter(|t| t.is_selected()).count()
    }

    /// Looks a ticket up by number
    #[must_use]
    pub fn ticket(&self, number: TicketNumber) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.number == number)
    }

    /// Header copy, themed or default
    #[must_use]
    pub fn page_copy(&self) -> PageCopy {
        PageCopy::resolve(self.theme.as_ref())
    }

    /// Price of the selection
    #[must_use]
    pub fn selection_total(&self, ticket_price: Money) -> Money {
        ticket_price.times(self.selected_count())
    }
}

impl Default for RaffleState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Session actions: commands from the front-end and events from effects
#[derive(Clone, Debug, PartialEq)]
pub enum RaffleAction {
    // Commands
    /// Build the ticket collection from the store
    LoadTickets,
    /// Ask the content provider for themed copy
    LoadTheme,
    /// Flip a ticket between available and selected
    ToggleTicket {
        /// Ticket to flip
        number: TicketNumber,
    },
    /// Show the checkout form
    OpenCheckout,
    /// Hide the checkout form
    CloseCheckout,
    /// Reserve the selection for `buyer`
    SubmitCheckout {
        /// Form contents
        buyer: BuyerInfo,
    },

    // Events
    /// Engine finished building the collection
    TicketsLoaded {
        /// Loaded tickets
        tickets: Vec<Ticket>,
    },
    /// Content provider answered
    ThemeLoaded {
        /// Provider result
        result: ThemeResult,
    },
    /// Reservation saved
    ReservationCompleted {
        /// Collection with the new SOLD tickets
        tickets: Vec<Ticket>,
        /// Numbers that were reserved
        numbers: Vec<TicketNumber>,
    },
    /// Reservation could not be saved
    ReservationFailed {
        /// Error message
        error: String,
    },
    /// Success display elapsed
    CheckoutReset {
        /// Submission whose success display elapsed
        attempt: u64,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the session reducer
#[derive(Clone)]
pub struct RaffleEnvironment {
    /// Ticket engine
    pub engine: Arc<RaffleEngine>,
    /// Themed copy source
    pub content: Arc<dyn ContentProvider>,
    /// How long a confirmed checkout stays on screen
    pub success_display: Duration,
}

impl RaffleEnvironment {
    /// Creates an environment with the default success display
    #[must_use]
    pub fn new(engine: Arc<RaffleEngine>, content: Arc<dyn ContentProvider>) -> Self {
        Self {
            engine,
            content,
            success_display: DEFAULT_SUCCESS_DISPLAY,
        }
    }

    /// Overrides the success display duration
    #[must_use]
    pub const fn with_success_display(mut self, success_display: Duration) -> Self {
        self.success_display = success_display;
        self
    }
}
