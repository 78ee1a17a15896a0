//! Session reducer

use super::{CheckoutPhase, RaffleAction, RaffleEnvironment, RaffleState};
use crate::content::ThemeResult;
use crate::engine;
use crate::error::RaffleError;
use crate::metrics;
use crate::types::BuyerInfo;
use raffle_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Reducer for a visitor's raffle session
#[derive(Clone, Copy, Debug, Default)]
pub struct RaffleReducer;

impl RaffleReducer {
    /// Creates the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn submit(
        state: &mut RaffleState,
        buyer: BuyerInfo,
        env: &RaffleEnvironment,
    ) -> SmallVec<[Effect<RaffleAction>; 4]> {
        if !state.checkout.is_open {
            tracing::debug!("Ignoring submit, checkout is closed");
            return SmallVec::new();
        }
        if state.checkout.phase != CheckoutPhase::Editing {
            tracing::debug!(phase = ?state.checkout.phase, "Ignoring submit, checkout is busy");
            return SmallVec::new();
        }

        let numbers = state.selected_numbers();
        let validation = if numbers.is_empty() {
            Err(RaffleError::EmptySelection)
        } else {
            buyer.validate()
        };
        if let Err(error) = validation {
            state.checkout.last_error = Some(error.to_string());
            return SmallVec::new();
        }

        state.checkout.phase = CheckoutPhase::Submitting;
        state.checkout.last_error = None;
        state.checkout.attempt += 1;
        tracing::info!(count = numbers.len(), "Submitting checkout");

        let engine = env.engine.clone();
        let tickets = state.tickets.clone();
        smallvec![Effect::future(async move {
            Some(match engine.reserve(tickets, &numbers, &buyer).await {
                Ok(tickets) => RaffleAction::ReservationCompleted { tickets, numbers },
                Err(error) => RaffleAction::ReservationFailed {
                    error: error.to_string(),
                },
            })
        })]
    }
}

impl Reducer for RaffleReducer {
    type State = RaffleState;
    type Action = RaffleAction;
    type Environment = RaffleEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            RaffleAction::LoadTickets => {
                let engine = env.engine.clone();
                smallvec![Effect::future(async move {
                    Some(RaffleAction::TicketsLoaded {
                        tickets: engine.initialize().await,
                    })
                })]
            },

            RaffleAction::LoadTheme => {
                state.loading_content = true;
                let content = env.content.clone();
                smallvec![Effect::future(async move {
                    let result = content.generate().await;
                    metrics::record_theme_request(result.outcome());
                    Some(RaffleAction::ThemeLoaded { result })
                })]
            },

            RaffleAction::ToggleTicket { number } => {
                if state.checkout.is_submitting() {
                    tracing::debug!(%number, "Ignoring toggle while submitting");
                } else {
                    let tickets = std::mem::take(&mut state.tickets);
                    state.tickets = engine::toggle_selection(tickets, number);
                }
                SmallVec::new()
            },

            RaffleAction::OpenCheckout => {
                if state.selected_count() == 0 {
                    tracing::debug!("Ignoring checkout without a selection");
                } else if state.checkout.phase == CheckoutPhase::Editing {
                    state.checkout.is_open = true;
                    state.checkout.last_error = None;
                }
                SmallVec::new()
            },

            RaffleAction::CloseCheckout => {
                if state.checkout.is_submitting() {
                    tracing::debug!("Ignoring close while submitting");
                } else {
                    state.checkout.is_open = false;
                    state.checkout.phase = CheckoutPhase::Editing;
                    state.checkout.last_error = None;
                }
                SmallVec::new()
            },

            RaffleAction::SubmitCheckout { buyer } => Self::submit(state, buyer, env),

            // ========== Events ==========
            RaffleAction::TicketsLoaded { tickets } => {
                state.tickets = tickets;
                state.tickets_loaded = true;
                SmallVec::new()
            },

            RaffleAction::ThemeLoaded { result } => {
                state.loading_content = false;
                if let ThemeResult::Content(theme) = result {
                    state.theme = Some(theme);
                }
                SmallVec::new()
            },

            RaffleAction::ReservationCompleted { tickets, numbers } => {
                tracing::info!(count = numbers.len(), "Checkout succeeded");
                state.tickets = tickets;
                state.checkout.phase = CheckoutPhase::Succeeded;
                smallvec![Effect::delay(
                    env.success_display,
                    RaffleAction::CheckoutReset {
                        attempt: state.checkout.attempt,
                    }
                )]
            },

            RaffleAction::ReservationFailed { error } => {
                tracing::warn!(%error, "Checkout failed, selection kept");
                state.checkout.phase = CheckoutPhase::Editing;
                state.checkout.last_error = Some(error);
                SmallVec::new()
            },

            RaffleAction::CheckoutReset { attempt } => {
                if state.checkout.phase == CheckoutPhase::Succeeded
                    && state.checkout.attempt == attempt
                {
                    state.checkout.is_open = false;
                    state.checkout.phase = CheckoutPhase::Editing;
                    state.checkout.last_error = None;
                } else {
                    tracing::debug!(attempt, current = state.checkout.attempt, "Ignoring stale reset");
                }
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::content::{StaticContentProvider, ThemeContent};
    use crate::engine::RaffleEngine;
    use crate::session::{CheckoutState, DEFAULT_SUCCESS_DISPLAY};
    use crate::storage::InMemoryTicketStore;
    use crate::types::{Money, Purchase, RaffleConfig, Ticket, TicketNumber};
    use raffle_core::environment::Clock;
    use raffle_testing::{ReducerTest, assertions, test_clock};
    use std::sync::Arc;
    use std::time::Duration;

    fn theme() -> ThemeContent {
        ThemeContent {
            title: "Setup dos Sonhos".to_string(),
            description: "Concorra. Boa sorte!".to_string(),
            prize_highlights: vec!["MacBook".to_string()],
        }
    }

    fn env_with(store: Arc<InMemoryTicketStore>) -> RaffleEnvironment {
        let config = RaffleConfig::new(Money::from_cents(1_000), 10, "R$").unwrap();
        let engine = RaffleEngine::new(config, store, Arc::new(test_clock()))
            .with_reservation_latency(Duration::ZERO);
        RaffleEnvironment::new(
            Arc::new(engine),
            Arc::new(StaticContentProvider::content(theme())),
        )
    }

    fn env() -> RaffleEnvironment {
        env_with(Arc::new(InMemoryTicketStore::new()))
    }

    fn n(value: u32) -> TicketNumber {
        TicketNumber::new(value)
    }

    fn fresh() -> RaffleState {
        RaffleState::with_tickets((1..=10).map(|v| Ticket::available(n(v))).collect())
    }

    fn maria() -> BuyerInfo {
        BuyerInfo::new("Maria Silva", "11999998888", "maria@x.com")
    }

    /// Runs the single Future effect of `effects` and returns its action
    async fn run_future(effects: SmallVec<[Effect<RaffleAction>; 4]>) -> Option<RaffleAction> {
        let mut effects = effects.into_iter();
        match effects.next() {
            Some(Effect::Future(fut)) => fut.await,
            other => unreachable!("expected a future effect, got {other:?}"),
        }
    }

    #[test]
    fn new_session_waits_for_content() {
        let state = RaffleState::new();
        assert!(state.loading_content);
        assert!(!state.tickets_loaded);
        assert_eq!(state.checkout, CheckoutState::default());
    }

    #[test]
    fn toggle_selects_ticket() {
        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .when_action(RaffleAction::ToggleTicket { number: n(3) })
            .then_state(|state| assert_eq!(state.selected_numbers(), vec![n(3)]))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn open_checkout_needs_a_selection() {
        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .when_action(RaffleAction::OpenCheckout)
            .then_state(|state| assert!(!state.checkout.is_open))
            .run();

        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions([RaffleAction::ToggleTicket { number: n(1) }])
            .when_action(RaffleAction::OpenCheckout)
            .then_state(|state| assert!(state.checkout.is_open))
            .run();
    }

    #[test]
    fn blank_buyer_field_is_rejected() {
        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions([
                RaffleAction::ToggleTicket { number: n(1) },
                RaffleAction::OpenCheckout,
            ])
            .when_action(RaffleAction::SubmitCheckout {
                buyer: BuyerInfo::new("Maria", "", "maria@x.com"),
            })
            .then_state(|state| {
                assert_eq!(state.checkout.phase, CheckoutPhase::Editing);
                assert_eq!(state.checkout.last_error.as_deref(), Some("phone is required"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn submit_locks_the_form() {
        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions([
                RaffleAction::ToggleTicket { number: n(1) },
                RaffleAction::OpenCheckout,
            ])
            .when_action(RaffleAction::SubmitCheckout { buyer: maria() })
            .then_state(|state| assert!(state.checkout.is_submitting()))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn second_submit_is_ignored_while_in_flight() {
        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions([
                RaffleAction::ToggleTicket { number: n(1) },
                RaffleAction::OpenCheckout,
                RaffleAction::SubmitCheckout { buyer: maria() },
            ])
            .when_action(RaffleAction::SubmitCheckout { buyer: maria() })
            .then_state(|state| assert!(state.checkout.is_submitting()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn close_and_toggle_are_ignored_while_submitting() {
        let submitting = [
            RaffleAction::ToggleTicket { number: n(1) },
            RaffleAction::OpenCheckout,
            RaffleAction::SubmitCheckout { buyer: maria() },
        ];

        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions(submitting.clone())
            .when_action(RaffleAction::CloseCheckout)
            .then_state(|state| assert!(state.checkout.is_open))
            .run();

        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions(submitting)
            .when_action(RaffleAction::ToggleTicket { number: n(2) })
            .then_state(|state| assert_eq!(state.selected_numbers(), vec![n(1)]))
            .run();
    }

    #[test]
    fn completion_schedules_reset() {
        let mut reserved = fresh().tickets;
        reserved[0] = Ticket::sold(
            n(1),
            Purchase::new(&maria(), test_clock().now(), Money::from_cents(1_000)),
        );
        let expected = reserved.clone();

        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions([
                RaffleAction::ToggleTicket { number: n(1) },
                RaffleAction::OpenCheckout,
                RaffleAction::SubmitCheckout { buyer: maria() },
            ])
            .when_action(RaffleAction::ReservationCompleted {
                tickets: reserved,
                numbers: vec![n(1)],
            })
            .then_state(move |state| {
                assert_eq!(state.checkout.phase, CheckoutPhase::Succeeded);
                assert_eq!(state.tickets, expected);
            })
            .then_effects(|effects| {
                assertions::assert_has_delay_effect(effects, DEFAULT_SUCCESS_DISPLAY, |a| {
                    *a == RaffleAction::CheckoutReset { attempt: 1 }
                });
            })
            .run();
    }

    #[test]
    fn failure_rolls_back_and_reports() {
        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions([
                RaffleAction::ToggleTicket { number: n(1) },
                RaffleAction::OpenCheckout,
                RaffleAction::SubmitCheckout { buyer: maria() },
            ])
            .when_action(RaffleAction::ReservationFailed {
                error: "disk full".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.checkout.phase, CheckoutPhase::Editing);
                assert!(state.checkout.is_open);
                assert_eq!(state.checkout.last_error.as_deref(), Some("disk full"));
                assert_eq!(state.selected_numbers(), vec![n(1)]);
                assert_eq!(engine::sold_count(&state.tickets), 0);
            })
            .run();
    }

    #[test]
    fn stale_reset_does_not_close_a_new_form() {
        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions([
                RaffleAction::ToggleTicket { number: n(2) },
                RaffleAction::OpenCheckout,
            ])
            .when_action(RaffleAction::CheckoutReset { attempt: 0 })
            .then_state(|state| assert!(state.checkout.is_open))
            .run();
    }

    #[test]
    fn reset_from_earlier_success_keeps_later_success_up() {
        let sold = |numbers: &[u32]| {
            let mut tickets = fresh().tickets;
            for ticket in tickets.iter_mut().filter(|t| numbers.contains(&t.number.value())) {
                *ticket = Ticket::sold(
                    ticket.number,
                    Purchase::new(&maria(), test_clock().now(), Money::from_cents(1_000)),
                );
            }
            tickets
        };

        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(fresh())
            .given_actions([
                RaffleAction::ToggleTicket { number: n(1) },
                RaffleAction::OpenCheckout,
                RaffleAction::SubmitCheckout { buyer: maria() },
                RaffleAction::ReservationCompleted {
                    tickets: sold(&[1]),
                    numbers: vec![n(1)],
                },
                RaffleAction::CloseCheckout,
                RaffleAction::ToggleTicket { number: n(2) },
                RaffleAction::OpenCheckout,
                RaffleAction::SubmitCheckout { buyer: maria() },
                RaffleAction::ReservationCompleted {
                    tickets: sold(&[1, 2]),
                    numbers: vec![n(2)],
                },
            ])
            .when_action(RaffleAction::CheckoutReset { attempt: 1 })
            .then_state(|state| {
                assert_eq!(state.checkout.attempt, 2);
                assert_eq!(state.checkout.phase, CheckoutPhase::Succeeded);
                assert!(state.checkout.is_open);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn unavailable_theme_keeps_defaults() {
        ReducerTest::new(RaffleReducer::new())
            .with_env(env())
            .given_state(RaffleState::new())
            .when_action(RaffleAction::ThemeLoaded {
                result: ThemeResult::Unavailable,
            })
            .then_state(|state| {
                assert!(!state.loading_content);
                assert_eq!(state.page_copy().title, crate::content::DEFAULT_TITLE);
            })
            .run();
    }

    #[tokio::test]
    async fn load_effects_produce_events() {
        let env = env();
        let mut state = RaffleState::new();

        let loaded = run_future(RaffleReducer.reduce(&mut state, RaffleAction::LoadTickets, &env))
            .await
            .unwrap();
        let RaffleAction::TicketsLoaded { tickets } = &loaded else {
            unreachable!("unexpected {loaded:?}");
        };
        assert_eq!(tickets.len(), 10);

        let themed = run_future(RaffleReducer.reduce(&mut state, RaffleAction::LoadTheme, &env))
            .await
            .unwrap();
        assert_eq!(
            themed,
            RaffleAction::ThemeLoaded {
                result: ThemeResult::Content(theme())
            }
        );
        let _ = RaffleReducer.reduce(&mut state, themed, &env);
        assert_eq!(state.page_copy().title, "Setup dos Sonhos");
    }

    #[tokio::test]
    async fn reservation_effect_reports_storage_failure() {
        let store = Arc::new(InMemoryTicketStore::new());
        store.set_fail_writes(true);
        let env = env_with(store);
        let mut state = fresh();
        for action in [
            RaffleAction::ToggleTicket { number: n(4) },
            RaffleAction::OpenCheckout,
        ] {
            let _ = RaffleReducer.reduce(&mut state, action, &env);
        }

        let effects = RaffleReducer.reduce(
            &mut state,
            RaffleAction::SubmitCheckout { buyer: maria() },
            &env,
        );
        let outcome = run_future(effects).await.unwrap();
        assert!(matches!(outcome, RaffleAction::ReservationFailed { .. }));
    }
}
