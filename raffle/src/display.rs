//! Text rendering of the raffle page for the terminal front-end.
//!
//! Every function is pure: it reads the session state and returns lines to
//! print.

use crate::engine;
use crate::session::{CheckoutPhase, RaffleState};
use crate::types::{RaffleConfig, Ticket, TicketNumber, TicketStatus};
use std::fmt::Write;

/// Tickets per grid row
pub const GRID_COLUMNS: usize = 10;

/// Page header: title, description and prize highlights
#[must_use]
pub fn render_header(state: &RaffleState) -> String {
    let copy = state.page_copy();
    let mut out = format!("== {} ==\n{}\n", copy.title, copy.description);
    if state.loading_content {
        out.push_str("  (carregando destaques...)\n");
    }
    for highlight in &copy.highlights {
        let _ = writeln!(out, "  * {highlight}");
    }
    out
}

/// Price, sold count and progress
#[must_use]
pub fn render_summary(state: &RaffleState, config: &RaffleConfig) -> String {
    let sold = engine::sold_count(&state.tickets);
    let progress = engine::progress_percent(&state.tickets, config).round();
    format!(
        "Valor: {} | Vendidos: {sold} / {} | {progress}% vendido",
        config.format_price(config.ticket_price()),
        config.total_numbers(),
    )
}

fn cell(ticket: &Ticket) -> String {
    match ticket.status {
        TicketStatus::Available => format!(" {} ", ticket.number),
        TicketStatus::Selected => format!("[{}]", ticket.number),
        TicketStatus::Sold(_) => format!("({})", ticket.number),
    }
}

/// Ticket grid: ` 007 ` available, `[007]` selected, `(007)` sold
#[must_use]
pub fn render_grid(state: &RaffleState) -> String {
    if !state.tickets_loaded {
        return "Carregando números...\n".to_string();
    }
    let mut out = String::new();
    for row in state.tickets.chunks(GRID_COLUMNS) {
        let cells: Vec<String> = row.iter().map(cell).collect();
        let _ = writeln!(out, "{}", cells.join(" "));
    }
    out.push_str("Legenda:  001  disponível  [001] selecionado  (001) vendido\n");
    out
}

/// Bottom action bar; `None` when nothing is selected
#[must_use]
pub fn render_action_bar(state: &RaffleState, config: &RaffleConfig) -> Option<String> {
    let count = state.selected_count();
    if count == 0 {
        return None;
    }
    let total = state.selection_total(config.ticket_price());
    Some(format!(
        "{count} número(s) selecionado(s) | Total: {} | digite 'checkout' para comprar",
        config.format_price(total)
    ))
}

/// Checkout form status: selected numbers, total, phase and last error
#[must_use]
pub fn render_checkout(state: &RaffleState, config: &RaffleConfig) -> String {
    let numbers: Vec<String> = state
        .selected_numbers()
        .iter()
        .map(ToString::to_string)
        .collect();
    let total = state.selection_total(config.ticket_price());

    let mut out = format!(
        "Finalizar compra\nNúmeros: {}\nTotal: {}\n",
        numbers.join(", "),
        config.format_price(total)
    );
    match state.checkout.phase {
        CheckoutPhase::Editing => {},
        CheckoutPhase::Submitting => out.push_str("Processando reserva...\n"),
        CheckoutPhase::Succeeded => out.push_str("Compra confirmada! Boa sorte!\n"),
    }
    if let Some(error) = &state.checkout.last_error {
        let _ = writeln!(out, "Erro: {error}");
    }
    out
}

/// Who holds `number`
#[must_use]
pub fn render_owner(state: &RaffleState, number: TicketNumber) -> String {
    match state.ticket(number).map(|t| &t.status) {
        Some(TicketStatus::Sold(purchase)) => {
            format!("{number}: vendido para {}", purchase.buyer_name)
        },
        Some(TicketStatus::Selected) => format!("{number}: selecionado por você"),
        Some(TicketStatus::Available) => format!("{number}: disponível"),
        None => format!("{number}: não existe nesta rifa"),
    }
}
