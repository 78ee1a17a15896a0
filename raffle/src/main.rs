//! Raffle desk terminal front-end.
//!
//! Renders the ticket grid and drives checkout from stdin.
//!
//! # Usage
//!
//! ```bash
//! # Persist sold tickets and start with demo sales
//! RAFFLE_STORE_PATH=rifa_digital_sheet_v2.json RAFFLE_SEED_DEMO_DATA=true cargo run --bin raffle
//! ```

use raffle::{
    AnthropicContentProvider, BuyerInfo, Config, ContentProvider, InMemoryTicketStore,
    JsonFileTicketStore, RaffleAction, RaffleConfig, RaffleEngine, RaffleEnvironment,
    RaffleReducer, RaffleState, TicketNumber, TicketStore, display,
    metrics::register_raffle_metrics,
};
use raffle_core::environment::SystemClock;
use raffle_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type RaffleStore = Store<RaffleState, RaffleAction, RaffleEnvironment, RaffleReducer>;

const HELP: &str = "\
Comandos:
  grid               mostra a grade de números
  toggle <n> [n...]  seleciona ou libera números
  who <n>            mostra quem comprou um número
  summary            mostra valor e progresso
  checkout           finaliza a compra dos números selecionados
  cancel             fecha o formulário de compra
  help               mostra esta ajuda
  quit               sai";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they do not interleave with the page
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raffle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    info!(
        total_numbers = config.raffle.total_numbers,
        store = ?config.storage.path,
        seeding = config.seeding.enabled,
        "Configuration loaded"
    );
    register_raffle_metrics();

    let raffle = config.raffle()?;
    let store = build_store(&config, raffle.clone());

    spawn_event_printer(&store);
    let mut loading = store.send(RaffleAction::LoadTickets).await?;
    let _theme = store.send(RaffleAction::LoadTheme).await?;
    loading.wait().await;

    print_page(&store, &raffle).await;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = prompt(&mut lines, "> ").await? else {
            break;
        };
        let mut words = line.split_whitespace();
        match words.next() {
            None => {},
            Some("grid") => print_page(&store, &raffle).await,
            Some("summary") => {
                println!("{}", store.state(|s| display::render_summary(s, &raffle)).await);
            },
            Some("toggle") => toggle(&store, &raffle, words).await?,
            Some("who") => match words.next().and_then(|w| w.parse::<u32>().ok()) {
                Some(number) => {
                    let number = TicketNumber::new(number);
                    println!("{}", store.state(|s| display::render_owner(s, number)).await);
                },
                None => println!("Uso: who <n>"),
            },
            Some("checkout") => checkout(&store, &raffle, &mut lines).await?,
            Some("cancel") => {
                store.send(RaffleAction::CloseCheckout).await?;
            },
            Some("help") => println!("{HELP}"),
            Some("quit" | "exit") => break,
            Some(other) => println!("Comando desconhecido: {other}. Digite 'help'."),
        }
    }

    store.shutdown(Duration::from_secs(5)).await?;
    info!("Raffle desk stopped");
    Ok(())
}

fn build_store(config: &Config, raffle: RaffleConfig) -> RaffleStore {
    let tickets: Arc<dyn TicketStore> = match &config.storage.path {
        Some(path) => Arc::new(JsonFileTicketStore::new(path)),
        None => Arc::new(InMemoryTicketStore::new()),
    };
    let content: Arc<dyn ContentProvider> = Arc::new(
        AnthropicContentProvider::new(config.content.api_key.clone())
            .with_api_url(config.content.api_url.clone())
            .with_model(config.content.model.clone()),
    );
    let engine = RaffleEngine::new(raffle, tickets, Arc::new(SystemClock))
        .with_seeding(config.seeding())
        .with_reservation_latency(config.reservation_latency());
    let environment = RaffleEnvironment::new(Arc::new(engine), content)
        .with_success_display(config.success_display());

    Store::new(RaffleState::new(), RaffleReducer::new(), environment)
}

/// Prints effect results as they arrive
fn spawn_event_printer(store: &RaffleStore) {
    let mut events = store.subscribe_actions();
    tokio::spawn(async move {
        while let Some(action) = next_event(&mut events).await {
            match action {
                RaffleAction::ThemeLoaded { result } => {
                    if let raffle::ThemeResult::Content(theme) = result {
                        println!("\n** {} **", theme.title);
                        for highlight in &theme.prize_highlights {
                            println!("  * {highlight}");
                        }
                    }
                },
                RaffleAction::ReservationCompleted { numbers, .. } => {
                    let numbers: Vec<String> = numbers.iter().map(ToString::to_string).collect();
                    println!("Compra confirmada! Números {}. Boa sorte!", numbers.join(", "));
                },
                RaffleAction::ReservationFailed { error } => {
                    println!("Não foi possível concluir a compra: {error}");
                },
                RaffleAction::CheckoutReset { .. } => println!("Formulário fechado."),
                _ => {},
            }
        }
    });
}

/// Next broadcast action, skipping over any the printer fell behind on.
/// `None` once the store is gone.
async fn next_event(events: &mut broadcast::Receiver<RaffleAction>) -> Option<RaffleAction> {
    loop {
        match events.recv().await {
            Ok(action) => return Some(action),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer fell behind"),
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn print_page(store: &RaffleStore, raffle: &RaffleConfig) {
    let page = store
        .state(|s| {
            let mut page = display::render_header(s);
            page.push('\n');
            page.push_str(&display::render_summary(s, raffle));
            page.push_str("\n\n");
            page.push_str(&display::render_grid(s));
            if let Some(bar) = display::render_action_bar(s, raffle) {
                page.push('\n');
                page.push_str(&bar);
            }
            page
        })
        .await;
    println!("{page}");
}

async fn toggle(
    store: &RaffleStore,
    raffle: &RaffleConfig,
    words: std::str::SplitWhitespace<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut any = false;
    for word in words {
        match word.parse::<u32>() {
            Ok(number) => {
                store
                    .send(RaffleAction::ToggleTicket {
                        number: TicketNumber::new(number),
                    })
                    .await?;
                any = true;
            },
            Err(_) => println!("Número inválido: {word}"),
        }
    }
    if !any {
        println!("Uso: toggle <n> [n...]");
        return Ok(());
    }
    let bar = store.state(|s| display::render_action_bar(s, raffle)).await;
    println!("{}", bar.unwrap_or_else(|| "Nenhum número selecionado.".to_string()));
    Ok(())
}

async fn checkout(
    store: &RaffleStore,
    raffle: &RaffleConfig,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<(), Box<dyn std::error::Error>> {
    store.send(RaffleAction::OpenCheckout).await?;
    if !store.state(|s| s.checkout.is_open).await {
        println!("Selecione ao menos um número antes de finalizar.");
        return Ok(());
    }
    println!("{}", store.state(|s| display::render_checkout(s, raffle)).await);

    let Some(full_name) = prompt(lines, "Nome completo: ").await? else {
        return Ok(());
    };
    let Some(phone) = prompt(lines, "Telefone: ").await? else {
        return Ok(());
    };
    let Some(email) = prompt(lines, "E-mail: ").await? else {
        return Ok(());
    };

    let mut handle = store
        .send(RaffleAction::SubmitCheckout {
            buyer: BuyerInfo::new(full_name, phone, email),
        })
        .await?;
    if store.state(|s| s.checkout.is_submitting()).await {
        println!("Processando reserva...");
    }
    // Covers the reservation and the success display that follows it
    handle.wait().await;

    if let Some(error) = store.state(|s| s.checkout.last_error.clone()).await {
        println!("Erro: {error}");
        println!("Digite 'checkout' para tentar de novo ou 'cancel' para fechar.");
    }
    Ok(())
}

async fn prompt(
    lines: &mut Lines<BufReader<Stdin>>,
    label: &str,
) -> std::io::Result<Option<String>> {
    use std::io::Write;

    print!("{label}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}
