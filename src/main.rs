use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use clap::Parser;

use relay_chat::config::ENDPOINT_ENV;
use relay_chat::exchange::SettlementReceiver;
use relay_chat::handler::handle_event;
use relay_chat::tui::{self, EventHandler, Tui};
use relay_chat::{
    ui, App, Config, ConsoleNotifier, ExchangeController, HttpResponder, MessageKind,
    SystemClipboard, ToastQueue,
};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Chat with a remote responder from the terminal")]
#[command(version)]
struct Cli {
    /// Send a single prompt, print the reply and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Responder endpoint URL (overrides RELAY_ENDPOINT and the config file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Save the resolved endpoint to the config file
    #[arg(long)]
    save_endpoint: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.prompt.is_some());

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        Config::default()
    });
    let env_endpoint = std::env::var(ENDPOINT_ENV).ok();
    let endpoint = config.resolve_endpoint(cli.endpoint.as_deref(), env_endpoint.as_deref());

    if cli.save_endpoint {
        let updated = Config {
            endpoint: Some(endpoint.clone()),
        };
        updated.save()?;
    }

    tracing::info!(%endpoint, "starting");
    let responder = Arc::new(HttpResponder::new(&endpoint));

    match cli.prompt {
        Some(prompt) => run_single_prompt(responder, &prompt).await,
        None => run_tui(responder, endpoint).await,
    }
}

/// Logs go to stderr in one-shot mode and to a file under the config dir in
/// TUI mode, where stderr is the alternate screen.
fn init_tracing(verbose: bool, to_stderr: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false);

    if to_stderr {
        builder.with_writer(std::io::stderr).init();
        return;
    }

    // Printed before the alternate screen is entered, so it stays visible
    match Config::open_log() {
        Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Err(e) => eprintln!("warning: logging disabled: {e:#}"),
    }
}

async fn run_tui(responder: Arc<HttpResponder>, endpoint: String) -> Result<()> {
    let toasts = Arc::new(ToastQueue::new());
    let (exchange, mut settlements) =
        ExchangeController::new(responder, toasts.clone(), Box::new(SystemClipboard));
    let mut app = App::new(exchange, toasts, endpoint);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events, &mut settlements).await;

    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
    settlements: &mut SettlementReceiver,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handle_event(app, event),
            Some(settlement) = settlements.recv() => app.apply_settlement(settlement),
            else => break,
        }
    }
    Ok(())
}

/// One exchange without the TUI. Ctrl+C stops the request.
async fn run_single_prompt(responder: Arc<HttpResponder>, prompt: &str) -> Result<()> {
    let (mut exchange, mut settlements) = ExchangeController::new(
        responder,
        Arc::new(ConsoleNotifier),
        Box::new(SystemClipboard),
    );

    if !exchange.submit(prompt) {
        bail!("prompt must not be empty");
    }

    let mut settlement = tokio::select! {
        settlement = settlements.recv() => settlement,
        _ = tokio::signal::ctrl_c() => None,
    };
    if settlement.is_none() {
        exchange.cancel();
        settlement = settlements.recv().await;
    }

    let Some(settlement) = settlement else {
        bail!("exchange ended without a result");
    };
    exchange.settle(settlement);

    let Some(reply) = exchange.transcript().last() else {
        bail!("exchange ended without a reply");
    };
    println!("{}", reply.content());

    if reply.kind() == MessageKind::Error {
        bail!("no usable reply from the responder");
    }
    Ok(())
}
