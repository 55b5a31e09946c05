mod config;
mod events;
mod scene;
mod server;
mod tui;

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use config::ServerConfig;
use server::PoseServer;
use tui::TuiState;

#[derive(Parser)]
#[command(name = "posesync-server")]
#[command(about = "Authoritative pose sync peer")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = posesync::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = posesync::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = ServerConfig::default().ping_after_ticks)]
    ping_after_ticks: u32,

    #[arg(long, default_value_t = ServerConfig::default().timeout_ticks, help = "Drop a silent peer after this many ticks")]
    timeout_ticks: u32,

    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.bind, args.port);

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        ping_after_ticks: args.ping_after_ticks,
        timeout_ticks: args.timeout_ticks,
    };

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let mut server = PoseServer::new(&bind_addr, config)?;

    if args.headless {
        log::info!("Server started on {}", server.local_addr());
        server.run();
        log::info!("Server shutting down");
    } else {
        run_with_tui(&mut server)?;
    }

    Ok(())
}

fn run_with_tui(server: &mut PoseServer) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = server.running();
    let mut tui_state = TuiState::new();

    while running.load(Ordering::SeqCst) {
        server.tick_once();

        for event in server.drain_events() {
            if event.is_warning() {
                tui_state.log_warn(event.describe());
            } else {
                tui_state.log_info(event.describe());
            }
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                {
                    running.store(false, Ordering::SeqCst);
                }
            }
        }

        let stats = server.stats();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats);
        })?;
    }

    server.shutdown();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
