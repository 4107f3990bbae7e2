//! Assistant Lite terminal front end
//!
//! Renders the timeline to stdout and reads turns from stdin. Logs go to
//! stderr.

use assistant_lite::{
    Appender, Direction, InputFocus, Lifecycle, MessageEntry, Payload, Widget, WidgetCallbacks,
    WidgetConfig, WidgetError,
};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct TerminalRenderer;

impl WidgetCallbacks for TerminalRenderer {
    fn on_custom_event(&self, payload: &Value, append: &mut Appender<'_>) {
        append.custom(payload.clone());
    }

    fn on_error(&self, error: &WidgetError) {
        eprintln!("! {error}");
    }

    fn on_entry_appended(&self, entry: &MessageEntry) {
        render(entry);
    }
}

impl InputFocus for TerminalRenderer {
    fn release(&self) {
        println!("  (pick one with /select <entry> <number>)");
    }

    fn restore(&self) {}
}

fn render(entry: &MessageEntry) {
    let who = match entry.direction {
        Direction::Outbound => "you",
        Direction::Inbound => "bot",
    };
    match &entry.payload {
        Payload::Text { text } => println!("{who}> {text}"),
        Payload::Options { items, consumable } => {
            let kind = if *consumable { "quick replies" } else { "buttons" };
            println!("{who}> {kind} {}", entry.id);
            for (n, item) in items.iter().enumerate() {
                println!("    {}) {}", n + 1, item.label);
            }
        }
        Payload::Custom { payload } => println!("{who}> [custom] {payload}"),
        Payload::MetadataOnly => {}
    }
}

enum Input<'a> {
    Select { entry: u64, option: usize },
    Restart,
    Quit,
    Text(&'a str),
    Invalid(&'static str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    match words.next() {
        Some("/quit") => Input::Quit,
        Some("/restart") => Input::Restart,
        Some("/select") => {
            let entry = words
                .next()
                .map(|w| w.trim_start_matches('#'))
                .and_then(|w| w.parse().ok());
            let option = words.next().and_then(|w| w.parse::<usize>().ok());
            match (entry, option) {
                (Some(entry), Some(option)) if option > 0 => Input::Select { entry, option },
                _ => Input::Invalid("usage: /select <entry> <number>"),
            }
        }
        _ => Input::Text(line),
    }
}

async fn select(widget: &Widget, entry: u64, option: usize) -> Result<(), WidgetError> {
    let snapshot = widget.snapshot();
    let Some(target) = snapshot.iter().find(|e| e.id.get() == entry) else {
        eprintln!("! no entry #{entry}");
        return Ok(());
    };
    let Some(item) = target
        .payload
        .options()
        .and_then(|(items, _)| items.get(option - 1))
    else {
        eprintln!("! entry #{entry} has no option {option}");
        return Ok(());
    };
    widget.select_option_by_id(target.id, item.clone()).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let json_logs = std::env::var_os("ASSISTANT_LOG_JSON").is_some();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assistant_lite=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let config = WidgetConfig::from_env()?;
    let widget = Widget::connect(&config, TerminalRenderer, TerminalRenderer)?;

    // Announce lifecycle changes
    let mut view = widget.subscribe();
    tokio::spawn(async move {
        let mut last = Lifecycle::Unestablished;
        while view.changed().await.is_ok() {
            let session = view.borrow_and_update().session.clone();
            if session.lifecycle() != last {
                last = session.lifecycle();
                match session.session_id() {
                    Some(id) => println!("-- {last:?} ({id})"),
                    None => println!("-- {last:?}"),
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let result = match parse_input(&line) {
            Input::Quit => break,
            Input::Restart => widget.restart_session().await,
            Input::Select { entry, option } => select(&widget, entry, option).await,
            Input::Text(text) => {
                widget.set_draft(text).await?;
                widget.send_current_draft().await
            }
            Input::Invalid(usage) => {
                eprintln!("{usage}");
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "Widget stopped");
            break;
        }
    }

    widget.shutdown().await;
    Ok(())
}
