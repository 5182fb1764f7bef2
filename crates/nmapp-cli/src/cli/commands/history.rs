//! History listing and the interactive delete/undo session.

use anyhow::{Context, Result, bail};
use nmapp_core::api::{ApiClient, HistoryEntry};
use nmapp_core::config::Config;
use nmapp_core::history::{
    DeleteCoordinator, HistoryNotice, filter_by_date_range, parse_bound,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::signed_in;

const MANAGE_HELP: &str = "\
Commands:
  ls                 show the list
  rm <n>             delete entry n (undo available for a few seconds)
  undo               restore the last deleted entry
  filter <from> <to> show entries strictly between two dates
  reset              clear the filter
  refresh            reload from the server
  help               show this help
  quit               wait for pending deletes and exit";

pub async fn list(config: &Config, range: Option<(&str, &str)>) -> Result<()> {
    let (session, client) = signed_in(config)?;
    let mut entries = client.list_history(session.user.id).await?;
    if let Some((from, to)) = range {
        entries = filter_by_date_range(&entries, parse_bound(from)?, parse_bound(to)?);
    }
    print_entries(&entries);
    Ok(())
}

pub async fn clear(config: &Config, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("This deletes the history of every user; pass --yes to confirm");
    }
    let (_, client) = signed_in(config)?;
    client.clear_history().await?;
    println!("History cleared.");
    Ok(())
}

pub async fn manage(config: &Config) -> Result<()> {
    let (session, client) = signed_in(config)?;
    let user_id = session.user.id;
    let mut coordinator = DeleteCoordinator::new(client, config.undo_window());
    coordinator.refresh(user_id).await?;
    print_entries(coordinator.list_visible());
    println!("Type `help` for commands.");

    // Deletes the user already accepted are sent even if reading input fails.
    let outcome = read_commands(&mut coordinator, user_id).await;

    if coordinator.has_outstanding() {
        println!("Waiting for pending deletes...");
    }
    for notice in coordinator.drain().await {
        print_notice(&notice);
    }
    outcome
}

async fn read_commands(
    coordinator: &mut DeleteCoordinator<ApiClient>,
    user_id: i64,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await.context("write prompt")?;
        stdout.flush().await.context("flush prompt")?;

        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line.context("read command")?),
            Some(notice) = coordinator.next_notice() => Input::Notice(notice),
        };

        match input {
            Input::Line(None) => return Ok(()),
            Input::Line(Some(line)) => {
                if run_command(coordinator, user_id, &line).await == Flow::Quit {
                    return Ok(());
                }
            }
            Input::Notice(notice) => {
                println!();
                print_notice(&notice);
            }
        }
    }
}

enum Input {
    Line(Option<String>),
    Notice(HistoryNotice),
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

async fn run_command(
    coordinator: &mut DeleteCoordinator<ApiClient>,
    user_id: i64,
    line: &str,
) -> Flow {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Flow::Continue;
    };
    let args: Vec<&str> = words.collect();

    match (command, args.as_slice()) {
        ("ls" | "list", []) => print_view(coordinator),
        ("rm" | "delete", [n]) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => match coordinator.request_delete(n - 1) {
                Ok(entry) => println!(
                    "Deleted #{} ({}). Type `undo` within {}s to restore.",
                    entry.id,
                    entry.kind,
                    coordinator.undo_window().as_secs()
                ),
                Err(err) => println!("Error: {err}"),
            },
            _ => println!("Error: expected a position from the list, got '{n}'"),
        },
        ("undo", []) => match coordinator.undo() {
            Some(entry) => println!("Restored #{} ({}).", entry.id, entry.kind),
            None => println!("Nothing to undo."),
        },
        ("filter", [from, to]) => match (parse_bound(from), parse_bound(to)) {
            (Ok(from), Ok(to)) => {
                let count = coordinator.show_filtered(from, to);
                println!("{count} matching entries.");
                print_view(coordinator);
            }
            (Err(err), _) | (_, Err(err)) => println!("Error: {err}"),
        },
        ("reset", []) => {
            coordinator.clear_filter();
            print_view(coordinator);
        }
        ("refresh", []) => match coordinator.refresh(user_id).await {
            Ok(_) => print_view(coordinator),
            Err(err) => println!("Error: {err}"),
        },
        ("help" | "?", []) => println!("{MANAGE_HELP}"),
        ("quit" | "exit" | "q", []) => return Flow::Quit,
        _ => println!("Unknown command: {}. Type `help` for commands.", line.trim()),
    }
    Flow::Continue
}

fn print_view(coordinator: &DeleteCoordinator<ApiClient>) {
    print_entries(coordinator.list_visible());
    if let Some(pending) = coordinator.pending() {
        println!("(undo available for #{})", pending.entry.id);
    }
}

fn print_notice(notice: &HistoryNotice) {
    match notice {
        HistoryNotice::Committed { entry_id } => println!("Deleted #{entry_id} on server."),
        HistoryNotice::CommitFailed(err) => match &err.details {
            Some(details) => println!("Error: {err} ({details})"),
            None => println!("Error: {err}"),
        },
    }
}

fn print_entries(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No downloads found.");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}. #{:<5} {:<6} {}  ({} to {})",
            i + 1,
            entry.id,
            entry.kind,
            entry.downloaded_at.format("%Y-%m-%d %H:%M"),
            entry.from_date.format("%Y-%m-%d"),
            entry.to_date.format("%Y-%m-%d"),
        );
    }
}
