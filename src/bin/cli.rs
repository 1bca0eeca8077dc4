use std::io::{self, Write};

use chrono::{Datelike, NaiveDate};
use tokio::runtime::Runtime;
use week_sync::{
    BoardOutcome, BoardStatus, Clock, ItemOutcome, MondayClient, Reconciler, RecordStore, SyncConfig,
    WeekWindow, classify, logging, parse_deadline, resolve_roles,
};

const TOKEN_MISSING: &str = "MONDAY_API_TOKEN is not set";

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  today [YYYY-MM-DD|system]          Show or pin the date used as today\n  week [YYYY-MM-DD]                  Show this and next week's windows\n  classify <YYYY-MM-DD|-> [status...]\n                                     Classify a deadline ('-' for none)\n  boards                             List boards visible to the token\n  columns <board_id>                 List a board's columns and their roles\n  board <board_id>                   Reconcile one board\n  sweep                              Reconcile every configured board\n  quit|exit                          Exit"
    );
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn print_week(label: &str, window: WeekWindow) {
    println!(
        "{label}: {} ({}) .. {} ({})",
        window.start(),
        window.start().weekday(),
        window.end(),
        window.end().weekday()
    );
}

fn print_board_outcome(outcome: &BoardOutcome) {
    let name = outcome.board_name.as_deref().unwrap_or("?");
    match &outcome.status {
        BoardStatus::Succeeded => println!(
            "Board {} ({name}): updated={}, skipped={}, failed={}",
            outcome.board_id, outcome.updated, outcome.skipped, outcome.failed
        ),
        BoardStatus::Failed { reason } => {
            println!("Board {} ({name}) failed: {reason}", outcome.board_id)
        }
    }
    if !outcome.missing_columns.is_empty() {
        println!("  missing columns: {}", outcome.missing_columns.join(", "));
    }
    for report in &outcome.items {
        match &report.outcome {
            ItemOutcome::Updated { previous, new } => println!(
                "  {} {}: {} -> {new}",
                report.item_id,
                report.item_name,
                previous.as_deref().unwrap_or("Not set")
            ),
            ItemOutcome::Failed { error } => {
                println!("  {} {}: error: {error}", report.item_id, report.item_name)
            }
            ItemOutcome::Skipped { .. } => {}
        }
    }
}

fn main() {
    logging::init_tracing();

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(2);
        }
    };
    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let mut clock = Clock::for_timezone(config.timezone);
    let mut reconciler = MondayClient::from_config(&config.store)
        .map(|client| Reconciler::new(client, config.engine.clone()).with_clock(clock));

    println!("Week Sync (CLI) - type 'help' for commands\n");
    println!("Today: {} ({})", clock.today(), clock.today().weekday());
    if reconciler.is_none() {
        println!("{TOKEN_MISSING}; board commands are unavailable.");
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "today" => {
                match parts.next() {
                    None => {}
                    Some("system") => clock = Clock::for_timezone(config.timezone),
                    Some(date_s) => match parse_date(date_s) {
                        Some(date) => clock = Clock::Fixed(date),
                        None => {
                            println!("Invalid date (YYYY-MM-DD)");
                            continue;
                        }
                    },
                }
                if let Some(reconciler) = reconciler.as_mut() {
                    reconciler.set_clock(clock);
                }
                println!("Today: {} ({})", clock.today(), clock.today().weekday());
            }
            "week" => {
                let date = match parts.next() {
                    None => clock.today(),
                    Some(date_s) => match parse_date(date_s) {
                        Some(date) => date,
                        None => {
                            println!("Invalid date (YYYY-MM-DD)");
                            continue;
                        }
                    },
                };
                let window = WeekWindow::containing(date);
                print_week("This week", window);
                print_week("Next week", window.next());
            }
            "classify" => {
                let Some(date_s) = parts.next() else {
                    println!("Usage: classify <YYYY-MM-DD|-> [status...]");
                    continue;
                };
                let deadline = if date_s == "-" {
                    None
                } else {
                    match parse_deadline(date_s) {
                        Ok(deadline) => deadline,
                        Err(e) => {
                            println!("Error: {e}");
                            continue;
                        }
                    }
                };
                let status = parts.collect::<Vec<_>>().join(" ");
                let status = Some(status.as_str()).filter(|s| !s.is_empty());
                println!("{}", classify(deadline, status, clock.today()));
            }
            "boards" => {
                let Some(reconciler) = reconciler.as_ref() else {
                    println!("{TOKEN_MISSING}");
                    continue;
                };
                match runtime.block_on(reconciler.store().list_boards(100)) {
                    Ok(boards) => {
                        for board in boards {
                            println!("{}  {} ({} columns)", board.id, board.name, board.columns.len());
                        }
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            "columns" => {
                let Some(board_id) = parts.next() else {
                    println!("Usage: columns <board_id>");
                    continue;
                };
                let Some(reconciler) = reconciler.as_ref() else {
                    println!("{TOKEN_MISSING}");
                    continue;
                };
                match runtime.block_on(reconciler.store().get_board(board_id)) {
                    Ok(board) => {
                        println!("{} ({})", board.name, board.id);
                        let names = &reconciler.config().columns;
                        for column in &board.columns {
                            let role = names
                                .role_of(&column.title)
                                .map(|role| format!("  <- {role:?}"))
                                .unwrap_or_default();
                            println!("  {}  {} [{}]{role}", column.id, column.title, column.kind);
                        }
                        if let Err(missing) = resolve_roles(&board, names) {
                            println!("{missing}");
                        }
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            "board" => {
                let Some(board_id) = parts.next() else {
                    println!("Usage: board <board_id>");
                    continue;
                };
                let Some(reconciler) = reconciler.as_ref() else {
                    println!("{TOKEN_MISSING}");
                    continue;
                };
                let outcome = runtime.block_on(reconciler.update_board(board_id));
                print_board_outcome(&outcome);
            }
            "sweep" => {
                let Some(reconciler) = reconciler.as_ref() else {
                    println!("{TOKEN_MISSING}");
                    continue;
                };
                if reconciler.config().board_ids.is_empty() {
                    println!("MONDAY_BOARD_IDS is not set");
                    continue;
                }
                let summary = runtime.block_on(reconciler.update_all_boards());
                for board in &summary.boards {
                    print_board_outcome(board);
                }
                println!("Sweep finished ({})", summary.to_cli_summary());
            }
            _ => {
                println!("Unknown command. Type 'help' for commands.");
            }
        }
    }
}
