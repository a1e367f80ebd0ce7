use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing::{error, info};
use unicode_width::UnicodeWidthStr;

mod cli;

use cli::{Cli, Commands, FacilityCommand, FilterArgs, TransactionCommand};
use procdesk::{
    api::ApiClient,
    config::Config,
    export::{ColumnMap, DirectorySink, ExportAdapter, ExportFormat, ExportOutcome},
    models::Record,
    notify::TracingNotifier,
    screens::{contracts, facilities, transactions, ScreenDef, ScreenKind},
    source::RecordFetcher,
    view::ViewState,
};

const MAX_CELL_WIDTH: usize = 30;

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "procdesk=info");
    }

    // Initialize logging to both console and file
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let file_appender = tracing_appender::rolling::never(".", "procdesk.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url);
    }

    if let Err(e) = run_command(cli.command, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(command: Commands, mut config: Config) -> Result<()> {
    let notifier = TracingNotifier;

    match command {
        Commands::List { screen, filters, json } => {
            config.validate()?;
            let client = ApiClient::new(&config)?;
            let def = screen_definition(screen, &filters)?;
            let (view, summary) = load_view(&def, &filters, &client).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(view.visible())?);
            } else {
                print_lines(&summary);
                print_table(&def.columns, view.visible());
                println!();
                println!("Showing {} of {} records", view.visible().len(), view.source().len());
            }
        }

        Commands::Export {
            screen,
            filters,
            format,
            output,
        } => {
            if let Some(output) = output {
                config = config.with_export_dir(output);
            }
            config.validate()?;
            let client = ApiClient::new(&config)?;
            let def = screen_definition(screen, &filters)?;
            let (view, _) = load_view(&def, &filters, &client).await?;
            export_view(&config, &def, &view, format.into())?;
        }

        Commands::Report {
            report_type,
            status,
            item,
            facility,
            supplier,
            format,
        } => {
            config.validate()?;
            let report_type = report_type.as_deref().map(cli::parse_report_type).transpose()?;
            let def = contracts::report_definition(report_type, &notifier)
                .context("A report type is required (--type)")?;

            let client = ApiClient::new(&config)?;
            let filters = FilterArgs {
                filters: [("status", status), ("item", item), ("facility", facility), ("supplier", supplier)]
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
                    .collect(),
                report_type: None,
            };
            let (view, summary) = load_view(&def, &filters, &client).await?;

            print_lines(&summary);
            print_table(&def.columns, view.visible());
            println!();
            println!("{} contracts in report", view.visible().len());

            if let Some(format) = format {
                export_view(&config, &def, &view, format.into())?;
            }
        }

        Commands::Facility { action } => {
            config.validate()?;
            let client = ApiClient::new(&config)?;
            run_facility(action, &client).await?;
        }

        Commands::Transaction { action } => {
            config.validate()?;
            let client = ApiClient::new(&config)?;
            run_transaction(action, &client, &config).await?;
        }

        Commands::Tui => {
            config.validate()?;
            info!("Launching TUI interface");
            procdesk::tui::run_tui(config, None).await?;
        }
    }

    Ok(())
}

async fn run_facility(action: FacilityCommand, client: &ApiClient) -> Result<()> {
    let notifier = TracingNotifier;

    let data = match action {
        FacilityCommand::Add(args) => {
            facilities::create_facility(client, client, &notifier, &args.into()).await?
        }
        FacilityCommand::Update { id, details } => {
            facilities::update_facility(client, client, &notifier, &id, &details.into()).await?
        }
        FacilityCommand::Toggle { id } => facilities::toggle_facility(client, client, &notifier, &id).await?,
        FacilityCommand::Stats => facilities::definition().load(client, &notifier).await,
    };

    for line in &data.summary {
        println!("{}", line);
    }
    Ok(())
}

async fn run_transaction(action: TransactionCommand, client: &ApiClient, config: &Config) -> Result<()> {
    let notifier = TracingNotifier;

    match action {
        TransactionCommand::New(args) => {
            let created = transactions::create_transaction(client, client, &notifier, &args.into()).await?;
            if let Some(id) = &created.id {
                println!("Saved transaction {}", id);
                print_lines(&created.history_lines());
            }
        }

        TransactionCommand::Delete { id, yes } => {
            if !yes && !confirm(transactions::DELETE_PROMPT)? {
                println!("Cancelled");
                return Ok(());
            }
            let def = transactions::definition();
            let mut view = def.new_view();
            let ticket = view.begin_load();
            def.load(client, &notifier).await.apply_to(&mut view, ticket);
            transactions::delete_transaction(client, &notifier, &mut view, &id).await?;
            println!("{} transactions remain", view.source().len());
        }

        TransactionCommand::Print { id, output } => {
            let record = find_transaction(client, &id).await?;
            let dir = output.unwrap_or_else(|| config.export_dir.clone());
            let sink = DirectorySink::new(dir);
            let adapter = ExportAdapter::new(&sink, &sink, &notifier);
            report_outcome(adapter.print_record(
                &record,
                &transactions::print_columns(),
                &transactions::print_title(&record),
            ))?;
        }

        TransactionCommand::History { id } => {
            let history = transactions::history_source(&id).load(client, &notifier).await;
            let created = transactions::CreatedTransaction {
                id: Some(id),
                history,
            };
            print_lines(&created.history_lines());
        }
    }

    Ok(())
}

/// Screen definition with the report type applied to the reports screen
fn screen_definition(kind: ScreenKind, filters: &FilterArgs) -> Result<ScreenDef> {
    match (kind, &filters.report_type) {
        (ScreenKind::ContractReports, Some(report_type)) => {
            Ok(contracts::definition(cli::parse_report_type(report_type)?))
        }
        _ => Ok(kind.definition()),
    }
}

/// Load a screen into a fresh view and apply the command line filters
async fn load_view(
    def: &ScreenDef,
    filters: &FilterArgs,
    fetcher: &dyn RecordFetcher,
) -> Result<(ViewState, Vec<String>)> {
    let notifier = TracingNotifier;
    let mut view = def.new_view();

    let ticket = view.begin_load();
    let summary = def.load(fetcher, &notifier).await.apply_to(&mut view, ticket);

    for (key, value) in &filters.filters {
        if !view.set_filter(key, value) {
            let known: Vec<&str> = view.filters().controls().iter().map(|c| c.key).collect();
            anyhow::bail!(
                "Unknown filter '{}' for {} (available: {})",
                key,
                def.kind.key(),
                known.join(", ")
            );
        }
    }
    Ok((view, summary))
}

fn export_view(config: &Config, def: &ScreenDef, view: &ViewState, format: ExportFormat) -> Result<()> {
    let spec = def
        .export
        .as_ref()
        .with_context(|| format!("The {} screen has no export", def.kind.key()))?;
    let columns = match format {
        ExportFormat::Document => &spec.document,
        _ => &spec.spreadsheet,
    };

    let sink = DirectorySink::new(config.export_dir.clone());
    let notifier = TracingNotifier;
    let adapter = ExportAdapter::new(&sink, &sink, &notifier);
    report_outcome(adapter.export(view.visible(), columns, format, spec.title))
}

fn report_outcome(outcome: ExportOutcome) -> Result<()> {
    match outcome {
        ExportOutcome::Saved(path) => println!("Saved {}", path.display()),
        ExportOutcome::Printed => println!("Print page written"),
        ExportOutcome::Refused => anyhow::bail!("Nothing to export"),
        ExportOutcome::Failed(e) => anyhow::bail!("Export failed: {}", e),
    }
    Ok(())
}

async fn find_transaction(client: &ApiClient, id: &str) -> Result<Record> {
    let def = transactions::definition();
    let loaded = def.primary.load(client, &TracingNotifier).await;
    loaded
        .payload
        .into_iter()
        .find(|r| r.id() == id)
        .with_context(|| format!("Transaction {} not found", id))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

/// Print rows padded by display width; Arabic and wide text line up
fn print_table(columns: &ColumnMap, records: &[Record]) {
    let labels = columns.labels();
    let rows: Vec<Vec<String>> = columns
        .rows(records)
        .into_iter()
        .map(|row| row.into_iter().map(|cell| truncate_cell(&cell, MAX_CELL_WIDTH)).collect())
        .collect();

    let widths: Vec<usize> = (0..labels.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].width())
                .chain(std::iter::once(labels[i].width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{}{}", cell, " ".repeat(width.saturating_sub(cell.width()))))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let header = format_row(labels.clone());
    println!("{}", header);
    println!("{}", "-".repeat(header.width()));
    for row in &rows {
        println!("{}", format_row(row.iter().map(String::as_str).collect()));
    }
}

/// Truncate to a display width with an ellipsis
fn truncate_cell(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    for c in s.chars() {
        if out.width() + 3 >= max_width {
            break;
        }
        out.push(c);
    }
    format!("{}...", out)
}
