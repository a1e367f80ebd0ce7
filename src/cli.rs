use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use procdesk::export::ExportFormat;
use procdesk::screens::contracts::ReportType;
use procdesk::screens::facilities::FacilityForm;
use procdesk::screens::transactions::{TransactionForm, DEFAULT_STATUS};
use procdesk::screens::ScreenKind;

#[derive(Parser)]
#[command(name = "procdesk")]
#[command(about = "Browse, filter and export procurement and administration records")]
#[command(version)]
pub struct Cli {
    /// API base URL (overrides PROCDESK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a screen and print its filtered rows
    List {
        /// Screen: dashboard, reports, orders, facilities, transactions
        #[arg(value_parser = parse_screen)]
        screen: ScreenKind,

        #[command(flatten)]
        filters: FilterArgs,

        /// Print the rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Export the filtered rows of a screen
    Export {
        /// Screen: reports or transactions
        #[arg(value_parser = parse_screen)]
        screen: ScreenKind,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(short, long, value_enum, default_value = "spreadsheet")]
        format: FormatArg,

        /// Output directory (overrides PROCDESK_EXPORT_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a dental contract report
    Report {
        /// all-contracts, by-status, by-item or by-facility-supplier
        #[arg(short = 't', long = "type")]
        report_type: Option<String>,

        /// Status to keep
        #[arg(long)]
        status: Option<String>,

        /// Item number or name to search for
        #[arg(long)]
        item: Option<String>,

        /// Beneficiary clinic to keep
        #[arg(long)]
        facility: Option<String>,

        /// Supplier to keep
        #[arg(long)]
        supplier: Option<String>,

        /// Also export the report
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Manage facilities
    Facility {
        #[command(subcommand)]
        action: FacilityCommand,
    },

    /// Manage administrative transactions
    Transaction {
        #[command(subcommand)]
        action: TransactionCommand,
    },

    /// Launch the terminal UI
    Tui,
}

#[derive(Args, Clone, Default)]
pub struct FilterArgs {
    /// Filter as key=value, e.g. --filter status=منجز (repeatable)
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Report type for the reports screen
    #[arg(long)]
    pub report_type: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Spreadsheet,
    Document,
    Print,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Spreadsheet => ExportFormat::Spreadsheet,
            FormatArg::Document => ExportFormat::Document,
            FormatArg::Print => ExportFormat::Print,
        }
    }
}

#[derive(Subcommand)]
pub enum FacilityCommand {
    /// Add a facility
    Add(FacilityArgs),
    /// Replace the details of a facility
    Update {
        id: String,
        #[command(flatten)]
        details: FacilityArgs,
    },
    /// Activate or deactivate a facility
    Toggle { id: String },
    /// Show active/inactive counts
    Stats,
}

#[derive(Args)]
pub struct FacilityArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub code: String,
    #[arg(long, default_value = "")]
    pub location: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub manager: String,
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Register the facility as inactive
    #[arg(long)]
    pub inactive: bool,
}

impl From<FacilityArgs> for FacilityForm {
    fn from(args: FacilityArgs) -> Self {
        FacilityForm {
            name: args.name,
            code: args.code,
            location: args.location,
            phone: args.phone,
            email: args.email,
            manager: args.manager,
            is_active: !args.inactive,
            address: args.address,
            description: args.description,
        }
    }
}

#[derive(Subcommand)]
pub enum TransactionCommand {
    /// Register a new transaction and show its transfer history
    New(TransactionArgs),
    /// Delete a transaction
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print one transaction as a report page
    Print {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the transfer history of a transaction
    History { id: String },
}

#[derive(Args)]
pub struct TransactionArgs {
    #[arg(long)]
    pub number: String,
    /// Receive date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long = "type")]
    pub kind: String,
    #[arg(long)]
    pub sender: String,
    #[arg(long)]
    pub to: String,
    #[arg(long, default_value = DEFAULT_STATUS)]
    pub status: String,
    #[arg(long, default_value = "")]
    pub notes: String,
}

impl From<TransactionArgs> for TransactionForm {
    fn from(args: TransactionArgs) -> Self {
        TransactionForm {
            transaction_number: args.number,
            receive_date: args.date,
            subject: args.subject,
            kind: args.kind,
            sender_entity: args.sender,
            transferred_to: args.to,
            status: args.status,
            notes: args.notes,
        }
    }
}

pub fn parse_screen(value: &str) -> Result<ScreenKind, String> {
    ScreenKind::parse(value).ok_or_else(|| {
        let known: Vec<&str> = ScreenKind::ALL.iter().map(|k| k.key()).collect();
        format!("unknown screen '{}', expected one of: {}", value, known.join(", "))
    })
}

pub fn parse_filter(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, filter)) if !key.trim().is_empty() => Ok((key.trim().to_string(), filter.to_string())),
        _ => Err(format!("expected key=value, got '{}'", value)),
    }
}

pub fn parse_report_type(value: &str) -> anyhow::Result<ReportType> {
    ReportType::parse(value).ok_or_else(|| {
        let known: Vec<&str> = ReportType::ALL.iter().map(|t| t.as_str()).collect();
        anyhow::anyhow!("Unsupported report type: {}. Supported types: {}", value, known.join(", "))
    })
}
