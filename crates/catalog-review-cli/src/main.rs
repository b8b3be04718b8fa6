mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "catalog-review",
    version,
    about = "Review products extracted from PDF catalogs and merge them into the product store"
)]
struct Cli {
    /// Use a local JSON store instead of the HTTP API
    #[arg(long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the extracted products of a catalog file
    Products {
        /// Catalog file id
        file_id: String,

        /// Which rows to show: all (default), reviewed or pending
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Table page, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Mark products reviewed (or pending) and save
    Mark {
        /// Catalog file id
        file_id: String,

        /// Mark every product
        #[arg(long, conflicts_with = "row")]
        all: bool,

        /// Row id(s) to mark
        #[arg(long = "row", value_name = "ID")]
        row: Vec<String>,

        /// Mark as pending instead of reviewed
        #[arg(long)]
        unreviewed: bool,
    },
    /// Finish the review and merge products into the product store
    Finish {
        /// Catalog file id
        file_id: String,

        /// Continue even if some products are not reviewed
        #[arg(short, long)]
        yes: bool,

        /// Keep the existing product for this ordering number
        #[arg(long = "keep", value_name = "ORDERING_NUMBER")]
        keep: Vec<String>,

        /// Replace the existing product's catalog data for this ordering number
        #[arg(long = "replace", value_name = "ORDERING_NUMBER")]
        replace: Vec<String>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Load a PDF as the preview dialog would and report what it shows
    Preview {
        /// Path to a local PDF
        #[arg(required_unless_present_any = ["url", "key"])]
        input_file: Option<PathBuf>,

        /// Document URL
        #[arg(long, conflicts_with_all = ["input_file", "key"])]
        url: Option<String>,

        /// Storage key of an uploaded document
        #[arg(long, conflicts_with = "input_file")]
        key: Option<String>,

        /// Page to open, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Text to highlight
        #[arg(long)]
        highlight: Option<String>,

        /// Product location to outline, as PAGE:X,Y,W,H in fractions of the page
        #[arg(long, conflicts_with = "highlight", value_name = "PAGE:X,Y,W,H")]
        location: Option<String>,

        /// Width of the container in pixels
        #[arg(long, default_value_t = 1024.0)]
        width: f64,

        /// Height of the viewport in pixels, used to center a location
        #[arg(long, default_value_t = 800.0)]
        viewport_height: f64,

        /// Zoom factor (0.75 - 2.5)
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Show the message a document load error maps to
    ExplainError {
        /// Raw error text
        message: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = cli.store.as_deref();
    let result = match cli.command {
        Commands::Products {
            file_id,
            filter,
            page,
            output,
        } => commands::products::run(store, &file_id, &filter, page, &output),
        Commands::Mark {
            file_id,
            all,
            row,
            unreviewed,
        } => commands::mark::run(store, &file_id, all, &row, !unreviewed),
        Commands::Finish {
            file_id,
            yes,
            keep,
            replace,
            output,
        } => commands::finish::run(store, &file_id, yes, &keep, &replace, &output),
        Commands::Preview {
            input_file,
            url,
            key,
            page,
            highlight,
            location,
            width,
            viewport_height,
            zoom,
            output,
        } => commands::preview::run(
            store,
            commands::preview::PreviewArgs {
                input_file,
                url,
                key,
                page,
                highlight,
                location,
                width,
                viewport_height,
                zoom,
            },
            &output,
        ),
        Commands::ExplainError { message } => commands::explain::run(&message),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
