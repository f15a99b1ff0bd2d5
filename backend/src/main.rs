//! Tripstar CLI - reshape taxi trip CSV files into a star schema
//!
//! ```bash
//! tripstar transform trips.csv -o star.json   # CSV -> 8 tables as JSON
//! tripstar validate star.json                 # Check a written result
//! tripstar serve                              # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! tripstar parse trips.csv     # Just parse CSV to JSON records
//! tripstar blocks              # List registered blocks and their tests
//! ```

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tripstar::transform::pipeline::format_delimiter;
use tripstar::{
    parse_csv_file, transform_csv, validate_star_schema_json, BlockRegistry, TransformOptions,
};

#[derive(Parser)]
#[command(name = "tripstar")]
#[command(about = "Reshape taxi trip CSV files into a star schema", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: CSV -> dimensions + fact table
    Transform {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip output tests
        #[arg(long)]
        no_validate: bool,
    },

    /// Parse a CSV file and output JSON records
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a star schema JSON file
    Validate {
        /// Input JSON file written by `transform`
        input: PathBuf,
    },

    /// List registered blocks
    Blocks,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "TRIPSTAR_PORT", default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transform {
            input,
            delimiter,
            output,
            no_validate,
        } => cmd_transform(&input, delimiter, output.as_deref(), no_validate),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Blocks => cmd_blocks(),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_transform(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
    no_validate: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = TransformOptions {
        delimiter,
        skip_validation: no_validate,
    };

    let result = transform_csv(input, options)?;

    eprintln!("\n📊 Summary");
    eprintln!("   Input rows:         {}", result.csv_info.row_count);
    eprintln!("   Duplicates removed: {}", result.duplicates_removed);
    for (name, table) in result.schema.tables() {
        eprintln!("   {:<20} {} rows, {} columns", name, table.len(), table.column_names().len());
    }

    let json = result.schema.to_json()?;
    write_output(&json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file(input, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let value: Value = serde_json::from_str(&content)?;

    match validate_star_schema_json(&value) {
        Ok(()) => {
            eprintln!("✅ Valid star schema");
            Ok(())
        }
        Err(errors) => {
            for err in errors.iter().take(10) {
                eprintln!("   - {}", err);
            }
            Err(format!("{} schema violation(s)", errors.len()).into())
        }
    }
}

fn cmd_blocks() -> Result<(), Box<dyn std::error::Error>> {
    let registry = BlockRegistry::with_defaults();

    eprintln!("📋 Registered blocks ({}):\n", registry.list().len());
    for block in registry.list() {
        println!("  📦 {}", block.name);
        println!("     {}", block.description);
        println!("     Tests: {}", block.test_names().join(", "));
        println!();
    }
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    tripstar::server::start_server(port).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
