use clap::{Parser, Subcommand};
use onestore::{report, Document};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "onestore", about = "Inspect OneNote .one / .onetoc2 containers")]
struct Cli {
    /// Log verbosity: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the container header
    Info {
        input: PathBuf,
    },
    /// Show the property sets of every object
    Props {
        input: PathBuf,
    },
    /// List embedded files with a hex preview
    Files {
        input: PathBuf,
    },
    /// Write every embedded file to disk
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Append this extension to each extracted file
        #[arg(short, long, default_value = "")]
        extension: String,
    },
    /// Print the whole decode as one JSON document
    Json {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let doc = Document::open(&input)?;
            println!("── {} ({}) ──", input.display(), doc.header().file_type().extension());
            print!("{}", report::render_headers(&doc));
            println!("  Nodes decoded  {}", doc.nodes_decoded());
            eprint!("{}", report::render_diagnostics(&doc));
        }

        // ── Props ────────────────────────────────────────────────────────────
        Commands::Props { input } => {
            let doc = Document::open(&input)?;
            print!("{}", report::render_properties(&doc));
            eprint!("{}", report::render_diagnostics(&doc));
        }

        // ── Files ────────────────────────────────────────────────────────────
        Commands::Files { input } => {
            let doc = Document::open(&input)?;
            print!("{}", report::render_files(&doc));
            eprint!("{}", report::render_diagnostics(&doc));
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, extension } => {
            let doc = Document::open(&input)?;
            let extraction = doc.extract_all(&output_dir, &extension)?;
            for path in &extraction.written {
                println!("  extracted  {}", path.display());
            }
            for (guid, error) in &extraction.skipped {
                eprintln!("  skipped    {guid}: {error}");
            }
            eprint!("{}", report::render_diagnostics(&doc));
        }

        // ── Json ─────────────────────────────────────────────────────────────
        Commands::Json { input } => {
            let doc = Document::open(&input)?;
            println!("{}", serde_json::to_string(&report::to_json(&doc))?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extract_with_options() {
        let cli = Cli::try_parse_from(["onestore", "-vv", "extract", "a.one", "-C", "out", "-e", "bin"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Extract { input, output_dir, extension } => {
                assert_eq!(input, PathBuf::from("a.one"));
                assert_eq!(output_dir, PathBuf::from("out"));
                assert_eq!(extension, "bin");
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["onestore"]).is_err());
    }
}
