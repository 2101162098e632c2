#![forbid(unsafe_code)]

//! Sigtuna CLI — XML canonicalization from the command line.

use clap::{Parser, Subcommand};
use sigtuna_c14n::{canonicalize, C14nMode, C14nSettings};
use sigtuna_core::Error;
use sigtuna_xml::{xpath, SelectedNode, XmlDocument};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "sigtuna",
    about = "Sigtuna — Canonical XML and Exclusive XML Canonicalization",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize an XML document or document subset
    Canonicalize {
        /// Input XML file
        file: PathBuf,

        /// Use Exclusive XML Canonicalization
        #[arg(short, long)]
        exclusive: bool,

        /// Include comments in the output
        #[arg(short = 'c', long)]
        with_comments: bool,

        /// Document subset expression
        #[arg(short, long)]
        subset: Option<String>,

        /// Namespace binding for the subset expression (PREFIX=URI)
        #[arg(short = 'n', long = "namespace")]
        namespaces: Vec<String>,

        /// Prefix treated inclusively in exclusive mode
        #[arg(long = "inclusive-ns")]
        inclusive_ns: Vec<String>,

        /// Expression selecting the apex node (default: the document)
        #[arg(long)]
        apex: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List supported canonicalization variants
    Info,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Canonicalize {
            file,
            exclusive,
            with_comments,
            subset,
            namespaces,
            inclusive_ns,
            apex,
            output,
            verbose,
        } => cmd_canonicalize(
            file,
            exclusive,
            with_comments,
            subset,
            namespaces,
            inclusive_ns,
            apex,
            output,
            verbose,
        ),

        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn cmd_canonicalize(
    file: PathBuf,
    exclusive: bool,
    with_comments: bool,
    subset: Option<String>,
    namespaces: Vec<String>,
    inclusive_ns: Vec<String>,
    apex: Option<String>,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Error> {
    let xml = read_file(&file)?;
    let document = XmlDocument::parse(xml)?;
    let doc = document.parse_doc()?;

    let bindings = parse_bindings(&namespaces)?;

    let mut settings = C14nSettings::new()
        .exclusive(exclusive)
        .with_comments(with_comments)
        .inclusive_namespaces(inclusive_ns);
    for (prefix, uri) in &bindings {
        settings = settings.namespace(prefix.clone(), uri.clone());
    }
    if let Some(query) = subset {
        settings = settings.query(query);
    }

    let apex_node = match &apex {
        None => doc.root(),
        Some(expr) => select_apex(&doc, expr, &bindings)?,
    };

    if verbose {
        eprintln!("Canonicalizing: {}", file.display());
    }

    let canonical = canonicalize(apex_node, &settings)?;
    write_output(output, canonical.as_bytes())
}

fn cmd_info() -> Result<(), Error> {
    println!("Sigtuna — XML Canonicalization");
    println!();
    println!("Supported variants:");
    for mode in [
        C14nMode::Inclusive,
        C14nMode::InclusiveWithComments,
        C14nMode::Exclusive,
        C14nMode::ExclusiveWithComments,
    ] {
        println!("  {}", mode.uri());
    }
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn parse_bindings(specs: &[String]) -> Result<Vec<(String, String)>, Error> {
    let mut bindings = Vec::new();
    for spec in specs {
        match spec.split_once('=') {
            Some((prefix, uri)) if !prefix.is_empty() => {
                bindings.push((prefix.to_owned(), uri.to_owned()));
            }
            _ => {
                return Err(Error::SubsetQuery(format!(
                    "invalid namespace binding `{spec}` (expected PREFIX=URI)"
                )))
            }
        }
    }
    Ok(bindings)
}

/// Evaluate an apex expression and return the first selected element.
fn select_apex<'a>(
    doc: &'a roxmltree::Document<'a>,
    expr: &str,
    bindings: &[(String, String)],
) -> Result<roxmltree::Node<'a, 'a>, Error> {
    let selected = xpath::evaluate(doc.root(), expr, bindings)?;
    for node in selected {
        if let SelectedNode::Tree(id) = node {
            if let Some(found) = doc.get_node(id) {
                return Ok(found);
            }
        }
    }
    Err(Error::SubsetQuery(format!(
        "apex expression `{expr}` selected no tree node"
    )))
}

fn read_file(path: &PathBuf) -> Result<String, Error> {
    Ok(std::fs::read_to_string(path)?)
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(Error::Io),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(data).map_err(Error::Io)
        }
    }
}
