//! folio - document format detector and metadata inspector

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use folio::{Doc, DocumentProperty};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Document format detector and metadata inspector", long_about = None)]
#[command(after_help = "EXAMPLES:
    folio book.epub             Show format and metadata
    folio --json book.mobi      Emit a JSON report
    folio --detect-only book    Print the detected format and exit")]
struct Cli {
    /// Input file (EPUB, FB2, MOBI)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Emit a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Only detect the format, without opening the document
    #[arg(long)]
    detect_only: bool,
}

#[derive(Serialize)]
struct Report {
    file: String,
    kind: String,
    title: Option<String>,
    author: Option<String>,
    publisher: Option<String>,
    subject: Option<String>,
    creation_date: Option<String>,
    content_bytes: usize,
    has_cover: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.detect_only {
        return match Doc::detect(&cli.input) {
            Some(kind) => {
                println!("{kind:?}");
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("error: unrecognized format: {}", cli.input.display());
                ExitCode::FAILURE
            }
        };
    }

    let doc = Doc::create_from_file(&cli.input);
    if let Some(err) = doc.error() {
        eprintln!("error: {}: {err}", cli.input.display());
        return ExitCode::FAILURE;
    }

    if cli.json {
        show_json(&doc);
    } else {
        show_info(&doc);
    }
    ExitCode::SUCCESS
}

fn show_info(doc: &Doc) {
    if let Some(path) = doc.file_path() {
        println!("File: {}", path.display());
    }
    println!("Kind: {:?}", doc.kind());
    for (label, prop) in [
        ("Title", DocumentProperty::Title),
        ("Author", DocumentProperty::Author),
        ("Publisher", DocumentProperty::Publisher),
        ("Subject", DocumentProperty::Subject),
        ("Date", DocumentProperty::CreationDate),
        ("Copyright", DocumentProperty::Copyright),
        ("Creator", DocumentProperty::CreatorApp),
    ] {
        if let Some(value) = doc.property(prop) {
            println!("{label}: {value}");
        }
    }
    if doc.is_ebook() {
        println!("Content: {} bytes", doc.html_data().len());
    }
    if let Some(cover) = doc.cover_image() {
        println!("Cover: {} ({} bytes)", cover.media_type, cover.data.len());
    }
}

fn show_json(doc: &Doc) {
    let report = Report {
        file: doc
            .file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        kind: format!("{:?}", doc.kind()),
        title: doc.property(DocumentProperty::Title),
        author: doc.property(DocumentProperty::Author),
        publisher: doc.property(DocumentProperty::Publisher),
        subject: doc.property(DocumentProperty::Subject),
        creation_date: doc.property(DocumentProperty::CreationDate),
        content_bytes: if doc.is_ebook() {
            doc.html_data().len()
        } else {
            0
        },
        has_cover: doc.cover_image().is_some(),
    };
    println!("{}", serde_json::to_string_pretty(&report).expect("report is serializable"));
}
