//! Inspect and fill PDF form fields
//!
//! Lists the form fields of a PDF, optionally sets values and writes the
//! filled document.
//!
//! Usage:
//!   cargo run --release --bin pdf_forms -- form.pdf
//!   cargo run --release --bin pdf_forms -- form.pdf --xml
//!   cargo run --release --bin pdf_forms -- form.pdf --set name=Ann --set agree=Yes --output filled.pdf

use pdf_forms::document::PdfDocument;
use pdf_forms::forms::FieldType;
use std::path::PathBuf;
use std::process::ExitCode;

struct CliConfig {
    input: PathBuf,
    xml: bool,
    json: bool,
    assignments: Vec<(String, String)>,
    output: Option<PathBuf>,
}

impl CliConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut input = None;
        let mut xml = false;
        let mut json = false;
        let mut assignments = Vec::new();
        let mut output = None;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--xml" => xml = true,
                "--json" => json = true,
                "--set" => {
                    i += 1;
                    let assignment = args.get(i).ok_or("--set needs name=value")?;
                    let (name, value) = assignment
                        .split_once('=')
                        .ok_or_else(|| format!("--set {}: expected name=value", assignment))?;
                    assignments.push((name.to_string(), value.to_string()));
                },
                "--output" | "-o" => {
                    i += 1;
                    output = Some(PathBuf::from(args.get(i).ok_or("--output needs a path")?));
                },
                other if other.starts_with('-') => return Err(format!("unknown option {}", other)),
                other => input = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        Ok(Self {
            input: input.ok_or("usage: pdf_forms <file.pdf> [--xml] [--json] [--set name=value ...] [--output out.pdf]")?,
            xml,
            json,
            assignments,
            output,
        })
    }
}

fn type_label(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::None => "-",
        FieldType::Text => "text",
        FieldType::Button => "button",
        FieldType::Choice => "choice",
        FieldType::Signature => "signature",
    }
}

fn run(config: CliConfig) -> pdf_forms::Result<()> {
    let mut doc = PdfDocument::open(&config.input)?;

    for (name, value) in &config.assignments {
        if doc.forms_mut().set_value(value, name) == 0 {
            eprintln!("warning: no field named {}", name);
        }
    }

    if config.xml {
        println!("{}", doc.form_xml()?);
    } else if config.json {
        println!("{}", doc.forms().to_json()?);
    } else {
        println!("{} ({} pages, PDF {})", doc.pdf_name(), doc.number_of_pages(), doc.version());
        for name in doc.forms().group_names() {
            let members = doc.forms().forms_with_name(name);
            let Some(first) = members.first() else { continue };
            println!(
                "  {:<40} {:<10} {:?} ({} widget{})",
                name,
                type_label(first.field_type()),
                first.value(),
                members.len(),
                if members.len() == 1 { "" } else { "s" }
            );
        }
    }

    if let Some(output) = &config.output {
        doc.save_forms_to_document_data()?;
        doc.write_to_file(output)?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match CliConfig::from_args() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        },
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
