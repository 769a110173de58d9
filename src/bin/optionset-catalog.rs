//! Option-set catalog CLI
//!
//! Command-line interface for browsing a metadata catalog and exporting its
//! value sets.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use optionset_catalog::{
    open_gateway, CatalogError, GatewayConfig, InlineExecutor, MetadataCache, ThreadExecutor,
    ValueSetMapping,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "optionset-catalog")]
#[command(about = "Browse option sets of a metadata catalog")]
#[command(version)]
struct Cli {
    /// Run object and field loads on background threads
    #[arg(long, global = true)]
    background: bool,

    /// Timeout in seconds for HTTP catalog requests
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the domain objects of the catalog
    Objects {
        /// Catalog source: JSON file path or base URL (http:// or https://)
        source: String,

        /// Only list objects of this container
        #[arg(long)]
        container: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the enumerated fields of an object
    Fields {
        /// Catalog source: JSON file path or base URL (http:// or https://)
        source: String,

        /// Object identifier
        object: String,

        /// Container the object belongs to
        #[arg(long)]
        container: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the options of a field
    Options {
        /// Catalog source: JSON file path or base URL (http:// or https://)
        source: String,

        /// Object identifier
        object: String,

        /// Field identifier
        field: String,

        /// Container the object belongs to
        #[arg(long)]
        container: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load value sets and export them as a JSON mapping
    Export {
        /// Catalog source: JSON file path or base URL (http:// or https://)
        source: String,

        /// Only export objects of this container
        #[arg(long)]
        container: Option<String>,

        /// Object to export (repeatable; all objects if omitted)
        #[arg(long = "object")]
        objects: Vec<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let session = Session {
        background: cli.background,
        timeout: Duration::from_secs(cli.timeout),
    };

    let result = match cli.command {
        Commands::Objects {
            source,
            container,
            json,
        } => run_objects(&session, &source, container.as_deref(), json),

        Commands::Fields {
            source,
            object,
            container,
            json,
        } => run_fields(&session, &source, container.as_deref(), &object, json),

        Commands::Options {
            source,
            object,
            field,
            container,
            json,
        } => run_options(&session, &source, container.as_deref(), &object, &field, json),

        Commands::Export {
            source,
            container,
            objects,
            output,
            pretty,
        } => run_export(&session, &source, container.as_deref(), &objects, output, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr so stdout stays machine readable. `RUST_LOG` overrides the level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct Session {
    background: bool,
    timeout: Duration,
}

impl Session {
    fn open(&self, source: &str) -> Result<MetadataCache, u8> {
        let config = GatewayConfig::default().timeout(self.timeout);
        let gateway = open_gateway(source, &config).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

        Ok(if self.background {
            MetadataCache::new(gateway, ThreadExecutor::default())
        } else {
            MetadataCache::new(gateway, InlineExecutor)
        })
    }
}

fn fail(e: CatalogError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

fn print_json(value: &serde_json::Value) -> Result<(), u8> {
    let text = serde_json::to_string(value).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", text);
    Ok(())
}

fn run_objects(session: &Session, source: &str, container: Option<&str>, json_output: bool) -> Result<(), u8> {
    let mut cache = session.open(source)?;
    let objects = cache.load_objects(container).map_err(fail)?;

    if json_output {
        let rows: Vec<_> = objects
            .iter()
            .map(|o| json!({ "identifier": o.identifier(), "display_label": o.display_label() }))
            .collect();
        return print_json(&json!(rows));
    }

    for object in objects {
        println!("{}\t{}", object.identifier(), object.display_label());
    }
    Ok(())
}

fn run_fields(
    session: &Session,
    source: &str,
    container: Option<&str>,
    object: &str,
    json_output: bool,
) -> Result<(), u8> {
    let mut cache = session.open(source)?;
    cache.load_objects(container).map_err(fail)?;
    let object = cache.require_object(object).map_err(fail)?;
    let fields = cache.load_fields(object).map_err(fail)?;

    if json_output {
        let rows: Vec<_> = fields
            .iter()
            .map(|f| json!({ "identifier": f.identifier(), "display_label": f.display_label() }))
            .collect();
        return print_json(&json!(rows));
    }

    for field in fields {
        println!("{}\t{}", field.identifier(), field.display_label());
    }
    Ok(())
}

fn run_options(
    session: &Session,
    source: &str,
    container: Option<&str>,
    object: &str,
    field: &str,
    json_output: bool,
) -> Result<(), u8> {
    let mut cache = session.open(source)?;
    cache.load_objects(container).map_err(fail)?;
    let object = cache.require_object(object).map_err(fail)?;
    cache.load_fields(object).map_err(fail)?;
    let field = cache.require_field(object, field).map_err(fail)?;
    cache.load_options(field).map_err(fail)?;
    let node = cache.field(field).map_err(fail)?;

    if json_output {
        let options: Vec<_> = node
            .options()
            .iter()
            .map(|o| json!({ "value": o.value(), "label": o.label(), "description": o.description() }))
            .collect();
        return print_json(&json!({
            "field": node.identifier(),
            "global_set_name": node.global_set_name(),
            "options": options,
        }));
    }

    if let Some(name) = node.global_set_name() {
        println!("# global set: {}", name);
    }
    for option in node.options() {
        match option.description() {
            Some(description) => println!("{}\t{}\t{}", option.value(), option.label(), description),
            None => println!("{}\t{}", option.value(), option.label()),
        }
    }
    Ok(())
}

fn run_export(
    session: &Session,
    source: &str,
    container: Option<&str>,
    selected: &[String],
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let mut cache = session.open(source)?;
    cache.load_objects(container).map_err(fail)?;

    let objects = if selected.is_empty() {
        cache.objects().iter().map(|o| o.id()).collect()
    } else {
        selected
            .iter()
            .map(|identifier| cache.require_object(identifier))
            .collect::<Result<Vec<_>, _>>()
            .map_err(fail)?
    };

    // Submit every field load up front so background loads overlap.
    let tickets = objects
        .iter()
        .map(|&object| cache.submit_fields(object))
        .collect::<Result<Vec<_>, _>>()
        .map_err(fail)?;
    for ticket in tickets {
        cache.wait_for(ticket).map_err(fail)?;
    }

    for &object in &objects {
        let fields: Vec<_> = cache
            .object(object)
            .map_err(fail)?
            .fields()
            .iter()
            .map(|f| f.id())
            .collect();
        for field in fields {
            cache.load_options(field).map_err(fail)?;
        }
    }

    let mapping = ValueSetMapping::from_cache(&cache);
    let json_output = if pretty {
        serde_json::to_string_pretty(&mapping)
    } else {
        serde_json::to_string(&mapping)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
