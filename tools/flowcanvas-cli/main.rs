use clap::{Parser, Subcommand, ValueEnum};
use flowcanvas::error::ConversionError;
use flowcanvas::prelude::*;
use serde::Deserialize;
use std::fs;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

// --- JSON Deserialization Structs (Input Format Specific) ---
// A React-Flow style export (`nodes` + `edges`), converted to the canonical
// document through `IntoDocument`.

#[derive(Deserialize)]
struct RawFlow {
    nodes: Vec<RawNode>,
    edges: Vec<RawEdge>,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type", default)]
    node_type: String,
    #[serde(default)]
    position: RawPosition,
    #[serde(default)]
    data: RawNodeData,
}

#[derive(Deserialize, Default)]
struct RawPosition {
    x: f64,
    y: f64,
}

#[derive(Deserialize, Default)]
struct RawNodeData {
    #[serde(default)]
    category: String,
    #[serde(default)]
    variables: Vec<NodeVariable>,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

#[derive(Deserialize)]
struct RawEdge {
    id: String,
    source: String,
    #[serde(alias = "sourceHandle")]
    source_handle: String,
    target: String,
    #[serde(alias = "targetHandle")]
    target_handle: String,
}

impl IntoDocument for RawFlow {
    fn into_document(self) -> std::result::Result<Document, ConversionError> {
        let defaults = CanvasConfig::default();
        let nodes = self
            .nodes
            .into_iter()
            .map(|raw| {
                let mut node = Node::new(raw.id, raw.node_type);
                node.category = raw.data.category;
                node.variables = raw.data.variables;
                node.view.x = raw.position.x;
                node.view.y = raw.position.y;
                node.view.width = raw.data.width.unwrap_or(defaults.default_node_width);
                node.view.height = raw.data.height.unwrap_or(defaults.default_node_height);
                node
            })
            .collect();
        let connections = self
            .edges
            .into_iter()
            .map(|edge| {
                Connection::new(
                    edge.id,
                    (edge.source.as_str(), edge.source_handle.as_str()),
                    (edge.target.as_str(), edge.target_handle.as_str()),
                )
            })
            .collect();
        let document = Document {
            nodes,
            connections,
            groups: Vec::new(),
        };
        document
            .validate()
            .map_err(|e| ConversionError::ValidationError(e.to_string()))?;
        Ok(document)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputFormat {
    /// `{ nodes, connections }` documents as saved by the canvas
    Native,
    /// `{ nodes, edges }` exports with React-Flow style edges
    Edges,
}

/// Inspect and check flow documents with the canvas engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Format of the input document
    #[arg(short, long, value_enum, default_value = "native", global = true)]
    format: InputFormat,

    /// Optional canvas configuration JSON file
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check referential integrity of a document
    Validate { path: String },
    /// Print node, connection and group counts
    Stats { path: String },
    /// Print the SVG path of every visible connection
    Routes {
        path: String,
        /// Zoom factor to lay the canvas out at
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
    },
    /// Load, save, reload and save again, and compare both outputs
    Roundtrip { path: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CanvasConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => CanvasConfig::default(),
    };

    match cli.command {
        Command::Validate { path } => run_validate(&path, cli.format),
        Command::Stats { path } => run_stats(&path, cli.format, config),
        Command::Routes { path, zoom } => run_routes(&path, cli.format, config, zoom),
        Command::Roundtrip { path } => run_roundtrip(&path, cli.format),
    }
}

fn load_document(path: &str, format: InputFormat) -> Document {
    let start = Instant::now();
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", path, e)));
    let document = match format {
        InputFormat::Native => Document::from_json(&json)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse document: {}", e))),
        InputFormat::Edges => {
            let raw: RawFlow = serde_json::from_str(&json)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse flow JSON: {}", e)));
            raw.into_document()
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to convert flow: {}", e)))
        }
    };
    info!(%path, elapsed = ?start.elapsed(), "Document read");
    document
}

fn run_validate(path: &str, format: InputFormat) {
    let document = load_document(path, format);
    match document.validate() {
        Ok(()) => println!("OK: '{}' is consistent", path),
        Err(e) => exit_with_error(&format!("Invalid document: {}", e)),
    }
}

fn run_stats(path: &str, format: InputFormat, config: CanvasConfig) {
    let canvas = Canvas::builder(load_document(path, format))
        .with_config(config)
        .build();
    let store = canvas.store();
    let variables: usize = store.nodes().iter().map(|n| n.flat_variables().len()).sum();
    let hidden = store.connections().iter().filter(|c| c.hidden).count();
    let collapsed = store.groups().iter().filter(|g| g.collapsed).count();

    println!("\n--- Document Summary ---");
    println!("Nodes:               {}", store.nodes().len());
    println!("Variables:           {}", variables);
    println!("Connections:         {} ({} hidden)", store.connections().len(), hidden);
    println!("Groups:              {} ({} collapsed)", store.groups().len(), collapsed);
    for group in store.groups().iter().filter(|g| g.collapsed) {
        if let Some(promoted) = canvas.promoted(&group.id) {
            println!(
                "  {} '{}': {} in / {} out promoted",
                group.id,
                group.name,
                promoted.inputs.len(),
                promoted.outputs.len()
            );
        }
    }
    println!();
}

fn run_routes(path: &str, format: InputFormat, config: CanvasConfig, zoom: f64) {
    let mut canvas = Canvas::builder(load_document(path, format))
        .with_config(config)
        .build();
    canvas.viewport_mut().set_zoom(zoom, Point::default());
    canvas.settle();

    let mut ids: Vec<&String> = canvas.router().paths().keys().collect();
    ids.sort();
    for id in ids {
        if let Some(path) = canvas.router().path(id) {
            println!("{}\t{}", id, path);
        }
    }
}

fn run_roundtrip(path: &str, format: InputFormat) {
    let document = load_document(path, format);
    let first = document
        .to_json()
        .unwrap_or_else(|e| exit_with_error(&format!("Serialization failed: {}", e)));
    let reloaded = Document::from_json(&first)
        .unwrap_or_else(|e| exit_with_error(&format!("Reload failed: {}", e)));
    let second = reloaded
        .to_json()
        .unwrap_or_else(|e| exit_with_error(&format!("Serialization failed: {}", e)));

    if first == second {
        println!("OK: round-trip is byte-identical ({} bytes)", first.len());
    } else {
        exit_with_error("Round-trip output differs");
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
