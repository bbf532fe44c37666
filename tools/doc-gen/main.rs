use clap::Parser;
use flowcanvas::document::{Connection, Document, Group, Node, NodeVariable, VariableValue};
use flowcanvas::geometry::Rect;
use rand::Rng;
use rand::rngs::ThreadRng;
use rand::seq::IndexedRandom;
use std::fs;

const VARIABLE_TYPES: [&str; 4] = ["string", "number", "file", "any"];
const NODE_TYPES: [&str; 5] = ["llm", "http", "code", "branch", "output"];

/// A CLI tool to generate random flow documents for the canvas engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated JSON file to
    #[arg(short, long, default_value = "generated_flow.json")]
    output: String,

    /// Number of nodes to generate
    #[arg(long, default_value_t = 20)]
    nodes: usize,

    /// Maximum number of outgoing connections per node
    #[arg(long, default_value_t = 2)]
    fan_out: usize,

    /// Number of groups to carve out of the generated nodes
    #[arg(long, default_value_t = 2)]
    groups: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut rng = rand::rng();

    if cli.groups > cli.nodes {
        eprintln!(
            "Error: --groups ({}) cannot be greater than --nodes ({})",
            cli.groups, cli.nodes
        );
        std::process::exit(1);
    }

    println!("Generating a flow with {} node(s)...", cli.nodes);

    let nodes: Vec<Node> = (0..cli.nodes).map(|i| generate_node(&mut rng, i)).collect();
    let connections = generate_connections(&mut rng, &nodes, cli.fan_out);
    let groups = generate_groups(&nodes, cli.groups);

    println!(
        "-> {} connection(s), {} group(s).",
        connections.len(),
        groups.len()
    );

    let document = Document {
        nodes,
        connections,
        groups,
    };
    document.validate()?;
    fs::write(&cli.output, document.to_json_pretty()?)?;

    println!("Successfully generated and saved flow to '{}'", cli.output);
    Ok(())
}

/// Lays nodes out on a loose grid, left to right in columns of five.
fn generate_node(rng: &mut ThreadRng, index: usize) -> Node {
    let node_type = NODE_TYPES.choose(rng).copied().unwrap_or("code");
    let mut node = Node::new(format!("node_{index}"), node_type);
    node.category = "generated".to_string();
    node.view.x = (index / 5) as f64 * 320.0 + rng.random_range(-20.0..20.0);
    node.view.y = (index % 5) as f64 * 180.0 + rng.random_range(-20.0..20.0);
    node.view.width = 240.0;
    node.view.height = rng.random_range(96.0..160.0);

    let inputs = rng.random_range(1..=3);
    let outputs = rng.random_range(1..=2);
    for i in 0..inputs {
        let var_type = VARIABLE_TYPES.choose(rng).copied().unwrap_or("any");
        let mut variable = NodeVariable::new(format!("in_{i}"), var_type).with_ports(true, false);
        variable.name = format!("Input {i}");
        node.variables.push(variable);
    }
    for i in 0..outputs {
        let mut variable = NodeVariable::new(format!("out_{i}"), "any").with_ports(false, true);
        variable.name = format!("Output {i}");
        node.variables.push(variable);
    }
    if rng.random_bool(0.3) {
        let entries = (0..rng.random_range(1..=3))
            .map(|i| NodeVariable::new(format!("field_{i}"), "string").with_ports(true, false))
            .collect();
        let mut aggregate = NodeVariable::new("fields", "dict").with_value(VariableValue::Variables(entries));
        aggregate.name = "Fields".to_string();
        node.variables.push(aggregate);
    }
    node
}

/// Wires outputs forward only, so the generated flow stays acyclic.
fn generate_connections(rng: &mut ThreadRng, nodes: &[Node], fan_out: usize) -> Vec<Connection> {
    let mut connections = Vec::new();
    for (i, source) in nodes.iter().enumerate() {
        let later = &nodes[i + 1..];
        if later.is_empty() {
            continue;
        }
        for _ in 0..rng.random_range(0..=fan_out) {
            let Some(target) = later.choose(rng) else {
                continue;
            };
            let Some(input) = target.flat_variables().into_iter().find(|v| v.has_in) else {
                continue;
            };
            let id = format!("conn_{}", connections.len());
            let duplicate = connections.iter().any(|c: &Connection| {
                c.source_node_id == source.id
                    && c.target_node_id == target.id
                    && c.target_handle == input.handle
            });
            if !duplicate {
                connections.push(Connection::new(
                    id,
                    (source.id.as_str(), "out_0"),
                    (target.id.as_str(), input.handle.as_str()),
                ));
            }
        }
    }
    connections
}

/// Groups consecutive runs of nodes.
fn generate_groups(nodes: &[Node], count: usize) -> Vec<Group> {
    if count == 0 {
        return Vec::new();
    }
    let size = (nodes.len() / (count * 2)).max(1);
    (0..count)
        .filter_map(|g| {
            let members = nodes.iter().skip(g * size * 2).take(size).collect::<Vec<_>>();
            let view = Rect::bounding(members.iter().map(|n| n.rect()).collect::<Vec<_>>().iter())?;
            Some(Group {
                id: format!("group_{g}"),
                name: format!("Group {g}"),
                nodes: members.iter().map(|n| n.id.clone()).collect(),
                parent: None,
                view: view.inflate(16.0),
                collapsed: false,
            })
        })
        .collect()
}
