use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sysbiokg::graph::{emit, RandomTokens};
use sysbiokg::schema::SchemaRegistry;
use sysbiokg::{discover_models, load_model, Config, GraphExtraction, JsonlSink, SchemaManager};

#[derive(Parser, Debug)]
#[command(name = "sysbiokg")]
#[command(about = "Extract SBGN-ML / SBML models into a typed knowledge graph", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract model files (or directories of them) into JSONL node/edge files
    Extract {
        /// Model files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Schema registry YAML to extend (overrides schema.path)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Where to write the updated schema (defaults to the loaded path)
        #[arg(long)]
        schema_out: Option<PathBuf>,

        /// Output directory for nodes.jsonl / edges.jsonl (overrides output.dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Do not synthesize a default compartment
        #[arg(long)]
        no_default_compartments: bool,

        /// Do not copy annotations onto nodes and edges
        #[arg(long)]
        no_annotations: bool,
    },
    /// Print the schema registry as a tree
    SchemaTree {
        /// Schema registry YAML (overrides schema.path)
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // RUST_LOG wins; otherwise output.log_level applies once the config is loaded.
    let rust_log = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "trace")).init();
    if !rust_log {
        log::set_max_level(LevelFilter::Info);
    }

    let cli = Cli::parse();
    let config = Config::load()?;
    if !rust_log {
        let level: LevelFilter = config
            .output
            .log_level
            .parse()
            .with_context(|| format!("Invalid output.log_level '{}'", config.output.log_level))?;
        log::set_max_level(level);
    }
    log::debug!("Configuration loaded");

    match cli.command {
        Command::Extract {
            paths,
            schema,
            schema_out,
            out,
            no_default_compartments,
            no_annotations,
        } => {
            let mut config = config;
            if let Some(schema) = schema {
                config.schema.path = Some(schema);
            }
            if let Some(schema_out) = schema_out {
                config.schema.output_path = Some(schema_out);
            }
            if let Some(out) = out {
                config.output.dir = out;
            }
            if no_default_compartments {
                config.extraction.add_default_compartments = false;
            }
            if no_annotations {
                config.extraction.annotations_as_properties = false;
            }
            config.validate()?;
            run_extract(&config, &paths)
        }
        Command::SchemaTree { schema } => {
            let path = schema
                .or(config.schema.path)
                .context("No schema given; pass --schema or set schema.path")?;
            let manager = SchemaManager::load(&path)
                .with_context(|| format!("Failed to load schema {}", path.display()))?;
            print!("{}", manager.render_tree());
            Ok(())
        }
    }
}

fn run_extract(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let start = Instant::now();

    let mut documents = Vec::new();
    for path in paths {
        documents.extend(
            discover_models(path).with_context(|| format!("Cannot read {}", path.display()))?,
        );
    }
    log::info!("Found {} model documents", documents.len());

    let mut schema = match &config.schema.path {
        Some(path) => Some(
            SchemaManager::load(path)
                .with_context(|| format!("Failed to load schema {}", path.display()))?,
        ),
        None => None,
    };

    let options = config.extraction_options();
    let mut sink = JsonlSink::create(&config.output.dir)
        .with_context(|| format!("Cannot open output dir {}", config.output.dir.display()))?;
    let mut tokens = RandomTokens;

    let mut extracted = 0;
    let mut failed = 0;
    let (mut total_nodes, mut total_edges) = (0, 0);

    for document in &documents {
        let model = match load_model(document) {
            Ok(model) => model,
            Err(e) => {
                log::error!("Skipping {}: {}", document.display(), e);
                failed += 1;
                continue;
            }
        };

        let registry = schema.as_mut().map(|s| s as &mut dyn SchemaRegistry);
        // A registry rejection means the hierarchy ordering is broken; stop here.
        let graph = GraphExtraction::extract(&model, &options, registry, &mut tokens)
            .with_context(|| format!("Extraction failed for {}", document.display()))?;

        let (nodes, edges) = emit(&graph, &mut sink)?;
        log::info!(
            "{}: {} nodes, {} edges (namespace {})",
            document.display(),
            nodes,
            edges,
            graph.namespace().token()
        );
        total_nodes += nodes;
        total_edges += edges;
        extracted += 1;
    }

    if let Some(manager) = &schema {
        let target: Option<&Path> = config.schema_output();
        let saved = manager.save(target, config.schema.backup)?;
        log::info!("Saved schema to {}", saved.display());
    }

    log::info!("Extraction complete in {:.2}s", start.elapsed().as_secs_f64());
    log::info!("  Documents extracted: {}", extracted);
    log::info!("  Documents failed: {}", failed);
    log::info!("  Nodes written: {}", total_nodes);
    log::info!("  Edges written: {}", total_edges);
    log::info!("  Output: {}", sink.dir().display());

    if extracted == 0 && failed > 0 {
        anyhow::bail!("all {} documents failed to load", failed);
    }
    Ok(())
}
