//! Tree importer CLI - main binary entry point

use clap::Parser;
use std::process;
use std::sync::Arc;
use treeimport::cli::args::{Cli, Command, EngineArgs};
use treeimport::cli::output::{format_json, format_text};
use treeimport::io::manifest::{Manifest, write_manifest};
use treeimport::services::filters::{LoggingListener, NamePatternFilter};
use treeimport::services::source::{FileSystemSourceNode, SourceNode, SyntheticSourceNode};
use treeimport::{DefaultEntryFactory, Error, ImportOptions, Importer, InMemoryStore};

fn main() {
    let cli = Cli::parse();

    let engine = match &cli.command {
        Command::Import(args) => &args.engine,
        Command::Synthetic(args) => &args.engine,
    };

    // RUST_LOG still wins over the default level
    let default_level = if engine.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let opts = match engine.resolve_options() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    let root: Box<dyn SourceNode> = match &cli.command {
        Command::Import(args) => match FileSystemSourceNode::open(&args.source) {
            Ok(node) => Box::new(node),
            Err(e) => {
                eprintln!("Error: cannot open {}: {e}", args.source.display());
                process::exit(2);
            }
        },
        Command::Synthetic(args) => {
            let layout = args.layout();
            log::info!(
                "Generating {} folders and {} documents",
                layout.folder_count(),
                layout.leaf_count()
            );
            Box::new(SyntheticSourceNode::root(args.root_name.clone(), layout))
        }
    };

    process::exit(run_import(engine, &opts, root));
}

fn run_import(engine: &EngineArgs, opts: &ImportOptions, root: Box<dyn SourceNode>) -> i32 {
    let filter = match NamePatternFilter::new(&engine.excludes) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };

    let store = InMemoryStore::new(opts.repository.clone());
    let factory = DefaultEntryFactory::new().with_ingest_content(!engine.no_content);

    let mut importer = Importer::new(Arc::new(store.clone()), opts.clone())
        .with_factory(Arc::new(factory))
        .with_listener(Arc::new(LoggingListener::new(opts.job_name.clone())));
    if !filter.is_empty() {
        importer = importer.with_document_filter(Arc::new(filter));
    }

    let result = importer.run(root);

    // Whatever was committed is worth a manifest, even after a failure
    if let Some(path) = &engine.manifest {
        let manifest = Manifest::from_store(&store, &opts.repository, &opts.job_name);
        if let Err(e) = write_manifest(path, &manifest) {
            eprintln!("Error: failed to write manifest {}: {e}", path.display());
            return 1;
        }
    }

    match result {
        Ok(report) => {
            if engine.json {
                match format_json(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        return 1;
                    }
                }
            } else {
                print!("{}", format_text(&report));
            }
            0
        }
        Err(e @ (Error::InvalidConfig(_) | Error::DestinationNotFound(_))) => {
            eprintln!("Error: {e}");
            2
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}
