mod logger;

use std::env;
use std::process;
use std::sync::Arc;

use depth_gate::{
    compute_depths, AdmissionController, OperationDepths, OperationDocument, Registry, Schema,
    Unmetered,
};
use depth_gate_config::{load_config, log::LoggingConfig};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: depth-gate-dev-cli <command> [...]");
        print_commands();
        process::exit(1);
    }

    match args[1].as_str() {
        "depths" => {
            logger::init(&LoggingConfig::default());
            let operation_name = args.get(4).filter(|arg| *arg != "--json");
            let depths = process_depths(&args[2], &args[3], operation_name.map(String::as_str));

            if args.contains(&"--json".into()) {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&depths).expect("failed to serialize depths")
                );
            } else {
                for field in &depths.fields {
                    println!("{}.{}: {}", field.type_name, field.field_name, field.depth);
                }
                println!("document: {}", depths.document_depth);
            }
        }
        "admit" if args.len() >= 6 => {
            process_admit(
                &args[2],
                &args[3],
                &args[4],
                &args[5],
                args.get(6).map(String::as_str),
            );
        }
        _ => {
            eprintln!("Unknown command or missing arguments.");
            print_commands();
            process::exit(1);
        }
    };
}

fn print_commands() {
    eprintln!("Available commands:");
    eprintln!("  depths <schema_path> <operation_path> [operation_name] [--json]");
    eprintln!("  admit <config_path> <session_key> <api_id> <operation_path> [operation_name]");
}

fn process_depths(
    schema_path: &str,
    operation_path: &str,
    operation_name: Option<&str>,
) -> OperationDepths {
    let sdl = std::fs::read_to_string(schema_path).expect("Unable to read schema file");
    let schema = Schema::parse(&sdl).expect("failed to parse schema");
    let operation = read_operation(operation_path, operation_name);

    compute_depths(&operation, &schema).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    })
}

fn process_admit(
    config_path: &str,
    session_key: &str,
    api_id: &str,
    operation_path: &str,
    operation_name: Option<&str>,
) {
    let config = load_config(Some(config_path.to_string())).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });
    logger::init(&config.log);

    let registry = Registry::from_config(&config).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });

    let Some(session) = registry.session(session_key) else {
        eprintln!("Session '{}' not found in {}", session_key, config_path);
        process::exit(1);
    };
    let Some(api) = registry.api(api_id) else {
        eprintln!("API '{}' not found in {}", api_id, config_path);
        process::exit(1);
    };

    let operation = read_operation(operation_path, operation_name);
    let controller = AdmissionController::new(Arc::new(Unmetered));
    let outcome = controller.admit(&session, &api, &operation);

    println!("{}", outcome);
    if let Some(rejection) = outcome.rejection() {
        println!("status: {}", rejection.status);
        println!(
            "{}",
            serde_json::to_string_pretty(&rejection.to_graphql_response())
                .expect("failed to serialize rejection")
        );
    }
}

fn read_operation(operation_path: &str, operation_name: Option<&str>) -> OperationDocument {
    let document_text = std::fs::read_to_string(operation_path).expect("Unable to read input file");

    OperationDocument::parse(&document_text, operation_name).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    })
}
