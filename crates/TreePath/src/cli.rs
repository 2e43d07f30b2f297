//! # Command Line Front End
//!
//! Evaluates one path expression against a JSON document and prints the result
//! collection as a JSON array.
//!
//! ## Command Line Options
//!
//! ```text
//! -e, --expression <EXPRESSION>   Expression to evaluate
//! -c, --context <CONTEXT>         Expression whose result becomes the input of --expression
//! -r, --resource <RESOURCE>       JSON document to evaluate against ('-' reads stdin)
//! -v, --variables <VARIABLES>     JSON object of external constants
//!     --var <KEY=VALUE>           Set one external constant
//! -o, --output <OUTPUT>           Output file (defaults to stdout)
//!     --trace                     Print trace() outputs to stderr
//!     --log-level <LEVEL>         Log filter used when RUST_LOG is unset [default: warn]
//! ```
//!
//! ## Usage Examples
//!
//! ```bash
//! treepath-cli -e "item.where(qty > 1).name" -r order.json
//! treepath-cli -c "item" -e "name" -r order.json
//! treepath-cli -e "total > %limit" -r order.json --var limit=10
//! cat order.json | treepath-cli -e "item.count()" -r -
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use treepath_support::Collection;

use crate::context::EvaluationContext;
use crate::engine::PathEngine;
use crate::error::{PathError, PathResult};
use crate::json_tree::{JsonNode, collection_to_json, json_to_collection};
use crate::type_resolver::SchemaTypeResolver;

#[derive(Parser, Debug)]
#[command(name = "treepath-cli")]
#[command(about = "Evaluate path expressions against JSON documents")]
pub struct Args {
    /// Expression to evaluate
    #[arg(short, long)]
    pub expression: String,

    /// Context expression to evaluate first (optional)
    #[arg(short, long)]
    pub context: Option<String>,

    /// Path to the JSON document (use '-' for stdin)
    #[arg(short, long)]
    pub resource: Option<PathBuf>,

    /// Path to a JSON object of external constants
    #[arg(short = 'v', long)]
    pub variables: Option<PathBuf>,

    /// Set an external constant directly (format: key=value)
    #[arg(long = "var", value_parser = parse_var)]
    pub var: Vec<(String, String)>,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print trace() outputs to stderr
    #[arg(long)]
    pub trace: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "TREEPATH_LOG", default_value = "warn")]
    pub log_level: String,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid variable format: {}", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

pub fn run_cli(args: Args) -> PathResult<()> {
    let engine = PathEngine::new().with_type_resolver(Arc::new(SchemaTypeResolver::default().open()));

    let mut context = match &args.resource {
        Some(path) => {
            let document: JsonValue = serde_json::from_str(&read_input(path)?)?;
            if document.is_array() {
                warn!("document root is an array; evaluating against its elements");
            }
            context_for_document(document)
        }
        None => EvaluationContext::new_empty(),
    };

    if let Some(path) = &args.variables {
        load_variables_from_file(&mut context, path)?;
    }
    for (key, value) in &args.var {
        set_variable(&mut context, key, value);
    }

    let input = match &args.context {
        Some(context_expression) => {
            let scoped = engine.evaluate(&mut context, context_expression)?;
            debug!(
                expression = context_expression.as_str(),
                items = scoped.len(),
                "context expression evaluated"
            );
            scoped
        }
        None => initial_input(&context),
    };

    let result = engine.evaluate_collection(&mut context, &args.expression, input)?;
    info!(expression = args.expression.as_str(), items = result.len(), "evaluated");

    if args.trace {
        write_traces(&context)?;
    }

    let output = serde_json::to_string_pretty(&collection_to_json(&result))?;
    write_output(args.output.as_deref(), &output)
}

/// An object document becomes the tree root. Any other document is exposed as
/// the initial collection through `%context` only.
fn context_for_document(document: JsonValue) -> EvaluationContext {
    if document.is_object() {
        return EvaluationContext::new(JsonNode::root(document));
    }
    let mut context = EvaluationContext::new_empty();
    context.set_external_constant(DOCUMENT_CONSTANT, json_to_collection(document));
    context
}

const DOCUMENT_CONSTANT: &str = "document";

fn initial_input(context: &EvaluationContext) -> Collection {
    match context.tree_root() {
        Some(root) => Collection::singleton(root.clone()),
        None => context.get_external_constant(DOCUMENT_CONSTANT),
    }
}

fn read_input(path: &Path) -> PathResult<String> {
    if path.to_str() == Some("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: Option<&Path>, content: &str) -> PathResult<()> {
    match path {
        Some(p) => fs::write(p, content)?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(content.as_bytes())?;
            handle.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn write_traces(context: &EvaluationContext) -> PathResult<()> {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    for (name, collection) in context.get_trace_outputs() {
        let rendered = serde_json::to_string(&collection_to_json(&collection))?;
        writeln!(handle, "{}: {}", name, rendered)?;
    }
    Ok(())
}

fn load_variables_from_file(context: &mut EvaluationContext, path: &Path) -> PathResult<()> {
    let content = fs::read_to_string(path)?;
    let variables: HashMap<String, JsonValue> = serde_json::from_str(&content).map_err(|e| {
        PathError::InvalidInput(format!(
            "variables file {} must hold a JSON object: {}",
            path.display(),
            e
        ))
    })?;
    for (key, value) in variables {
        context.set_external_constant(constant_name(&key), json_to_collection(value));
    }
    Ok(())
}

/// Values that parse as JSON are converted; anything else is a string.
fn set_variable(context: &mut EvaluationContext, key: &str, value: &str) {
    let collection = match serde_json::from_str::<JsonValue>(value) {
        Ok(json) => json_to_collection(json),
        Err(_) => json_to_collection(JsonValue::String(value.to_string())),
    };
    context.set_external_constant(constant_name(key), collection);
}

fn constant_name(key: &str) -> &str {
    key.strip_prefix('%').unwrap_or(key)
}
