use serde::Serialize;
use serde_json::{Value, json};
use termflow_contract::Violation;
use termflow_pipeline::{Propagation, TermflowConfig};
use termflow_term::{BlockSize, Term};

/// Exit code for malformed arguments or configuration.
pub const EXIT_USAGE: i32 = 2;
/// Exit code for an evaluation that ended in a violation.
pub const EXIT_REJECTED: i32 = 1;

pub fn usage_error(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(EXIT_USAGE);
}

pub fn load_config_or_exit(path: Option<&str>) -> TermflowConfig {
    match path {
        Some(path) => TermflowConfig::load(path).unwrap_or_else(|err| usage_error(err)),
        None => TermflowConfig::default(),
    }
}

pub fn parse_block_size_or_exit(text: &str) -> BlockSize {
    text.parse().unwrap_or_else(|err: String| usage_error(err))
}

pub fn parse_propagation_or_exit(text: &str) -> Propagation {
    text.parse().unwrap_or_else(|err: String| usage_error(err))
}

/// Comma-separated integers; blank entries are ignored.
pub fn parse_elements_or_exit(text: &str) -> Vec<i64> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>()
                .unwrap_or_else(|err| usage_error(format!("invalid element `{item}`: {err}")))
        })
        .collect()
}

pub fn print_json_or_exit(payload: &Value, what: &str) {
    let rendered = serde_json::to_string_pretty(payload).unwrap_or_else(|err| {
        eprintln!("error: failed to render {what} json: {err}");
        std::process::exit(EXIT_USAGE);
    });
    println!("{rendered}");
}

/// Elements of a resolved term as JSON, or the violation an Error term
/// carries.
pub fn render_term<V>(term: &Term<V>) -> Result<Value, Violation>
where
    V: Serialize + Clone + Send + Sync + 'static,
{
    match term {
        Term::Error(error) => Err(error.violation().clone()),
        Term::Cyclical(cyclical) => Ok(json!({
            "variant": "cyclical",
            "header": cyclical.header(),
            "cycle": cyclical.cycle(),
        })),
        resolved => Ok(json!({
            "variant": resolved.variant_name(),
            "elements": resolved.elements(BlockSize::All).collect::<Vec<_>>(),
        })),
    }
}

/// One line per element of `rendered`, as produced by [`render_term`].
pub fn describe_rendered(rendered: &Value) -> String {
    let list = |key: &str| {
        rendered
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default()
    };
    let variant = rendered
        .get("variant")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    if variant == "cyclical" {
        format!("{variant}: [{}] then ([{}]) repeated", list("header"), list("cycle"))
    } else {
        format!("{variant}: [{}]", list("elements"))
    }
}

/// Print a violation and its cause chain, one link per line.
pub fn print_violation(violation: &Violation) {
    println!("  Rejected: {violation}");
    for cause in violation.chain().skip(1) {
        println!("    caused by: {cause}");
    }
}
