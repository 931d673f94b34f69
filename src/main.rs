use clap::{ArgAction, Parser, ValueEnum};
use context_map::{ContextMap, ContextValue, FromValue};
use serde::Serialize;
use tracing::{warn, Level};

/// Load a JSON object into a context map and read values back out of it.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON object (string) holding the context entries.
    json: String,
    /// Key to read; every entry is printed in order when omitted
    #[arg(long)]
    get: Option<String>,
    /// Type to read the key as
    #[arg(long = "as", value_enum, default_value = "string")]
    target: Target,
    /// Fallback used when the key is absent or holds another type
    #[arg(long)]
    default: Option<String>,
    /// Log coercion fallbacks (-v) and bulk inserts (-vv) to stderr
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Target {
    String,
    Int,
    Long,
    Double,
    Bool,
    List,
    Map,
    /// Whether the key holds non-blank text
    Text,
}

/// Key looked up at the end of the walkthrough; usually absent, so it reads as null.
const SESSION_KEY: &str = "sessionId";

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    // Route logs to stderr so stdout stays clean.
    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Load the context.
    let ctx = match ContextMap::from_json_str(&args.json) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Invalid context: {e}");
            std::process::exit(1);
        }
    };

    // Read one key, or walk through everything.
    match args.get.as_deref() {
        Some(key) => println!("{}", lookup(&ctx, key, args.target, args.default.as_deref())),
        None => {
            for line in walkthrough(&ctx) {
                println!("{line}");
            }
        }
    }
}

/// Individual lookups for every entry in insertion order, then one for [`SESSION_KEY`].
fn walkthrough(ctx: &ContextMap) -> Vec<String> {
    let mut lines: Vec<String> = ctx.keys().map(|key| format!("{key}: {}", show(ctx, key))).collect();
    lines.push(format!("{SESSION_KEY}: {}", show(ctx, SESSION_KEY)));
    lines
}

fn show(ctx: &ContextMap, key: &str) -> String {
    ctx.get(key).map_or_else(|| "null".to_string(), ToString::to_string)
}

fn lookup(ctx: &ContextMap, key: &str, target: Target, default: Option<&str>) -> String {
    // JSON if it parses, plain text otherwise.
    let fallback = default.map(|d| {
        serde_json::from_str::<serde_json::Value>(d)
            .map(ContextValue::from)
            .unwrap_or_else(|_| ContextValue::from(d))
    });
    let fallback = fallback.as_ref();

    match target {
        Target::String => match default {
            Some(d) => ctx.get_string_or(key, d),
            None => ctx.get_string(key),
        },
        Target::Int => match typed_default::<i32>(fallback, target) {
            Some(d) => ctx.get_int_or(key, d),
            None => ctx.get_int(key),
        }
        .to_string(),
        Target::Long => match typed_default::<i64>(fallback, target) {
            Some(d) => ctx.get_long_or(key, d),
            None => ctx.get_long(key),
        }
        .to_string(),
        Target::Double => match typed_default::<f64>(fallback, target) {
            Some(d) => ctx.get_double_or(key, d),
            None => ctx.get_double(key),
        }
        .to_string(),
        Target::Bool => match typed_default::<bool>(fallback, target) {
            Some(d) => ctx.get_bool_or(key, d),
            None => ctx.get_bool(key),
        }
        .to_string(),
        Target::List | Target::Map | Target::Text => {
            if let Some(d) = default {
                warn!(default = d, target = ?target, "--default has no effect for this type");
            }
            match target {
                Target::List => render(&ctx.get_list::<ContextValue>(key)),
                Target::Map => render(&ctx.get_map(key)),
                _ => ctx.has_text(key).to_string(),
            }
        }
    }
}

/// Converts `--default` to the requested type. A default that does not fit is
/// reported and dropped, so the neutral default applies.
fn typed_default<T: FromValue>(fallback: Option<&ContextValue>, target: Target) -> Option<T> {
    let value = fallback?;
    let out = T::from_value(value);
    if out.is_none() {
        warn!(default = %value, found = %value.kind(), target = ?target, "--default does not fit the requested type; ignoring it");
    }
    out
}

fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
