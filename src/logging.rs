use std::fs::File;
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Env, Target};
use log::kv::{self, Key, Value, VisitSource};
use log::Record;

use crate::error::{Result, TestLensError};

struct Fields<'a>(&'a mut String);

impl<'kvs> VisitSource<'kvs> for Fields<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> std::result::Result<(), kv::Error> {
        self.0.push_str(&format!(" {key}={value}"));
        Ok(())
    }
}

/// Renders the structured fields of a record as ` key=value` pairs.
fn format_fields(record: &Record) -> String {
    let mut fields = String::new();
    // A failing visitor only truncates the field list
    let _ = record.key_values().visit(&mut Fields(&mut fields));
    fields
}

/// Initialise `env_logger` from `RUST_LOG` (default `info`), optionally
/// writing to a file instead of stderr.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} {}{}",
            buf.timestamp_seconds(),
            record.level(),
            record.args(),
            format_fields(record)
        )
    });

    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|e| TestLensError::Config(format!("Failed to initialise logging: {e}")))
}
