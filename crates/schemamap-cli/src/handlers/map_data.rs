//! Map-data command handler

use super::utils::{load_session, read_document, write_document};
use crate::cli::MapDataArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use schemamap_core::Session;
use schemamap_schemas::SchemaLoader;
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Handle the map-data command
#[instrument(skip_all, fields(input = %args.input.display(), reverse = args.reverse))]
pub fn handle_map_data(args: MapDataArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("map_data_command", &format!("input: {}", args.input.display()));

    let options = config.transformer_options(&args.transform);
    debug!(?options, "Transformer options");
    let mut session = load_session(&args.inputs, options)?;
    if let Some(path) = &args.target_schema {
        session.set_target_schema(SchemaLoader::new().load_schema(path)?);
    }

    let document = read_document(&args.input)?;
    if args.index {
        let container = args
            .source_type
            .as_deref()
            .ok_or_else(|| Error::other("--index requires --source-type"))?;
        session.index(&document, container)?;
        info!(container, "Indexed input document");
    }

    let mapped = match (&document, args.each) {
        (Value::Array(items), true) => {
            let progress = output.progress_bar(items.len() as u64, "Mapping objects");
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(map_one(&mut session, &args, item)?);
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
            }
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            info!(count = mapped.len(), "Mapped objects");
            Value::Array(mapped)
        }
        _ => map_one(&mut session, &args, &document)?,
    };

    write_document(output, args.output.as_deref(), &mapped)
}

fn map_one(session: &mut Session, args: &MapDataArgs, obj: &Value) -> Result<Value> {
    let source_type = args.source_type.as_deref();
    let mapped = if args.reverse {
        session.reverse_transform(obj, source_type)?
    } else {
        match args.target_type.as_deref() {
            Some(target_type) => session.transform_to(obj, source_type, target_type)?,
            None => session.transform(obj, source_type)?,
        }
    };
    Ok(mapped)
}
