//! Derive-schema command handler

use super::utils::{load_session, write_document};
use crate::cli::DeriveSchemaArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use tracing::{info, instrument};

/// Handle the derive-schema command
#[instrument(skip_all, fields(specification = %args.inputs.transformer_specification.display()))]
pub fn handle_derive_schema(args: DeriveSchemaArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::new("derive_schema_command");

    let mut session = load_session(&args.inputs, config.transform.clone())?;
    let schema = session.derive_schema(args.target_id.as_deref(), args.target_name.as_deref())?;
    info!(
        classes = schema.classes.len(),
        enums = schema.enums.len(),
        "Derived target schema"
    );

    write_document(output, args.output.as_deref(), &schema)
}
