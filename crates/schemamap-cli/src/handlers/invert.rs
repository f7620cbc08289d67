//! Invert command handler

use super::utils::{load_session, write_document};
use crate::cli::InvertArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use tracing::{info, instrument};

/// Handle the invert command
#[instrument(skip_all, fields(specification = %args.inputs.transformer_specification.display(), strict = args.strict))]
pub fn handle_invert(args: InvertArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::new("invert_command");

    let mut session = load_session(&args.inputs, config.transform.clone())?;
    let derived = session.derived_specification()?.class_derivations.len();
    let inverted = session.invert(args.strict)?;
    if inverted.class_derivations.len() < derived {
        output.warning(&format!(
            "{} of {} class derivations could not be inverted",
            derived - inverted.class_derivations.len(),
            derived
        ))?;
    }
    info!(classes = inverted.class_derivations.len(), "Inverted specification");

    write_document(output, args.output.as_deref(), &inverted.to_value()?)
}
