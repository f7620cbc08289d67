//! Transformer options
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};

/// Options controlling how an object transformer behaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerOptions {
    /// Fall back to the permissive evaluator when an expression leaves the
    /// restricted subset; also enables multi-line `target = ...` blocks
    pub unrestricted_eval: bool,
    /// Fail instead of yielding null for unresolvable dot-paths and
    /// non-invertible derivations
    pub strict: bool,
    /// Coerce slot values to primitive target ranges
    pub coerce_types: bool,
    /// Expand CURIEs for `uri`/`uriorcurie` ranges
    pub expand_curies: bool,
}

impl Default for TransformerOptions {
    fn default() -> Self {
        Self {
            unrestricted_eval: false,
            strict: false,
            coerce_types: true,
            expand_curies: true,
        }
    }
}

impl TransformerOptions {
    pub fn with_unrestricted_eval(mut self, enabled: bool) -> Self {
        self.unrestricted_eval = enabled;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_coerce_types(mut self, enabled: bool) -> Self {
        self.coerce_types = enabled;
        self
    }
}
