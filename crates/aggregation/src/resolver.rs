//! Matching requested variable names against the names a source provides.

use std::path::Path;

use netcdf_parser::is_coordinate_name;
use tracing::info;

use crate::error::{AggregationError, Result};

/// Resolve each requested name to the spelling present in the source.
///
/// A verbatim match always wins. Otherwise the name is compared ignoring
/// case and, when exactly one available name matches, replaced by that
/// name. Coordinate axes never match. Anything left unmatched fails the
/// whole request; the error lists the available names without axes.
pub fn resolve_variables(
    requested: &[String],
    available: &[String],
    file: &Path,
) -> Result<Vec<String>> {
    let candidates: Vec<&String> = available.iter().filter(|a| !is_coordinate_name(a)).collect();
    let mut resolved = Vec::with_capacity(requested.len());
    let mut unresolved = Vec::new();

    for name in requested {
        if candidates.iter().any(|a| *a == name) {
            resolved.push(name.clone());
            continue;
        }

        let lower = name.to_lowercase();
        let mut matches = candidates.iter().filter(|a| a.to_lowercase() == lower);
        match (matches.next(), matches.next()) {
            (Some(found), None) => {
                info!(
                    requested = %name,
                    resolved = %found,
                    file = %file.display(),
                    "Resolved variable name ignoring case"
                );
                resolved.push(found.to_string());
            }
            _ => unresolved.push(name.clone()),
        }
    }

    if unresolved.is_empty() {
        return Ok(resolved);
    }

    Err(AggregationError::Resolution {
        requested: unresolved,
        file: file.display().to_string(),
        available: candidates.into_iter().cloned().collect(),
    })
}
