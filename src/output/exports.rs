use anyhow::Result;
use std::io::Write;

use crate::records::Dataset;

/// Writes the dataset as a JSON list of category groupings.
///
/// Each element is `{"<category>": [records...], "summary": {...}}`, in
/// catalog order. Categories without results are not part of the list.
pub fn export_dataset(dataset: &Dataset, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(&dataset.categories)?
    } else {
        serde_json::to_string(&dataset.categories)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

/// Writes the disabled test names as a sorted JSON array.
pub fn export_disabled_tests(dataset: &Dataset, output: &mut dyn Write) -> Result<()> {
    let json = serde_json::to_string_pretty(&dataset.disabled_tests)?;
    writeln!(output, "{json}")?;
    Ok(())
}
