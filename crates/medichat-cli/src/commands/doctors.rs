use anyhow::Result;
use comfy_table::{Cell, Table};
use medichat_models::{DEFAULT_PERSONA_ID, PERSONAS};
use serde_json::json;

use crate::cli::OutputFormat;

pub fn run(format: OutputFormat) -> Result<()> {
    if format.is_json() {
        let doctors: Vec<_> = PERSONAS
            .iter()
            .map(|persona| {
                json!({
                    "id": persona.id,
                    "name": persona.name,
                    "icon": persona.icon,
                    "default": persona.id == DEFAULT_PERSONA_ID,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&doctors)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "", "Name"]);
    for persona in PERSONAS {
        let name = if persona.id == DEFAULT_PERSONA_ID {
            format!("{} (default)", persona.name)
        } else {
            persona.name.to_string()
        };
        table.add_row(vec![Cell::new(persona.id), Cell::new(persona.icon), Cell::new(name)]);
    }
    println!("{table}");
    Ok(())
}
