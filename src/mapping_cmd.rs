use anyhow::{Context, Result, bail};

use crate::{
    cli::{MappingArgs, MappingCommand, MappingSaveArgs},
    mapping::Mapping,
    session::Session,
    store::{MappingStore, StoreError},
    table::Table,
};

pub fn execute(session: &Session, args: &MappingArgs) -> Result<()> {
    let mut store = session.mapping_store();
    match &args.command {
        MappingCommand::Save(save) => save_mapping(session, &mut store, save),
        MappingCommand::List => {
            let entries = store.list()?;
            let mut table = Table::new(["id", "name", "schema", "fields"]);
            for entry in &entries {
                table.push_row([
                    entry.id.clone(),
                    entry.name.clone(),
                    format!("{} v{}", entry.schema_name, entry.schema_version),
                    entry.mapping.len().to_string(),
                ]);
            }
            table.print();
            Ok(())
        }
        MappingCommand::Show(show) => {
            let saved = store.get(&show.id)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&saved).context("Serializing mapping")?
            );
            Ok(())
        }
    }
}

fn save_mapping(
    session: &Session,
    store: &mut impl MappingStore,
    args: &MappingSaveArgs,
) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        bail!("Mapping name cannot be empty");
    }
    let mapping = Mapping::from_pairs(&args.map)?;
    session.warn_unknown_fields(&mapping);
    let saved = match store.save(name, mapping) {
        Ok(saved) => saved,
        Err(err @ StoreError::DuplicateName(_)) => bail!("Conflict: {err}"),
        Err(err) => return Err(err.into()),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&saved).context("Serializing saved mapping")?
    );
    Ok(())
}
