//! Menu listing.

use forkful_core::CatalogItem;
use forkful_storefront::state::AppState;

use super::CliError;

/// Print the menu, as a table or as YAML.
///
/// # Errors
///
/// Returns `CliError::Render` if the YAML cannot be produced.
#[allow(clippy::print_stdout)]
pub fn list(state: &AppState, yaml: bool) -> Result<(), CliError> {
    if yaml {
        let items: Vec<&CatalogItem> = state.catalog().iter().collect();
        print!("{}", serde_yaml::to_string(&items)?);
        return Ok(());
    }

    for item in state.catalog().iter() {
        println!(
            "{:>4}  {:<32} {:>12}",
            item.id.to_string(),
            item.name,
            item.price.to_string()
        );
        if !item.tags.is_empty() {
            println!("      [{}]", item.tags.join(", "));
        }
        if let Some(description) = &item.description {
            println!("      {description}");
        }
    }
    Ok(())
}
