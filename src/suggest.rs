use log::{debug, info};

use crate::error::PipelineError;
use crate::model::{IngredientSet, RecipeName};
use crate::providers::{ChatCapability, ChatSlot};

/// Prompt template; `{ingredients}` is replaced with a comma separated list.
///
/// Loaded from `suggest_prompt.txt` at compile time.
pub const SUGGESTION_PROMPT: &str = include_str!("suggest_prompt.txt");

/// Build the prompt asking for dishes made only from `ingredients`.
pub fn build_suggestion_prompt(ingredients: &IngredientSet) -> String {
    let list = ingredients
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    SUGGESTION_PROMPT.replace("{ingredients}", &list)
}

/// Split a reply into dish names.
///
/// Lines are kept exactly as returned: no trimming, no filtering of blank
/// lines, no deduplication. Callers should expect blank entries.
pub fn parse_suggestions(content: &str) -> Vec<RecipeName> {
    content.split('\n').map(str::to_string).collect()
}

/// Ask the installed chat capability for dishes.
///
/// Fails with `CapabilityUnavailable` if nothing has been installed into
/// `slot` yet; waiting for readiness is the caller's job.
pub async fn suggest_recipes(
    ingredients: &IngredientSet,
    slot: &ChatSlot,
) -> Result<Vec<RecipeName>, PipelineError> {
    let capability = slot.try_get()?;
    suggest_with(ingredients, capability.as_ref()).await
}

/// Same as [`suggest_recipes`] with an explicit capability.
pub async fn suggest_with(
    ingredients: &IngredientSet,
    capability: &dyn ChatCapability,
) -> Result<Vec<RecipeName>, PipelineError> {
    if ingredients.is_empty() {
        return Ok(Vec::new());
    }

    let prompt = build_suggestion_prompt(ingredients);
    let reply = capability
        .chat(&prompt)
        .await
        .map_err(|e| PipelineError::Chat(format!("{}: {}", capability.provider_name(), e)))?;

    let recipes = parse_suggestions(reply.content());
    debug!("{} output: {:?}", capability.provider_name(), recipes);
    info!("Received {} recipe line(s)", recipes.len());
    Ok(recipes)
}
