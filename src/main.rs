use log::info;
use std::env;
use std::process::ExitCode;

use snapdish::controller::GENERIC_ERROR_MESSAGE;
use snapdish::{
    read_asset, AppConfig, ChatSlot, IngredientSet, ProviderFactory, RecipeName, UploadController,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    // Get the image path from command-line arguments
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        let program = args.first().map(String::as_str).unwrap_or("snapdish");
        eprintln!("Usage: {} <image-path>", program);
        return ExitCode::from(2);
    };

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // The chat back-end comes up in the background while the image is
    // preprocessed and segmented
    let (installer, slot) = ChatSlot::pending();
    let chat_config = config.chat.clone();
    tokio::spawn(async move {
        ProviderFactory::install_default(&chat_config, installer);
    });

    let controller = match UploadController::builder().config(&config).chat(slot).build() {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let asset = match read_asset(path).await {
        Ok(asset) => asset,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    match controller.handle_upload(asset).await {
        Ok(report) => {
            info!("Upload #{} finished", report.sequence);
            print!("{}", success_output(&report.ingredients, &report.recipes));
            ExitCode::SUCCESS
        }
        Err(_) => {
            // Cause already logged by the controller
            print!("{}", ingredients_output(&controller.snapshot().ingredients));
            eprintln!("{}", GENERIC_ERROR_MESSAGE);
            ExitCode::FAILURE
        }
    }
}

fn success_output(ingredients: &IngredientSet, recipes: &[RecipeName]) -> String {
    if ingredients.is_empty() {
        return "No ingredients detected.\n".to_string();
    }

    let mut out = ingredients_output(ingredients);
    out.push_str("Recipe Suggestions:\n");
    for recipe in recipes {
        out.push_str(&format!("  - {}\n", recipe));
    }
    out
}

/// Ingredient list, or nothing when none were detected. A failed suggestion
/// step still shows what segmentation found.
fn ingredients_output(ingredients: &IngredientSet) -> String {
    if ingredients.is_empty() {
        return String::new();
    }

    let mut out = String::from("Detected Ingredients:\n");
    for ingredient in ingredients {
        out.push_str(&format!("  - {}\n", ingredient));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapdish::UploadView;

    #[test]
    fn test_success_lists_ingredients_then_recipes() {
        let ingredients: IngredientSet = ["egg", "milk"].into_iter().collect();
        let recipes = vec!["Omelette".to_string(), "Custard".to_string()];
        assert_eq!(
            success_output(&ingredients, &recipes),
            "Detected Ingredients:\n  - egg\n  - milk\n\nRecipe Suggestions:\n  - Omelette\n  - Custard\n"
        );
    }

    #[test]
    fn test_success_without_ingredients() {
        assert_eq!(
            success_output(&IngredientSet::default(), &[]),
            "No ingredients detected.\n"
        );
    }

    #[test]
    fn test_failed_upload_still_shows_detected_ingredients() {
        let view = UploadView {
            ingredients: ["banana"].into_iter().collect(),
            error: Some(GENERIC_ERROR_MESSAGE.to_string()),
            ..Default::default()
        };
        assert_eq!(
            ingredients_output(&view.ingredients),
            "Detected Ingredients:\n  - banana\n\n"
        );
    }

    #[test]
    fn test_failed_upload_without_ingredients_prints_nothing() {
        assert_eq!(ingredients_output(&UploadView::default().ingredients), "");
    }
}
