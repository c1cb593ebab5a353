//! Recipe workflow: ingredients in, formatted German recipe out.

use super::orchestrator::WorkflowPlan;
use super::steps::{CredentialCheck, ModelInvoke, PromptStyle, StatusStep};
use super::{EventSink, StepContext, StepOutcome, WorkflowStep};
use crate::client::ModelClient;
use crate::config::Settings;
use crate::structured::ResponseSchema;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

pub const WORKFLOW_NAME: &str = "recipe";

pub const EMPTY_INPUT_MESSAGE: &str =
    "❌ **Fehler:** Bitte geben Sie Ihre verfügbaren Zutaten ein (z.B. 'Nudeln, Tomaten, Käse').";
pub const FAILURE_PREFIX: &str = "❌ **Fehler bei der Rezepterstellung:**";
pub const COMPLETION_MESSAGE: &str = "✅ Rezept fertig! Guten Appetit! 🍽️";

const DEFAULT_TEMPERATURE: f64 = 0.3;

const PROMPT_TEMPLATE: &str = r#"Du bist ein erfahrener Koch und Rezeptentwickler. Du musst ALLE Felder der Antwort ausfüllen!

VERFÜGBARE ZUTATEN:
{input}

Erstelle ein vollständiges Rezept mit ALLEN folgenden Feldern:

1. RECIPE_NAME: Ein kreativer, appetitlicher Name für das Gericht
2. DESCRIPTION: 1-2 Sätze die das Gericht beschreiben und appetitlich machen
3. COOKING_TIME: Realistische Zubereitungszeit (z.B. "25 Minuten", "1 Stunde 15 Minuten")
4. DIFFICULTY: Genau einer dieser Werte: "Einfach", "Mittel", "Schwer"
5. INGREDIENTS: Liste mit MINDESTENS 5-8 Zutaten mit exakten Mengenangaben
6. INSTRUCTIONS: Liste mit MINDESTENS 5-7 detaillierten Zubereitungsschritten
7. TIPS: Liste mit MINDESTENS 3-4 hilfreichen Kochtipps oder Variationen
8. NUTRITIONAL_INFO: Nährwertangaben und Besonderheiten (ca. 1-2 Sätze)

WICHTIGE REGELN:
- Nutze hauptsächlich die verfügbaren Zutaten
- Ergänze Standard-Zutaten (Salz, Pfeffer, Öl) falls nötig
- Alle Mengenangaben müssen realistisch sein
- Jeder Schritt muss klar und verständlich sein
- Antworte komplett auf Deutsch
- FÜLLE ALLE FELDER AUS - keines darf leer bleiben!

Erstelle jetzt das vollständige Rezept:"#;

/// Strukturiertes Rezept basierend auf verfügbaren Zutaten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    /// Name des vorgeschlagenen Gerichts
    pub recipe_name: String,
    /// Kurze Beschreibung des Gerichts (1-2 Sätze)
    pub description: String,
    /// Zubereitungszeit (z.B. '30 Minuten')
    pub cooking_time: String,
    /// Schwierigkeitsgrad: Einfach, Mittel oder Schwer
    pub difficulty: String,
    /// Vollständige Zutatenliste mit Mengenangaben
    pub ingredients: Vec<String>,
    /// Schritt-für-Schritt Kochanleitung
    pub instructions: Vec<String>,
    /// Hilfreiche Kochtipps und Variationen
    pub tips: Vec<String>,
    /// Kurze Nährwertangaben (Kalorien, besondere Eigenschaften)
    pub nutritional_info: String,
}

pub fn difficulty_marker(difficulty: &str) -> &'static str {
    match difficulty {
        "Einfach" => "🟢",
        "Mittel" => "🟡",
        "Schwer" => "🔴",
        _ => "⚪",
    }
}

/// Render a recipe as Markdown.
pub fn format_recipe_markdown(recipe: &Recipe) -> String {
    let mut md = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(md, "# 🍳 {}\n", recipe.recipe_name);
    let _ = writeln!(md, "## 📝 Beschreibung\n{}\n", recipe.description);
    let _ = writeln!(md, "## ⏱️ Details");
    let _ = writeln!(md, "- **Zubereitungszeit:** {}", recipe.cooking_time);
    let _ = writeln!(
        md,
        "- **Schwierigkeit:** {} {}\n",
        difficulty_marker(&recipe.difficulty),
        recipe.difficulty
    );

    let _ = writeln!(md, "## 🛒 Zutaten");
    for ingredient in &recipe.ingredients {
        let _ = writeln!(md, "- {}", ingredient);
    }

    let _ = writeln!(md, "\n## 👨‍🍳 Zubereitung");
    for (i, step) in recipe.instructions.iter().enumerate() {
        let _ = writeln!(md, "{}. {}", i + 1, step);
    }

    let _ = writeln!(md, "\n## 💡 Kochtipps");
    for tip in &recipe.tips {
        let _ = writeln!(md, "- 💡 {}", tip);
    }

    let _ = writeln!(md, "\n## 🥗 Nährwerte\n{}\n", recipe.nutritional_info);
    md.push_str("---\n*Guten Appetit! 🍽️ Rezept erstellt von Ihrem KI-Kochassistenten* 🤖\n");
    md
}

/// Turns the structured model output into one Markdown `TextChunk`.
pub struct RecipeFormatter;

#[async_trait]
impl WorkflowStep for RecipeFormatter {
    fn name(&self) -> &str {
        "recipe_formatter"
    }

    async fn execute(&self, ctx: &mut StepContext, events: &EventSink) -> Result<StepOutcome> {
        let value = ctx.structured().cloned().ok_or_else(|| {
            Error::backend_with_context(
                "model returned no recipe",
                ErrorContext::new().with_source("recipe_formatter"),
            )
        })?;
        let recipe: Recipe = serde_json::from_value(value).map_err(|e| {
            Error::backend_with_context(
                "model returned an incomplete recipe",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("recipe_formatter"),
            )
        })?;
        tracing::info!(recipe = %recipe.recipe_name, difficulty = %recipe.difficulty, "recipe generated");

        events.status("formatting", "📝 Formatiere Rezept...").await?;
        events.text(format_recipe_markdown(&recipe)).await?;
        Ok(StepOutcome::Continue)
    }
}

pub fn recipe_workflow(client: Arc<dyn ModelClient>, settings: &Settings) -> WorkflowPlan {
    let model = ModelInvoke::new(
        Arc::clone(&client),
        &settings.llm.recipe_model,
        PromptStyle::Template {
            template: PROMPT_TEMPLATE.to_string(),
        },
    )
    .response_schema(ResponseSchema::for_type::<Recipe>("recipe"))
    .default_temperature(DEFAULT_TEMPERATURE)
    .timeout(settings.limits.model_timeout())
    .announce("developing", "👨‍🍳 Entwickle Rezept...");

    WorkflowPlan::new(WORKFLOW_NAME, Arc::new(model))
        .empty_input_message(EMPTY_INPUT_MESSAGE)
        .failure_prefix(FAILURE_PREFIX)
        .completion_message(COMPLETION_MESSAGE)
        .preflight(Arc::new(CredentialCheck::model(client)))
        .preflight(Arc::new(StatusStep::new("starting", "🍳 Starte Kochassistent...")))
        .formatter(Arc::new(RecipeFormatter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pasta() -> Recipe {
        Recipe {
            recipe_name: "Cremige Tomaten-Pasta".into(),
            description: "Schnell und lecker.".into(),
            cooking_time: "20 Minuten".into(),
            difficulty: "Einfach".into(),
            ingredients: vec!["250g Nudeln".into(), "400g Tomaten".into()],
            instructions: vec!["Nudeln kochen".into(), "Soße zubereiten".into()],
            tips: vec!["Al dente kochen".into()],
            nutritional_info: "Ca. 450 kcal".into(),
        }
    }

    #[test]
    fn test_markdown_layout() {
        let md = format_recipe_markdown(&pasta());
        assert!(md.starts_with("# 🍳 Cremige Tomaten-Pasta\n\n## 📝 Beschreibung\nSchnell und lecker.\n"));
        assert!(md.contains("- **Schwierigkeit:** 🟢 Einfach\n"));
        assert!(md.contains("## 🛒 Zutaten\n- 250g Nudeln\n- 400g Tomaten\n"));
        assert!(md.contains("1. Nudeln kochen\n2. Soße zubereiten\n"));
        assert!(md.contains("- 💡 Al dente kochen\n"));
        assert!(md.contains("## 🥗 Nährwerte\nCa. 450 kcal\n"));
        assert!(md.ends_with("KI-Kochassistenten* 🤖\n"));
    }

    #[test]
    fn test_difficulty_markers() {
        assert_eq!(difficulty_marker("Mittel"), "🟡");
        assert_eq!(difficulty_marker("Schwer"), "🔴");
        assert_eq!(difficulty_marker("Profi"), "⚪");
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = ResponseSchema::for_type::<Recipe>("recipe").schema;
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 8);
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
        assert_eq!(
            schema["properties"]["difficulty"]["description"],
            "Schwierigkeitsgrad: Einfach, Mittel oder Schwer"
        );
    }

    #[test]
    fn test_prompt_has_input_placeholder() {
        assert_eq!(PROMPT_TEMPLATE.matches("{input}").count(), 1);
    }

    #[tokio::test]
    async fn test_formatter_rejects_incomplete_recipe() {
        let (sink, _rx) = EventSink::channel(4);
        let mut ctx = StepContext::new(crate::types::ChatRequest::new(vec![]));
        ctx.model_response = Some(crate::client::ModelResponse::structured(
            serde_json::json!({"recipe_name": "Halb"}),
        ));
        let err = RecipeFormatter.execute(&mut ctx, &sink).await.unwrap_err();
        assert!(err.to_string().contains("incomplete recipe"));
    }
}
