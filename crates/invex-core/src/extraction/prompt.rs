//! Chat prompt construction for field extraction.

use std::fmt::Write;

use crate::models::ExtractionSchema;

const SYSTEM_PROMPT: &str =
    "You extract structured JSON data from invoice text using business-aware synonym matching.";

/// A system and user message pair sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Build the extraction prompt for `text` under `schema`.
    pub fn for_extraction(schema: &ExtractionSchema, text: &str) -> Self {
        let mut user = String::from(
            "You are a smart data extraction assistant. Extract the following fields \
             from invoice text and return a valid JSON object.\n\n\
             If any fields are not found or unclear, set their values to null.\n\
             Use synonyms based on business context. Here are common mappings:\n",
        );

        for (alias, canonical) in schema.synonyms() {
            let _ = writeln!(user, "- \"{}\" = \"{}\"", alias, canonical);
        }

        user.push_str("\nRequired fields:\n");
        for field in schema.fields() {
            let _ = writeln!(user, "- \"{}\"", field);
        }

        user.push_str("\nExtract from:\n");
        user.push_str(text);

        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_synonyms_then_fields_then_text() {
        let schema = ExtractionSchema::builder("t")
            .fields(["Invoice#", "Date"])
            .synonym("Invoice No", "Invoice#")
            .build()
            .unwrap();
        let prompt = Prompt::for_extraction(&schema, "Invoice No: INV-001");

        assert_eq!(prompt.system, SYSTEM_PROMPT);

        let synonym = prompt.user.find("- \"Invoice No\" = \"Invoice#\"").unwrap();
        let field = prompt.user.find("- \"Date\"").unwrap();
        let text = prompt.user.find("Extract from:\nInvoice No: INV-001").unwrap();
        assert!(synonym < field && field < text);
        assert!(prompt.user.ends_with("INV-001"));
    }

    #[test]
    fn test_prompt_without_synonyms() {
        let schema = ExtractionSchema::builder("t").field("Total").build().unwrap();
        let prompt = Prompt::for_extraction(&schema, "Total 5");
        assert!(prompt.user.contains("mappings:\n\nRequired fields:\n- \"Total\"\n"));
    }
}
