//! Formula entry points
//!
//! Each spreadsheet function (`AI.CHAT`, `AI.SUMMARIZE`, ...) is a variant of
//! [`Formula`]. Preparing a formula validates its arguments and produces the
//! backend-independent [`GenerationRequest`] to send to the model.

use crate::types::{GenerationRequest, Range, DEFAULT_TEMPERATURE};
use std::str::FromStr;
use thiserror::Error;

/// Argument validation failures, displayed as cell text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("Error: No prompt provided")]
    NoPrompt,

    #[error("Error: No text provided")]
    NoText,

    #[error("Error: No target language specified")]
    NoLanguage,

    #[error("Error: No data provided")]
    NoData,

    #[error("Error: No question provided")]
    NoQuestion,

    #[error("Error: No description provided")]
    NoDescription,
}

/// Summary flavour for `AI.SUMMARIZE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryStyle {
    #[default]
    Brief,
    Detailed,
    Bullet,
}

impl FromStr for SummaryStyle {
    type Err = std::convert::Infallible;

    /// Unrecognised styles fall back to brief
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "detailed" => SummaryStyle::Detailed,
            "bullet" => SummaryStyle::Bullet,
            _ => SummaryStyle::Brief,
        })
    }
}

/// One invocation of a formula function
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    Chat {
        prompt: String,
        model: Option<String>,
        temperature: Option<f64>,
    },
    Summarize {
        text: String,
        model: Option<String>,
        style: SummaryStyle,
    },
    Translate {
        text: String,
        language: String,
        model: Option<String>,
        formal: bool,
    },
    Analyze {
        data: Range,
        question: String,
        model: Option<String>,
    },
    Sentiment {
        text: String,
        model: Option<String>,
        detailed: bool,
    },
    Code {
        description: String,
        language: Option<String>,
        model: Option<String>,
    },
}

impl Formula {
    /// Spreadsheet-facing function name
    pub fn name(&self) -> &'static str {
        match self {
            Formula::Chat { .. } => "AI.CHAT",
            Formula::Summarize { .. } => "AI.SUMMARIZE",
            Formula::Translate { .. } => "AI.TRANSLATE",
            Formula::Analyze { .. } => "AI.ANALYZE",
            Formula::Sentiment { .. } => "AI.SENTIMENT",
            Formula::Code { .. } => "AI.CODE",
        }
    }

    /// Validate arguments and build the generation request
    pub fn prepare(&self, default_model: &str) -> Result<GenerationRequest, FormulaError> {
        match self {
            Formula::Chat {
                prompt,
                model,
                temperature,
            } => {
                require(prompt, FormulaError::NoPrompt)?;
                Ok(GenerationRequest::new(
                    prompt.as_str(),
                    pick(model, default_model),
                    temperature.unwrap_or(DEFAULT_TEMPERATURE),
                ))
            }

            Formula::Summarize { text, model, style } => {
                require(text, FormulaError::NoText)?;
                let prompt = match style {
                    SummaryStyle::Detailed => format!(
                        "Please provide a detailed summary of the following text, highlighting key points:\n\n{}",
                        text
                    ),
                    SummaryStyle::Bullet => format!(
                        "Please summarize the following text as bullet points:\n\n{}",
                        text
                    ),
                    SummaryStyle::Brief => format!(
                        "Please provide a brief summary of the following text:\n\n{}",
                        text
                    ),
                };
                Ok(GenerationRequest::new(prompt, pick(model, default_model), 0.5))
            }

            Formula::Translate {
                text,
                language,
                model,
                formal,
            } => {
                require(text, FormulaError::NoText)?;
                require(language, FormulaError::NoLanguage)?;
                let tone = if *formal { "formal" } else { "natural" };
                let prompt = format!(
                    "Translate the following text to {} using a {} tone. Only return the translation:\n\n{}",
                    language.trim(),
                    tone,
                    text
                );
                Ok(GenerationRequest::new(prompt, pick(model, default_model), 0.3))
            }

            Formula::Analyze {
                data,
                question,
                model,
            } => {
                if data.is_empty() {
                    return Err(FormulaError::NoData);
                }
                require(question, FormulaError::NoQuestion)?;
                let prompt = format!(
                    "Data to analyze:\n{}\n\nQuestion: {}\n\nPlease analyze this data and answer the question with specific references to the data.",
                    data.to_prompt_text(),
                    question
                );
                Ok(GenerationRequest::new(prompt, pick(model, default_model), 0.4))
            }

            Formula::Sentiment {
                text,
                model,
                detailed,
            } => {
                require(text, FormulaError::NoText)?;
                let prompt = if *detailed {
                    format!(
                        "Analyze the sentiment of the following text and provide a detailed explanation with confidence scores:\n\n{}",
                        text
                    )
                } else {
                    format!(
                        "Analyze the sentiment of the following text. Return only: Positive, Negative, or Neutral:\n\n{}",
                        text
                    )
                };
                Ok(GenerationRequest::new(prompt, pick(model, default_model), 0.2))
            }

            Formula::Code {
                description,
                language,
                model,
            } => {
                require(description, FormulaError::NoDescription)?;
                let prompt = format!(
                    "Generate {} code for: {}\n\nOnly return the code, no explanations unless specifically requested.",
                    pick(language, "excel"),
                    description
                );
                Ok(GenerationRequest::new(prompt, pick(model, default_model), 0.3))
            }
        }
    }
}

fn require(value: &str, err: FormulaError) -> Result<(), FormulaError> {
    if value.trim().is_empty() {
        Err(err)
    } else {
        Ok(())
    }
}

/// Optional argument, or the fallback when missing or blank
fn pick<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

/// Function guide shown by the help command
pub fn help_text() -> &'static str {
    r#"Local AI Functions:

AI.CHAT(prompt, [model], [temperature])
  General AI conversation and responses

AI.SUMMARIZE(text, [model], [style])
  Summarize text (style: brief, detailed, bullet)

AI.TRANSLATE(text, language, [model], [formal])
  Translate to any language

AI.ANALYZE(data_range, question, [model])
  Analyze tabular data and answer questions

AI.SENTIMENT(text, [model], [detailed])
  Analyze text sentiment

AI.CODE(description, [language], [model])
  Generate code or spreadsheet formulas

Every call runs off the calling thread, so the host stays responsive.
Configure the AI service with `localai config set`."#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    #[test]
    fn test_chat_uses_defaults() {
        let formula = Formula::Chat {
            prompt: "Hello".to_string(),
            model: None,
            temperature: None,
        };
        let request = formula.prepare("llama3").unwrap();
        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.model, "llama3");
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let formula = Formula::Chat {
            prompt: "   ".to_string(),
            model: None,
            temperature: None,
        };
        let err = formula.prepare("llama3").unwrap_err();
        assert_eq!(err.to_string(), "Error: No prompt provided");
    }

    #[test]
    fn test_blank_model_falls_back() {
        let formula = Formula::Sentiment {
            text: "great".to_string(),
            model: Some(" ".to_string()),
            detailed: false,
        };
        let request = formula.prepare("mistral").unwrap();
        assert_eq!(request.model, "mistral");
        assert_eq!(request.temperature, 0.2);
        assert!(request.prompt.contains("Return only: Positive, Negative, or Neutral"));
    }

    #[test]
    fn test_summary_styles() {
        assert_eq!("BULLET".parse::<SummaryStyle>().unwrap(), SummaryStyle::Bullet);
        assert_eq!("fancy".parse::<SummaryStyle>().unwrap(), SummaryStyle::Brief);

        let formula = Formula::Summarize {
            text: "Long text".to_string(),
            model: Some("phi3".to_string()),
            style: SummaryStyle::Detailed,
        };
        let request = formula.prepare("llama3").unwrap();
        assert_eq!(request.model, "phi3");
        assert_eq!(request.temperature, 0.5);
        assert!(request.prompt.starts_with("Please provide a detailed summary"));
        assert!(request.prompt.ends_with("\n\nLong text"));
    }

    #[test]
    fn test_translate_requires_language() {
        let formula = Formula::Translate {
            text: "Hello".to_string(),
            language: String::new(),
            model: None,
            formal: false,
        };
        assert_eq!(formula.prepare("llama3"), Err(FormulaError::NoLanguage));
    }

    #[test]
    fn test_translate_formal_tone() {
        let formula = Formula::Translate {
            text: "Hello".to_string(),
            language: "German".to_string(),
            model: None,
            formal: true,
        };
        let request = formula.prepare("llama3").unwrap();
        assert_eq!(
            request.prompt,
            "Translate the following text to German using a formal tone. Only return the translation:\n\nHello"
        );
        assert_eq!(request.temperature, 0.3);
    }

    #[test]
    fn test_analyze_validation_order() {
        let empty = Formula::Analyze {
            data: Range::default(),
            question: String::new(),
            model: None,
        };
        assert_eq!(empty.prepare("llama3"), Err(FormulaError::NoData));

        let no_question = Formula::Analyze {
            data: Range::new(vec![vec![CellValue::Number(1.0)]]),
            question: " ".to_string(),
            model: None,
        };
        assert_eq!(no_question.prepare("llama3"), Err(FormulaError::NoQuestion));
    }

    #[test]
    fn test_analyze_prompt_embeds_range() {
        let formula = Formula::Analyze {
            data: Range::from_delimited("Region,Sales\nNorth,120", ','),
            question: "Which region sold most?".to_string(),
            model: None,
        };
        let request = formula.prepare("llama3").unwrap();
        assert!(request
            .prompt
            .starts_with("Data to analyze:\nHeaders: Region, Sales\nData rows:\nRow 1: North, 120\n"));
        assert!(request.prompt.contains("\n\nQuestion: Which region sold most?\n\n"));
        assert_eq!(request.temperature, 0.4);
    }

    #[test]
    fn test_code_defaults_to_excel() {
        let formula = Formula::Code {
            description: "sum column A".to_string(),
            language: None,
            model: None,
        };
        let request = formula.prepare("llama3").unwrap();
        assert!(request.prompt.starts_with("Generate excel code for: sum column A"));
        assert_eq!(formula.name(), "AI.CODE");
    }
}
