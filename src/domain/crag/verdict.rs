//! Structured verdicts returned by the judgment capability

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::judgment::Verdict;

/// Portuguese yes/no answer used by the relevance and grounding schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BinaryScore {
    Sim,
    Nao,
}

impl BinaryScore {
    pub fn is_yes(&self) -> bool {
        matches!(self, Self::Sim)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sim => "sim",
            Self::Nao => "nao",
        }
    }
}

impl TryFrom<String> for BinaryScore {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "sim" => Ok(Self::Sim),
            "nao" | "não" => Ok(Self::Nao),
            other => Err(format!("expected 'sim' or 'nao', got '{}'", other)),
        }
    }
}

impl From<BinaryScore> for String {
    fn from(score: BinaryScore) -> Self {
        score.as_str().to_string()
    }
}

impl fmt::Display for BinaryScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn binary_score_schema(description: &str) -> serde_json::Value {
    json!({
        "type": "string",
        "enum": ["sim", "nao"],
        "description": description
    })
}

/// Per-passage relevance judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelevanceVerdict {
    pub binary_score: BinaryScore,
}

impl Verdict for RelevanceVerdict {
    const NAME: &'static str = "relevance_verdict";

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "binary_score": binary_score_schema("Documento é relevante para a pergunta? 'sim' ou 'nao'")
            },
            "required": ["binary_score"],
            "additionalProperties": false
        })
    }
}

/// Input guardrail judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardrailVerdict {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
}

impl Verdict for GuardrailVerdict {
    const NAME: &'static str = "guardrail_verdict";

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "is_valid": {
                    "type": "boolean",
                    "description": "A pergunta é válida para Dom Casmurro?"
                },
                "reason": {
                    "type": "string",
                    "description": "Razão pela qual a pergunta foi rejeitada (se aplicável)"
                }
            },
            "required": ["is_valid", "reason"],
            "additionalProperties": false
        })
    }
}

/// Grounding judgment; `sim` means every claim is supported by the passages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroundingVerdict {
    pub binary_score: BinaryScore,
    #[serde(default)]
    pub reason: String,
}

impl Verdict for GroundingVerdict {
    const NAME: &'static str = "grounding_verdict";

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "binary_score": binary_score_schema("A resposta está fundamentada nos trechos? 'sim' ou 'nao'"),
                "reason": {
                    "type": "string",
                    "description": "Fato não suportado pelos trechos, se houver"
                }
            },
            "required": ["binary_score", "reason"],
            "additionalProperties": false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_score_accepts_accents_and_case() {
        let yes: BinaryScore = serde_json::from_value(json!("SIM")).unwrap();
        let no: BinaryScore = serde_json::from_value(json!("Não")).unwrap();

        assert!(yes.is_yes());
        assert!(!no.is_yes());
    }

    #[test]
    fn test_binary_score_rejects_other_values() {
        let result: Result<BinaryScore, _> = serde_json::from_value(json!("talvez"));
        assert!(result.is_err());
    }

    #[test]
    fn test_guardrail_verdict_reason_defaults_to_empty() {
        let verdict: GuardrailVerdict = serde_json::from_value(json!({"is_valid": true})).unwrap();

        assert!(verdict.is_valid);
        assert!(verdict.reason.is_empty());
    }

    #[test]
    fn test_relevance_verdict_rejects_unknown_fields() {
        let result: Result<RelevanceVerdict, _> =
            serde_json::from_value(json!({"binary_score": "sim", "is_valid": true}));
        assert!(result.is_err());
    }

    #[test]
    fn test_schemas_are_closed() {
        for schema in [
            RelevanceVerdict::schema(),
            GuardrailVerdict::schema(),
            GroundingVerdict::schema(),
        ] {
            assert_eq!(schema["additionalProperties"], json!(false));
        }
    }
}
