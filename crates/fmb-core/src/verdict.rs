use serde::{Deserialize, Serialize};

/// Three-way verdict for one feedback message.
///
/// Wire labels are the native-language ones the classification service is
/// instructed to answer with (see [`crate::rubric`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "POSITIVO")]
    Positive,
    #[serde(rename = "POSSO_PERDER_CLIENTE")]
    CustomerRisk,
    #[serde(rename = "NEGATIVO")]
    Negative,
}

impl Classification {
    /// Wire label, also used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "POSITIVO",
            Self::CustomerRisk => "POSSO_PERDER_CLIENTE",
            Self::Negative => "NEGATIVO",
        }
    }

    /// Severity glyph used in overseer reports.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Positive => "🟢",
            Self::CustomerRisk => "🟡",
            Self::Negative => "🔴",
        }
    }

    pub fn is_punitive(self) -> bool {
        !matches!(self, Self::Positive)
    }
}

/// Classifier output for a single [`crate::domain::FeedbackEvent`].
///
/// Produced exactly once per event and discarded after the event is acted on.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub classification: Classification,
    pub rationale: String,
    pub confidence: f64,
}

impl Verdict {
    /// Fail-open verdict for classifier transport/auth failures: infrastructure
    /// problems must never trigger punitive action.
    pub fn fail_open(error_text: impl Into<String>) -> Self {
        Self {
            classification: Classification::Positive,
            rationale: error_text.into(),
            confidence: 0.0,
        }
    }
}

/// Confidence assigned when the structured response could not be parsed and
/// the verdict came from the keyword scan instead.
pub const FALLBACK_CONFIDENCE: f64 = 0.7;

#[derive(Deserialize)]
struct WireVerdict {
    classificacao: Classification,
    #[serde(default = "default_rationale")]
    motivo: String,
    #[serde(default = "default_confidence")]
    confianca: f64,
}

fn default_rationale() -> String {
    "Sem motivo especificado".to_string()
}

fn default_confidence() -> f64 {
    0.5
}

/// Parse the raw completion text into a [`Verdict`].
///
/// The service is instructed to answer with bare JSON, but models routinely
/// wrap it in code fences or prepend prose. Parsing order:
/// 1. strip ```json fences, parse the structured object;
/// 2. on any parse failure, keyword-scan the raw text (NEGATIVO first, then
///    POSSO_PERDER_CLIENTE, else POSITIVO) at [`FALLBACK_CONFIDENCE`].
pub fn parse_verdict(raw: &str) -> Verdict {
    let candidate = strip_code_fences(raw);

    match serde_json::from_str::<WireVerdict>(candidate.trim()) {
        Ok(wire) => Verdict {
            classification: wire.classificacao,
            rationale: wire.motivo,
            confidence: wire.confianca.clamp(0.0, 1.0),
        },
        Err(_) => keyword_fallback(raw),
    }
}

fn strip_code_fences(raw: &str) -> &str {
    if let Some(rest) = raw.split("```json").nth(1) {
        return rest.split("```").next().unwrap_or(rest);
    }
    if raw.contains("```") {
        if let Some(inner) = raw.split("```").nth(1) {
            return inner;
        }
    }
    raw
}

fn keyword_fallback(raw: &str) -> Verdict {
    let upper = raw.to_uppercase();
    let classification = if upper.contains("NEGATIVO") {
        Classification::Negative
    } else if upper.contains("POSSO_PERDER_CLIENTE") {
        Classification::CustomerRisk
    } else {
        Classification::Positive
    };

    Verdict {
        classification,
        rationale: raw.to_string(),
        confidence: FALLBACK_CONFIDENCE,
    }
}
