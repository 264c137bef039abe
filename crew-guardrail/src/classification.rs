//! The classification shape and its tolerant normalization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A yes/no category answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    /// The category applies to the text.
    Yes,
    /// The category does not apply.
    No,
}

/// The final allow/block verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The text may proceed.
    Allow,
    /// The text must be blocked.
    Block,
}

/// A normalized safety classification: four categories, a verdict, and a
/// rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Toxic language.
    pub toxicity: YesNo,
    /// Attempted prompt injection.
    pub prompt_injection: YesNo,
    /// Personally identifying information other than a name.
    pub pii_except_name: YesNo,
    /// Violent content.
    pub violence: YesNo,
    /// The final verdict.
    pub verdict: Verdict,
    /// The model's short justification.
    pub rationale: String,
}

const CATEGORY_KEYS: [&str; 4] =
    ["toxicity", "prompt_injection", "pii_except_name", "violence"];

/// Map a raw key to its canonical form: lowercase, then (if still unknown)
/// stripped of everything but ASCII alphanumerics. Accepts the spellings
/// models actually produce: `Prompt Injection`, `prompt_injection`,
/// `PII (except name)`, `pii`, and so on.
fn canonical_key(raw: &str) -> Option<&'static str> {
    let lowered = raw.trim().to_ascii_lowercase();
    let stripped: String = lowered.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    match stripped.as_str() {
        "toxicity" => Some("toxicity"),
        "promptinjection" => Some("prompt_injection"),
        "piiexceptname" | "pii" => Some("pii_except_name"),
        "violence" => Some("violence"),
        "verdict" => Some("verdict"),
        "rationale" => Some("rationale"),
        _ => None,
    }
}

fn coerce_yes_no(key: &str, value: &Value) -> Result<YesNo, String> {
    match value {
        Value::Bool(b) => Ok(if *b { YesNo::Yes } else { YesNo::No }),
        Value::Number(n) => {
            let truthy = n.as_f64().is_some_and(|f| f != 0.0);
            Ok(if truthy { YesNo::Yes } else { YesNo::No })
        }
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Ok(YesNo::Yes),
            "no" | "false" => Ok(YesNo::No),
            other => Err(format!("invalid value for {key}: {other:?}")),
        },
        other => Err(format!("invalid value for {key}: {other}")),
    }
}

fn coerce_verdict(value: &Value) -> Result<Verdict, String> {
    match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Verdict::Allow),
            "block" => Ok(Verdict::Block),
            other => Err(format!("invalid verdict: {other:?}")),
        },
        other => Err(format!("invalid verdict type: {other}")),
    }
}

impl Classification {
    /// Validate and normalize a parsed JSON object into a classification.
    ///
    /// Unknown keys are ignored; all six required fields must be present
    /// under some recognized spelling. Returns a human-readable reason on
    /// rejection.
    pub fn from_value(parsed: &Value) -> Result<Self, String> {
        let object = parsed.as_object().ok_or_else(|| "not a JSON object".to_string())?;

        let mut found: HashMap<&'static str, &Value> = HashMap::new();
        for (key, value) in object {
            if let Some(canon) = canonical_key(key) {
                found.entry(canon).or_insert(value);
            }
        }

        let mut missing: Vec<&str> = Vec::new();
        for required in CATEGORY_KEYS.into_iter().chain(["verdict", "rationale"]) {
            if !found.contains_key(required) {
                missing.push(required);
            }
        }
        if !missing.is_empty() {
            return Err(format!("missing keys: {missing:?}"));
        }

        let rationale = match found["rationale"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        Ok(Self {
            toxicity: coerce_yes_no("toxicity", found["toxicity"])?,
            prompt_injection: coerce_yes_no("prompt_injection", found["prompt_injection"])?,
            pii_except_name: coerce_yes_no("pii_except_name", found["pii_except_name"])?,
            violence: coerce_yes_no("violence", found["violence"])?,
            verdict: coerce_verdict(found["verdict"])?,
            rationale,
        })
    }
}
