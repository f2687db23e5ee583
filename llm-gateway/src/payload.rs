//! Request payload builder.
//!
//! Pure: `(model, messages, reasoning, temperature, max tokens, wire) -> JSON`.
//! The fallback layer rebuilds payloads with a different [`TemperatureMode`]
//! or reasoning level instead of editing JSON in place.

use serde_json::{Map, Value, json};

use crate::{
    config::wire::WireFormat,
    messages::{ChatTurn, ContentPart, Role, TurnContent},
    reasoning::{self, ProviderProfile, ReasoningLevel, ReasoningSelection, WireParam},
};

/// Output headroom added on top of a thinking budget.
const THINKING_HEADROOM_TOKENS: u32 = 1024;

/// How the sampling temperature is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TemperatureMode {
    /// Use the configured value, unless the profile says to drop it.
    #[default]
    AsConfigured,
    /// Never send `temperature`.
    Omit,
    /// Send exactly this value.
    Fixed(f64),
}

/// Inputs for [`build_payload`].
#[derive(Debug, Clone)]
pub struct PayloadRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatTurn],
    pub reasoning: ReasoningSelection,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub wire: WireFormat,
    pub stream: bool,
}

/// A rendered request body plus what went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPayload {
    pub body: Value,
    /// Reasoning level actually expressed in the body (`Default` when none).
    pub applied_level: ReasoningLevel,
    pub has_temperature: bool,
}

/// Builds the JSON body for one request attempt.
pub fn build_payload(req: &PayloadRequest<'_>, mode: TemperatureMode) -> BuiltPayload {
    let profile = reasoning::resolve(req.reasoning.provider, req.model);
    let applied_level = profile.effective_level(req.reasoning.level);
    let param = profile.wire_param(applied_level);

    let temperature = match mode {
        TemperatureMode::Omit => None,
        TemperatureMode::Fixed(v) => Some(v),
        TemperatureMode::AsConfigured if drops_temperature(profile, param) => None,
        TemperatureMode::AsConfigured => req.temperature.map(temperature_value),
    };

    let max_tokens = match param {
        Some(WireParam::ThinkingBudget(budget)) => match req.max_tokens {
            Some(m) if m > budget => Some(m),
            _ => Some(budget + THINKING_HEADROOM_TOKENS),
        },
        _ => req.max_tokens,
    };

    let mut body = Map::new();
    body.insert("model".into(), Value::String(req.model.to_string()));

    match req.wire {
        WireFormat::ChatCompletions => {
            let messages: Vec<Value> = req.messages.iter().map(chat_message).collect();
            body.insert("messages".into(), Value::Array(messages));
            body.insert("stream".into(), Value::Bool(req.stream));
            if let Some(t) = temperature {
                body.insert("temperature".into(), json!(t));
            }
            if let Some(m) = max_tokens {
                let field = if profile.completion_tokens_field {
                    "max_completion_tokens"
                } else {
                    "max_tokens"
                };
                body.insert(field.into(), json!(m));
            }
        }
        WireFormat::Responses => {
            let instructions = req
                .messages
                .iter()
                .filter(|t| t.role == Role::System)
                .map(ChatTurn::text)
                .filter(|t| !t.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");
            let input: Vec<Value> = req
                .messages
                .iter()
                .filter(|t| t.role != Role::System)
                .map(responses_item)
                .collect();
            body.insert("input".into(), Value::Array(input));
            if !instructions.is_empty() {
                body.insert("instructions".into(), Value::String(instructions));
            }
            body.insert("stream".into(), Value::Bool(req.stream));
            if let Some(t) = temperature {
                body.insert("temperature".into(), json!(t));
            }
            if let Some(m) = max_tokens {
                body.insert("max_output_tokens".into(), json!(m));
            }
        }
    }

    if let Some(param) = param {
        apply_reasoning(&mut body, param, req.wire);
    }

    BuiltPayload {
        body: Value::Object(body),
        applied_level,
        has_temperature: temperature.is_some(),
    }
}

/// Reasoning models that reject sampling temperature: the profile flag plus
/// either an explicit reasoning parameter or a model that reasons by default.
fn drops_temperature(profile: &ProviderProfile, param: Option<WireParam>) -> bool {
    profile.omit_temperature
        && (param.is_some()
            || !profile.supports_reasoning
            || profile.default_level != ReasoningLevel::Default)
}

/// `0.7_f32` must serialize as `0.7`, not `0.699999988079071`.
fn temperature_value(t: f32) -> f64 {
    t.to_string().parse::<f64>().unwrap_or(f64::from(t))
}

fn apply_reasoning(body: &mut Map<String, Value>, param: WireParam, wire: WireFormat) {
    match (param, wire) {
        (WireParam::Effort(effort), WireFormat::ChatCompletions) => {
            body.insert("reasoning_effort".into(), json!(effort));
        }
        (WireParam::Effort(effort), WireFormat::Responses) => {
            body.insert(
                "reasoning".into(),
                json!({ "effort": effort, "summary": "auto" }),
            );
        }
        (WireParam::NestedEffort(effort), _) => {
            body.insert("reasoning".into(), json!({ "effort": effort }));
        }
        (WireParam::ThinkingBudget(budget), _) => {
            body.insert(
                "thinking".into(),
                json!({ "type": "enabled", "budget_tokens": budget }),
            );
        }
        (WireParam::EnableThinking(on), _) => {
            body.insert("enable_thinking".into(), json!(on));
        }
        (WireParam::Think(on), _) => {
            body.insert("think".into(), json!(on));
        }
    }
}

fn chat_message(turn: &ChatTurn) -> Value {
    let content = match &turn.content {
        TurnContent::Text(text) => Value::String(text.clone()),
        TurnContent::Parts(parts) => Value::Array(
            parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => json!({ "type": "text", "text": text }),
                    ContentPart::ImageUrl { url } => {
                        json!({ "type": "image_url", "image_url": { "url": url } })
                    }
                })
                .collect(),
        ),
    };
    json!({ "role": turn.role.as_str(), "content": content })
}

fn responses_item(turn: &ChatTurn) -> Value {
    let text_kind = if turn.role == Role::Assistant {
        "output_text"
    } else {
        "input_text"
    };
    let parts: Vec<Value> = match &turn.content {
        TurnContent::Text(text) => vec![json!({ "type": text_kind, "text": text })],
        TurnContent::Parts(parts) => parts
            .iter()
            .map(|p| match p {
                ContentPart::Text { text } => json!({ "type": text_kind, "text": text }),
                ContentPart::ImageUrl { url } => json!({ "type": "input_image", "image_url": url }),
            })
            .collect(),
    };
    json!({ "role": turn.role.as_str(), "content": parts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::llm_provider::LlmProvider;

    fn turns() -> Vec<ChatTurn> {
        vec![
            ChatTurn::system("be brief"),
            ChatTurn::user("hi"),
            ChatTurn::assistant("hello"),
            ChatTurn::user_with_image("what is this", "data:image/png;base64,AAAA"),
        ]
    }

    fn request<'a>(
        model: &'a str,
        provider: LlmProvider,
        level: ReasoningLevel,
        messages: &'a [ChatTurn],
        wire: WireFormat,
    ) -> PayloadRequest<'a> {
        PayloadRequest {
            model,
            messages,
            reasoning: ReasoningSelection::new(provider, level),
            temperature: Some(0.7),
            max_tokens: Some(2048),
            wire,
            stream: true,
        }
    }

    #[test]
    fn chat_body_keeps_temperature_for_plain_models() {
        let msgs = turns();
        let req = request(
            "gpt-4o",
            LlmProvider::OpenAI,
            ReasoningLevel::High,
            &msgs,
            WireFormat::ChatCompletions,
        );
        let built = build_payload(&req, TemperatureMode::AsConfigured);
        assert_eq!(built.body["temperature"], json!(0.7));
        assert_eq!(built.body["max_tokens"], json!(2048));
        assert!(built.body.get("reasoning_effort").is_none());
        assert_eq!(built.applied_level, ReasoningLevel::Default);
        assert_eq!(built.body["messages"][0]["content"], json!("be brief"));
        assert_eq!(
            built.body["messages"][3]["content"][1]["image_url"]["url"],
            json!("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn reasoning_models_drop_temperature() {
        let msgs = turns();
        let req = request(
            "gpt-5",
            LlmProvider::OpenAI,
            ReasoningLevel::Xhigh,
            &msgs,
            WireFormat::ChatCompletions,
        );
        let built = build_payload(&req, TemperatureMode::AsConfigured);
        assert_eq!(built.body["reasoning_effort"], json!("high"));
        assert_eq!(built.applied_level, ReasoningLevel::High);
        assert!(!built.has_temperature);
        assert!(built.body.get("temperature").is_none());
    }

    #[test]
    fn openai_reasoning_models_take_max_completion_tokens() {
        let msgs = turns();
        for model in ["gpt-5-mini", "o3", "o1-mini"] {
            let req = request(
                model,
                LlmProvider::OpenAI,
                ReasoningLevel::Default,
                &msgs,
                WireFormat::ChatCompletions,
            );
            let built = build_payload(&req, TemperatureMode::AsConfigured);
            assert_eq!(built.body["max_completion_tokens"], json!(2048), "{model}");
            assert!(built.body.get("max_tokens").is_none(), "{model}");
        }

        let responses = request(
            "gpt-5",
            LlmProvider::OpenAI,
            ReasoningLevel::Low,
            &msgs,
            WireFormat::Responses,
        );
        let built = build_payload(&responses, TemperatureMode::AsConfigured);
        assert_eq!(built.body["max_output_tokens"], json!(2048));
        assert!(built.body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn temperature_modes_override_configuration() {
        let msgs = turns();
        let req = request(
            "gpt-4o",
            LlmProvider::OpenAI,
            ReasoningLevel::Default,
            &msgs,
            WireFormat::ChatCompletions,
        );
        let omitted = build_payload(&req, TemperatureMode::Omit);
        assert!(omitted.body.get("temperature").is_none());
        let fixed = build_payload(&req, TemperatureMode::Fixed(1.0));
        assert_eq!(fixed.body["temperature"], json!(1.0));
    }

    #[test]
    fn responses_body_moves_system_to_instructions() {
        let msgs = turns();
        let req = request(
            "gpt-5",
            LlmProvider::OpenAI,
            ReasoningLevel::Low,
            &msgs,
            WireFormat::Responses,
        );
        let built = build_payload(&req, TemperatureMode::AsConfigured);
        let body = &built.body;
        assert_eq!(body["instructions"], json!("be brief"));
        assert_eq!(body["input"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["input"][1]["content"][0]["type"], json!("output_text"));
        assert_eq!(body["input"][2]["content"][1]["type"], json!("input_image"));
        assert_eq!(body["max_output_tokens"], json!(2048));
        assert_eq!(body["reasoning"], json!({ "effort": "low", "summary": "auto" }));
        assert!(body.get("messages").is_none());
    }

    #[test]
    fn thinking_budget_raises_max_tokens() {
        let msgs = turns();
        let req = request(
            "claude-sonnet-4-5",
            LlmProvider::Anthropic,
            ReasoningLevel::High,
            &msgs,
            WireFormat::ChatCompletions,
        );
        let built = build_payload(&req, TemperatureMode::AsConfigured);
        assert_eq!(
            built.body["thinking"],
            json!({ "type": "enabled", "budget_tokens": 16384 })
        );
        assert_eq!(built.body["max_tokens"], json!(16384 + 1024));
        assert!(built.body.get("temperature").is_none());
    }

    #[test]
    fn provider_specific_toggles() {
        let msgs = turns();
        let qwen = request(
            "qwen3-max",
            LlmProvider::Qwen,
            ReasoningLevel::Minimal,
            &msgs,
            WireFormat::ChatCompletions,
        );
        assert_eq!(
            build_payload(&qwen, TemperatureMode::AsConfigured).body["enable_thinking"],
            json!(false)
        );
        let ollama = request(
            "qwen3:14b",
            LlmProvider::Ollama,
            ReasoningLevel::Medium,
            &msgs,
            WireFormat::ChatCompletions,
        );
        assert_eq!(
            build_payload(&ollama, TemperatureMode::AsConfigured).body["think"],
            json!(true)
        );
        let router = request(
            "openai/gpt-5",
            LlmProvider::OpenRouter,
            ReasoningLevel::Medium,
            &msgs,
            WireFormat::ChatCompletions,
        );
        assert_eq!(
            build_payload(&router, TemperatureMode::AsConfigured).body["reasoning"],
            json!({ "effort": "medium" })
        );
    }
}
