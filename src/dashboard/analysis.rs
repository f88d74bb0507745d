use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::api::genai::{extract_json, TextCompletion};
use crate::error::{Error, Result};
use crate::models::{PanelState, Token};
use crate::utils::format::{time_ago, to_precision};

/// The opportunities panel waits for at least this many candidates.
pub const MIN_OPPORTUNITY_CANDIDATES: usize = 5;
/// At most this many tokens are offered to the model per call.
pub const OPPORTUNITY_PROMPT_LIMIT: usize = 30;

/// Single-pick market analysis, schema-enforced.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketPulse {
    pub token_address: String,
    pub confidence: f64,
    pub trend: String,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct PulseResult {
    pub pulse: MarketPulse,
    pub token: Token,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub token_address: String,
    pub reasoning: String,
    pub opportunity_type: String,
}

#[derive(Debug, Clone)]
pub struct OpportunityPick {
    pub opportunity: Opportunity,
    pub token: Token,
}

#[derive(Debug, Deserialize)]
struct OpportunitiesEnvelope {
    #[serde(default)]
    opportunities: Vec<Opportunity>,
}

/// Remembers the signature of the last successfully analyzed candidate set,
/// so an unchanged set never triggers another completion call. Held by the
/// owning panel, never ambient.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    signature: Option<String>,
}

impl AnalysisCache {
    pub fn is_fresh(&self, signature: &str) -> bool {
        self.signature.as_deref() == Some(signature)
    }

    pub fn mark(&mut self, signature: String) {
        self.signature = Some(signature);
    }
}

/// Deterministic content signature of a candidate set: sorted, comma-joined
/// addresses.
pub fn pulse_signature(tokens: &[Token]) -> String {
    let mut addresses: Vec<&str> = tokens.iter().map(|t| t.address.as_str()).collect();
    addresses.sort_unstable();
    addresses.join(",")
}

/// Like [`pulse_signature`] but sensitive to movement: each entry carries the
/// 24h change rounded to two decimals, so a re-ranked set re-triggers.
pub fn opportunities_signature(tokens: &[Token]) -> String {
    let mut entries: Vec<String> = tokens
        .iter()
        .map(|t| format!("{}:{:.2}", t.address, t.change24h))
        .collect();
    entries.sort_unstable();
    entries.join(",")
}

fn created_label(token: &Token) -> String {
    token
        .created_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| time_ago(dt.with_timezone(&Utc)))
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn build_pulse_prompt(tokens: &[Token]) -> String {
    let token_data: Vec<String> = tokens
        .iter()
        .map(|t| {
            format!(
                "- {} (${}): Price ${}, 24h Change {:.2}%, Address: {}",
                t.name,
                t.ticker,
                to_precision(t.price, 4),
                t.change24h,
                t.address
            )
        })
        .collect();
    format!(
        "You are EVE, a sophisticated AI market analyst for the EVE Protocol terminal, \
specializing in identifying high-potential tokens on the Solana blockchain.\n\
Your task is to analyze the following list of recently active tokens. Based on the \
provided data (price, 24h change) and your own broad knowledge of the crypto market, \
narratives, and social trends, select the SINGLE token you believe has the most \
interesting short-term potential. This could be due to momentum, a new narrative \
forming, or being significantly undervalued.\n\n\
Token Data:\n{}\n\n\
Analyze the data and select the single best token, providing your confidence, the \
trend, and a summary.",
        token_data.join("\n")
    )
}

pub fn pulse_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tokenAddress": {
                "type": "STRING",
                "description": "The address of the selected token."
            },
            "confidence": {
                "type": "NUMBER",
                "description": "A score from 0 to 100 representing confidence in this token's potential."
            },
            "trend": {
                "type": "STRING",
                "description": "A short, descriptive label for the potential trend (e.g., 'Strong Momentum')."
            },
            "summary": {
                "type": "STRING",
                "description": "A single, compelling sentence explaining why this token is the pick."
            }
        },
        "required": ["tokenAddress", "confidence", "trend", "summary"]
    })
}

const OPPORTUNITIES_RESPONSE_FORMAT: &str = r#"Your analysis must be concise and actionable. Return ONLY a single JSON object containing an array named "opportunities" with exactly 3 token objects. Do not include any other text, markdown, or explanations. Each object in the array must have the following structure:

{
  "opportunities": [
    {
      "tokenAddress": "The address of the selected token.",
      "reasoning": "A single, compelling sentence explaining why this token is a top opportunity.",
      "opportunityType": "A short, descriptive label for the potential trend (e.g., 'Momentum Play', 'New Gem', 'Potential Reversal')."
    }
  ]
}"#;

pub fn build_opportunities_prompt(tokens: &[Token]) -> String {
    let token_data: Vec<String> = tokens
        .iter()
        .map(|t| {
            format!(
                "- {} (${}): 24h Change {:.2}%, Created: {}, Address: {}",
                t.name,
                t.ticker,
                t.change24h,
                created_label(t),
                t.address
            )
        })
        .collect();
    format!(
        "You are EVE, a sophisticated AI market analyst for the EVE Protocol terminal. \
Your task is to analyze the following list of Solana tokens and identify the TOP 3 \
tokens with the most interesting short-term potential.\n\
Prioritize tokens that exhibit a strong combination of high positive momentum (24h \
Change) and recent creation (newer tokens are often higher risk but higher reward).\n\n\
Token Data:\n{}\n\n{}",
        token_data.join("\n"),
        OPPORTUNITIES_RESPONSE_FORMAT
    )
}

/// Validates a single-pick response against the candidate set. A pick
/// outside the set is an analysis failure, never silently accepted.
pub fn parse_pulse(raw: &str, candidates: &[Token]) -> Result<PulseResult> {
    let pulse: MarketPulse = serde_json::from_str(extract_json(raw)?)
        .map_err(|e| Error::AnalysisFailed(format!("Unusable analysis response: {}", e)))?;
    let token = candidates
        .iter()
        .find(|t| t.address == pulse.token_address)
        .cloned()
        .ok_or_else(|| {
            Error::AnalysisFailed(
                "AI selected a token that was not in the provided list.".to_string(),
            )
        })?;
    Ok(PulseResult { pulse, token })
}

/// Validates an opportunities response: exactly three picks, each resolving
/// to a candidate.
pub fn parse_opportunities(raw: &str, candidates: &[Token]) -> Result<Vec<OpportunityPick>> {
    let envelope: OpportunitiesEnvelope = serde_json::from_str(extract_json(raw)?)
        .map_err(|e| Error::AnalysisFailed(format!("Unusable opportunities response: {}", e)))?;
    if envelope.opportunities.len() != 3 {
        return Err(Error::AnalysisFailed(
            "AI did not return 3 opportunities.".to_string(),
        ));
    }
    envelope
        .opportunities
        .into_iter()
        .map(|opportunity| {
            candidates
                .iter()
                .find(|t| t.address == opportunity.token_address)
                .cloned()
                .map(|token| OpportunityPick { opportunity, token })
                .ok_or_else(|| {
                    Error::AnalysisFailed(
                        "AI selected a token that was not in the provided list.".to_string(),
                    )
                })
        })
        .collect()
}

/// "Neural Index" panel: one AI pick over the current token set.
pub struct NeuralIndexPanel {
    genai: Arc<dyn TextCompletion>,
    cache: Mutex<AnalysisCache>,
    state: Arc<Mutex<PanelState<PulseResult>>>,
}

impl NeuralIndexPanel {
    pub fn new(genai: Arc<dyn TextCompletion>) -> Self {
        Self {
            genai,
            cache: Mutex::new(AnalysisCache::default()),
            state: Arc::new(Mutex::new(PanelState::new())),
        }
    }

    pub async fn state(&self) -> PanelState<PulseResult> {
        self.state.lock().await.clone()
    }

    /// Re-analyzes when the candidate set changed since the last successful
    /// run. Failures are retried on the next set change, not before.
    pub async fn analyze(&self, tokens: &[Token]) {
        if tokens.is_empty() {
            return;
        }
        let signature = pulse_signature(tokens);
        if self.cache.lock().await.is_fresh(&signature) {
            return;
        }
        self.state.lock().await.loading = true;
        match self.run(tokens).await {
            Ok(result) => {
                self.state.lock().await.resolve(result);
                self.cache.lock().await.mark(signature);
            }
            Err(err) => {
                warn!("Market pulse analysis failed: {}", err);
                self.state.lock().await.fail(err.to_string());
            }
        }
    }

    async fn run(&self, tokens: &[Token]) -> Result<PulseResult> {
        let prompt = build_pulse_prompt(tokens);
        let raw = self.genai.complete(&prompt, Some(pulse_schema())).await?;
        parse_pulse(&raw, tokens)
    }
}

/// "Top Opportunities" panel: three AI picks over the current token set.
pub struct OpportunitiesPanel {
    genai: Arc<dyn TextCompletion>,
    cache: Mutex<AnalysisCache>,
    state: Arc<Mutex<PanelState<Vec<OpportunityPick>>>>,
}

impl OpportunitiesPanel {
    pub fn new(genai: Arc<dyn TextCompletion>) -> Self {
        Self {
            genai,
            cache: Mutex::new(AnalysisCache::default()),
            state: Arc::new(Mutex::new(PanelState::new())),
        }
    }

    pub async fn state(&self) -> PanelState<Vec<OpportunityPick>> {
        self.state.lock().await.clone()
    }

    pub async fn analyze(&self, tokens: &[Token]) {
        if tokens.len() < MIN_OPPORTUNITY_CANDIDATES {
            return;
        }
        let signature = opportunities_signature(tokens);
        if self.cache.lock().await.is_fresh(&signature) {
            return;
        }
        self.state.lock().await.loading = true;
        let candidates = &tokens[..tokens.len().min(OPPORTUNITY_PROMPT_LIMIT)];
        match self.run(candidates).await {
            Ok(picks) => {
                self.state.lock().await.resolve(picks);
                self.cache.lock().await.mark(signature);
            }
            Err(err) => {
                warn!("Opportunities analysis failed: {}", err);
                self.state.lock().await.fail(err.to_string());
            }
        }
    }

    async fn run(&self, candidates: &[Token]) -> Result<Vec<OpportunityPick>> {
        let prompt = build_opportunities_prompt(candidates);
        let raw = self.genai.complete(&prompt, None).await?;
        parse_opportunities(&raw, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::genai::MockTextCompletion;

    fn token(address: &str, change24h: f64) -> Token {
        Token {
            address: address.to_string(),
            name: format!("{}-name", address),
            ticker: address.to_uppercase(),
            price: 1.0,
            change24h,
            image_url: String::new(),
            pair_address: format!("{}-pool", address),
            created_at: None,
        }
    }

    #[test]
    fn signatures_are_order_independent() {
        let a = vec![token("a", 1.0), token("b", 2.0)];
        let b = vec![token("b", 2.0), token("a", 1.0)];
        assert_eq!(pulse_signature(&a), pulse_signature(&b));
        assert_eq!(opportunities_signature(&a), opportunities_signature(&b));
    }

    #[test]
    fn opportunities_signature_tracks_rounded_change() {
        let before = vec![token("a", 1.004)];
        let after = vec![token("a", 1.001)];
        assert_eq!(
            opportunities_signature(&before),
            opportunities_signature(&after)
        );
        let moved = vec![token("a", 1.02)];
        assert_ne!(
            opportunities_signature(&before),
            opportunities_signature(&moved)
        );
    }

    #[test]
    fn pulse_pick_outside_candidates_is_rejected() {
        let candidates = vec![token("a", 1.0)];
        let raw = r#"{"tokenAddress": "zzz", "confidence": 90, "trend": "Up", "summary": "s"}"#;
        let err = parse_pulse(raw, &candidates).unwrap_err();
        assert!(matches!(err, Error::AnalysisFailed(_)));
    }

    #[test]
    fn pulse_accepts_candidate_pick_with_prose_wrapping() {
        let candidates = vec![token("a", 1.0)];
        let raw = "Here you go:\n{\"tokenAddress\": \"a\", \"confidence\": 72, \"trend\": \"Strong Momentum\", \"summary\": \"s\"}\nEnjoy.";
        let result = parse_pulse(raw, &candidates).unwrap();
        assert_eq!(result.token.address, "a");
        assert_eq!(result.pulse.confidence, 72.0);
    }

    #[test]
    fn opportunities_require_exactly_three_known_picks() {
        let candidates: Vec<Token> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|a| token(a, 1.0))
            .collect();

        let two = r#"{"opportunities": [
            {"tokenAddress": "a", "reasoning": "r", "opportunityType": "Momentum Play"},
            {"tokenAddress": "b", "reasoning": "r", "opportunityType": "New Gem"}
        ]}"#;
        assert!(parse_opportunities(two, &candidates).is_err());

        let unknown = r#"{"opportunities": [
            {"tokenAddress": "a", "reasoning": "r", "opportunityType": "Momentum Play"},
            {"tokenAddress": "b", "reasoning": "r", "opportunityType": "New Gem"},
            {"tokenAddress": "zzz", "reasoning": "r", "opportunityType": "Potential Reversal"}
        ]}"#;
        assert!(parse_opportunities(unknown, &candidates).is_err());

        let valid = r#"{"opportunities": [
            {"tokenAddress": "a", "reasoning": "r", "opportunityType": "Momentum Play"},
            {"tokenAddress": "b", "reasoning": "r", "opportunityType": "New Gem"},
            {"tokenAddress": "c", "reasoning": "r", "opportunityType": "Potential Reversal"}
        ]}"#;
        let picks = parse_opportunities(valid, &candidates).unwrap();
        assert_eq!(picks.len(), 3);
        assert_eq!(picks[2].token.address, "c");
    }

    #[tokio::test]
    async fn out_of_set_pick_lands_in_failed_state() {
        let mut genai = MockTextCompletion::new();
        genai.expect_complete().returning(|_, _| {
            Ok(r#"{"tokenAddress": "zzz", "confidence": 90, "trend": "Up", "summary": "s"}"#
                .to_string())
        });

        let panel = NeuralIndexPanel::new(Arc::new(genai));
        panel.analyze(&[token("a", 1.0)]).await;

        let state = panel.state().await;
        assert!(state.data.is_none());
        assert!(state.error.is_some());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn unchanged_candidate_set_is_not_reanalyzed() {
        let mut genai = MockTextCompletion::new();
        genai.expect_complete().times(1).returning(|_, _| {
            Ok(r#"{"tokenAddress": "a", "confidence": 80, "trend": "Up", "summary": "s"}"#
                .to_string())
        });

        let panel = NeuralIndexPanel::new(Arc::new(genai));
        let tokens = vec![token("a", 1.0)];
        panel.analyze(&tokens).await;
        panel.analyze(&tokens).await;

        let state = panel.state().await;
        assert_eq!(state.data.unwrap().token.address, "a");
    }

    #[tokio::test]
    async fn opportunities_wait_for_enough_candidates() {
        let mut genai = MockTextCompletion::new();
        genai.expect_complete().never();

        let panel = OpportunitiesPanel::new(Arc::new(genai));
        let tokens: Vec<Token> = ["a", "b", "c", "d"].iter().map(|a| token(a, 1.0)).collect();
        panel.analyze(&tokens).await;

        let state = panel.state().await;
        assert!(state.data.is_none());
        assert!(state.loading);
    }
}
