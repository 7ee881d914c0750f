//! Decision-source interface.
//!
//! The ledger does not care how a trade recommendation was produced: a
//! rule-based rebalancer, an LLM-backed agent, and a human reviewer all
//! feed it through the same types. Drift detection, trade sizing, and
//! reasoning-text generation live behind the [`DecisionSource`] seam and
//! are not part of this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, json};

use crate::record::{AppendRequest, TriggeredBy};

/// Direction of a proposed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    /// Acquire the asset.
    Buy,
    /// Dispose of the asset.
    Sell,
}

/// One proposed trade inside a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Buy or sell.
    pub action: TradeAction,

    /// Asset symbol.
    pub symbol: String,

    /// Quantity of the asset to trade.
    pub quantity: f64,

    /// Approximate value of the trade in the portfolio currency.
    pub value: f64,

    /// Per-trade explanation.
    pub reasoning: String,
}

/// A rebalancing recommendation produced by a decision source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecommendation {
    /// The subject whose portfolio the recommendation targets.
    pub subject_id: String,

    /// When the decision source produced the recommendation.
    pub generated_at: DateTime<Utc>,

    /// Proposed trades, in execution order.
    pub trades: Vec<Trade>,

    /// Overall human-readable explanation.
    pub reasoning: String,

    /// Decision confidence in [0, 1].
    pub confidence: f64,

    /// Projected effect, e.g. `risk_reduction` or `sharpe_improvement`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub expected_impact: Map<String, serde_json::Value>,
}

/// A pluggable producer of trade recommendations.
///
/// Returns `None` when the portfolio needs no action. Implementations live
/// outside this crate; errors cross the seam as boxed values.
pub trait DecisionSource {
    /// Analyzes the subject's portfolio and proposes trades, if any.
    ///
    /// # Errors
    ///
    /// Returns the implementation's own failure (market data unavailable,
    /// model error, ...) as a boxed error.
    fn recommend(
        &self,
        subject_id: &str,
    ) -> Result<Option<TradeRecommendation>, Box<dyn std::error::Error + Send + Sync>>;
}

impl From<&TradeRecommendation> for AppendRequest {
    /// Maps a recommendation to its auditable fields: one "rebalance"
    /// record whose affected assets are the trade symbols in proposal
    /// order, with the projected impact folded into `extra_context`.
    fn from(recommendation: &TradeRecommendation) -> Self {
        let sell_count = recommendation
            .trades
            .iter()
            .filter(|t| t.action == TradeAction::Sell)
            .count();
        let buy_count = recommendation.trades.len() - sell_count;

        let mut context = Map::new();
        context.insert("trade_count".to_string(), json!(recommendation.trades.len()));
        if !recommendation.expected_impact.is_empty() {
            context.insert(
                "expected_impact".to_string(),
                serde_json::Value::Object(recommendation.expected_impact.clone()),
            );
        }

        Self::new(
            recommendation.subject_id.clone(),
            "rebalance",
            format!(
                "Rebalance recommendation generated: {sell_count} sell, {buy_count} buy"
            ),
            TriggeredBy::AiAgent,
        )
        .with_assets(recommendation.trades.iter().map(|t| t.symbol.clone()))
        .with_confidence(recommendation.confidence)
        .with_reasoning(recommendation.reasoning.clone())
        .with_context(context)
    }
}
