//! Outfit curation over a saved pin collection.
//!
//! The curator asks an external text/vision model to pick 3 to 5 pins that
//! cohere as an outfit, then parses the free-form answer. Because neither
//! the call nor the answer format is guaranteed, every stage degrades into
//! the next rather than failing — the contract is "always return something
//! plausible":
//!
//! 1. Three or fewer pins: return them all, no external call.
//! 2. No credential: random selection, reason says so.
//! 3. Call the model (bounded timeout, no retries).
//! 4. Parse `Item N: because ...` justifications by index.
//! 5. If no index matched, match pins by their own description words.
//! 6. Still nothing: random selection, reason names the failure mode.
//!
//! The only hard error is an empty input set.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;
use tracing::warn;

use crate::completion::{ChatMessage, CompletionClient, MessagePart};
use crate::models::{CuratedItem, PinCandidate};
use crate::parse;

/// Collections of this size or smaller skip the model entirely.
const SMALL_SET_MAX: usize = 3;
/// How many pins a randomized fallback returns.
const FALLBACK_PICKS: usize = 3;

/// Reason texts. Each fallback mode gets distinct wording so callers can
/// tell from the response which rung of the ladder answered.
pub const SMALL_SET_REASON: &str = "Part of a small collection, so every piece makes the cut.";
pub const NO_CREDENTIAL_REASON: &str = "Picked at random: no stylist API key is configured.";
pub const PARSE_FAILURE_REASON: &str = "Picked at random: the stylist's answer couldn't be read.";
pub const API_ERROR_REASON: &str = "Picked at random: the stylist service was unavailable.";
pub const INTERNAL_ERROR_REASON: &str = "Picked at random: something went wrong while curating.";

pub struct Curator {
    client: Box<dyn CompletionClient>,
    rng: Mutex<StdRng>,
}

impl Curator {
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        Self {
            client,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic random source, for tests.
    pub fn with_seed(client: Box<dyn CompletionClient>, seed: u64) -> Self {
        Self {
            client,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Select a coherent subset of `pins` with a justification per pick.
    /// Fails only on an empty input; every other failure mode is absorbed
    /// into a degraded selection.
    pub async fn curate(&self, pins: &[PinCandidate]) -> Result<Vec<CuratedItem>> {
        if pins.is_empty() {
            bail!("pins must be a non-empty array");
        }

        if pins.len() <= SMALL_SET_MAX {
            return Ok(pins
                .iter()
                .map(|pin| CuratedItem::new(pin, SMALL_SET_REASON))
                .collect());
        }

        if !self.client.is_configured() {
            warn!("no completion credential configured, selecting pins at random");
            return Ok(self.random_picks(pins, NO_CREDENTIAL_REASON));
        }

        match self.ask_model(pins).await {
            Ok(items) if !items.is_empty() => Ok(items),
            Ok(_) => {
                warn!("could not parse any picks out of the model response");
                Ok(self.random_picks(pins, PARSE_FAILURE_REASON))
            }
            Err(e) => {
                warn!(error = %e, "completion call failed");
                Ok(self.random_picks(pins, API_ERROR_REASON))
            }
        }
    }

    /// Best-effort answer for the outermost error boundary: when curation
    /// blows up in a way the ladder did not anticipate, the handler still
    /// responds with a random selection rather than an error.
    pub fn random_fallback(&self, pins: &[PinCandidate]) -> Vec<CuratedItem> {
        self.random_picks(pins, INTERNAL_ERROR_REASON)
    }

    async fn ask_model(&self, pins: &[PinCandidate]) -> Result<Vec<CuratedItem>> {
        let messages = build_prompt(pins);
        let response = self.client.complete(&messages).await?;

        let mut items = resolve_by_index(pins, &response);
        if items.is_empty() {
            items = resolve_by_description(pins, &response);
        }

        Ok(items)
    }

    fn random_picks(&self, pins: &[PinCandidate], reason: &str) -> Vec<CuratedItem> {
        // A panic elsewhere while the lock was held poisons the mutex; the
        // RNG state itself is still fine, so keep serving instead of
        // propagating the panic.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        pins.choose_multiple(&mut *rng, FALLBACK_PICKS)
            .map(|pin| CuratedItem::new(pin, reason))
            .collect()
    }
}

/// One system instruction plus a single user message enumerating every pin
/// as `Item N` with its description and image inlined.
fn build_prompt(pins: &[PinCandidate]) -> Vec<ChatMessage> {
    let system = ChatMessage::system(
        "You are a personal stylist. From the numbered items below, choose 3 to 5 \
         that work together as one coherent outfit, weighing style, color, and \
         occasion. For each pick, answer on its own line in the form \
         \"Item N: because <justification>\".",
    );

    let mut parts = Vec::with_capacity(pins.len() * 2);
    for (i, pin) in pins.iter().enumerate() {
        let description = if pin.text.trim().is_empty() {
            "(no description)"
        } else {
            pin.text.as_str()
        };
        parts.push(MessagePart::Text(format!("Item {}: {}", i + 1, description)));
        parts.push(MessagePart::ImageUrl(pin.image.clone()));
    }

    vec![system, ChatMessage::user(parts)]
}

/// Map parsed `Item N` justifications back onto the input. Indices are
/// 1-based as written by the model; out-of-range ones are dropped.
fn resolve_by_index(pins: &[PinCandidate], response: &str) -> Vec<CuratedItem> {
    parse::parse_item_reasons(response)
        .into_iter()
        .filter_map(|(index, reason)| {
            let pin = index.checked_sub(1).and_then(|i| pins.get(i))?;
            Some(CuratedItem::new(pin, reason))
        })
        .collect()
}

fn resolve_by_description(pins: &[PinCandidate], response: &str) -> Vec<CuratedItem> {
    let descriptions: Vec<String> = pins.iter().map(|pin| pin.text.clone()).collect();
    parse::match_by_description(response, &descriptions)
        .into_iter()
        .filter_map(|(position, reason)| {
            let pin = pins.get(position)?;
            Some(CuratedItem::new(pin, reason))
        })
        .collect()
}
