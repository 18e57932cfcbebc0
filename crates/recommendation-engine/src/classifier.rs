use async_trait::async_trait;
use market_core::MarketError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which externally trained model to consult.
///
/// The 3-month model reads (close, volume); the 7-day model also reads
/// RSI for its shorter horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelHorizon {
    ThreeMonth,
    SevenDay,
}

/// Latest per-ticker inputs handed to the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub ticker: String,
    pub close: f64,
    pub volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
}

/// Binary up/down call with the model's probability for that call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prediction {
    pub rises: bool,
    pub probability: f64,
}

/// The pre-trained direction model, owned and served elsewhere. This
/// engine only ever calls it as a pure function of the feature row.
#[async_trait]
pub trait DirectionClassifier: Send + Sync {
    async fn predict(
        &self,
        horizon: ModelHorizon,
        features: &FeatureRow,
    ) -> Result<Prediction, MarketError>;
}

/// HTTP-backed classifier. Base URL from `CLASSIFIER_URL`.
#[derive(Clone)]
pub struct RemoteClassifier {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    horizon: &'a str,
    #[serde(flatten)]
    features: &'a FeatureRow,
}

#[derive(Deserialize)]
struct PredictResponse {
    rises: bool,
    probability: f64,
}

impl RemoteClassifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("CLASSIFIER_URL").ok().map(Self::new)
    }
}

#[async_trait]
impl DirectionClassifier for RemoteClassifier {
    async fn predict(
        &self,
        horizon: ModelHorizon,
        features: &FeatureRow,
    ) -> Result<Prediction, MarketError> {
        let horizon = match horizon {
            ModelHorizon::ThreeMonth => "3m",
            ModelHorizon::SevenDay => "7d",
        };

        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&PredictRequest { horizon, features })
            .send()
            .await
            .map_err(|e| MarketError::RecommendationsUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MarketError::RecommendationsUnavailable(format!(
                "classifier HTTP {}",
                response.status()
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| MarketError::RecommendationsUnavailable(e.to_string()))?;

        Ok(Prediction {
            rises: body.rises,
            probability: body.probability,
        })
    }
}
