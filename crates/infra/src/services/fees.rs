//! Platform fee resolution and fee/payout split.
//!
//! Percentages come from platform configuration. A failed configuration read
//! falls back to the tier's built-in default so a booking can still be
//! priced; every fallback is logged with the tier and cause for later
//! reconciliation against the configured value.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use detailr_core::{DetailerId, FeeSplit, Money, Percentage};
use detailr_marketplace::PricingModel;

use crate::error::ServiceError;
use crate::platform::{DirectoryStore, FinanceStore};

pub const DEFAULT_STANDARD_FEE: Percentage = Percentage::from_whole_percent(15);
pub const DEFAULT_SUBSCRIPTION_FEE: Percentage = Percentage::from_whole_percent(3);

/// Where the applied percentage came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeSource {
    Override,
    Subscription,
    Standard,
    SubscriptionDefault,
    StandardDefault,
}

impl FeeSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::SubscriptionDefault | Self::StandardDefault)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct FeeResolution {
    pub percentage: Percentage,
    pub source: FeeSource,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    #[serde(flatten)]
    pub split: FeeSplit,
    pub source: FeeSource,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Tier {
    Standard,
    Subscription,
}

pub struct FeeCalculator {
    directory: Arc<dyn DirectoryStore>,
    finance: Arc<dyn FinanceStore>,
}

impl FeeCalculator {
    pub fn new(directory: Arc<dyn DirectoryStore>, finance: Arc<dyn FinanceStore>) -> Self {
        Self { directory, finance }
    }

    pub async fn resolve_percentage(
        &self,
        detailer_id: Option<DetailerId>,
        override_percentage: Option<Percentage>,
    ) -> FeeResolution {
        if let Some(percentage) = override_percentage {
            return FeeResolution {
                percentage,
                source: FeeSource::Override,
            };
        }

        let tier = match detailer_id {
            Some(id) => self.tier_of(id).await,
            None => Tier::Standard,
        };

        match tier {
            Tier::Subscription => match self.finance.get_subscription_fee_percentage().await {
                Ok(percentage) => FeeResolution {
                    percentage,
                    source: FeeSource::Subscription,
                },
                Err(err) => {
                    warn!(
                        tier = "subscription",
                        fallback = %DEFAULT_SUBSCRIPTION_FEE,
                        error = %err,
                        "fee percentage read failed, using default"
                    );
                    FeeResolution {
                        percentage: DEFAULT_SUBSCRIPTION_FEE,
                        source: FeeSource::SubscriptionDefault,
                    }
                }
            },
            Tier::Standard => match self.finance.get_platform_fee_percentage().await {
                Ok(percentage) => FeeResolution {
                    percentage,
                    source: FeeSource::Standard,
                },
                Err(err) => {
                    warn!(
                        tier = "standard",
                        fallback = %DEFAULT_STANDARD_FEE,
                        error = %err,
                        "fee percentage read failed, using default"
                    );
                    FeeResolution {
                        percentage: DEFAULT_STANDARD_FEE,
                        source: FeeSource::StandardDefault,
                    }
                }
            },
        }
    }

    pub async fn calculate(
        &self,
        total: Money,
        detailer_id: Option<DetailerId>,
        override_percentage: Option<Percentage>,
    ) -> Result<FeeBreakdown, ServiceError> {
        let resolution = self.resolve_percentage(detailer_id, override_percentage).await;
        let split = FeeSplit::compute(total, resolution.percentage)?;
        debug!(
            total = %split.total,
            percentage = %split.percentage,
            fee = %split.fee,
            source = ?resolution.source,
            "computed fee split"
        );
        Ok(FeeBreakdown {
            split,
            source: resolution.source,
        })
    }

    async fn tier_of(&self, detailer_id: DetailerId) -> Tier {
        match self.directory.get_detailer(detailer_id).await {
            Ok(Some(d)) if d.pricing_model == Some(PricingModel::Subscription) => Tier::Subscription,
            Ok(_) => Tier::Standard,
            Err(err) => {
                warn!(detailer_id = %detailer_id, error = %err, "detailer lookup failed, using standard tier");
                Tier::Standard
            }
        }
    }
}
