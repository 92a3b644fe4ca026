// Investment plan tiers
//
// The plan level on an investment decides how many video rewards the owner
// may credit per day. The mapping is deployment configuration loaded at
// startup; these defaults only cover a fresh install.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::money::Amount;

/// One plan tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanSpec {
    /// Display name shown by clients
    pub name: String,
    /// Videos creditable per calendar day
    pub daily_video_limit: u32,
    /// Minimum amount to activate an investment on this plan
    pub min_investment: Amount,
}

/// Plan level to tier mapping, ordered by level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PlanSchedule {
    plans: IndexMap<u8, PlanSpec>,
}

impl Default for PlanSchedule {
    fn default() -> Self {
        let mut plans = IndexMap::new();
        plans.insert(1, PlanSpec {
            name: "Starter".to_string(),
            daily_video_limit: 5,
            min_investment: Amount::from_whole(50),
        });
        plans.insert(2, PlanSpec {
            name: "Bronze".to_string(),
            daily_video_limit: 10,
            min_investment: Amount::from_whole(200),
        });
        plans.insert(3, PlanSpec {
            name: "Silver".to_string(),
            daily_video_limit: 15,
            min_investment: Amount::from_whole(500),
        });
        plans.insert(4, PlanSpec {
            name: "Gold".to_string(),
            daily_video_limit: 20,
            min_investment: Amount::from_whole(1000),
        });
        plans.insert(5, PlanSpec {
            name: "Platinum".to_string(),
            daily_video_limit: 30,
            min_investment: Amount::from_whole(2000),
        });
        Self { plans }
    }
}

impl PlanSchedule {
    pub fn new(plans: IndexMap<u8, PlanSpec>) -> Self {
        Self { plans }
    }

    pub fn get(&self, level: u8) -> Option<&PlanSpec> {
        self.plans.get(&level)
    }

    pub fn daily_limit(&self, level: u8) -> Option<u32> {
        self.plans.get(&level).map(|plan| plan.daily_video_limit)
    }

    pub fn levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.plans.keys().copied()
    }

    /// A usable schedule has at least one tier and no zero-video tier.
    pub fn is_valid(&self) -> bool {
        !self.plans.is_empty()
            && self
                .plans
                .values()
                .all(|plan| plan.daily_video_limit > 0)
    }
}
