//! Catalogue of backend resources polled by the dashboard.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::request::ApiRequest;

/// A fetchable unit of backend data with a stable path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Stats,
    ActiveTrades,
    SoldTrades,
    WalletBalance,
    LastToken,
    BotState,
    SolPrice,
    DailyStats,
    Consolidated,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Stats,
        Resource::ActiveTrades,
        Resource::SoldTrades,
        Resource::WalletBalance,
        Resource::LastToken,
        Resource::BotState,
        Resource::SolPrice,
        Resource::DailyStats,
        Resource::Consolidated,
    ];

    /// Endpoint path on the bot API.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Stats => "/api/stats",
            Resource::ActiveTrades => "/api/trades/active",
            Resource::SoldTrades => "/api/trades/sold",
            Resource::WalletBalance => "/api/wallet-balance",
            Resource::LastToken => "/api/last-token",
            Resource::BotState => "/api/bot/state",
            Resource::SolPrice => "/api/sol-price",
            Resource::DailyStats => "/api/daily-stats",
            Resource::Consolidated => "/api/consolidated",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Resource::Stats => "stats",
            Resource::ActiveTrades => "active_trades",
            Resource::SoldTrades => "sold_trades",
            Resource::WalletBalance => "wallet_balance",
            Resource::LastToken => "last_token",
            Resource::BotState => "bot_state",
            Resource::SolPrice => "sol_price",
            Resource::DailyStats => "daily_stats",
            Resource::Consolidated => "consolidated",
        }
    }

    /// The plain GET used to load this resource.
    pub fn request(self) -> ApiRequest {
        ApiRequest::get(self.path())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
