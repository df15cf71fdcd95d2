//! Whiteout Survival gift code API: request signing, player lookup, CAPTCHA
//! handling and the redemption loop.

pub mod captcha;
pub mod client;
pub mod player;
pub mod redeem;
pub mod reply;
pub mod retry;
pub mod sign;

pub use captcha::{CaptchaSolution, CaptchaSolver, RemoteSolver};
pub use client::{ApiReply, GiftApi, PlayerData, WosClient};
pub use player::{PlayerInfo, PlayerLookup, validate_ids};
pub use redeem::{RedeemStats, Redeemer};
pub use reply::RedeemOutcome;
pub use retry::RetryPolicy;
