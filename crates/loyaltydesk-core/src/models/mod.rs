//! Data models for loyalty program entities.
//!
//! This module contains the request and response types exchanged with the
//! loyalty API:
//!
//! - `TokenGrant`, `Registration`: identity issuance and signup
//! - `Tier`, `TierConfig` and their editable drafts
//! - `WalletBranding`: wallet colors and images for multipart uploads
//! - `QrCode`, `CheckIn`: shop check-in
//! - Points types: balance, history, sharing, redemption, checkout rewards
//! - `Shop`, `SubArea`, `ShopOverview`

pub mod checkin;
pub mod identity;
pub mod points;
pub mod shop;
pub mod tier;
pub mod wallet;

pub use checkin::{CheckIn, QrCode};
pub use identity::{Registration, TokenGrant};
pub use points::{CheckoutReward, PointTransaction, PointsBalance, Redemption, SharePointsRequest};
pub use shop::{Shop, ShopOverview, SubArea};
pub use tier::{SaveOperation, Tier, TierConfig, TierConfigDraft, TierDraft};
pub use wallet::{WalletBranding, WalletImage};
