//! Application state and command handlers.
//!
//! `App` is the composition root: it loads the config, restores the session
//! from disk, and wires the API client's unauthorized hook to the session
//! store so a rejected token logs the user out.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use loyaltydesk_core::models::{
    CheckIn, Redemption, Registration, SharePointsRequest, TierConfigDraft, TierDraft,
    WalletBranding, WalletImage,
};
use loyaltydesk_core::storage::{FileStore, KeyValueStore};
use loyaltydesk_core::{ApiClient, ApiError, Config, Credentials, Role, Session, SessionStore};
use tracing::{debug, info, warn};

/// Wallet branding as given on the command line, images still on disk.
pub struct BrandingRequest {
    pub tier_id: i64,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub bg_color: Option<String>,
    pub icon: Option<PathBuf>,
    pub logo: Option<PathBuf>,
    pub cover_image: Option<PathBuf>,
}

pub struct App {
    /// Config as read from disk; the only copy ever saved
    saved: Config,
    /// `saved` plus per-process environment overrides
    config: Config,
    store: Arc<SessionStore>,
    api: ApiClient,
}

impl App {
    pub fn new() -> Result<Self> {
        let saved = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        let mut config = saved.clone();
        config.apply_env();

        let session_dir = config.session_dir()?;
        debug!(?session_dir, "Session directory configured");
        Self::with_storage(saved, config, Arc::new(FileStore::new(session_dir)))
    }

    fn with_storage(
        saved: Config,
        config: Config,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let store = Arc::new(SessionStore::new(storage));
        let hook_store = Arc::clone(&store);
        let api = ApiClient::from_config(&config)
            .context("Failed to create HTTP client")?
            .on_unauthorized(move || hook_store.logout());

        let restored = store.restore();
        debug!(authenticated = restored.is_some(), "Session loaded");

        Ok(Self {
            saved,
            config,
            store,
            api,
        })
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn session(&self) -> Result<Session> {
        self.store
            .current()
            .ok_or_else(|| anyhow!("You are not logged in. Run `loyaltydesk login` first."))
    }

    /// Client carrying the session token, for any logged-in role.
    fn authenticated(&self) -> Result<(ApiClient, Session)> {
        let session = self.session()?;
        Ok((self.api.with_token(session.token()), session))
    }

    /// Client for a role-restricted dashboard.
    fn for_role(&self, role: Role) -> Result<(ApiClient, Session)> {
        let (client, session) = self.authenticated()?;
        session.require_role(role)?;
        Ok((client, session))
    }

    fn org_id(&self, flag: Option<i64>) -> Result<i64> {
        flag.or(self.config.organization_id)
            .ok_or_else(|| anyhow!("Organization id required (--org-id or LOYALTYDESK_ORG_ID)"))
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login(
        &mut self,
        role: Role,
        employee: bool,
        email: Option<String>,
        org_id: Option<i64>,
        password: Option<String>,
    ) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt_line("Email: ")?,
        };
        let password = match password {
            Some(p) => p,
            None => rpassword::prompt_password("Password: ")?,
        };
        let credentials = Credentials {
            email,
            password,
            is_employee: employee,
            org_id: self.org_id(org_id)?,
        };

        let session = self.store.login(&self.api, &credentials, role).await?;

        if let Err(e) = self.remember_email(session.email()).save() {
            warn!(error = %e, "Failed to save config");
        }

        println!("Logged in as {} ({})", session.email(), session.role());
        Ok(())
    }

    /// Record the last login email, returning the config to write to disk.
    fn remember_email(&mut self, email: &str) -> &Config {
        self.config.last_email = Some(email.to_string());
        self.saved.last_email = Some(email.to_string());
        &self.saved
    }

    pub async fn signup(
        &self,
        name: String,
        email: String,
        referrer: Option<String>,
        org_id: Option<i64>,
    ) -> Result<()> {
        let org_id = self.org_id(org_id)?;
        let password = rpassword::prompt_password("Password: ")?;
        let confirm_password = rpassword::prompt_password("Confirm password: ")?;
        let registration = Registration {
            name,
            email,
            password,
            confirm_password,
            referrer,
        };

        self.api
            .register(&registration, org_id, &self.config.activation_redirect_url)
            .await?;
        info!(email = %registration.email, "Account registered");
        println!("Account created. Check {} to activate it.", registration.email.trim());
        Ok(())
    }

    pub fn logout(&self) {
        self.store.logout();
        println!("Logged out");
    }

    pub fn whoami(&self) -> Result<()> {
        let session = self.session()?;
        println!("{}", serde_json::to_string_pretty(session.profile())?);
        Ok(())
    }

    // =========================================================================
    // Dashboard (any logged-in role)
    // =========================================================================

    pub async fn list_tiers(&self) -> Result<()> {
        let (client, _) = self.authenticated()?;
        let tiers = client.list_tiers().await?;
        if tiers.is_empty() {
            println!("No tiers");
        }
        for tier in tiers {
            let cashback = tier
                .cashback_percent()
                .map(|p| format!("{:.1}%", p))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:>6}  {:<24} purchases {:<10} cashback {:<7} {}{}",
                tier.id,
                tier.name,
                tier.purchase_range_display(),
                cashback,
                if tier.is_active { "active" } else { "inactive" },
                if tier.is_special { ", special" } else { "" },
            );
        }
        Ok(())
    }

    pub async fn save_tier(&self, draft: TierDraft) -> Result<()> {
        let (client, _) = self.authenticated()?;
        client.save_tier(&draft).await?;
        println!("Tier \"{}\" saved", draft.name.trim());
        Ok(())
    }

    pub async fn delete_tier(&self, id: i64) -> Result<()> {
        let (client, _) = self.authenticated()?;
        client.delete_tier(id).await?;
        println!("Tier {} deleted", id);
        Ok(())
    }

    pub async fn list_tier_configs(&self) -> Result<()> {
        let (client, _) = self.authenticated()?;
        let configs = client.list_tier_configs().await?;
        if configs.is_empty() {
            println!("No tier configurations");
        }
        for config in configs {
            let draft = config.to_draft();
            println!(
                "{:>6}  {:<24} default tier {:<6} {} points -> {} cashback, referral {}, review {}",
                config.id,
                config.description,
                draft.default_tier_id,
                draft.required_points,
                draft.cashback_reward,
                draft.referral_amount,
                draft.review_amount,
            );
        }
        Ok(())
    }

    pub async fn save_tier_config(&self, draft: TierConfigDraft) -> Result<()> {
        let (client, _) = self.authenticated()?;
        client.save_tier_config(&draft).await?;
        println!("Tier configuration saved");
        Ok(())
    }

    pub async fn delete_tier_config(&self, id: i64) -> Result<()> {
        let (client, _) = self.authenticated()?;
        client.delete_tier_config(id).await?;
        println!("Tier configuration {} deleted", id);
        Ok(())
    }

    // =========================================================================
    // Admin dashboard
    // =========================================================================

    pub async fn save_wallet(&self, request: BrandingRequest, create: bool) -> Result<()> {
        let (client, _) = self.for_role(Role::Admin)?;

        let load = |path: Option<PathBuf>| path.map(|p| WalletImage::from_path(&p)).transpose();
        let branding = WalletBranding {
            primary_color: request.primary_color,
            secondary_color: request.secondary_color,
            bg_color: request.bg_color,
            icon: load(request.icon)?,
            logo: load(request.logo)?,
            cover_image: load(request.cover_image)?,
        };

        if create {
            client.create_wallet(request.tier_id, &branding).await?;
            println!("Wallet created for tier {}", request.tier_id);
        } else {
            client.update_wallet(request.tier_id, &branding).await?;
            println!("Wallet updated for tier {}", request.tier_id);
        }
        Ok(())
    }

    pub async fn qr_code(&self, shop_id: i64, url: Option<String>, out: PathBuf) -> Result<()> {
        let (client, _) = self.for_role(Role::Admin)?;
        let url = url
            .or_else(|| self.config.checkin_page_url.clone())
            .ok_or_else(|| anyhow!("Check-in URL required (--url or LOYALTYDESK_CHECKIN_PAGE)"))?;

        let qr = client.qr_code(shop_id, &url).await?;
        std::fs::write(&out, &qr.png)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        println!("QR code saved to {}", out.display());
        Ok(())
    }

    pub async fn shop_reward(&self, shop_id: i64, points: i64, create: bool) -> Result<()> {
        let (client, _) = self.for_role(Role::Admin)?;
        if create {
            client.create_shop_reward(shop_id, points).await?;
        } else {
            client.update_shop_reward(shop_id, points).await?;
        }
        println!("Shop {} check-in reward set to {} points", shop_id, points);
        Ok(())
    }

    pub async fn redeem(&self, order_id: String, code: String, points: i64) -> Result<()> {
        let (client, _) = self.for_role(Role::Admin)?;
        let redemption = Redemption {
            order_id,
            code,
            points,
        };
        client.redeem_code(&redemption).await?;
        println!("Redeemed {} points on order {}", points, redemption.order_id.trim());
        Ok(())
    }

    pub async fn shops(&self, org_id: Option<i64>) -> Result<()> {
        let (client, session) = self.for_role(Role::Admin)?;
        let org_id = org_id.or(self.config.organization_id).unwrap_or(session.org_id());

        let overviews = client.shop_overviews(org_id).await?;
        if overviews.is_empty() {
            println!("No shops");
        }
        for overview in overviews {
            println!(
                "{:>6}  {:<24} {}",
                overview.shop.id,
                overview.shop.name,
                overview.display_sub_areas()
            );
            for area in &overview.sub_areas {
                println!("          - {}", area.name);
            }
        }
        Ok(())
    }

    // =========================================================================
    // User dashboard
    // =========================================================================

    pub async fn check_in(&self, shop_id: i64, latitude: f64, longitude: f64) -> Result<()> {
        let (client, _) = self.for_role(Role::User)?;
        let check_in = CheckIn {
            shop_id,
            latitude,
            longitude,
        };
        client.check_in(&check_in).await?;
        println!("Checked in at shop {}", shop_id);
        Ok(())
    }

    pub async fn points_balance(&self) -> Result<()> {
        let (client, _) = self.for_role(Role::User)?;
        let balance = client.points_balance().await?;
        println!("{} points", balance.points);
        Ok(())
    }

    pub async fn points_history(&self) -> Result<()> {
        let (client, _) = self.for_role(Role::User)?;
        let history = client.points_history().await?;
        if history.is_empty() {
            println!("No transactions");
        }
        for tx in history {
            let date = tx
                .date()
                .map(|d| d.format("%b %d, %Y").to_string())
                .unwrap_or_else(|| tx.transaction_date.clone());
            println!("{:<14} {:>+8}  {}", date, tx.points, tx.description);
        }
        Ok(())
    }

    pub async fn share_points(&self, email: String, points: i64) -> Result<()> {
        let (client, session) = self.for_role(Role::User)?;
        let share = SharePointsRequest {
            org_id: session.org_id(),
            email,
            points,
        };
        client.share_points(&share).await?;
        println!("Shared {} points with {}", points, share.email.trim());
        Ok(())
    }

    pub async fn checkout_reward(&self, amount: f64) -> Result<()> {
        let (client, _) = self.for_role(Role::User)?;
        let reward = client.checkout_reward(amount).await?;
        if reward.message.is_empty() {
            println!("This order earns {} points", reward.reward_points);
        } else {
            println!("{} ({} points)", reward.message, reward.reward_points);
        }
        Ok(())
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        bail!("{} is required", label.trim_end_matches([':', ' ']));
    }
    Ok(input.to_string())
}

/// Render an error as the single line shown to the user.
pub fn notification(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ApiError>() {
        Some(ApiError::SessionExpired) => {
            "Your session has expired. Please log in again.".to_string()
        }
        Some(ApiError::Authentication(msg))
        | Some(ApiError::Authorization(msg))
        | Some(ApiError::Validation(msg)) => msg.clone(),
        Some(ApiError::Remote { message, .. }) => message.clone(),
        Some(ApiError::Network(e)) if e.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        Some(ApiError::Network(_)) => {
            "Unable to connect to server. Check your internet connection.".to_string()
        }
        Some(other) => other.to_string(),
        None => error.to_string(),
    }
}
