//! Loyalty Desk - command line front end for the loyalty program API.
//!
//! # Usage
//!
//! ```bash
//! # Log in as a shop administrator
//! loyaltydesk login --role admin --email admin@example.com
//!
//! # Check the user dashboard
//! loyaltydesk points balance
//!
//! # Generate a shop check-in QR code
//! loyaltydesk qr --shop-id 5 --url https://shop.example/checkin --out shop.png
//! ```
//!
//! Set `RUST_LOG` to control stderr logging and `LOYALTYDESK_LOG_DIR` to also
//! write a daily log file.

mod app;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use loyaltydesk_core::models::{TierConfigDraft, TierDraft};
use loyaltydesk_core::Role;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

#[derive(Parser)]
#[command(name = "loyaltydesk")]
#[command(author, version, about = "Loyalty program dashboard for shops and customers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        /// Dashboard to log in to
        #[arg(long, default_value = "user")]
        role: Role,

        /// Log in as a shop employee
        #[arg(long)]
        employee: bool,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(long)]
        org_id: Option<i64>,

        #[arg(long, env = "LOYALTYDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create a customer account
    Signup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        /// Id of the customer who referred you
        #[arg(long)]
        referrer: Option<String>,

        #[arg(long)]
        org_id: Option<i64>,
    },
    /// End the current session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Manage loyalty tiers
    Tiers {
        #[command(subcommand)]
        action: TierAction,
    },
    /// Manage tier configurations
    Configs {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Brand a tier's loyalty wallet
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Download a shop's check-in QR code
    Qr {
        #[arg(long)]
        shop_id: i64,

        /// Page the QR code points to (defaults to the configured check-in page)
        #[arg(long)]
        url: Option<String>,

        /// Where to write the PNG
        #[arg(short, long, default_value = "shop-qr.png")]
        out: PathBuf,
    },
    /// Set the points a shop check-in earns
    ShopReward {
        #[command(subcommand)]
        action: ShopRewardAction,
    },
    /// Check in at a shop
    CheckIn {
        #[arg(long)]
        shop_id: i64,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Redeem a points code against an order
    Redeem {
        #[arg(long)]
        order_id: String,

        #[arg(long)]
        code: String,

        #[arg(long)]
        points: i64,
    },
    /// Points balance, history, sharing and checkout rewards
    Points {
        #[command(subcommand)]
        action: PointsAction,
    },
    /// List shops with their sub-areas
    Shops {
        #[arg(long)]
        org_id: Option<i64>,
    },
}

#[derive(Subcommand)]
enum TierAction {
    List,
    /// Create a tier, or update one when --id is given
    Save {
        #[arg(long)]
        id: Option<i64>,

        #[arg(long)]
        name: String,

        #[arg(long)]
        active: bool,

        #[arg(long)]
        special: bool,

        /// Lowest purchase count for the tier
        #[arg(long, default_value_t = 0)]
        from: i64,

        /// Highest purchase count for the tier
        #[arg(long, default_value_t = 0)]
        to: i64,

        /// Cashback percentage, 0 to under 100
        #[arg(long, default_value_t = 0.0)]
        cashback: f64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    List,
    /// Create a configuration, or update one when --id is given
    Save {
        #[arg(long)]
        id: Option<i64>,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        default_tier: i64,

        /// Points required per online order
        #[arg(long)]
        required_points: String,

        /// Cashback granted for those points
        #[arg(long)]
        cashback_reward: String,

        #[arg(long)]
        referral_amount: Option<String>,

        #[arg(long)]
        review_amount: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args)]
struct BrandingArgs {
    #[arg(long)]
    tier: i64,

    #[arg(long)]
    primary: Option<String>,

    #[arg(long)]
    secondary: Option<String>,

    #[arg(long)]
    bg: Option<String>,

    #[arg(long)]
    icon: Option<PathBuf>,

    #[arg(long)]
    logo: Option<PathBuf>,

    #[arg(long)]
    cover: Option<PathBuf>,
}

#[derive(Subcommand)]
enum WalletAction {
    /// Create wallet branding (all colors and images required)
    Create(BrandingArgs),
    /// Update only the given colors and images
    Update(BrandingArgs),
}

#[derive(Subcommand)]
enum ShopRewardAction {
    Create {
        #[arg(long)]
        shop_id: i64,

        #[arg(long)]
        points: i64,
    },
    Update {
        #[arg(long)]
        shop_id: i64,

        #[arg(long)]
        points: i64,
    },
}

#[derive(Subcommand)]
enum PointsAction {
    Balance,
    History,
    /// Give points to another customer
    Share {
        #[arg(long)]
        email: String,

        #[arg(long)]
        points: i64,
    },
    /// Preview the reward for an order amount
    Checkout {
        #[arg(long)]
        amount: f64,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must outlive `main`'s work.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os("LOYALTYDESK_LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "loyaltydesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", app::notification(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut app = App::new()?;
    info!("Loyalty Desk starting");

    match cli.command {
        Commands::Login {
            role,
            employee,
            email,
            org_id,
            password,
        } => app.login(role, employee, email, org_id, password).await,
        Commands::Signup {
            name,
            email,
            referrer,
            org_id,
        } => app.signup(name, email, referrer, org_id).await,
        Commands::Logout => {
            app.logout();
            Ok(())
        }
        Commands::Whoami => app.whoami(),
        Commands::Tiers { action } => match action {
            TierAction::List => app.list_tiers().await,
            TierAction::Save {
                id,
                name,
                active,
                special,
                from,
                to,
                cashback,
            } => {
                let draft = TierDraft {
                    tier_id: id,
                    name,
                    is_active: active,
                    is_special: special,
                    purchase_from: from,
                    purchase_to: to,
                    cashback_percent: cashback,
                };
                app.save_tier(draft).await
            }
            TierAction::Delete { id } => app.delete_tier(id).await,
        },
        Commands::Configs { action } => match action {
            ConfigAction::List => app.list_tier_configs().await,
            ConfigAction::Save {
                id,
                description,
                default_tier,
                required_points,
                cashback_reward,
                referral_amount,
                review_amount,
            } => {
                let mut draft =
                    TierConfigDraft::new(default_tier, &required_points, &cashback_reward);
                draft.id = id;
                draft.description = description;
                if let Some(amount) = referral_amount {
                    draft.referral_amount = amount;
                }
                if let Some(amount) = review_amount {
                    draft.review_amount = amount;
                }
                app.save_tier_config(draft).await
            }
            ConfigAction::Delete { id } => app.delete_tier_config(id).await,
        },
        Commands::Wallet { action } => match action {
            WalletAction::Create(args) => {
                app.save_wallet(args.into_branding_request(), true).await
            }
            WalletAction::Update(args) => {
                app.save_wallet(args.into_branding_request(), false).await
            }
        },
        Commands::Qr { shop_id, url, out } => app.qr_code(shop_id, url, out).await,
        Commands::ShopReward { action } => match action {
            ShopRewardAction::Create { shop_id, points } => {
                app.shop_reward(shop_id, points, true).await
            }
            ShopRewardAction::Update { shop_id, points } => {
                app.shop_reward(shop_id, points, false).await
            }
        },
        Commands::CheckIn { shop_id, lat, lon } => app.check_in(shop_id, lat, lon).await,
        Commands::Redeem {
            order_id,
            code,
            points,
        } => app.redeem(order_id, code, points).await,
        Commands::Points { action } => match action {
            PointsAction::Balance => app.points_balance().await,
            PointsAction::History => app.points_history().await,
            PointsAction::Share { email, points } => app.share_points(email, points).await,
            PointsAction::Checkout { amount } => app.checkout_reward(amount).await,
        },
        Commands::Shops { org_id } => app.shops(org_id).await,
    }
}

impl BrandingArgs {
    fn into_branding_request(self) -> app::BrandingRequest {
        app::BrandingRequest {
            tier_id: self.tier,
            primary_color: self.primary,
            secondary_color: self.secondary,
            bg_color: self.bg,
            icon: self.icon,
            logo: self.logo,
            cover_image: self.cover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_login_role() {
        let args = ["loyaltydesk", "login", "--role", "admin", "--email", "a@b.com"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Login { role, email, .. } => {
                assert_eq!(role, Role::Admin);
                assert_eq!(email.as_deref(), Some("a@b.com"));
            }
            _ => panic!("expected login"),
        }
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "loyaltydesk", "check-in", "--shop-id", "5", "--lat", "-33.9", "--lon", "-70.6",
        ])
        .unwrap();
        match cli.command {
            Commands::CheckIn { shop_id, lat, lon } => {
                assert_eq!(shop_id, 5);
                assert_eq!(lat, -33.9);
                assert_eq!(lon, -70.6);
            }
            _ => panic!("expected check-in"),
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(Cli::try_parse_from(["loyaltydesk", "login", "--role", "owner"]).is_err());
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["loyaltydesk", "settings"]).is_err());
    }
}
