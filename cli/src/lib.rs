//! Command-line storefront for Vantalu: browse the menu, manage the cart,
//! check out, track orders and run the admin console.

mod account_cmd;
mod admin_cmd;
mod context;
mod order_cmd;
mod output;
mod shop_cmd;

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

pub use account_cmd::{LoginArgs, ProfileCommand, SignupArgs};
pub use admin_cmd::AdminCommand;
pub use context::App;
pub use order_cmd::TrackArgs;
pub use shop_cmd::{CartCommand, CheckoutArgs, FavoritesCommand, MenuArgs};

#[derive(Debug, Parser)]
#[command(name = "vantalu", version, about = "Telugu home-style food, from the terminal")]
pub struct Cli {
    /// Directory holding config.toml, the cart and the session
    /// (defaults to $VANTALU_HOME or ~/.vantalu)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long = "json", short = 'j', global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse the menu
    Menu(MenuArgs),

    /// List menu categories
    Categories,

    /// Show one dish in detail
    Dish {
        /// Dish id as listed by `vantalu menu`
        id: String,
    },

    /// View or change the cart
    #[command(subcommand)]
    Cart(CartCommand),

    /// Price the cart for delivery to a pincode
    Quote {
        #[arg(long)]
        pincode: String,
    },

    /// Place an order for the cart
    Checkout(CheckoutArgs),

    /// Show an order's progress
    Track(TrackArgs),

    /// Past orders of the signed-in user
    Orders,

    /// Favorite dishes of the signed-in user
    #[command(subcommand)]
    Favorites(FavoritesCommand),

    /// Sign in with email and password
    Login(LoginArgs),

    /// Create an account
    Signup(SignupArgs),

    /// Sign out and forget the stored session
    Logout,

    /// View or edit your profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Back-office commands (admin role required)
    #[command(subcommand)]
    Admin(AdminCommand),
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let app = App::load(cli.home, cli.json)?;
    run_command(&app, cli.command).await
}

pub async fn run_command(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Menu(args) => shop_cmd::run_menu(app, args).await,
        Command::Categories => shop_cmd::run_categories(app),
        Command::Dish { id } => shop_cmd::run_dish(app, &id).await,
        Command::Cart(cmd) => shop_cmd::run_cart(app, cmd).await,
        Command::Quote { pincode } => shop_cmd::run_quote(app, &pincode).await,
        Command::Checkout(args) => shop_cmd::run_checkout(app, args).await,
        Command::Track(args) => order_cmd::run_track(app, args).await,
        Command::Orders => order_cmd::run_orders(app).await,
        Command::Favorites(cmd) => shop_cmd::run_favorites(app, cmd).await,
        Command::Login(args) => account_cmd::run_login(app, args).await,
        Command::Signup(args) => account_cmd::run_signup(app, args).await,
        Command::Logout => account_cmd::run_logout(app).await,
        Command::Profile(cmd) => account_cmd::run_profile(app, cmd).await,
        Command::Admin(cmd) => admin_cmd::run_admin(app, cmd).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::output::Palette;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use vantalu_core::StoreConfig;
    use vantalu_core::catalog::SortOrder;
    use vantalu_core::model::{Category, OrderStatus, PaymentMethod, Region};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vantalu").chain(args.iter().copied())).unwrap()
    }

    fn offline_app(dir: &TempDir) -> App {
        App::with_config(
            StoreConfig::defaults(dir.path().to_path_buf()),
            false,
            Palette::new(false),
        )
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn menu_filters_parse() {
        let cli = parse(&[
            "menu", "-c", "curries", "--region", "telangana", "--sort", "price-desc", "--popular",
        ]);
        let Command::Menu(args) = cli.command else {
            panic!("expected menu");
        };
        assert_eq!(args.category, Some(Category::Curries));
        assert_eq!(args.region, Some(Region::Telangana));
        assert_eq!(args.sort, SortOrder::PriceHighToLow);
        assert!(args.popular);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = Cli::try_parse_from(["vantalu", "menu", "--category", "snacks"]).unwrap_err();
        assert!(err.to_string().contains("snacks"));
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["cart", "show", "--json", "--home", "/tmp/vantalu"]);
        assert!(cli.json);
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/vantalu")));
        assert!(matches!(cli.command, Command::Cart(CartCommand::Show)));
    }

    #[test]
    fn cart_set_accepts_negative_quantity() {
        let cli = parse(&["cart", "set", "3", "-1"]);
        assert!(matches!(
            cli.command,
            Command::Cart(CartCommand::Set { ref dish_id, quantity: -1 }) if dish_id == "3"
        ));
    }

    #[test]
    fn checkout_defaults_to_cash_on_delivery() {
        let cli = parse(&["checkout", "--pincode", "522002"]);
        let Command::Checkout(args) = cli.command else {
            panic!("expected checkout");
        };
        assert_eq!(args.payment, PaymentMethod::Cod);
        assert_eq!(args.pincode.as_deref(), Some("522002"));
    }

    #[test]
    fn admin_set_status_accepts_spaced_names() {
        let cli = parse(&["admin", "set-status", "ord-1", "out-for-delivery"]);
        assert!(matches!(
            cli.command,
            Command::Admin(AdminCommand::SetStatus {
                status: OrderStatus::OutForDelivery,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn cart_commands_persist_between_runs() {
        let dir = TempDir::new().unwrap();
        let app = offline_app(&dir);
        run_command(&app, parse(&["cart", "add", "3"]).command)
            .await
            .unwrap();
        run_command(&app, parse(&["cart", "add", "3"]).command)
            .await
            .unwrap();
        run_command(&app, parse(&["cart", "add", "6"]).command)
            .await
            .unwrap();

        let store = app.cart().unwrap();
        assert_eq!(store.total_items(), 3);
        assert_eq!(store.lines()[0].quantity, 2);

        run_command(&app, parse(&["cart", "set", "3", "0"]).command)
            .await
            .unwrap();
        assert_eq!(app.cart().unwrap().total_items(), 1);
    }

    #[tokio::test]
    async fn huge_cart_quantity_is_capped() {
        let dir = TempDir::new().unwrap();
        let app = offline_app(&dir);
        run_command(&app, parse(&["cart", "add", "1"]).command)
            .await
            .unwrap();
        run_command(&app, parse(&["cart", "set", "1", "20000000"]).command)
            .await
            .unwrap();

        let store = app.cart().unwrap();
        assert_eq!(store.total_items(), 99);
        assert_eq!(store.total_price(), 250 * 99);
    }

    #[tokio::test]
    async fn removing_missing_dish_fails() {
        let dir = TempDir::new().unwrap();
        let app = offline_app(&dir);
        let err = run_command(&app, parse(&["cart", "remove", "9"]).command)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not in the cart"));
    }

    #[tokio::test]
    async fn signed_out_users_cannot_list_orders() {
        let dir = TempDir::new().unwrap();
        let app = offline_app(&dir);
        let err = run_command(&app, Command::Orders).await.unwrap_err();
        assert!(err.to_string().contains("not signed in"));
    }
}
