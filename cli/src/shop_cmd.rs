//! Customer-facing commands: menu browsing, cart, quotes, checkout and
//! favorites.

use anyhow::Context;
use anyhow::bail;
use clap::Args;
use clap::Subcommand;
use serde_json::json;
use vantalu_core::cart::{AddOutcome, CartStore, MAX_LINE_QUANTITY};
use vantalu_core::catalog::{Catalog, MenuFilter, SortOrder, categories};
use vantalu_core::checkout::{CheckoutService, DeliveryDetails, Quote};
use vantalu_core::favorites::{Favorites, add_all_to_cart};
use vantalu_core::model::{Category, DishType, PaymentMethod, Profile, Region};
use vantalu_core::profile::load_profile;
use vantalu_core::session::Session;

use crate::context::App;
use crate::output::{dish_line, print_json, rupees};

// ─────────────────────────────────────────────────────────────────────────────
// Menu
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MenuArgs {
    /// meals, curries, pickles, tiffins or sweets
    #[arg(long, short = 'c')]
    pub category: Option<Category>,

    /// andhra or telangana; dishes from both regions always match
    #[arg(long, short = 'r')]
    pub region: Option<Region>,

    /// veg or nonveg
    #[arg(long = "type", short = 't')]
    pub dish_type: Option<DishType>,

    /// Only show popular dishes
    #[arg(long)]
    pub popular: bool,

    /// Case-insensitive text search over names and descriptions
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// featured, price-asc, price-desc or name
    #[arg(long, default_value = "featured")]
    pub sort: SortOrder,
}

impl MenuArgs {
    pub fn filter(&self) -> MenuFilter {
        MenuFilter {
            category: self.category,
            region: self.region,
            dish_type: self.dish_type,
            popular_only: self.popular,
            search: self.search.clone(),
            sort: self.sort,
        }
    }
}

pub async fn run_menu(app: &App, args: MenuArgs) -> anyhow::Result<()> {
    let catalog = app.catalog().await?;
    let dishes = catalog.filter(&args.filter());
    if app.json {
        return print_json(&dishes);
    }
    if dishes.is_empty() {
        println!("No dishes match those filters.");
        return Ok(());
    }
    for dish in dishes {
        println!("{}", dish_line(&app.palette, dish));
    }
    Ok(())
}

pub fn run_categories(app: &App) -> anyhow::Result<()> {
    let list = categories();
    if app.json {
        let rows: Vec<_> = list
            .iter()
            .map(|c| json!({ "id": c.id, "name": c.name, "telugu": c.telugu }))
            .collect();
        return print_json(&rows);
    }
    for info in list {
        println!("{:<8}  {}  {}", info.id.as_str(), info.name, app.palette.dim(info.telugu));
    }
    Ok(())
}

pub async fn run_dish(app: &App, id: &str) -> anyhow::Result<()> {
    let catalog = app.catalog().await?;
    let dish = catalog
        .find(id)
        .with_context(|| format!("no dish with id {id}"))?;
    if app.json {
        return print_json(dish);
    }

    println!("{}", dish_line(&app.palette, dish));
    if !dish.description.is_empty() {
        println!("      {}", dish.description);
    }
    println!(
        "      {} · {}",
        dish.category.display_name(),
        dish.region.as_str()
    );
    if !dish.ingredients.is_empty() {
        println!("      Ingredients: {}", dish.ingredients.join(", "));
    }
    if let Some(n) = &dish.nutrition {
        println!(
            "      {} kcal · protein {} · carbs {}",
            n.calories, n.protein, n.carbs
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Cart
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    /// Show cart contents and totals
    Show,

    /// Add one of a dish (increments the quantity if already present)
    Add {
        /// Dish id as listed by `vantalu menu`
        dish_id: String,
    },

    /// Remove a dish from the cart
    Remove { dish_id: String },

    /// Set a dish's quantity; zero or less removes it
    Set {
        dish_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Empty the cart
    Clear,
}

pub async fn run_cart(app: &App, cmd: CartCommand) -> anyhow::Result<()> {
    let mut store = app.cart()?;
    match cmd {
        CartCommand::Show => {}
        CartCommand::Add { dish_id } => {
            let catalog = app.catalog().await?;
            let dish = catalog
                .find(&dish_id)
                .with_context(|| format!("no dish with id {dish_id}"))?;
            match store.add(dish)? {
                AddOutcome::Added => eprintln!("Added {} to cart", dish.name),
                AddOutcome::Incremented { quantity } => {
                    eprintln!("{} quantity is now {quantity}", dish.name);
                }
            }
        }
        CartCommand::Remove { dish_id } => {
            if !store.remove(&dish_id)? {
                bail!("dish {dish_id} is not in the cart");
            }
        }
        CartCommand::Set { dish_id, quantity } => {
            if store.cart().get(&dish_id).is_none() {
                bail!("dish {dish_id} is not in the cart");
            }
            if quantity > i64::from(MAX_LINE_QUANTITY) {
                eprintln!("Quantity capped at {MAX_LINE_QUANTITY}");
            }
            store.update_quantity(&dish_id, quantity)?;
        }
        CartCommand::Clear => store.clear()?,
    }
    print_cart(app, &store)
}

fn print_cart(app: &App, store: &CartStore) -> anyhow::Result<()> {
    if app.json {
        return print_json(&json!({
            "lines": store.lines(),
            "total_items": store.total_items(),
            "total_price": store.total_price(),
        }));
    }
    if store.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }
    for line in store.lines() {
        println!(
            "{:>4}  {} x{}  {}",
            line.dish.id,
            line.dish.name,
            line.quantity,
            rupees(line.line_total())
        );
    }
    println!(
        "{}",
        app.palette.heading(&format!(
            "{} items · {}",
            store.total_items(),
            rupees(store.total_price())
        ))
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Quote & checkout
// ─────────────────────────────────────────────────────────────────────────────

pub async fn run_quote(app: &App, pincode: &str) -> anyhow::Result<()> {
    let store = app.cart()?;
    let service = CheckoutService::new(app.backend(None)?)
        .with_packaging_fee(app.config.packaging_fee);
    let quote = service.quote(store.cart(), pincode).await?;
    if app.json {
        return print_json(&quote_json(&quote));
    }
    print_quote(app, &quote);
    Ok(())
}

fn quote_json(quote: &Quote) -> serde_json::Value {
    json!({
        "area": quote.area,
        "subtotal": quote.subtotal,
        "delivery_fee": quote.delivery_fee,
        "packaging_fee": quote.packaging_fee,
        "total": quote.total,
    })
}

fn print_quote(app: &App, quote: &Quote) {
    println!(
        "Delivering to {}, {} ({})",
        quote.area.area_name, quote.area.city, quote.area.pincode
    );
    println!("  Subtotal      {:>8}", rupees(quote.subtotal));
    println!("  Delivery fee  {:>8}", rupees(quote.delivery_fee));
    println!("  Packaging     {:>8}", rupees(quote.packaging_fee));
    println!(
        "  {}",
        app.palette
            .heading(&format!("Total         {:>8}", rupees(quote.total)))
    );
    println!(
        "  Estimated delivery in {} minutes",
        quote.area.estimated_delivery_minutes
    );
}

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Customer name (defaults to the signed-in profile)
    #[arg(long)]
    pub name: Option<String>,

    /// 10 digit mobile number; +91 prefix is accepted
    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    /// Street address for delivery
    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    /// 6 digit pincode of a serviceable area
    #[arg(long)]
    pub pincode: Option<String>,

    /// cod or upi (only cash on delivery is accepted)
    #[arg(long, default_value = "cod")]
    pub payment: PaymentMethod,
}

impl CheckoutArgs {
    /// Flags win; missing fields fall back to the saved profile.
    pub fn details(&self, profile: Option<&Profile>, session_email: Option<&str>) -> DeliveryDetails {
        DeliveryDetails {
            customer_name: pick(&self.name, profile.and_then(|p| p.name.as_ref())),
            phone: pick(&self.phone, profile.and_then(|p| p.phone.as_ref())),
            email: self
                .email
                .clone()
                .or_else(|| profile.and_then(|p| p.email.clone()))
                .or_else(|| session_email.map(str::to_string)),
            address: pick(&self.address, profile.and_then(|p| p.default_address.as_ref())),
            city: pick(&self.city, profile.and_then(|p| p.city.as_ref())),
            pincode: pick(&self.pincode, profile.and_then(|p| p.pincode.as_ref())),
        }
    }
}

fn pick(flag: &Option<String>, saved: Option<&String>) -> String {
    flag.as_ref().or(saved).cloned().unwrap_or_default()
}

pub async fn run_checkout(app: &App, args: CheckoutArgs) -> anyhow::Result<()> {
    let session = app.current_session().await?;
    let backend = app.backend(session.as_ref())?;
    let profile = match &session {
        Some(session) => match load_profile(backend.as_ref(), session.user_id()).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::warn!(%err, "could not load profile for checkout defaults");
                None
            }
        },
        None => None,
    };
    let details = args.details(
        profile.as_ref(),
        session.as_ref().and_then(|s| s.user.email.as_deref()),
    );

    let mut store = app.cart()?;
    let service = CheckoutService::new(backend).with_packaging_fee(app.config.packaging_fee);
    let order = service
        .place_order(
            &mut store,
            &details,
            args.payment,
            session.as_ref().map(Session::user_id),
        )
        .await?;

    if app.json {
        return print_json(&order);
    }
    println!(
        "{} Order {} placed · {}",
        app.palette.success("✓"),
        app.palette.heading(order.short_id()),
        rupees(order.total_amount)
    );
    if let Some(eta) = order.estimated_delivery_time {
        println!("  Estimated delivery by {}", eta.format("%H:%M UTC"));
    }
    println!("  Track it with `vantalu track {}`", order.id);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Favorites
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List favorite dishes
    List,

    /// Add or remove a dish from favorites
    Toggle { dish_id: String },

    /// Put one of every favorite dish in the cart
    AddAll,
}

pub async fn run_favorites(app: &App, cmd: FavoritesCommand) -> anyhow::Result<()> {
    let session = app.require_session().await?;
    let favorites = Favorites::new(app.backend(Some(&session))?, session.user_id());
    let catalog = app.catalog().await?;
    match cmd {
        FavoritesCommand::List => print_favorites(app, &favorites, &catalog).await,
        FavoritesCommand::Toggle { dish_id } => {
            let dish = catalog
                .find(&dish_id)
                .with_context(|| format!("no dish with id {dish_id}"))?;
            let added = favorites.toggle(&dish.id).await?;
            if app.json {
                return print_json(&json!({ "dish_id": dish.id, "favorite": added }));
            }
            let verb = if added { "Added" } else { "Removed" };
            println!("{verb} {} {} favorites", dish.name, if added { "to" } else { "from" });
            Ok(())
        }
        FavoritesCommand::AddAll => {
            let dishes = favorites.dishes(&catalog).await?;
            let mut store = app.cart()?;
            let added = add_all_to_cart(&dishes, &mut store)?;
            if app.json {
                return print_json(&json!({ "added": added }));
            }
            println!("Added {added} favorite dishes to the cart");
            Ok(())
        }
    }
}

async fn print_favorites(app: &App, favorites: &Favorites, catalog: &Catalog) -> anyhow::Result<()> {
    let dishes = favorites.dishes(catalog).await?;
    if app.json {
        return print_json(&dishes);
    }
    if dishes.is_empty() {
        println!("No favorites yet. Add one with `vantalu favorites toggle <dish>`.");
    }
    for dish in dishes {
        println!("{}", dish_line(&app.palette, dish));
    }
    Ok(())
}
