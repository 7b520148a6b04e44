//! `vantalu admin ...`: back-office commands for users holding the admin
//! role.

use anyhow::Context;
use clap::Args;
use clap::Subcommand;
use serde_json::json;
use vantalu_core::admin::{AdminConsole, OrderStats, StatusChange};
use vantalu_core::model::{
    Category, DeliveryArea, DeliveryAreaInput, Dish, DishType, Order, OrderStatus, Region,
};

use crate::context::App;
use crate::output::{Palette, dish_line, print_json, rupees, short};

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// List all orders, newest first
    Orders {
        /// Only show orders with this status
        #[arg(long)]
        status: Option<OrderStatus>,
    },

    /// Move an order to a new status
    SetStatus {
        order_id: String,
        /// placed, confirmed, preparing, out_for_delivery, delivered or cancelled
        status: OrderStatus,
    },

    /// Order counts and revenue
    Stats,

    /// List delivery areas
    Areas,

    /// Add a delivery area
    AreaAdd(AreaArgs),

    /// Edit a delivery area; omitted fields keep their values
    AreaUpdate {
        id: String,
        #[command(flatten)]
        patch: AreaPatch,
    },

    /// Delete a delivery area
    AreaDelete { id: String },

    /// List every menu item, including unavailable ones
    Menu,

    /// Add a menu item
    MenuAdd(DishArgs),

    /// Edit a menu item; omitted fields keep their values
    MenuUpdate {
        id: String,
        #[command(flatten)]
        patch: DishPatch,
    },

    /// Delete a menu item
    MenuDelete { id: String },

    /// List registered users
    Users,
}

#[derive(Debug, Args)]
pub struct AreaArgs {
    #[arg(long)]
    pub pincode: String,

    #[arg(long = "area-name")]
    pub area_name: String,

    #[arg(long)]
    pub city: String,

    /// Delivery fee in rupees
    #[arg(long)]
    pub fee: u32,

    /// Estimated delivery time in minutes
    #[arg(long, default_value_t = 45)]
    pub minutes: u32,

    /// Create the area without accepting orders yet
    #[arg(long)]
    pub paused: bool,
}

impl From<AreaArgs> for DeliveryAreaInput {
    fn from(args: AreaArgs) -> Self {
        Self {
            pincode: args.pincode,
            area_name: args.area_name,
            city: args.city,
            delivery_fee: args.fee,
            estimated_delivery_minutes: args.minutes,
            is_serviceable: !args.paused,
        }
    }
}

#[derive(Debug, Args)]
pub struct AreaPatch {
    #[arg(long)]
    pub pincode: Option<String>,
    #[arg(long = "area-name")]
    pub area_name: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub fee: Option<u32>,
    #[arg(long)]
    pub minutes: Option<u32>,
    /// true or false
    #[arg(long)]
    pub serviceable: Option<bool>,
}

impl AreaPatch {
    pub fn apply(self, area: DeliveryArea) -> DeliveryAreaInput {
        DeliveryAreaInput {
            pincode: self.pincode.unwrap_or(area.pincode),
            area_name: self.area_name.unwrap_or(area.area_name),
            city: self.city.unwrap_or(area.city),
            delivery_fee: self.fee.unwrap_or(area.delivery_fee),
            estimated_delivery_minutes: self.minutes.unwrap_or(area.estimated_delivery_minutes),
            is_serviceable: self.serviceable.unwrap_or(area.is_serviceable),
        }
    }
}

#[derive(Debug, Args)]
pub struct DishArgs {
    /// Assigned by the backend when omitted
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub telugu: Option<String>,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Price in rupees
    #[arg(long)]
    pub price: u32,
    #[arg(long)]
    pub category: Category,
    #[arg(long)]
    pub region: Region,
    #[arg(long = "type")]
    pub dish_type: DishType,
    #[arg(long)]
    pub image: Option<String>,
    #[arg(long)]
    pub popular: bool,
    /// Hide the dish from customers
    #[arg(long)]
    pub unavailable: bool,
    /// Comma separated
    #[arg(long, value_delimiter = ',')]
    pub ingredients: Vec<String>,
}

impl From<DishArgs> for Dish {
    fn from(args: DishArgs) -> Self {
        Self {
            id: args.id.unwrap_or_default(),
            name: args.name,
            telugu: args.telugu,
            description: args.description,
            price: args.price,
            category: args.category,
            region: args.region,
            dish_type: args.dish_type,
            image: args.image,
            popular: args.popular,
            available: !args.unavailable,
            ingredients: trimmed(args.ingredients),
            nutrition: None,
        }
    }
}

#[derive(Debug, Args)]
pub struct DishPatch {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub telugu: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<u32>,
    #[arg(long)]
    pub category: Option<Category>,
    #[arg(long)]
    pub region: Option<Region>,
    #[arg(long = "type")]
    pub dish_type: Option<DishType>,
    #[arg(long)]
    pub image: Option<String>,
    /// true or false
    #[arg(long)]
    pub popular: Option<bool>,
    /// true or false
    #[arg(long)]
    pub available: Option<bool>,
    /// Comma separated; replaces the current list
    #[arg(long, value_delimiter = ',')]
    pub ingredients: Option<Vec<String>>,
}

impl DishPatch {
    pub fn apply(self, dish: Dish) -> Dish {
        Dish {
            id: dish.id,
            name: self.name.unwrap_or(dish.name),
            telugu: self.telugu.or(dish.telugu),
            description: self.description.unwrap_or(dish.description),
            price: self.price.unwrap_or(dish.price),
            category: self.category.unwrap_or(dish.category),
            region: self.region.unwrap_or(dish.region),
            dish_type: self.dish_type.unwrap_or(dish.dish_type),
            image: self.image.or(dish.image),
            popular: self.popular.unwrap_or(dish.popular),
            available: self.available.unwrap_or(dish.available),
            ingredients: self.ingredients.map(trimmed).unwrap_or(dish.ingredients),
            nutrition: dish.nutrition,
        }
    }
}

fn trimmed(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub async fn run_admin(app: &App, cmd: AdminCommand) -> anyhow::Result<()> {
    let session = app.require_session().await?;
    let console = AdminConsole::open(app.backend(Some(&session))?, &session).await?;
    tracing::debug!(admin_id = console.admin_id(), "admin console opened");
    let palette = &app.palette;

    match cmd {
        AdminCommand::Orders { status } => {
            let orders: Vec<Order> = console
                .orders()
                .await?
                .into_iter()
                .filter(|o| status.is_none_or(|wanted| o.status == wanted))
                .collect();
            if app.json {
                return print_json(&orders);
            }
            if orders.is_empty() {
                println!("No orders.");
            }
            for order in &orders {
                println!("{}", order_line(palette, order));
            }
        }
        AdminCommand::SetStatus { order_id, status } => {
            match console.set_order_status(&order_id, status).await? {
                StatusChange::Updated { from, order } => {
                    if app.json {
                        return print_json(&order);
                    }
                    println!(
                        "Order #{} {} → {}",
                        order.short_id(),
                        palette.status(from),
                        palette.status(order.status)
                    );
                }
                StatusChange::Unchanged(order) => {
                    if app.json {
                        return print_json(&order);
                    }
                    println!(
                        "Order #{} is already {}",
                        order.short_id(),
                        palette.status(order.status)
                    );
                }
            }
        }
        AdminCommand::Stats => {
            let stats = console.stats().await?;
            if app.json {
                return print_json(&stats_json(&stats));
            }
            print!("{}", render_stats(palette, &stats));
        }
        AdminCommand::Areas => {
            let areas = console.delivery_areas().await?;
            if app.json {
                return print_json(&areas);
            }
            for area in &areas {
                println!("{}", area_line(palette, area));
            }
        }
        AdminCommand::AreaAdd(args) => {
            let area = console.create_delivery_area(&args.into()).await?;
            report_area(app, "Added", &area)?;
        }
        AdminCommand::AreaUpdate { id, patch } => {
            let current = console
                .delivery_areas()
                .await?
                .into_iter()
                .find(|a| a.id == id)
                .with_context(|| format!("no delivery area with id {id}"))?;
            let area = console
                .update_delivery_area(&id, &patch.apply(current))
                .await?;
            report_area(app, "Updated", &area)?;
        }
        AdminCommand::AreaDelete { id } => {
            console.delete_delivery_area(&id).await?;
            println!("Deleted delivery area {id}");
        }
        AdminCommand::Menu => {
            let dishes = console.menu_items().await?;
            if app.json {
                return print_json(&dishes);
            }
            for dish in &dishes {
                let hidden = if dish.available { "" } else { "  (hidden)" };
                println!("{}{}", dish_line(palette, dish), palette.dim(hidden));
            }
        }
        AdminCommand::MenuAdd(args) => {
            let dish = console.create_menu_item(&args.into()).await?;
            report_dish(app, "Added", &dish)?;
        }
        AdminCommand::MenuUpdate { id, patch } => {
            let current = console
                .menu_items()
                .await?
                .into_iter()
                .find(|d| d.id == id)
                .with_context(|| format!("no menu item with id {id}"))?;
            let dish = console.update_menu_item(&patch.apply(current)).await?;
            report_dish(app, "Updated", &dish)?;
        }
        AdminCommand::MenuDelete { id } => {
            console.delete_menu_item(&id).await?;
            println!("Deleted menu item {id}");
        }
        AdminCommand::Users => {
            let users = console.users().await?;
            if app.json {
                return print_json(&users);
            }
            for user in &users {
                println!(
                    "{}  {:<20}  {:<28}  {}",
                    short(&user.id),
                    user.name.as_deref().unwrap_or("-"),
                    user.email.as_deref().unwrap_or("-"),
                    user.phone.as_deref().unwrap_or("-"),
                );
            }
        }
    }
    Ok(())
}

fn report_area(app: &App, verb: &str, area: &DeliveryArea) -> anyhow::Result<()> {
    if app.json {
        return print_json(area);
    }
    println!("{verb} {}", area_line(&app.palette, area));
    Ok(())
}

fn report_dish(app: &App, verb: &str, dish: &Dish) -> anyhow::Result<()> {
    if app.json {
        return print_json(dish);
    }
    println!("{verb} {}", dish_line(&app.palette, dish));
    Ok(())
}

pub fn order_line(palette: &Palette, order: &Order) -> String {
    format!(
        "#{}  {}  {:<16}  {:<10}  {:>6}  {}",
        order.short_id(),
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.customer_name,
        order.pincode,
        rupees(order.total_amount),
        palette.status(order.status),
    )
}

pub fn area_line(palette: &Palette, area: &DeliveryArea) -> String {
    let state = if area.is_serviceable {
        palette.success("open")
    } else {
        palette.failure("paused")
    };
    format!(
        "{}  {}  {}, {}  fee {}  ~{} min  {state}",
        short(&area.id),
        area.pincode,
        area.area_name,
        area.city,
        rupees(area.delivery_fee),
        area.estimated_delivery_minutes,
    )
}

fn stats_json(stats: &OrderStats) -> serde_json::Value {
    let by_status: serde_json::Map<String, serde_json::Value> = stats
        .by_status
        .iter()
        .map(|(status, count)| (status.as_str().to_string(), json!(count)))
        .collect();
    json!({
        "total_orders": stats.total_orders,
        "total_revenue": stats.total_revenue,
        "pending": stats.pending,
        "completed": stats.completed,
        "cancelled": stats.cancelled,
        "average_order_value": stats.average_order_value,
        "by_status": by_status,
    })
}

pub fn render_stats(palette: &Palette, stats: &OrderStats) -> String {
    let mut out = format!(
        "{}\n  Orders     {}\n  Revenue    {}\n  Average    {}\n  Pending    {}\n  Completed  {}\n  Cancelled  {}\n",
        palette.heading("Orders overview"),
        stats.total_orders,
        rupees(stats.total_revenue),
        rupees(stats.average_order_value),
        stats.pending,
        stats.completed,
        stats.cancelled,
    );
    for (status, count) in &stats.by_status {
        out.push_str(&format!("  {:<18} {count}\n", palette.status(*status)));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vantalu_core::admin::order_stats;
    use vantalu_core::catalog::builtin_dishes;

    fn area() -> DeliveryArea {
        DeliveryArea {
            id: "area-guntur-1".to_string(),
            pincode: "522002".to_string(),
            area_name: "Brodipet".to_string(),
            city: "Guntur".to_string(),
            delivery_fee: 30,
            estimated_delivery_minutes: 45,
            is_serviceable: true,
        }
    }

    #[test]
    fn area_patch_keeps_unset_fields() {
        let patch = AreaPatch {
            pincode: None,
            area_name: None,
            city: None,
            fee: Some(40),
            minutes: None,
            serviceable: Some(false),
        };
        let input = patch.apply(area());
        assert_eq!(input.pincode, "522002");
        assert_eq!(input.delivery_fee, 40);
        assert!(!input.is_serviceable);
    }

    #[test]
    fn area_line_shows_state() {
        assert_eq!(
            area_line(&Palette::new(false), &area()),
            "area-gun  522002  Brodipet, Guntur  fee ₹30  ~45 min  open"
        );
    }

    #[test]
    fn dish_args_trim_ingredients_and_hide() {
        let dish: Dish = DishArgs {
            id: None,
            name: "Gongura Pachadi".to_string(),
            telugu: None,
            description: String::new(),
            price: 180,
            category: Category::Pickles,
            region: Region::Andhra,
            dish_type: DishType::Veg,
            image: None,
            popular: false,
            unavailable: true,
            ingredients: vec![" gongura ".to_string(), String::new(), "chilli".to_string()],
        }
        .into();
        assert_eq!(dish.id, "");
        assert!(!dish.available);
        assert_eq!(dish.ingredients, vec!["gongura".to_string(), "chilli".to_string()]);
    }

    #[test]
    fn dish_patch_replaces_only_given_fields() {
        let original = builtin_dishes().remove(0);
        let patch = DishPatch {
            name: None,
            telugu: None,
            description: None,
            price: Some(275),
            category: None,
            region: None,
            dish_type: None,
            image: None,
            popular: None,
            available: Some(false),
            ingredients: None,
        };
        let updated = patch.apply(original.clone());
        assert_eq!(updated.price, 275);
        assert!(!updated.available);
        assert_eq!(updated.name, original.name);
        assert_eq!(updated.ingredients, original.ingredients);
    }

    #[test]
    fn stats_render_and_encode() {
        let stats = order_stats(&[]);
        let text = render_stats(&Palette::new(false), &stats);
        assert!(text.contains("Orders     0"));
        assert!(text.contains("[Out for delivery]"));
        let encoded = stats_json(&stats);
        assert_eq!(encoded["by_status"]["delivered"], json!(0));
        assert_eq!(encoded["average_order_value"], json!(0));
    }
}
