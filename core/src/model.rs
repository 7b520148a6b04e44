//! Storefront records shared by every module.
//!
//! Field names follow the backend's table columns so that rows decode
//! directly into these types. Prices and fees are whole rupees.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Returned when a CLI or config string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value} (expected one of: {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Menu
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Meals,
    Curries,
    Pickles,
    Tiffins,
    Sweets,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Meals,
        Category::Curries,
        Category::Pickles,
        Category::Tiffins,
        Category::Sweets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meals => "meals",
            Self::Curries => "curries",
            Self::Pickles => "pickles",
            Self::Tiffins => "tiffins",
            Self::Sweets => "sweets",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Meals => "Meals",
            Self::Curries => "Curries",
            Self::Pickles => "Pickles",
            Self::Tiffins => "Tiffins",
            Self::Sweets => "Sweets",
        }
    }

    pub fn telugu_name(self) -> &'static str {
        match self {
            Self::Meals => "భోజనాలు",
            Self::Curries => "కూరలు",
            Self::Pickles => "ఊరగాయలు",
            Self::Tiffins => "టిఫిన్లు",
            Self::Sweets => "తీపి పదార్థాలు",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "category",
                value: s.to_string(),
                expected: "meals, curries, pickles, tiffins, sweets",
            })
    }
}

/// Regional origin of a dish. `Both` dishes belong to every region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Andhra,
    Telangana,
    Both,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Andhra => "andhra",
            Self::Telangana => "telangana",
            Self::Both => "both",
        }
    }

    /// Whether a dish from `self` should be listed under the `wanted` region.
    pub fn matches(self, wanted: Region) -> bool {
        self == wanted || self == Region::Both
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "andhra" => Ok(Self::Andhra),
            "telangana" => Ok(Self::Telangana),
            "both" => Ok(Self::Both),
            _ => Err(UnknownVariant {
                kind: "region",
                value: s.to_string(),
                expected: "andhra, telangana, both",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DishType {
    Veg,
    Nonveg,
}

impl DishType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Veg => "veg",
            Self::Nonveg => "nonveg",
        }
    }
}

impl fmt::Display for DishType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DishType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "veg" => Ok(Self::Veg),
            "nonveg" | "non-veg" => Ok(Self::Nonveg),
            _ => Err(UnknownVariant {
                kind: "dish type",
                value: s.to_string(),
                expected: "veg, nonveg",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: u32,
    pub protein: String,
    pub carbs: String,
}

/// A sellable menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telugu: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: u32,
    pub category: Category,
    pub region: Region,
    #[serde(rename = "type")]
    pub dish_type: DishType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub popular: bool,
    /// Hidden from customers when false; admins still see the row.
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

fn default_available() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Delivery areas
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryArea {
    pub id: String,
    pub pincode: String,
    pub area_name: String,
    pub city: String,
    pub delivery_fee: u32,
    pub estimated_delivery_minutes: u32,
    pub is_serviceable: bool,
}

/// Columns written when an admin creates or edits a delivery area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAreaInput {
    pub pincode: String,
    pub area_name: String,
    pub city: String,
    pub delivery_fee: u32,
    pub estimated_delivery_minutes: u32,
    pub is_serviceable: bool,
}

impl DeliveryAreaInput {
    pub fn into_area(self, id: String) -> DeliveryArea {
        DeliveryArea {
            id,
            pincode: self.pincode,
            area_name: self.area_name,
            city: self.city,
            delivery_fee: self.delivery_fee,
            estimated_delivery_minutes: self.estimated_delivery_minutes,
            is_serviceable: self.is_serviceable,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders
// ─────────────────────────────────────────────────────────────────────────────

/// Order lifecycle. `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Preparing",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether this is a terminal state (no further transitions).
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Still moving through the kitchen or on the road.
    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| UnknownVariant {
                kind: "order status",
                value: s.to_string(),
                expected: "placed, confirmed, preparing, out_for_delivery, delivered, cancelled",
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Upi => "upi",
        }
    }

    /// UPI is listed at checkout but not yet taken.
    pub fn is_accepted(self) -> bool {
        matches!(self, PaymentMethod::Cod)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Ok(Self::Cod),
            "upi" => Ok(Self::Upi),
            _ => Err(UnknownVariant {
                kind: "payment method",
                value: s.to_string(),
                expected: "cod, upi",
            }),
        }
    }
}

/// One dish line inside a placed order, frozen at checkout prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(alias = "id")]
    pub dish_id: String,
    pub name: String,
    pub price: u32,
    pub quantity: u32,
}

impl OrderLine {
    pub fn line_total(&self) -> u64 {
        u64::from(self.price) * u64::from(self.quantity)
    }
}

/// Columns written when an order is submitted. The backend assigns `id`
/// and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub items: Vec<OrderLine>,
    pub subtotal: u32,
    pub delivery_fee: u32,
    pub packaging_fee: u32,
    pub total_amount: u32,
    pub customer_name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub delivery_address: String,
    pub city: String,
    pub pincode: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "lines_from_json_or_string")]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub subtotal: u32,
    #[serde(default)]
    pub delivery_fee: u32,
    #[serde(default)]
    pub packaging_fee: u32,
    pub total_amount: u32,
    pub customer_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub delivery_address: String,
    pub city: String,
    pub pincode: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

impl Order {
    pub fn from_new(id: String, created_at: DateTime<Utc>, new: NewOrder) -> Self {
        Self {
            id,
            user_id: new.user_id,
            items: new.items,
            subtotal: new.subtotal,
            delivery_fee: new.delivery_fee,
            packaging_fee: new.packaging_fee,
            total_amount: new.total_amount,
            customer_name: new.customer_name,
            phone: new.phone,
            email: new.email,
            delivery_address: new.delivery_address,
            city: new.city,
            pincode: new.pincode,
            status: new.status,
            payment_method: new.payment_method,
            created_at,
            estimated_delivery_time: new.estimated_delivery_time,
        }
    }

    /// Total quantity across all lines.
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .map(|line| line.quantity)
            .fold(0, u32::saturating_add)
    }

    /// First eight characters of the id, as shown in order lists.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((end, _)) => &self.id[..end],
            None => &self.id,
        }
    }
}

/// Older rows store `items` as a JSON-encoded string instead of an array.
fn lines_from_json_or_string<'de, D>(deserializer: D) -> Result<Vec<OrderLine>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawLines {
        Lines(Vec<OrderLine>),
        Encoded(String),
    }

    match RawLines::deserialize(deserializer)? {
        RawLines::Lines(lines) => Ok(lines),
        RawLines::Encoded(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub default_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.default_address.is_none()
            && self.city.is_none()
            && self.pincode.is_none()
    }

    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = Some(name.clone());
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(address) = &self.default_address {
            profile.default_address = Some(address.clone());
        }
        if let Some(city) = &self.city {
            profile.city = Some(city.clone());
        }
        if let Some(pincode) = &self.pincode {
            profile.pincode = Some(pincode.clone());
        }
    }
}
