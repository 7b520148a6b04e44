//! Checkout: delivery details, serviceability gate, quote and submission.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::cart::{Cart, CartError, CartStore};
use crate::config::DEFAULT_PACKAGING_FEE;
use crate::model::{DeliveryArea, NewOrder, Order, OrderLine, OrderStatus, PaymentMethod};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("payment method {0} is not available yet")]
    PaymentUnavailable(PaymentMethod),

    #[error("we do not deliver to pincode {0} yet")]
    UnknownPincode(String),

    #[error("delivery to {area_name} ({pincode}) is currently paused")]
    NotServiceable { pincode: String, area_name: String },

    #[error("order total of ₹{0} is too large")]
    TotalTooLarge(u64),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Customer and address fields collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryDetails {
    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub city: String,
    pub pincode: String,
}

impl DeliveryDetails {
    /// Trims every field, normalises the phone number to ten digits and
    /// rejects anything incomplete.
    pub fn validated(&self) -> Result<Self, CheckoutError> {
        let customer_name = required("name", &self.customer_name)?;
        let address = required("address", &self.address)?;
        let city = required("city", &self.city)?;
        let phone = normalize_phone(&self.phone).ok_or(CheckoutError::InvalidField {
            field: "phone",
            reason: "expected a 10 digit mobile number",
        })?;
        let pincode = self.pincode.trim().to_string();
        if !is_valid_pincode(&pincode) {
            return Err(CheckoutError::InvalidField {
                field: "pincode",
                reason: "expected 6 digits",
            });
        }
        let email = match self.email.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(email) if is_plausible_email(email) => Some(email.to_string()),
            Some(_) => {
                return Err(CheckoutError::InvalidField {
                    field: "email",
                    reason: "expected an address like name@example.com",
                });
            }
        };
        Ok(Self {
            customer_name,
            phone,
            email,
            address,
            city,
            pincode,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, CheckoutError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CheckoutError::InvalidField {
            field,
            reason: "must not be empty",
        });
    }
    Ok(trimmed.to_string())
}

/// Ten-digit mobile number with spaces, dashes and an optional `+91`/`91`
/// country prefix stripped.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    let digits = compact
        .strip_prefix("+91")
        .or_else(|| compact.strip_prefix("91").filter(|rest| rest.len() == 10))
        .unwrap_or(compact.as_str());
    (digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit())).then(|| digits.to_string())
}

pub fn is_valid_pincode(pincode: &str) -> bool {
    pincode.len() == 6 && pincode.bytes().all(|b| b.is_ascii_digit())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Price breakdown for a cart delivered to one area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub area: DeliveryArea,
    pub subtotal: u32,
    pub delivery_fee: u32,
    pub packaging_fee: u32,
    pub total: u32,
}

impl Quote {
    pub fn estimated_delivery_time(&self, placed_at: DateTime<Utc>) -> DateTime<Utc> {
        placed_at + Duration::minutes(i64::from(self.area.estimated_delivery_minutes))
    }
}

/// Freezes the cart into order lines at current prices.
pub fn order_lines(cart: &Cart) -> Vec<OrderLine> {
    cart.lines()
        .iter()
        .map(|line| OrderLine {
            dish_id: line.dish.id.clone(),
            name: line.dish.name.clone(),
            price: line.dish.price,
            quantity: line.quantity,
        })
        .collect()
}

pub fn build_order(
    cart: &Cart,
    details: &DeliveryDetails,
    quote: &Quote,
    payment_method: PaymentMethod,
    user_id: Option<&str>,
    placed_at: DateTime<Utc>,
) -> NewOrder {
    NewOrder {
        user_id: user_id.map(str::to_string),
        items: order_lines(cart),
        subtotal: quote.subtotal,
        delivery_fee: quote.delivery_fee,
        packaging_fee: quote.packaging_fee,
        total_amount: quote.total,
        customer_name: details.customer_name.clone(),
        phone: details.phone.clone(),
        email: details.email.clone(),
        delivery_address: details.address.clone(),
        city: details.city.clone(),
        pincode: details.pincode.clone(),
        status: OrderStatus::Placed,
        payment_method,
        estimated_delivery_time: Some(quote.estimated_delivery_time(placed_at)),
    }
}

pub struct CheckoutService {
    backend: Arc<dyn Backend>,
    packaging_fee: u32,
}

impl CheckoutService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            packaging_fee: DEFAULT_PACKAGING_FEE,
        }
    }

    pub fn with_packaging_fee(mut self, fee: u32) -> Self {
        self.packaging_fee = fee;
        self
    }

    /// Looks up the delivery area for a pincode and fails unless it is
    /// known and currently serviceable.
    pub async fn check_serviceability(&self, pincode: &str) -> Result<DeliveryArea, CheckoutError> {
        let pincode = pincode.trim();
        if !is_valid_pincode(pincode) {
            return Err(CheckoutError::InvalidField {
                field: "pincode",
                reason: "expected 6 digits",
            });
        }
        let area = self
            .backend
            .delivery_area(pincode)
            .await?
            .ok_or_else(|| CheckoutError::UnknownPincode(pincode.to_string()))?;
        if !area.is_serviceable {
            return Err(CheckoutError::NotServiceable {
                pincode: area.pincode,
                area_name: area.area_name,
            });
        }
        Ok(area)
    }

    pub async fn quote(&self, cart: &Cart, pincode: &str) -> Result<Quote, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let area = self.check_serviceability(pincode).await?;
        let subtotal = cart.total_price();
        let delivery_fee = area.delivery_fee;
        let total = subtotal
            .saturating_add(u64::from(delivery_fee))
            .saturating_add(u64::from(self.packaging_fee));
        // Orders store every amount as a u32 column.
        let (Ok(subtotal), Ok(total)) = (u32::try_from(subtotal), u32::try_from(total)) else {
            return Err(CheckoutError::TotalTooLarge(total));
        };
        Ok(Quote {
            subtotal,
            delivery_fee,
            packaging_fee: self.packaging_fee,
            total,
            area,
        })
    }

    /// Validates, prices and submits the cart. The cart is cleared only
    /// after the order has been stored.
    pub async fn place_order(
        &self,
        store: &mut CartStore,
        details: &DeliveryDetails,
        payment_method: PaymentMethod,
        user_id: Option<&str>,
    ) -> Result<Order, CheckoutError> {
        if store.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if !payment_method.is_accepted() {
            return Err(CheckoutError::PaymentUnavailable(payment_method));
        }
        let details = details.validated()?;
        let quote = self.quote(store.cart(), &details.pincode).await?;

        let new_order = build_order(
            store.cart(),
            &details,
            &quote,
            payment_method,
            user_id,
            Utc::now(),
        );
        let order = self.backend.insert_order(&new_order).await?;
        tracing::info!(
            order_id = %order.id,
            total = order.total_amount,
            pincode = %order.pincode,
            "order placed"
        );

        store.clear()?;
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::catalog::builtin_dishes;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn details() -> DeliveryDetails {
        DeliveryDetails {
            customer_name: " Sita ".to_string(),
            phone: "+91 98765-43210".to_string(),
            email: Some("sita@example.in".to_string()),
            address: "4-12 Arundelpet".to_string(),
            city: "Guntur".to_string(),
            pincode: "522002".to_string(),
        }
    }

    fn area(pincode: &str, serviceable: bool) -> DeliveryArea {
        DeliveryArea {
            id: format!("area-{pincode}"),
            pincode: pincode.to_string(),
            area_name: "Arundelpet".to_string(),
            city: "Guntur".to_string(),
            delivery_fee: 30,
            estimated_delivery_minutes: 45,
            is_serviceable: serviceable,
        }
    }

    async fn service_with_areas() -> (Arc<MemoryBackend>, CheckoutService) {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_area(area("522002", true)).await;
        backend.seed_area(area("522003", false)).await;
        let service = CheckoutService::new(backend.clone());
        (backend, service)
    }

    fn filled_store(dir: &TempDir) -> CartStore {
        let mut store = CartStore::open(dir.path().join("cart.json")).unwrap();
        let dishes = builtin_dishes();
        store.add(&dishes[0]).unwrap();
        store.add(&dishes[0]).unwrap();
        store.add(&dishes[6]).unwrap();
        store
    }

    #[test]
    fn phone_normalisation() {
        assert_eq!(normalize_phone("98765 43210").as_deref(), Some("9876543210"));
        assert_eq!(normalize_phone("+91-9876543210").as_deref(), Some("9876543210"));
        assert_eq!(normalize_phone("919876543210").as_deref(), Some("9876543210"));
        assert_eq!(normalize_phone("98765"), None);
        assert_eq!(normalize_phone("98765abcde"), None);
    }

    #[test]
    fn validation_rejects_missing_fields() {
        let mut bad = details();
        bad.city = "   ".to_string();
        assert!(matches!(
            bad.validated(),
            Err(CheckoutError::InvalidField { field: "city", .. })
        ));

        let mut bad = details();
        bad.pincode = "52200".to_string();
        assert!(matches!(
            bad.validated(),
            Err(CheckoutError::InvalidField { field: "pincode", .. })
        ));

        let mut bad = details();
        bad.email = Some("nobody".to_string());
        assert!(matches!(
            bad.validated(),
            Err(CheckoutError::InvalidField { field: "email", .. })
        ));

        let ok = details().validated().unwrap();
        assert_eq!(ok.customer_name, "Sita");
        assert_eq!(ok.phone, "9876543210");
    }

    #[tokio::test]
    async fn quote_adds_delivery_and_packaging() {
        let (_backend, service) = service_with_areas().await;
        let dir = TempDir::new().unwrap();
        let store = filled_store(&dir);

        let quote = service.quote(store.cart(), "522002").await.unwrap();
        assert_eq!(quote.subtotal, 250 * 2 + 60);
        assert_eq!(quote.delivery_fee, 30);
        assert_eq!(quote.packaging_fee, 20);
        assert_eq!(quote.total, 560 + 30 + 20);
    }

    #[tokio::test]
    async fn oversized_total_is_rejected_and_cart_kept() {
        let (backend, service) = service_with_areas().await;
        let dir = TempDir::new().unwrap();
        let mut store = CartStore::open(dir.path().join("cart.json")).unwrap();
        let mut banquet = builtin_dishes().remove(0);
        banquet.price = 50_000_000;
        store.add(&banquet).unwrap();
        store.update_quantity(&banquet.id, 20_000_000).unwrap();

        let err = service
            .place_order(&mut store, &details(), PaymentMethod::Cod, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::TotalTooLarge(total) if total == 4_950_000_050));
        assert_eq!(store.total_items(), 99);
        assert!(backend.orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn serviceability_gate() {
        let (_backend, service) = service_with_areas().await;
        assert!(matches!(
            service.check_serviceability("500001").await,
            Err(CheckoutError::UnknownPincode(p)) if p == "500001"
        ));
        assert!(matches!(
            service.check_serviceability("522003").await,
            Err(CheckoutError::NotServiceable { .. })
        ));
        assert_eq!(
            service.check_serviceability(" 522002 ").await.unwrap().delivery_fee,
            30
        );
    }

    #[tokio::test]
    async fn place_order_stores_order_and_clears_cart() {
        let (backend, service) = service_with_areas().await;
        let service = service.with_packaging_fee(25);
        let dir = TempDir::new().unwrap();
        let mut store = filled_store(&dir);

        let order = service
            .place_order(&mut store, &details(), PaymentMethod::Cod, Some("user-1"))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.total_amount, 560 + 30 + 25);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.phone, "9876543210");
        let lead = order.estimated_delivery_time.unwrap() - order.created_at;
        assert!(lead <= Duration::minutes(45) && lead > Duration::minutes(44));
        assert!(store.is_empty());
        assert!(CartStore::open(store.path()).unwrap().is_empty());
        assert_eq!(backend.orders(Some("user-1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_checkout_keeps_cart() {
        let (backend, service) = service_with_areas().await;
        let dir = TempDir::new().unwrap();
        let mut store = filled_store(&dir);

        let err = service
            .place_order(&mut store, &details(), PaymentMethod::Upi, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentUnavailable(PaymentMethod::Upi)));

        let mut unserviceable = details();
        unserviceable.pincode = "522003".to_string();
        let err = service
            .place_order(&mut store, &unserviceable, PaymentMethod::Cod, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NotServiceable { .. }));

        assert_eq!(store.total_items(), 3);
        assert!(backend.orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let (_backend, service) = service_with_areas().await;
        let dir = TempDir::new().unwrap();
        let mut store = CartStore::open(dir.path().join("cart.json")).unwrap();
        let err = service
            .place_order(&mut store, &details(), PaymentMethod::Cod, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }
}
