//! Menu catalog: the built-in dish list or the remote `menu_items` table.

use std::str::FromStr;

use crate::backend::{Backend, BackendResult};
use crate::config::CatalogSource;
use crate::model::{Category, Dish, DishType, Nutrition, Region, UnknownVariant};

/// Category as listed on the menu page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub id: Category,
    pub name: &'static str,
    pub telugu: &'static str,
}

struct SeedDish {
    id: &'static str,
    name: &'static str,
    telugu: &'static str,
    description: &'static str,
    price: u32,
    category: Category,
    region: Region,
    dish_type: DishType,
    image: &'static str,
    popular: bool,
    ingredients: &'static [&'static str],
    nutrition: (u32, &'static str, &'static str),
}

const BUILTIN_DISHES: &[SeedDish] = &[
    SeedDish {
        id: "1",
        name: "Special Hyderabadi Biryani",
        telugu: "స్పెషల్ హైదరాబాద్ బిర్యానీ",
        description: "Aromatic basmati rice cooked with tender meat and secret spices, layered with love",
        price: 250,
        category: Category::Meals,
        region: Region::Both,
        dish_type: DishType::Nonveg,
        image: "assets/biryani.jpg",
        popular: true,
        ingredients: &["Basmati Rice", "Chicken/Mutton", "Yogurt", "Spices", "Herbs", "Ghee"],
        nutrition: (550, "25g", "60g"),
    },
    SeedDish {
        id: "2",
        name: "Crispy Masala Dosa",
        telugu: "మసాలా దోస",
        description: "Golden crispy dosa with perfectly spiced potato filling, served with sambar & chutneys",
        price: 80,
        category: Category::Tiffins,
        region: Region::Both,
        dish_type: DishType::Veg,
        image: "assets/dosa.jpg",
        popular: true,
        ingredients: &["Rice Batter", "Urad Dal", "Potato", "Onion", "Spices", "Curry Leaves"],
        nutrition: (250, "8g", "45g"),
    },
    SeedDish {
        id: "3",
        name: "Andhra Chicken Curry",
        telugu: "ఆంధ్ర కోడి కూర",
        description: "Spicy and tangy Andhra style chicken curry with authentic home-ground masala",
        price: 180,
        category: Category::Curries,
        region: Region::Andhra,
        dish_type: DishType::Nonveg,
        image: "assets/chicken-curry.jpg",
        popular: true,
        ingredients: &["Chicken", "Onion", "Tomato", "Red Chili", "Coriander", "Garlic", "Ginger"],
        nutrition: (320, "30g", "15g"),
    },
    SeedDish {
        id: "4",
        name: "Avakaya Mango Pickle",
        telugu: "ఆవకాయ",
        description: "Traditional Andhra style mango pickle with perfect spice balance, just like Amma made",
        price: 150,
        category: Category::Pickles,
        region: Region::Andhra,
        dish_type: DishType::Veg,
        image: "assets/pickles.jpg",
        popular: false,
        ingredients: &["Raw Mango", "Red Chili Powder", "Mustard", "Fenugreek", "Salt", "Oil"],
        nutrition: (50, "1g", "8g"),
    },
    SeedDish {
        id: "5",
        name: "Bellam Ariselu",
        telugu: "బెల్లం అరిసెలు",
        description: "Sweet rice flour jaggery patties, a traditional festive delicacy made with pure ghee",
        price: 120,
        category: Category::Sweets,
        region: Region::Both,
        dish_type: DishType::Veg,
        image: "assets/sweets.jpg",
        popular: false,
        ingredients: &["Rice Flour", "Jaggery", "Ghee", "Cardamom", "Sesame Seeds"],
        nutrition: (280, "4g", "50g"),
    },
    SeedDish {
        id: "6",
        name: "Gongura Mutton",
        telugu: "గోంగూర మటన్",
        description: "Telangana signature dish: tender mutton cooked with tangy gongura leaves",
        price: 280,
        category: Category::Curries,
        region: Region::Telangana,
        dish_type: DishType::Nonveg,
        image: "assets/chicken-curry.jpg",
        popular: true,
        ingredients: &["Mutton", "Gongura Leaves", "Onion", "Garlic", "Spices", "Oil"],
        nutrition: (420, "35g", "12g"),
    },
    SeedDish {
        id: "7",
        name: "Idli Sambar",
        telugu: "ఇడ్లీ సాంబార్",
        description: "Soft steamed rice cakes with flavorful vegetable sambar and coconut chutney",
        price: 60,
        category: Category::Tiffins,
        region: Region::Both,
        dish_type: DishType::Veg,
        image: "assets/dosa.jpg",
        popular: true,
        ingredients: &["Rice", "Urad Dal", "Lentils", "Vegetables", "Tamarind", "Spices"],
        nutrition: (180, "6g", "35g"),
    },
    SeedDish {
        id: "8",
        name: "Pulihora (Tamarind Rice)",
        telugu: "పులిహోర",
        description: "Tangy and flavorful tamarind rice with peanuts and aromatic tempering",
        price: 100,
        category: Category::Meals,
        region: Region::Both,
        dish_type: DishType::Veg,
        image: "assets/biryani.jpg",
        popular: false,
        ingredients: &["Rice", "Tamarind", "Peanuts", "Curry Leaves", "Mustard", "Turmeric"],
        nutrition: (350, "8g", "55g"),
    },
];

impl SeedDish {
    fn to_dish(&self) -> Dish {
        let (calories, protein, carbs) = self.nutrition;
        Dish {
            id: self.id.to_string(),
            name: self.name.to_string(),
            telugu: Some(self.telugu.to_string()),
            description: self.description.to_string(),
            price: self.price,
            category: self.category,
            region: self.region,
            dish_type: self.dish_type,
            image: Some(self.image.to_string()),
            popular: self.popular,
            available: true,
            ingredients: self.ingredients.iter().map(|s| (*s).to_string()).collect(),
            nutrition: Some(Nutrition {
                calories,
                protein: protein.to_string(),
                carbs: carbs.to_string(),
            }),
        }
    }
}

/// The built-in dish list in menu order.
pub fn builtin_dishes() -> Vec<Dish> {
    BUILTIN_DISHES.iter().map(SeedDish::to_dish).collect()
}

/// Every category in menu order.
pub fn categories() -> Vec<CategoryInfo> {
    Category::ALL
        .into_iter()
        .map(|id| CategoryInfo {
            id,
            name: id.display_name(),
            telugu: id.telugu_name(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Catalog order.
    #[default]
    Featured,
    PriceLowToHigh,
    PriceHighToLow,
    Name,
}

impl FromStr for SortOrder {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "featured" => Ok(Self::Featured),
            "price" | "price-asc" | "price_asc" => Ok(Self::PriceLowToHigh),
            "price-desc" | "price_desc" => Ok(Self::PriceHighToLow),
            "name" => Ok(Self::Name),
            _ => Err(UnknownVariant {
                kind: "sort order",
                value: s.to_string(),
                expected: "featured, price-asc, price-desc, name",
            }),
        }
    }
}

/// Customer-facing menu filters. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuFilter {
    pub category: Option<Category>,
    pub region: Option<Region>,
    pub dish_type: Option<DishType>,
    pub popular_only: bool,
    /// Case-insensitive match on name, Telugu name or description.
    pub search: Option<String>,
    pub sort: SortOrder,
}

impl MenuFilter {
    pub fn matches(&self, dish: &Dish) -> bool {
        if self.category.is_some_and(|category| dish.category != category) {
            return false;
        }
        if self.region.is_some_and(|region| !dish.region.matches(region)) {
            return false;
        }
        if self.dish_type.is_some_and(|kind| dish.dish_type != kind) {
            return false;
        }
        if self.popular_only && !dish.popular {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                dish.name.to_lowercase().contains(&needle)
                    || dish.description.to_lowercase().contains(&needle)
                    || dish
                        .telugu
                        .as_deref()
                        .is_some_and(|telugu| telugu.contains(&needle))
            }
            _ => true,
        }
    }
}

/// Dishes offered to customers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    dishes: Vec<Dish>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            dishes: builtin_dishes(),
        }
    }

    /// Builds a customer catalog; unavailable dishes are dropped.
    pub fn from_dishes(dishes: Vec<Dish>) -> Self {
        Self {
            dishes: dishes.into_iter().filter(|dish| dish.available).collect(),
        }
    }

    pub async fn load(source: CatalogSource, backend: &dyn Backend) -> BackendResult<Self> {
        match source {
            CatalogSource::Static => Ok(Self::builtin()),
            CatalogSource::Remote => {
                let rows = backend.menu_items().await?;
                tracing::debug!(rows = rows.len(), "loaded remote menu");
                Ok(Self::from_dishes(rows))
            }
        }
    }

    pub fn dishes(&self) -> &[Dish] {
        &self.dishes
    }

    pub fn find(&self, id: &str) -> Option<&Dish> {
        self.dishes.iter().find(|dish| dish.id == id)
    }

    pub fn popular(&self) -> Vec<&Dish> {
        self.dishes.iter().filter(|dish| dish.popular).collect()
    }

    pub fn filter(&self, filter: &MenuFilter) -> Vec<&Dish> {
        let mut matched: Vec<&Dish> = self
            .dishes
            .iter()
            .filter(|dish| filter.matches(dish))
            .collect();
        match filter.sort {
            SortOrder::Featured => {}
            SortOrder::PriceLowToHigh => matched.sort_by_key(|dish| dish.price),
            SortOrder::PriceHighToLow => matched.sort_by_key(|dish| std::cmp::Reverse(dish.price)),
            SortOrder::Name => matched.sort_by_key(|dish| dish.name.to_lowercase()),
        }
        matched
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use pretty_assertions::assert_eq;

    fn ids(dishes: &[&Dish]) -> Vec<String> {
        dishes.iter().map(|dish| dish.id.clone()).collect()
    }

    #[test]
    fn builtin_catalog_shape() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.dishes().len(), 8);
        assert_eq!(categories().len(), 5);
        assert_eq!(categories()[4].telugu, "తీపి పదార్థాలు");
        assert_eq!(ids(&catalog.popular()), vec!["1", "2", "3", "6", "7"]);
        assert_eq!(catalog.find("6").map(|d| d.price), Some(280));
        assert!(catalog.find("99").is_none());
    }

    #[test]
    fn region_filter_includes_both() {
        let catalog = Catalog::builtin();
        let filter = MenuFilter {
            region: Some(Region::Andhra),
            ..Default::default()
        };
        assert_eq!(
            ids(&catalog.filter(&filter)),
            vec!["1", "2", "3", "4", "5", "7", "8"]
        );

        let filter = MenuFilter {
            region: Some(Region::Telangana),
            dish_type: Some(DishType::Nonveg),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter(&filter)), vec!["1", "6"]);
    }

    #[test]
    fn category_search_and_sort() {
        let catalog = Catalog::builtin();
        let tiffins = MenuFilter {
            category: Some(Category::Tiffins),
            sort: SortOrder::PriceLowToHigh,
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter(&tiffins)), vec!["7", "2"]);

        let search = MenuFilter {
            search: Some("  TAMARIND ".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter(&search)), vec!["8"]);

        let priciest = MenuFilter {
            sort: SortOrder::PriceHighToLow,
            ..Default::default()
        };
        assert_eq!(catalog.filter(&priciest)[0].name, "Gongura Mutton");
    }

    #[tokio::test]
    async fn remote_catalog_hides_unavailable() {
        let mut menu = builtin_dishes();
        menu[0].available = false;
        let backend = MemoryBackend::with_menu(menu);

        let catalog = Catalog::load(CatalogSource::Remote, &backend).await.unwrap();
        assert_eq!(catalog.dishes().len(), 7);
        assert!(catalog.find("1").is_none());

        let builtin = Catalog::load(CatalogSource::Static, &backend).await.unwrap();
        assert_eq!(builtin.dishes().len(), 8);
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!("price-desc".parse::<SortOrder>().unwrap(), SortOrder::PriceHighToLow);
        assert!("random".parse::<SortOrder>().is_err());
    }
}
