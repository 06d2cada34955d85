//! Closed option sets offered to the user: food categories, aspect ratios and
//! the toggleable visual enhancements.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementOption {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

/// `(id, label)` in display order. Ids are stable API identifiers.
const ENHANCEMENTS: &[(&str, &str)] = &[
    ("lighting", "Iluminação profissional de estúdio"),
    ("colors", "Cores mais vivas e naturais"),
    ("background", "Fundo sofisticado e desfocado"),
    ("editorial", "Estilo editorial gastronômico"),
    ("texture", "Realce de textura, brilho e frescor"),
    ("structure", "Manter o produto sem alterações estruturais"),
];

/// Fresh catalog with every option selected.
pub fn default_enhancements() -> Vec<EnhancementOption> {
    ENHANCEMENTS
        .iter()
        .map(|(id, label)| EnhancementOption { id: id.to_string(), label: label.to_string(), selected: true })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodCategory {
    #[serde(rename = "Pizza")]
    Pizza,
    #[serde(rename = "Hambúrguer")]
    Burger,
    #[serde(rename = "Sushi")]
    Sushi,
    #[serde(rename = "Doces e sobremesas")]
    Dessert,
    #[serde(rename = "Bebidas")]
    Drinks,
    #[serde(rename = "Pratos quentes")]
    HotDish,
    #[serde(rename = "Fast food")]
    FastFood,
    #[serde(rename = "Massas")]
    Pasta,
    #[serde(rename = "Lanches artesanais")]
    Artisan,
    #[serde(rename = "Pastelaria")]
    Pastry,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 10] = [
        FoodCategory::Pizza,
        FoodCategory::Burger,
        FoodCategory::Sushi,
        FoodCategory::Dessert,
        FoodCategory::Drinks,
        FoodCategory::HotDish,
        FoodCategory::FastFood,
        FoodCategory::Pasta,
        FoodCategory::Artisan,
        FoodCategory::Pastry,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FoodCategory::Pizza => "Pizza",
            FoodCategory::Burger => "Hambúrguer",
            FoodCategory::Sushi => "Sushi",
            FoodCategory::Dessert => "Doces e sobremesas",
            FoodCategory::Drinks => "Bebidas",
            FoodCategory::HotDish => "Pratos quentes",
            FoodCategory::FastFood => "Fast food",
            FoodCategory::Pasta => "Massas",
            FoodCategory::Artisan => "Lanches artesanais",
            FoodCategory::Pastry => "Pastelaria",
        }
    }

    /// Short ASCII slug for command lines.
    pub fn slug(self) -> &'static str {
        match self {
            FoodCategory::Pizza => "pizza",
            FoodCategory::Burger => "burger",
            FoodCategory::Sushi => "sushi",
            FoodCategory::Dessert => "dessert",
            FoodCategory::Drinks => "drinks",
            FoodCategory::HotDish => "hot-dish",
            FoodCategory::FastFood => "fast-food",
            FoodCategory::Pasta => "pasta",
            FoodCategory::Artisan => "artisan",
            FoodCategory::Pastry => "pastry",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FoodCategory {
    type Err = AppError;

    /// Accepts either the display label or the slug, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        FoodCategory::ALL
            .into_iter()
            .find(|c| c.label().to_lowercase() == wanted || c.slug() == wanted)
            .ok_or_else(|| AppError::validation(format!("Unknown food category '{}'", s)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Portrait,
    #[default]
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] =
        [AspectRatio::Square, AspectRatio::Portrait, AspectRatio::Story, AspectRatio::Landscape];

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "4:5",
            AspectRatio::Story => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }

    /// Where the format is typically published.
    pub fn usage(self) -> &'static str {
        match self {
            AspectRatio::Square => "Instagram Feed",
            AspectRatio::Portrait => "Portrait",
            AspectRatio::Story => "Stories/Reels",
            AspectRatio::Landscape => "Youtube",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AspectRatio {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|r| r.label() == s.trim())
            .ok_or_else(|| AppError::validation(format!("Unknown aspect ratio '{}' (expected 1:1, 4:5, 9:16 or 16:9)", s)))
    }
}
