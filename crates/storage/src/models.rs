//! Stored records

use serde::{Deserialize, Serialize};

/// Color tag attached to predictions and wishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    #[default]
    Gold,
    Silver,
    Green,
    Purple,
}

impl Color {
    /// Palette a new wish draws its color from
    pub const PALETTE: [Color; 6] = [
        Color::Red,
        Color::Blue,
        Color::Gold,
        Color::Silver,
        Color::Green,
        Color::Purple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Gold => "gold",
            Color::Silver => "silver",
            Color::Green => "green",
            Color::Purple => "purple",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seeded festive prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prediction {
    pub id: i64,
    pub text: String,
    pub color: Color,
}

/// Visitor wish
///
/// `created_at` is the SQLite `CURRENT_TIMESTAMP` text (`YYYY-MM-DD HH:MM:SS`, UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wish {
    pub id: i64,
    pub text: String,
    pub color: Color,
    pub created_at: String,
}
