use std::collections::BTreeMap;

pub struct Order {
    /// validate: min=1,dive
    pub items: Vec<Item>,
    /// validate: dive
    pub gift: Option<Item>,
    /// validate: dive
    pub by_sku: BTreeMap<String, Item>,
    /// validate: dive,min=1,dive,gt=0
    pub matrix: Vec<Vec<i32>>,
    /// validate: dive
    pub notes: Vec<Note>,
}

pub struct Item {
    /// validate: gt=0
    pub price: f64,
    /// validate: lte=99
    pub quantity: u32,
}

/// Carries no rules of its own; dived into from `Order`.
pub struct Note {
    pub text: String,
}

mod validation {
    include!(concat!(env!("OUT_DIR"), "/order_validation.rs"));
}
