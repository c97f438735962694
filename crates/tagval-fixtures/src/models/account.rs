use serde_json::Number;

/// validate: crate::checks:account_window
#[derive(Debug, Clone)]
pub struct Account {
    /// validate: required,min=3,max=32
    pub name: String,
    /// validate: gte=18,lte=100
    pub age: i32,
    /// validate: omitempty,email
    pub email: String,
    /// validate: uuid
    pub id: String,
    /// validate: omitempty,iso4217
    pub currency: String,
    /// validate: omitempty,iso3166-alpha2
    pub country: Option<String>,
    /// validate: omitempty,datetime=%Y-%m-%d
    pub born: String,
    /// validate: regexp=crate::patterns:SLUG
    pub slug: String,
    /// validate: crate::checks:not_reserved
    pub handle: String,
    /// validate: min=1,max=5,unique
    pub tags: Vec<String>,
    /// validate: gte=0
    pub balance: Number,
    pub opened: i64,
    pub closed: Option<i64>,
}

mod validation {
    include!(concat!(env!("OUT_DIR"), "/account_validation.rs"));
}
