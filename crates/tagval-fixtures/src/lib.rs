//! Models whose `validate()` methods are generated by `build.rs`.

pub mod checks;
pub mod patterns;

pub mod models {
    pub mod account;
    pub mod catalog;
    pub mod credentials;
    pub mod order;
    pub mod pricing;
    pub mod reading;
    pub mod shared;
}
