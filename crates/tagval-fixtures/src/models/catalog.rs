pub struct Catalog {
    /// validate: unique=sku
    pub products: Vec<Product>,
    /// validate: unique=sku
    pub featured: Vec<Option<Product>>,
    /// validate: email
    pub contacts: Vec<String>,
    /// validate: dive
    pub legacy: Vec<Legacy>,
    /// validate: omitempty,min=2
    pub code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Product {
    pub sku: String,
}

/// validate: skip
pub struct Legacy {
    /// validate: required
    pub name: String,
}

mod validation {
    include!(concat!(env!("OUT_DIR"), "/catalog_validation.rs"));
}
