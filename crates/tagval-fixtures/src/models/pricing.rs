pub struct Discount {
    /// validate: required_without=percentage
    pub fixed: Option<f64>,
    /// validate: required_without=fixed
    pub percentage: Option<f64>,
}

mod validation {
    include!(concat!(env!("OUT_DIR"), "/pricing_validation.rs"));
}
