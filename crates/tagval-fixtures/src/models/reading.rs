pub struct Reading {
    /// validate: required
    pub count: i64,
    /// validate: required
    pub ratio: f64,
    /// validate: required
    pub unit: Option<String>,
}

mod validation {
    include!(concat!(env!("OUT_DIR"), "/reading_validation.rs"));
}
