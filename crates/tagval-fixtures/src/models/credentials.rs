pub struct Credentials {
    pub password: String,
    /// validate: eqfield=password
    pub confirm: String,
}

pub struct BothOptional {
    /// validate: eqfield=b
    pub a: Option<String>,
    pub b: Option<String>,
}

pub struct OptionalLeft {
    /// validate: eqfield=b
    pub a: Option<String>,
    pub b: String,
}

pub struct OptionalRight {
    /// validate: eqfield=b
    pub a: String,
    pub b: Option<String>,
}

mod validation {
    include!(concat!(env!("OUT_DIR"), "/credentials_validation.rs"));
}
