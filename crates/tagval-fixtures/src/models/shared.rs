use std::rc::Rc;
use std::sync::Arc;

pub struct Handle {
    /// validate: gt=0
    pub n: Box<i32>,
    /// validate: required
    pub owners: Rc<u32>,
    /// validate: uuid
    pub id: Arc<String>,
    /// validate: omitempty,min=2
    pub alias: Option<Box<String>>,
}

mod validation {
    include!(concat!(env!("OUT_DIR"), "/shared_validation.rs"));
}
