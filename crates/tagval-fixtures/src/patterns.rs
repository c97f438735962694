use std::sync::LazyLock;

use regex::Regex;

pub static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern"));
