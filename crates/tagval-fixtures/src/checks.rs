use crate::models::account::Account;

const RESERVED: [&str; 3] = ["admin", "root", "system"];

pub fn not_reserved(handle: &str) -> Result<(), String> {
    if RESERVED.contains(&handle) {
        return Err(format!("`{handle}` is reserved"));
    }
    Ok(())
}

/// An account cannot be closed before it was opened.
pub fn account_window(account: &Account) -> Result<(), String> {
    match account.closed {
        Some(closed) if closed < account.opened => Err("closed before opened".to_string()),
        _ => Ok(()),
    }
}
