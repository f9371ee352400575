//! Account balance snapshot.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Account {
    pub cash_available: f64,
    pub total_assets: f64,
}

impl Account {
    pub fn new(cash: f64) -> Self {
        Account {
            cash_available: cash,
            total_assets: cash,
        }
    }
}
