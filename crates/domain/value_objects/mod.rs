pub mod carts;
pub mod checkout;
pub mod enums;
pub mod money;
pub mod orders;
pub mod payments;
