pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payments;
