pub mod cart;
pub mod cart_store;
pub mod checkout;
pub mod order_ledger;
pub mod orders;
pub mod payment_reconciler;
pub mod retry;
#[cfg(test)]
pub mod test_support;
