pub mod callback_signature;
pub mod paypal_client;
