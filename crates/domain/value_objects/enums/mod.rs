pub mod capture_statuses;
pub mod cart_statuses;
pub mod order_statuses;
pub mod payment_methods;
pub mod shipping_methods;
