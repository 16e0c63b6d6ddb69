pub mod cart_line_items;
pub mod carts;
pub mod order_line_items;
pub mod orders;
pub mod products;
