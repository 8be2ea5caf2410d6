//! Aggregates module
pub mod product;
pub mod configuration;
pub mod order;
pub mod cart;

pub use product::{Product, ProductError, ProductOptions, ProductStatus, ProductUpdate};
pub use configuration::{Configuration, ConfigurationError, ConfigurationStatus};
pub use order::{Order, OrderError, OrderItem, OrderLine, OrderStatus, PaymentStatus, ShippingAddress};
pub use cart::{Cart, CartError, CartItem};
