//! Typed entities and the normalization step at the store boundary.

mod id;
mod liked_by;
pub(crate) mod normalize;
mod product;

pub use id::{validate_id, EntityId, SellerId, UserId};
pub use liked_by::LikedBy;
pub use normalize::NormalizeError;
pub use product::Product;
