//! Client engine for the Optika eyewear storefront cart.
//!
//! All business rules live behind the remote cart service; this crate
//! implements the client side: the cart data model (`model`), the shared
//! server-confirmed state (`cart`), the typed HTTP client (`api`), the
//! debounced quantity sync core (`sync`), and the edit policies at the UI
//! boundary (`input`).

pub mod api;
pub mod cart;
pub mod input;
pub mod model;
pub mod sync;
pub mod telemetry;
