//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule covers one area of the API (health, raw record catalog,
//! the my-list operations) and exposes typed Rocket handlers annotated with
//! `#[openapi]` so `rocket_okapi` can derive an OpenAPI document.

pub mod catalog;
pub mod health;
pub mod my_list;
