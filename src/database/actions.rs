//! Store operations. Every function takes the pool it runs against; nothing
//! holds a connection between calls.

pub mod attributes;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;
