//! Access-token primitives.

pub mod jwt;
