//! Request queue logic: ports, collapsing, and batch encoding.

pub mod collapse;
pub mod encoder;
pub mod memory;
pub mod ports;
