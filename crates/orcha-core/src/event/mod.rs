//! Run event distribution.

pub mod bus;
