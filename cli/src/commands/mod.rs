pub mod lockup;
pub mod members;
pub mod requests;
