pub mod employee;
pub mod image;
