pub mod loan;
pub mod optimize;
pub mod tool;
