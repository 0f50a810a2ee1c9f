pub mod check;
pub mod cleanup;
pub mod extend;
pub mod status;
