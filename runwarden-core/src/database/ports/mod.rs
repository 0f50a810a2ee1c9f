pub mod databases;
pub mod runs;
