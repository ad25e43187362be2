pub mod import;
pub mod optimizer;
pub mod roster;
