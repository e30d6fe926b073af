pub mod evaluation_sink;
pub mod inventory;
