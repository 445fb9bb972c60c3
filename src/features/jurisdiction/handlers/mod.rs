pub mod jurisdiction_handler;

pub use jurisdiction_handler::get_jurisdiction;
