pub mod mapping;

pub use mapping::{MapperConfig, Inputs, read_config_file};
