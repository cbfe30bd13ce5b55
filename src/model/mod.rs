pub mod catalog;
pub mod files;
pub mod source;

pub use catalog::{ModelCatalog, ModelEntry};
pub use files::{estimate_model_size, extract_param_count_from_readme, list_model_files, ModelFileInfo};
pub use source::{
    read_config_file, ChainedConfigSource, ConfigSource, DirConfigSource, HfCacheConfigSource, NoConfigSource,
    StaticConfigSource,
};
