pub mod temp_store;

pub use temp_store::{sanitize_file_name, ScratchStore, StagedFile, TempResourceManager};
