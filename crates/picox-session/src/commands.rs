//! Built-in remote commands, compiled from `templates/` at build time.
//!
//! Each constant is a [`StaticCommand`](picox_compiler::StaticCommand) whose
//! parameters are listed in order of first use:
//!
//! - `CREATE_DIR(directory)`
//! - `DELETE_PATH(folder_path, is_recursive)`
//! - `DOWNLOAD_FILE(pico_filename)`
//! - `UPLOAD_FILE(hex_data, pico_file_path)`

include!(concat!(env!("OUT_DIR"), "/commands.rs"));
