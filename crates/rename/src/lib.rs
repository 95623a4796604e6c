//! DeITy rename pipelines - encode identifiers out of filenames and restore them.

pub mod executor;
pub mod files;
pub mod pipeline;
pub mod recovery;

pub use executor::{check_destinations, commit, DryRunRenamer, FsRenamer, Renamer};
pub use files::get_file_list;
pub use pipeline::{decode_all, encode_files, DecodeReport, EncodeOptions, EncodeReport};
pub use recovery::find_existing_file;
