const DEFAULT_BATCH_SIZE: usize = 32;

pub(crate) mod utils;
pub use utils::Compose;

mod init;
pub use init::*;

mod r#impl;
