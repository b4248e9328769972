#![deny(missing_docs)]
#![doc = "Counter-based RNG core for the SDG platform: the Philox-style bijection, key derivation, counter accounting types, and structured errors shared by every generative stage."]

pub mod derive;
pub mod errors;
pub mod philox;
pub mod provenance;
mod types;

pub use derive::{root_key, sub_key, KEY_SEPARATOR};
pub use errors::{ErrorInfo, SdgError};
pub use philox::{philox_block, uniform_from_word, PHILOX_ROUNDS, WORDS_PER_BLOCK};
pub use provenance::RunIdentity;
pub use types::{CounterState, ManifestFingerprint, ParameterHash, RootKey, SubKey};
