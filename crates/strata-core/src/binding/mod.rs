//! Bindings between storage volumes and the databases and tables using them.
//!
//! Each entity kind has a forward map (`entity -> volume`) and a reverse
//! index (`volume -> {entity}`) that are always updated together. Replay
//! mode skips the volume existence check, since the journal only carries
//! binds that were validated when first applied.

mod index;
mod table;

pub use table::{BindingSnapshot, BindingTable};
