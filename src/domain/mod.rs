mod cashbook;
mod entry;
mod money;
mod reason;
mod statement;
mod tax;

pub use cashbook::*;
pub use entry::*;
pub use money::*;
pub use reason::*;
pub use statement::*;
pub use tax::*;
