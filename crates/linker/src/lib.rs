pub mod linker;
pub mod options;

pub(crate) mod combine;
pub(crate) mod fetch;
pub(crate) mod filters;
pub(crate) mod rank;
pub(crate) mod ranges;
pub(crate) mod util;

pub use linker::{link_bills_to_operations, BillLinkage, LinkError, Linker};
pub use options::LinkOptions;
