pub mod bill;
pub mod money;
pub mod operation;
pub mod period;

pub use bill::{Bill, BILLS_DOCTYPE};
pub use money::Money;
pub use operation::{Operation, Reimbursement, OPERATIONS_DOCTYPE};
pub use period::{AmountRange, DateRange};
