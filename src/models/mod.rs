pub mod category;
pub mod enums;
pub mod transaction;
pub mod user;

pub use category::*;
pub use enums::*;
pub use transaction::*;
pub use user::*;
