pub mod rainfall;
pub mod site;
pub mod value;

pub use rainfall::{RainfallObservation, RAINFALL_COLUMNS};
pub use site::Site;
pub use value::Value;
