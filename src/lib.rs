pub mod ballistics;
pub mod cache;
pub mod equipment;
pub mod error;
pub mod interpolation;
pub mod solution;
pub mod table;


pub use ballistics::{AltitudeConvention, BallisticRow, Field, Solution, Trajectory};
pub use error::{EquipmentError, InterpolationError, TableError};
pub use solution::{FiringQuery, SolutionFinder};
pub use table::{RangeTable, RangeTableStore, StoreConfig, TableKey};
