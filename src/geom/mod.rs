mod dissolve;
mod feature;

pub use dissolve::{DEFAULT_TOLERANCE, Dissolved, Dissolver};
pub use feature::{Feature, FeatureCollection};
pub(crate) use feature::value_as_string;
