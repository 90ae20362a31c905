pub mod name;

pub use name::{choose_canonical, choose_representative, normalize_name};
