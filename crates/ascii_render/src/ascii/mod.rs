pub mod alphabet;
pub mod grid;
pub mod mapping;
pub mod series;
