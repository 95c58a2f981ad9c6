pub mod lattice;
pub mod coords;
