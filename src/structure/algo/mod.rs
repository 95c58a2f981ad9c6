pub mod bonds;
pub mod find_perm;
pub mod stars;
