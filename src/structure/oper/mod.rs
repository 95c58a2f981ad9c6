pub mod symmops;
